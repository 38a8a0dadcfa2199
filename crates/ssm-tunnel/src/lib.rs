//! ssm-tunnel Library
//!
//! Port-forwarding tunnels to remote instances over managed sessions:
//! - Session negotiation with fixed-delay retry
//! - Plugin command construction for the external tunneling executable
//! - Plugin supervision with output forwarding
//! - Open/close handshake with the caller

pub mod control;
pub mod plugin;
pub mod session;
pub mod shutdown;
pub mod subprocess;
pub mod tunnel;

#[cfg(test)]
mod test_support;

pub use control::{ControlPlaneClient, ControlPlaneError, SessionResult, StartSessionInput};
pub use session::SessionRequest;
pub use tunnel::{TunnelConfig, TunnelError, TunnelOrchestrator, tunnel_signals};
