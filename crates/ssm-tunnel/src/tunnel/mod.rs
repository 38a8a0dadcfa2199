//! Tunnel lifecycle orchestration.
//!
//! Negotiates a session, launches the plugin with the session credentials,
//! forwards plugin output to an [`OutputSink`](crate::subprocess::OutputSink),
//! and coordinates open/close with the caller over [`TunnelSignals`].

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod signal;
pub mod state;

pub use config::TunnelConfig;
pub use error::TunnelError;
pub use orchestrator::TunnelOrchestrator;
pub use signal::{OpenOutcome, SIGNAL_BUFFER, TunnelController, TunnelSignals, tunnel_signals};
pub use state::TunnelState;
