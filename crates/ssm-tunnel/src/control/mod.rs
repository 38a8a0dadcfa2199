//! Control-plane client capability.
//!
//! The tunnel never talks to the cloud API directly; it negotiates and
//! terminates sessions through [`ControlPlaneClient`].

mod client;
mod types;

pub use client::{ClientSettings, ControlPlaneClient, ControlPlaneError};
pub use types::{SessionResult, StartSessionInput};
