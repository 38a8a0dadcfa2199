//! Control-plane client trait and errors.

use async_trait::async_trait;

use super::types::{SessionResult, StartSessionInput};

/// Errors reported by a control-plane client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("Control plane unavailable: {0}")]
    Unavailable(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Malformed session: {0}")]
    MalformedSession(String),

    #[error("Control plane error: {0}")]
    Other(String),
}

/// Managed-session operations of the cloud control plane.
///
/// Implementations must be safe to share across tasks; the orchestrator
/// holds one behind an `Arc` for the lifetime of a tunnel.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Start a managed session against `input.target`.
    async fn start_session(
        &self,
        input: &StartSessionInput,
    ) -> Result<SessionResult, ControlPlaneError>;

    /// Terminate a previously started session. Called best-effort on teardown.
    async fn terminate_session(&self, session_id: &str) -> Result<(), ControlPlaneError>;
}

/// Caller-supplied values a concrete client is configured with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSettings {
    pub region: String,
    pub profile: Option<String>,
}

impl ClientSettings {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            profile: None,
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Profile passed to the plugin; the plugin expects an empty string when unset.
    pub fn profile_arg(&self) -> &str {
        self.profile.as_deref().unwrap_or_default()
    }
}
