//! Tunnel orchestrator error types.

use crate::plugin::CommandError;
use crate::session::NegotiateError;

/// Terminal failures of a tunnel run.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("Session negotiation failed: {0}")]
    Negotiation(#[from] NegotiateError),

    #[error("Failed to build plugin command for session {session_id}: {source}")]
    Command {
        session_id: String,
        #[source]
        source: CommandError,
    },

    #[error("Failed to start {program} for session {session_id}: {source}")]
    Spawn {
        session_id: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin exited unexpectedly for session {session_id}: {detail}")]
    PluginExited { session_id: String, detail: String },

    #[error("Tunnel for session {session_id} cancelled")]
    Cancelled { session_id: String },
}

impl TunnelError {
    /// The negotiated session id, if negotiation got that far.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Negotiation(_) => None,
            Self::Command { session_id, .. }
            | Self::Spawn { session_id, .. }
            | Self::PluginExited { session_id, .. }
            | Self::Cancelled { session_id } => Some(session_id),
        }
    }
}
