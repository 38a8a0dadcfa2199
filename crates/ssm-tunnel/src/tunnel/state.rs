//! Tunnel lifecycle states.

use std::fmt;

/// Lifecycle of one tunnel run.
///
/// `Failed` is reachable only before the plugin is running; once `Open`, a
/// run always ends in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TunnelState {
    #[default]
    Idle,
    Negotiating,
    Launching,
    Open,
    Draining,
    Closed,
    Failed,
}

impl TunnelState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::Launching => "launching",
            Self::Open => "open",
            Self::Draining => "draining",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
