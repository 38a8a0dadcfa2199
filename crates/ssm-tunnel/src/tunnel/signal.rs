//! Open/close handshake between the orchestrator and its caller.
//!
//! `is_open` carries orchestrator -> caller values: `true` once the plugin is
//! running, then a final `false` after it is killed. A run that fails before
//! launch sends a single `false`. `can_close` carries one caller ->
//! orchestrator `true` asking for teardown.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Depth of both signal channels.
pub const SIGNAL_BUFFER: usize = 1;

/// Create a connected pair of orchestrator-side and caller-side signal ends.
pub fn tunnel_signals() -> (TunnelSignals, TunnelController) {
    let (open_tx, open_rx) = mpsc::channel(SIGNAL_BUFFER);
    let (close_tx, close_rx) = mpsc::channel(SIGNAL_BUFFER);
    (
        TunnelSignals::new(open_tx, close_rx),
        TunnelController {
            is_open: open_rx,
            can_close: close_tx,
        },
    )
}

/// Orchestrator side of the handshake.
#[derive(Debug)]
pub struct TunnelSignals {
    is_open: mpsc::Sender<bool>,
    can_close: mpsc::Receiver<bool>,
}

impl TunnelSignals {
    /// Wrap caller-owned channels.
    pub const fn new(is_open: mpsc::Sender<bool>, can_close: mpsc::Receiver<bool>) -> Self {
        Self { is_open, can_close }
    }

    /// Publish the open state without blocking.
    ///
    /// A caller that went away or left the previous value unread is logged
    /// and otherwise ignored.
    pub(crate) fn notify(&self, open: bool) {
        match self.is_open.try_send(open) {
            Ok(()) => debug!(open, "Sent tunnel open signal"),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(open, "Caller stopped listening for tunnel open signal");
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(open, "Previous tunnel open signal unread, dropping");
            }
        }
    }

    /// Publish the final `false`, waiting up to `timeout` for the caller to
    /// consume an earlier `true`.
    pub(crate) async fn notify_closed(&self, timeout: Duration) {
        match tokio::time::timeout(timeout, self.is_open.send(false)).await {
            Ok(Ok(())) => debug!("Sent tunnel closed signal"),
            Ok(Err(_)) => debug!("Caller stopped listening for tunnel closed signal"),
            Err(_) => warn!("Caller did not consume tunnel open signal, dropping closed signal"),
        }
    }

    /// Wait until the caller asks for teardown.
    ///
    /// `false` values are ignored; a dropped sender counts as a close request.
    pub(crate) async fn close_requested(&mut self) {
        loop {
            match self.can_close.recv().await {
                Some(true) | None => return,
                Some(false) => debug!("Ignoring false on close channel"),
            }
        }
    }
}

/// Result of waiting for the tunnel to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The plugin is running.
    Open,
    /// The run failed before the plugin started.
    Failed,
    /// No signal arrived before the deadline.
    TimedOut,
}

/// Caller side of the handshake.
#[derive(Debug)]
pub struct TunnelController {
    is_open: mpsc::Receiver<bool>,
    can_close: mpsc::Sender<bool>,
}

impl TunnelController {
    /// Wait up to `timeout` for the first open signal.
    pub async fn wait_open(&mut self, timeout: Duration) -> OpenOutcome {
        match tokio::time::timeout(timeout, self.is_open.recv()).await {
            Ok(Some(true)) => OpenOutcome::Open,
            Ok(Some(false) | None) => OpenOutcome::Failed,
            Err(_) => OpenOutcome::TimedOut,
        }
    }

    /// Next raw value from the open channel; `None` once the orchestrator is gone.
    pub async fn recv(&mut self) -> Option<bool> {
        self.is_open.recv().await
    }

    /// Ask the orchestrator to tear the tunnel down.
    ///
    /// Returns `false` if the orchestrator already finished.
    pub async fn close(&self) -> bool {
        self.can_close.send(true).await.is_ok()
    }

    /// Wait for the final `false`, or for the orchestrator to finish.
    pub async fn wait_closed(&mut self) {
        while let Some(open) = self.is_open.recv().await {
            if !open {
                return;
            }
        }
    }
}
