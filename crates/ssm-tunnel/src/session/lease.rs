//! Scoped ownership of a negotiated session.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::control::{ControlPlaneClient, SessionResult};

/// A negotiated session that is terminated when released or dropped.
///
/// [`SessionLease::release`] awaits termination. Dropping an unreleased lease
/// (e.g. the owning future was cancelled) spawns termination on the current
/// runtime instead. Termination failures are logged, never returned.
pub struct SessionLease {
    client: Arc<dyn ControlPlaneClient>,
    session: SessionResult,
    released: bool,
}

impl SessionLease {
    pub fn new(client: Arc<dyn ControlPlaneClient>, session: SessionResult) -> Self {
        Self {
            client,
            session,
            released: false,
        }
    }

    pub const fn session(&self) -> &SessionResult {
        &self.session
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    /// Terminate the session against the control plane.
    pub async fn release(mut self) {
        self.released = true;
        terminate(self.client.as_ref(), &self.session.session_id).await;
    }
}

async fn terminate(client: &dyn ControlPlaneClient, session_id: &str) {
    match client.terminate_session(session_id).await {
        Ok(()) => info!(session_id, "Session terminated"),
        Err(e) => warn!(session_id, error = %e, "Failed to terminate session"),
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let client = Arc::clone(&self.client);
        let session_id = self.session.session_id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(session_id = %session_id, "Session lease dropped, terminating in background");
                handle.spawn(async move {
                    terminate(client.as_ref(), &session_id).await;
                });
            }
            Err(_) => {
                warn!(session_id = %session_id, "Session lease dropped outside a runtime, session left open");
            }
        }
    }
}
