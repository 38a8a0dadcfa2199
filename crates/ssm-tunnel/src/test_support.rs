//! Scripted control-plane client for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::control::{ControlPlaneClient, ControlPlaneError, SessionResult, StartSessionInput};

/// Replays a fixed script of start-session outcomes and records every call.
pub struct ScriptedControlPlane {
    script: Mutex<VecDeque<Result<SessionResult, ControlPlaneError>>>,
    pub starts: Mutex<Vec<StartSessionInput>>,
    pub terminated: Mutex<Vec<String>>,
}

impl ScriptedControlPlane {
    pub fn new(script: Vec<Result<SessionResult, ControlPlaneError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            starts: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
        }
    }

    /// `failures` transient errors followed by one success.
    pub fn failing_then_ok(failures: usize, result: SessionResult) -> Self {
        let mut script: Vec<_> = (0..failures)
            .map(|i| Err(ControlPlaneError::Unavailable(format!("attempt {}", i + 1))))
            .collect();
        script.push(Ok(result));
        Self::new(script)
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn terminated_ids(&self) -> Vec<String> {
        self.terminated.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ControlPlaneClient for ScriptedControlPlane {
    async fn start_session(
        &self,
        input: &StartSessionInput,
    ) -> Result<SessionResult, ControlPlaneError> {
        if let Ok(mut starts) = self.starts.lock() {
            starts.push(input.clone());
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| Err(ControlPlaneError::Other("script exhausted".into())))
    }

    async fn terminate_session(&self, session_id: &str) -> Result<(), ControlPlaneError> {
        if let Ok(mut terminated) = self.terminated.lock() {
            terminated.push(session_id.to_string());
        }
        Ok(())
    }
}
