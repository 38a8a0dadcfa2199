//! Session input/output shapes shared with the plugin executable.
//!
//! Field names serialise in the control plane's PascalCase form because the
//! plugin parses these JSON documents verbatim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::client::ControlPlaneError;

/// Input to the session-start operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartSessionInput {
    pub target: String,
    pub document_name: String,
    pub parameters: BTreeMap<String, Vec<String>>,
}

/// A negotiated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionResult {
    pub session_id: String,
    pub stream_url: String,
    pub token_value: String,
}

impl SessionResult {
    pub fn new(
        session_id: impl Into<String>,
        stream_url: impl Into<String>,
        token_value: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            stream_url: stream_url.into(),
            token_value: token_value.into(),
        }
    }

    /// Reject results with any empty field.
    pub fn validate(&self) -> Result<(), ControlPlaneError> {
        let missing = [
            ("SessionId", &self.session_id),
            ("StreamUrl", &self.stream_url),
            ("TokenValue", &self.token_value),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty());

        match missing {
            Some((field, _)) => Err(ControlPlaneError::MalformedSession(format!(
                "{field} is empty"
            ))),
            None => Ok(()),
        }
    }
}
