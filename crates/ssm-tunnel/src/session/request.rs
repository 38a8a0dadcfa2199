//! Session request describing one tunnel attempt.

use std::collections::BTreeMap;
use std::time::Duration;

use ssm_tunnel_core::config::{PORT_FORWARD_DOCUMENT, SessionSettings};

use crate::control::StartSessionInput;

/// Immutable input to session negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    /// Instance the session targets.
    pub instance_id: String,
    /// Document selecting the session type.
    pub document_name: String,
    /// Document parameters, e.g. remote/local port numbers.
    pub parameters: BTreeMap<String, Vec<String>>,
    /// Attempt bound. Zero is treated as one.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_wait_interval: Duration,
}

impl SessionRequest {
    pub fn new(instance_id: impl Into<String>, document_name: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            document_name: document_name.into(),
            parameters: BTreeMap::new(),
            max_retries: 1,
            retry_wait_interval: Duration::ZERO,
        }
    }

    /// Port-forwarding request from `remote_port` on the instance to `local_port`.
    pub fn port_forward(instance_id: impl Into<String>, remote_port: u16, local_port: u16) -> Self {
        Self::new(instance_id, PORT_FORWARD_DOCUMENT)
            .with_parameter("portNumber", [remote_port.to_string()])
            .with_parameter("localPortNumber", [local_port.to_string()])
    }

    #[must_use]
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = String>,
    ) -> Self {
        self.parameters
            .insert(name.into(), values.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_wait_interval: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_wait_interval = retry_wait_interval;
        self
    }

    /// Apply the configured document and retry defaults.
    #[must_use]
    pub fn with_settings(mut self, settings: &SessionSettings) -> Self {
        self.document_name.clone_from(&settings.document_name);
        self.with_retries(
            settings.max_retries,
            Duration::from_secs(settings.retry_wait_secs),
        )
    }

    /// Attempt count with zero normalised to one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Control-plane input for this request.
    pub fn to_start_input(&self) -> StartSessionInput {
        StartSessionInput {
            target: self.instance_id.clone(),
            document_name: self.document_name.clone(),
            parameters: self.parameters.clone(),
        }
    }
}
