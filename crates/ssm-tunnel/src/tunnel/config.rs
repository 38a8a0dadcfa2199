//! Tunnel orchestrator configuration.

use std::time::Duration;

use ssm_tunnel_core::Config;
use ssm_tunnel_core::config::DEFAULT_PLUGIN_PROGRAM;

use crate::control::ClientSettings;

/// Default bound on joining output readers after the plugin is killed.
pub const DEFAULT_READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Default bound on delivering the final closed signal.
pub const DEFAULT_CLOSED_SIGNAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for launching and supervising the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    /// Region and profile handed to the plugin.
    pub client: ClientSettings,
    /// Plugin executable name or path.
    pub plugin_program: String,
    /// Upper bound on waiting for output readers after the plugin is killed.
    pub reader_drain_timeout: Duration,
    /// Upper bound on waiting for the caller to read an unread open signal
    /// before the closed signal is sent.
    pub closed_signal_timeout: Duration,
}

impl TunnelConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            client: ClientSettings::new(region),
            plugin_program: DEFAULT_PLUGIN_PROGRAM.to_string(),
            reader_drain_timeout: DEFAULT_READER_DRAIN_TIMEOUT,
            closed_signal_timeout: DEFAULT_CLOSED_SIGNAL_TIMEOUT,
        }
    }

    /// Build from resolved configuration. A region is required.
    pub fn from_config(config: &Config) -> ssm_tunnel_core::Result<Self> {
        let region = config.tunnel.region.clone().ok_or_else(|| {
            ssm_tunnel_core::Error::Config(
                "tunnel.region is not set (set SSM_TUNNEL_REGION or AWS_REGION)".into(),
            )
        })?;
        let mut client = ClientSettings::new(region);
        client.profile.clone_from(&config.tunnel.profile);
        Ok(Self {
            client,
            plugin_program: config.tunnel.plugin_program.clone(),
            reader_drain_timeout: Duration::from_secs(config.tunnel.reader_drain_timeout_secs),
            closed_signal_timeout: Duration::from_secs(config.tunnel.closed_signal_timeout_secs),
        })
    }
}
