//! Configuration resolution for ssm-tunnel.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/ssm-tunnel/settings.json`)
//! 3. Project config (`.ssm-tunnel/settings.json`)
//! 4. Environment variables

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Name of the external tunneling executable.
pub const DEFAULT_PLUGIN_PROGRAM: &str = "session-manager-plugin";

/// Document that selects a port-forwarding session.
pub const PORT_FORWARD_DOCUMENT: &str = "AWS-StartPortForwardingSession";

/// Complete ssm-tunnel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub tunnel: TunnelSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Settings for launching and supervising the tunnel plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TunnelSettings {
    /// Region handed to the control-plane client and the plugin.
    pub region: Option<String>,
    /// Named credential profile handed to the plugin.
    pub profile: Option<String>,
    /// Executable performing the byte forwarding.
    pub plugin_program: String,
    /// How long to wait for output readers after the plugin is killed.
    pub reader_drain_timeout_secs: u64,
    /// How long the final closed signal waits for the caller to read an
    /// earlier open signal.
    pub closed_signal_timeout_secs: u64,
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            plugin_program: DEFAULT_PLUGIN_PROGRAM.to_string(),
            reader_drain_timeout_secs: 2,
            closed_signal_timeout_secs: 5,
        }
    }
}

/// Session negotiation defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    pub document_name: String,
    pub max_retries: u32,
    pub retry_wait_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            document_name: PORT_FORWARD_DOCUMENT.to_string(),
            max_retries: 1,
            retry_wait_secs: 5,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// Each file layer only overrides the keys it actually sets.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            debug!(path = %global_path.display(), "Loading global config");
            let global = load_layer(&global_path)?;
            merge_config(&mut config, global)?;
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".ssm-tunnel").join("settings.json");
        if project_path.exists() {
            debug!(path = %project_path.display(), "Loading project config");
            let project = load_layer(&project_path)?;
            merge_config(&mut config, project)?;
        }
    }

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ssm-tunnel").join("settings.json"))
}

/// Read a single config file, filling unset keys with defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let mut config = Config::default();
    merge_config(&mut config, load_layer(path)?)?;
    Ok(config)
}

/// Read a config file as a raw layer, keeping only the keys it sets.
fn load_layer(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let layer: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if !layer.is_object() {
        return Err(Error::Config(format!(
            "Config file {} must contain a JSON object",
            path.display()
        )));
    }
    Ok(layer)
}

/// Overlay `layer` onto `base` key by key.
fn merge_config(base: &mut Config, layer: Value) -> Result<()> {
    let mut merged = serde_json::to_value(&*base)?;
    merge_values(&mut merged, layer);
    *base = serde_json::from_value(merged)?;
    Ok(())
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Tool-specific variables win over the generic `AWS_*` ones.
pub fn apply_overrides_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(region) = lookup("SSM_TUNNEL_REGION").or_else(|| lookup("AWS_REGION")) {
        config.tunnel.region = Some(region);
    }
    if let Some(profile) = lookup("SSM_TUNNEL_PROFILE").or_else(|| lookup("AWS_PROFILE")) {
        config.tunnel.profile = Some(profile);
    }
    if let Some(program) = lookup("SSM_TUNNEL_PLUGIN") {
        config.tunnel.plugin_program = program;
    }
    if let Some(val) = lookup("SSM_TUNNEL_MAX_RETRIES") {
        if let Ok(n) = val.parse() {
            config.session.max_retries = n;
        }
    }
    if let Some(val) = lookup("SSM_TUNNEL_RETRY_WAIT_SECS") {
        if let Ok(n) = val.parse() {
            config.session.retry_wait_secs = n;
        }
    }
    if let Some(val) = lookup("SSM_TUNNEL_LOG_LEVEL") {
        config.logging.level = val;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_target_port_forwarding_plugin() {
        let config = Config::default();
        assert_eq!(config.tunnel.plugin_program, "session-manager-plugin");
        assert_eq!(config.session.document_name, PORT_FORWARD_DOCUMENT);
        assert_eq!(config.session.max_retries, 1);
        assert!(config.tunnel.region.is_none());
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"tunnel": {"region": "us-east-2"}}"#).unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.tunnel.region.as_deref(), Some("us-east-2"));
        assert_eq!(config.tunnel.plugin_program, DEFAULT_PLUGIN_PROGRAM);
        assert_eq!(config.session.retry_wait_secs, 5);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn project_config_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = dir.path().join(".ssm-tunnel");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(
            project.join("settings.json"),
            r#"{"session": {"max_retries": 30, "retry_wait_secs": 5}}"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.session.max_retries, 30);
    }

    #[test]
    fn merge_keeps_base_region_when_overlay_unset() {
        let mut base = Config::default();
        base.tunnel.region = Some("eu-west-1".into());
        merge_config(&mut base, serde_json::json!({"tunnel": {"profile": "dev"}})).unwrap();
        assert_eq!(base.tunnel.region.as_deref(), Some("eu-west-1"));
        assert_eq!(base.tunnel.profile.as_deref(), Some("dev"));
    }

    #[test]
    fn project_layer_only_overrides_keys_it_sets() {
        let dir = tempfile::TempDir::new().unwrap();
        let global = dir.path().join("global.json");
        let project = dir.path().join("project.json");
        std::fs::write(
            &global,
            r#"{
                "tunnel": {"plugin_program": "/opt/custom-plugin"},
                "session": {"max_retries": 30, "retry_wait_secs": 9},
                "logging": {"json": true}
            }"#,
        )
        .unwrap();
        std::fs::write(&project, r#"{"tunnel": {"region": "us-east-2"}}"#).unwrap();

        let mut config = Config::default();
        merge_config(&mut config, load_layer(&global).unwrap()).unwrap();
        merge_config(&mut config, load_layer(&project).unwrap()).unwrap();

        assert_eq!(config.tunnel.region.as_deref(), Some("us-east-2"));
        assert_eq!(config.tunnel.plugin_program, "/opt/custom-plugin");
        assert_eq!(config.tunnel.reader_drain_timeout_secs, 2);
        assert_eq!(config.tunnel.closed_signal_timeout_secs, 5);
        assert_eq!(config.session.max_retries, 30);
        assert_eq!(config.session.retry_wait_secs, 9);
        assert_eq!(config.session.document_name, PORT_FORWARD_DOCUMENT);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn non_object_layer_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(load_config_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn mistyped_value_is_json_error() {
        let mut config = Config::default();
        let err = merge_config(
            &mut config,
            serde_json::json!({"session": {"max_retries": "many"}}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(config.session.max_retries, 1);
    }

    #[test]
    fn tool_variables_take_precedence() {
        let vars: HashMap<&str, &str> = [
            ("AWS_REGION", "us-west-2"),
            ("SSM_TUNNEL_REGION", "us-east-2"),
            ("AWS_PROFILE", "dev"),
            ("SSM_TUNNEL_MAX_RETRIES", "7"),
            ("SSM_TUNNEL_RETRY_WAIT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        apply_overrides_from(&mut config, |k| vars.get(k).map(ToString::to_string));

        assert_eq!(config.tunnel.region.as_deref(), Some("us-east-2"));
        assert_eq!(config.tunnel.profile.as_deref(), Some("dev"));
        assert_eq!(config.session.max_retries, 7);
        assert_eq!(config.session.retry_wait_secs, 5);
    }
}
