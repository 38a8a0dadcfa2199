//! Plugin argument vector and command binding.
//!
//! The plugin is invoked as
//! `<program> <session json> <region> StartSession <profile> <request json> <stream url>`.
//! All six positional arguments are required and order-sensitive.

use std::sync::Arc;

use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use ssm_tunnel_core::config::DEFAULT_PLUGIN_PROGRAM;

use crate::control::{SessionResult, StartSessionInput};
use crate::subprocess::CommandFactory;

/// Operation name the plugin expects as its third argument.
pub const PLUGIN_OPERATION: &str = "StartSession";

/// Errors from plugin command construction.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the plugin needs to attach to a negotiated session.
#[derive(Debug, Clone, Copy)]
pub struct PluginCommandInput<'a> {
    pub session: &'a SessionResult,
    pub request: &'a StartSessionInput,
    pub region: &'a str,
    pub profile: &'a str,
}

/// A plugin command ready to be started.
#[derive(Debug)]
pub struct PluginCommand {
    pub program: String,
    pub args: Vec<String>,
    pub command: Command,
}

fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<String, CommandError> {
    serde_json::to_string(value).map_err(|source| CommandError::Serialize { what, source })
}

/// Build the plugin's argument vector.
pub fn build_plugin_args(input: &PluginCommandInput<'_>) -> Result<Vec<String>, CommandError> {
    let session_json = encode("session result", input.session)?;
    let request_json = encode("session request", input.request)?;

    Ok(vec![
        session_json,
        input.region.to_string(),
        PLUGIN_OPERATION.to_string(),
        input.profile.to_string(),
        request_json,
        input.session.stream_url.clone(),
    ])
}

/// Binds plugin arguments to a [`CommandFactory`].
#[derive(Clone)]
pub struct PluginCommandBuilder {
    program: String,
    factory: Arc<dyn CommandFactory>,
}

impl PluginCommandBuilder {
    pub fn new(program: impl Into<String>, factory: Arc<dyn CommandFactory>) -> Self {
        Self {
            program: program.into(),
            factory,
        }
    }

    /// Builder for the default `session-manager-plugin` program.
    pub fn with_default_program(factory: Arc<dyn CommandFactory>) -> Self {
        Self::new(DEFAULT_PLUGIN_PROGRAM, factory)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Produce the plugin command. The factory is only consulted once every
    /// argument has been encoded.
    ///
    /// `SessionResult` and `StartSessionInput` hold only strings and string
    /// maps, so encoding cannot fail for them today. The error path covers
    /// future input types.
    pub fn build(&self, input: &PluginCommandInput<'_>) -> Result<PluginCommand, CommandError> {
        let args = build_plugin_args(input)?;
        debug!(program = %self.program, region = input.region, "Built plugin command");
        let command = self.factory.command(&self.program, &args);
        Ok(PluginCommand {
            program: self.program.clone(),
            args,
            command,
        })
    }
}
