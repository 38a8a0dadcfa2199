//! Command construction for the external tunneling plugin.

mod command;

pub use command::{
    CommandError, PLUGIN_OPERATION, PluginCommand, PluginCommandBuilder, PluginCommandInput,
    build_plugin_args,
};
