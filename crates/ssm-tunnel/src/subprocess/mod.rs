//! Process spawning and output forwarding for the tunnel plugin.

pub mod factory;
pub mod output;

pub use factory::{CommandFactory, SystemCommandFactory};
pub use output::{OutputSink, OutputStream, TracingSink, spawn_line_forwarder};
