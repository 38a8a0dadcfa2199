//! Tunnel orchestrator: negotiate, launch, supervise, tear down.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::control::ControlPlaneClient;
use crate::plugin::{PluginCommandBuilder, PluginCommandInput};
use crate::session::{SessionLease, SessionRequest, negotiate};
use crate::shutdown;
use crate::subprocess::{
    CommandFactory, OutputSink, OutputStream, TracingSink, spawn_line_forwarder,
};

use super::config::TunnelConfig;
use super::error::TunnelError;
use super::signal::{TunnelController, TunnelSignals, tunnel_signals};
use super::state::TunnelState;

/// Why the supervised plugin stopped.
enum Stop {
    CloseRequested,
    Cancelled,
    Exited(std::io::Result<ExitStatus>),
}

/// Drives one tunnel from session negotiation to plugin teardown.
///
/// The negotiated session is terminated on every exit path once it exists.
/// [`TunnelOrchestrator::subscribe_state`] reflects the most recent run.
pub struct TunnelOrchestrator {
    config: TunnelConfig,
    client: Arc<dyn ControlPlaneClient>,
    builder: PluginCommandBuilder,
    sink: Arc<dyn OutputSink>,
    state_tx: watch::Sender<TunnelState>,
}

impl TunnelOrchestrator {
    pub fn new(
        config: TunnelConfig,
        client: Arc<dyn ControlPlaneClient>,
        factory: Arc<dyn CommandFactory>,
    ) -> Self {
        let builder = PluginCommandBuilder::new(config.plugin_program.clone(), factory);
        Self {
            config,
            client,
            builder,
            sink: Arc::new(TracingSink),
            state_tx: watch::Sender::new(TunnelState::Idle),
        }
    }

    /// Send plugin output somewhere other than the tracing subscriber.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub const fn config(&self) -> &TunnelConfig {
        &self.config
    }

    pub fn state(&self) -> TunnelState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TunnelState> {
        self.state_tx.subscribe()
    }

    /// Run the orchestrator on a background task.
    ///
    /// Returns the caller's end of the handshake together with the task
    /// handle, which resolves to the negotiated session id.
    pub fn spawn(
        self: &Arc<Self>,
        request: SessionRequest,
        shutdown: watch::Receiver<bool>,
    ) -> (TunnelController, JoinHandle<Result<String, TunnelError>>) {
        let (signals, controller) = tunnel_signals();
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run(request, signals, shutdown).await });
        (controller, handle)
    }

    /// Establish the tunnel and hold it open until the caller signals close.
    ///
    /// On success returns the negotiated session id. Any failure before the
    /// plugin is running sends a single `false` on the open channel.
    pub async fn run(
        &self,
        request: SessionRequest,
        mut signals: TunnelSignals,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<String, TunnelError> {
        let tunnel_id = uuid::Uuid::new_v4();
        let span = info_span!(
            "tunnel",
            %tunnel_id,
            instance_id = %request.instance_id,
            region = %self.config.client.region
        );
        self.run_inner(request, &mut signals, &mut shutdown)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        request: SessionRequest,
        signals: &mut TunnelSignals,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<String, TunnelError> {
        self.set_state(TunnelState::Negotiating);
        let session = match negotiate(self.client.as_ref(), &request, shutdown).await {
            Ok(session) => session,
            Err(e) => {
                self.fail(signals);
                return Err(e.into());
            }
        };

        let lease = SessionLease::new(Arc::clone(&self.client), session);
        let outcome = self.launch_and_supervise(&lease, &request, signals, shutdown).await;
        lease.release().await;
        outcome
    }

    async fn launch_and_supervise(
        &self,
        lease: &SessionLease,
        request: &SessionRequest,
        signals: &mut TunnelSignals,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<String, TunnelError> {
        self.set_state(TunnelState::Launching);
        let session_id = lease.session_id().to_string();
        let start_input = request.to_start_input();
        let input = PluginCommandInput {
            session: lease.session(),
            request: &start_input,
            region: &self.config.client.region,
            profile: self.config.client.profile_arg(),
        };

        let mut plugin = match self.builder.build(&input) {
            Ok(plugin) => plugin,
            Err(source) => {
                self.fail(signals);
                return Err(TunnelError::Command { session_id, source });
            }
        };
        plugin
            .command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(program = %plugin.program, "Starting session manager plugin process");
        let mut child = match plugin.command.spawn() {
            Ok(child) => child,
            Err(source) => {
                warn!(program = %plugin.program, error = %source, "Failed to start plugin");
                self.fail(signals);
                return Err(TunnelError::Spawn {
                    session_id,
                    program: plugin.program,
                    source,
                });
            }
        };

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_forwarder(
                stdout,
                OutputStream::Stdout,
                Arc::clone(&self.sink),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_forwarder(
                stderr,
                OutputStream::Stderr,
                Arc::clone(&self.sink),
            ));
        }

        self.set_state(TunnelState::Open);
        info!(pid = ?child.id(), "Sending signal that tunnel is open");
        signals.notify(true);

        info!("Waiting for signal that tunnel can close");
        let stop = tokio::select! {
            () = signals.close_requested() => Stop::CloseRequested,
            () = shutdown::cancelled(shutdown) => Stop::Cancelled,
            status = child.wait() => Stop::Exited(status),
        };

        self.set_state(TunnelState::Draining);
        let result = match stop {
            Stop::CloseRequested => {
                info!("Received signal that tunnel can close");
                kill_plugin(&mut child).await;
                Ok(session_id)
            }
            Stop::Cancelled => {
                info!("Shutdown requested while tunnel open");
                kill_plugin(&mut child).await;
                Err(TunnelError::Cancelled { session_id })
            }
            Stop::Exited(status) => {
                let detail = match status {
                    Ok(status) => status.to_string(),
                    Err(e) => e.to_string(),
                };
                warn!(%detail, "Plugin exited before close was requested");
                Err(TunnelError::PluginExited { session_id, detail })
            }
        };

        self.drain_readers(readers).await;

        info!("Sending signal that tunnel has been closed");
        signals
            .notify_closed(self.config.closed_signal_timeout)
            .await;
        self.set_state(TunnelState::Closed);
        result
    }

    /// Wait for the output readers to hit EOF, aborting stragglers.
    ///
    /// Readers can outlive the plugin when a grandchild inherited its pipes.
    async fn drain_readers(&self, readers: Vec<JoinHandle<usize>>) {
        let deadline = tokio::time::Instant::now() + self.config.reader_drain_timeout;
        for mut reader in readers {
            match tokio::time::timeout_at(deadline, &mut reader).await {
                Ok(Ok(lines)) => debug!(lines, "Output reader joined"),
                Ok(Err(e)) => warn!(error = %e, "Output reader failed"),
                Err(_) => {
                    warn!("Output reader still running after plugin exit, aborting");
                    reader.abort();
                }
            }
        }
    }

    fn fail(&self, signals: &TunnelSignals) {
        self.set_state(TunnelState::Failed);
        signals.notify(false);
    }

    fn set_state(&self, state: TunnelState) {
        let previous = self.state_tx.send_replace(state);
        debug!(from = %previous, to = %state, "Tunnel state changed");
    }
}

async fn kill_plugin(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(%status, "Plugin already exited");
        }
        _ => {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill plugin process");
            } else {
                info!("Plugin process killed");
            }
        }
    }
}
