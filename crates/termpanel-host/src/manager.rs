use std::process::{ExitStatus, Stdio};
use termpanel_core::config::HostSettings;
use termpanel_core::constants::terminal as term_consts;
use termpanel_core::error::{PanelError, Result};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::client::RpcProcessHost;

/// Owns the process-host child for as long as the panel talks to it.
///
/// `start` launches it, `connect` hands its stdio to an [`RpcProcessHost`],
/// `stop` kills it and waits for it to go away.
pub struct HostProcessManager {
    program: String,
    args: Vec<String>,
    process: Option<Child>,
}

impl HostProcessManager {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            process: None,
        }
    }

    pub fn from_settings(settings: &HostSettings) -> Self {
        Self::new(settings.program.clone(), settings.args.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// True while the child is started and has not exited.
    pub fn is_running(&mut self) -> bool {
        match self.process.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("Process host exited: {status}");
                false
            }
            Some(Err(e)) => {
                warn!("Could not poll process host: {e}");
                false
            }
            None => false,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        info!("Starting process host: {} {}", self.program, self.args.join(" "));

        // stderr is discarded: the host shares our terminal and would draw over it.
        let child = Command::new(&self.program)
            .args(&self.args)
            .env("TERM", term_consts::TERM_TYPE)
            .env("COLORTERM", term_consts::COLOR_TERM)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PanelError::host(format!("Failed to start process host '{}': {e}", self.program))
            })?;

        self.process = Some(child);
        Ok(())
    }

    /// Wire a client to the started child's stdin/stdout. Works once per
    /// start. Must be called inside a tokio runtime.
    pub fn connect(&mut self) -> Result<RpcProcessHost> {
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| PanelError::host("Process host is not running"))?;
        let (Some(stdin), Some(stdout)) = (process.stdin.take(), process.stdout.take()) else {
            return Err(PanelError::host("Process host is already connected"));
        };
        Ok(RpcProcessHost::from_io(stdout, stdin))
    }

    /// Kill the child and reap it. `None` when nothing was running.
    pub async fn stop(&mut self) -> Option<ExitStatus> {
        let mut process = self.process.take()?;
        info!("Stopping process host");
        if let Err(e) = process.start_kill() {
            debug!("Process host already gone: {e}");
        }
        match process.wait().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Failed to reap process host: {e}");
                None
            }
        }
    }
}

impl Drop for HostProcessManager {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take() {
            warn!("Process host dropped without explicit stop");
            let _ = process.start_kill();
        }
    }
}
