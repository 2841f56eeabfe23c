use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use termpanel_core::constants::panel as panel_consts;
use termpanel_core::emulator::MonospaceFit;
use termpanel_core::{PanelCommand, PanelNotice, Settings, TerminalPanel};
use termpanel_host::HostProcessManager;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::emulator::{PassthroughFactory, SharedOutput, TerminalFit};
use crate::keys::{KeyAction, KeyRouter};

/// Replay history kept per session, in bytes per scrollback line.
const HISTORY_BYTES_PER_LINE: usize = 256;
const SIZE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Text drawn inline for a panel notice.
pub fn render_notice(notice: &PanelNotice) -> String {
    match notice {
        PanelNotice::SpawnFailed(message) => format!(
            "\r\n\x1b[31m{message}\x1b[0m\r\n\x1b[2mPress Ctrl-A c to try again.\x1b[0m\r\n"
        ),
    }
}

pub fn command_for(action: KeyAction) -> PanelCommand {
    match action {
        KeyAction::Forward(bytes) => PanelCommand::Input(bytes),
        KeyAction::NewTerminal => PanelCommand::NewTerminal,
        KeyAction::Next => PanelCommand::SelectRelative(1),
        KeyAction::Previous => PanelCommand::SelectRelative(-1),
        KeyAction::Kill => PanelCommand::Kill(None),
        KeyAction::Quit => PanelCommand::Teardown,
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        enable_raw_mode().context("Failed to switch terminal to raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

pub async fn run(settings: Settings, cwd: Option<PathBuf>) -> Result<()> {
    let mut manager = HostProcessManager::from_settings(&settings.host);
    manager.start().await.with_context(|| {
        format!(
            "Could not launch process host '{}'; set it with --host",
            manager.program()
        )
    })?;
    let host = Arc::new(
        manager
            .connect()
            .context("Could not talk to the process host")?,
    );

    let fit = TerminalFit::new(MonospaceFit::from(&settings.terminal));
    let factory =
        PassthroughFactory::stdout(settings.terminal.scrollback * HISTORY_BYTES_PER_LINE, fit);
    let out = factory.output();
    let mut panel = TerminalPanel::new(&settings, host, Box::new(factory));
    panel.set_workspace(cwd);
    spawn_notice_printer(out, panel.notices());

    let (commands, command_rx) = mpsc::unbounded_channel();
    let _ = commands.send(PanelCommand::Open);

    let raw_mode = RawModeGuard::enable()?;
    spawn_stdin_reader(commands.clone());
    spawn_size_watcher(commands);

    info!("termpanel started");
    panel.run(command_rx).await;

    if !manager.is_running() {
        warn!("Process host exited before the panel was closed");
    }
    manager.stop().await;
    drop(raw_mode);
    println!("\r\n[termpanel exited]");
    Ok(())
}

fn spawn_notice_printer(out: SharedOutput, mut notices: mpsc::UnboundedReceiver<PanelNotice>) {
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            let mut out = out.lock().unwrap_or_else(|e| e.into_inner());
            let text = render_notice(&notice);
            if out.write_all(text.as_bytes()).and_then(|_| out.flush()).is_err() {
                debug!("Could not draw notice");
            }
        }
    });
}

/// Stdin has no async reader that works in raw mode everywhere, so it gets
/// its own thread.
fn spawn_stdin_reader(commands: mpsc::UnboundedSender<PanelCommand>) {
    std::thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut router = KeyRouter::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = match stdin.read(&mut buf) {
                Ok(0) | Err(_) => {
                    let _ = commands.send(PanelCommand::Teardown);
                    return;
                }
                Ok(n) => n,
            };
            for action in router.feed(&buf[..n]) {
                if commands.send(command_for(action)).is_err() {
                    return;
                }
            }
        }
    });
}

/// Crossterm only reports resizes through its event reader, which would
/// compete with the stdin thread, so the size is polled instead.
///
/// The panel's pixel geometry is nominal here: `TerminalFit` measures the
/// real terminal, so a resize only has to trigger a fit.
fn spawn_size_watcher(commands: mpsc::UnboundedSender<PanelCommand>) {
    tokio::spawn(async move {
        let mut last = crossterm::terminal::size().unwrap_or_default();
        let mut interval = tokio::time::interval(SIZE_POLL_INTERVAL);
        loop {
            interval.tick().await;
            let Ok(size) = crossterm::terminal::size() else {
                continue;
            };
            if size == last {
                continue;
            }
            debug!("Terminal resized to {}x{}", size.0, size.1);
            last = size;
            let resized = PanelCommand::WindowResized {
                width: panel_consts::DEFAULT_WINDOW_WIDTH,
                height: panel_consts::DEFAULT_WINDOW_HEIGHT,
            };
            if commands.send(resized).is_err() {
                return;
            }
        }
    });
}
