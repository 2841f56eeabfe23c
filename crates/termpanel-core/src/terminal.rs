//! The bottom panel as one event-driven unit.
//!
//! `TerminalPanel` owns the session registry, the mount coordinator, the
//! resize synchronizer, the panel chrome and the secondary views. All state
//! changes go through synchronous handlers; [`TerminalPanel::run`] only
//! decides which handler to call next.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::binding::MountOutcome;
use crate::config::Settings;
use crate::constants::panel as panel_consts;
use crate::emulator::{EmulatorFactory, Viewport};
use crate::error::Result;
use crate::host::{HostEvent, ProcessHost, SessionId, SpawnedProcess};
use crate::mount::MountCoordinator;
use crate::panel::{
    ForwardedPort, LogBuffer, LogLevel, PanelState, PanelTab, PortList, ProblemsView,
};
use crate::registry::SessionRegistry;
use crate::resize::{FitOutcome, ResizeSynchronizer, ResizeTrigger, RetryPolicy};

/// Everything the UI can ask of the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelCommand {
    Open,
    Close,
    SelectTab(PanelTab),
    NewTerminal,
    /// Kill the given session, or the active one when `None`.
    Kill(Option<SessionId>),
    Select(SessionId),
    /// Select the session `n` places after the active one, wrapping around.
    SelectRelative(isize),
    /// Keystrokes for the active session.
    Input(Vec<u8>),
    PointerDown,
    PointerMove { y: f32 },
    PointerUp,
    ToggleMaximize,
    WindowResized { width: f32, height: f32 },
    SidebarResized(f32),
    ClearOutput,
    ClearDebug,
    ForwardPort(ForwardedPort),
    ClosePort(u16),
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOrigin {
    /// First session created when the panel opens empty.
    Default,
    /// "New Terminal" action.
    User,
}

/// A spawn the panel wants, not yet sent to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnJob {
    pub origin: SpawnOrigin,
    pub cwd: Option<PathBuf>,
}

/// Something the embedding UI has to put in front of the user.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelNotice {
    /// A terminal could not be created. Nothing is retried automatically.
    SpawnFailed(String),
}

/// Result of a spawn job, reported back to the loop.
#[derive(Debug)]
pub struct SpawnCompletion {
    pub origin: SpawnOrigin,
    pub result: Result<SpawnedProcess>,
}

pub struct TerminalPanel {
    registry: SessionRegistry,
    mount: MountCoordinator,
    resize: ResizeSynchronizer,
    panel: PanelState,
    problems: ProblemsView,
    output: LogBuffer,
    debug_console: LogBuffer,
    ports: PortList,
    workspace: Option<PathBuf>,
    default_cwd: Option<PathBuf>,
    host_events: mpsc::UnboundedReceiver<HostEvent>,
    spawn_queue: Vec<SpawnJob>,
    spawn_tx: mpsc::UnboundedSender<SpawnCompletion>,
    spawn_rx: mpsc::UnboundedReceiver<SpawnCompletion>,
    spawns_in_flight: usize,
    notices: Option<mpsc::UnboundedSender<PanelNotice>>,
    torn_down: bool,
}

impl TerminalPanel {
    pub fn new(
        settings: &Settings,
        host: Arc<dyn ProcessHost>,
        factory: Box<dyn EmulatorFactory>,
    ) -> Self {
        let registry = SessionRegistry::new(host, factory);
        let host_events = registry.subscribe();
        let panel = PanelState::new(
            settings.panel.clone(),
            panel_consts::DEFAULT_WINDOW_WIDTH,
            panel_consts::DEFAULT_WINDOW_HEIGHT,
        );

        let (width, height) = panel.viewport_size();
        let mut viewport = Viewport::new(width, height);
        viewport.in_document = false;

        let (spawn_tx, spawn_rx) = mpsc::unbounded_channel();
        Self {
            registry,
            mount: MountCoordinator::new(viewport),
            resize: ResizeSynchronizer::new(RetryPolicy::from(settings.resize.clone())),
            panel,
            problems: ProblemsView::new(),
            output: LogBuffer::new(settings.panel.log_capacity),
            debug_console: LogBuffer::new(settings.panel.log_capacity),
            ports: PortList::new(),
            workspace: None,
            default_cwd: settings.terminal.default_cwd.clone(),
            host_events,
            spawn_queue: Vec::new(),
            spawn_tx,
            spawn_rx,
            spawns_in_flight: 0,
            notices: None,
            torn_down: false,
        }
    }

    /// Folder new sessions start in. Falls back to the configured default cwd.
    pub fn with_workspace(mut self, folder: impl Into<PathBuf>) -> Self {
        self.workspace = Some(folder.into());
        self
    }

    pub fn set_workspace(&mut self, folder: Option<PathBuf>) {
        self.workspace = folder;
    }

    fn session_cwd(&self) -> Option<PathBuf> {
        self.workspace.clone().or_else(|| self.default_cwd.clone())
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SessionRegistry {
        &mut self.registry
    }

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn mount(&self) -> &MountCoordinator {
        &self.mount
    }

    pub fn resize_sync(&self) -> &ResizeSynchronizer {
        &self.resize
    }

    pub fn problems(&self) -> &ProblemsView {
        &self.problems
    }

    pub fn problems_mut(&mut self) -> &mut ProblemsView {
        &mut self.problems
    }

    pub fn output(&self) -> &LogBuffer {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut LogBuffer {
        &mut self.output
    }

    pub fn debug_console(&self) -> &LogBuffer {
        &self.debug_console
    }

    pub fn debug_console_mut(&mut self) -> &mut LogBuffer {
        &mut self.debug_console
    }

    pub fn ports(&self) -> &PortList {
        &self.ports
    }

    /// Receive user-facing notices. A second call replaces the first receiver.
    pub fn notices(&mut self) -> mpsc::UnboundedReceiver<PanelNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notices = Some(tx);
        rx
    }

    fn notify(&self, notice: PanelNotice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Count shown next to a tab label, if any.
    pub fn badge(&self, tab: PanelTab) -> Option<usize> {
        let count = match tab {
            PanelTab::Problems => self.problems.badge(),
            PanelTab::Ports => self.ports.len(),
            PanelTab::Output | PanelTab::Debug | PanelTab::Terminal => 0,
        };
        (count > 0).then_some(count)
    }

    /// Spawns queued by the handlers and not yet started.
    pub fn pending_spawns(&self) -> &[SpawnJob] {
        &self.spawn_queue
    }

    pub fn spawns_in_flight(&self) -> usize {
        self.spawns_in_flight
    }

    // ── Commands ──────────────────────────────────────────────────────────

    pub fn handle_command(&mut self, command: PanelCommand, now: Instant) {
        if self.torn_down {
            debug!("Ignoring {command:?} after teardown");
            return;
        }

        match command {
            PanelCommand::Open => {
                if self.panel.set_open(true) {
                    self.refresh_visibility(now);
                }
            }
            PanelCommand::Close => {
                if self.panel.set_open(false) {
                    self.refresh_visibility(now);
                    self.registry.reset_initialization();
                }
            }
            PanelCommand::SelectTab(tab) => {
                if self.panel.select_tab(tab) {
                    self.refresh_visibility(now);
                }
            }
            PanelCommand::NewTerminal => {
                let cwd = self.session_cwd();
                self.spawn_queue.push(SpawnJob {
                    origin: SpawnOrigin::User,
                    cwd,
                });
            }
            PanelCommand::Kill(target) => {
                let Some(id) = target.or_else(|| self.registry.active_id().cloned()) else {
                    return;
                };
                if self.registry.kill_session(&id) {
                    self.mount.forget(&id);
                    self.remount(now, ResizeTrigger::Mount);
                }
            }
            PanelCommand::Select(id) => {
                if self.registry.set_active(&id) {
                    self.remount(now, ResizeTrigger::Mount);
                }
            }
            PanelCommand::SelectRelative(offset) => {
                let target = self.registry.neighbor_of_active(offset);
                if let Some(id) = target {
                    if self.registry.set_active(&id) {
                        self.remount(now, ResizeTrigger::Mount);
                    }
                }
            }
            PanelCommand::Input(data) => {
                if let Some(id) = self.registry.active_id().cloned() {
                    self.registry.write(&id, &data);
                }
            }
            PanelCommand::PointerDown => {
                self.panel.pointer_down();
            }
            PanelCommand::PointerMove { y } => {
                if self.panel.pointer_move(y).is_some() {
                    self.relayout(now, ResizeTrigger::PanelDrag);
                }
            }
            PanelCommand::PointerUp => {
                self.panel.pointer_up();
            }
            PanelCommand::ToggleMaximize => {
                self.panel.toggle_maximize();
                self.relayout(now, ResizeTrigger::MaximizeToggle);
            }
            PanelCommand::WindowResized { width, height } => {
                self.panel.set_window_size(width, height);
                self.relayout(now, ResizeTrigger::WindowResize);
            }
            PanelCommand::SidebarResized(width) => {
                if self.panel.set_sidebar_width(width) {
                    self.relayout(now, ResizeTrigger::SidebarResize);
                }
            }
            PanelCommand::ClearOutput => self.output.clear(),
            PanelCommand::ClearDebug => self.debug_console.clear(),
            PanelCommand::ForwardPort(port) => {
                info!("Forwarding port {}", port.port);
                self.ports.forward(port);
            }
            PanelCommand::ClosePort(port) => {
                self.ports.close(port);
            }
            PanelCommand::Teardown => self.teardown(),
        }
    }

    /// Mount or unmount according to the open state and selected tab. Becoming
    /// visible with no sessions queues the default one.
    fn refresh_visibility(&mut self, now: Instant) {
        let visible = self.panel.terminal_visible();
        let outcome = self.mount.set_visible(visible, &mut self.registry);
        if !visible {
            return;
        }
        self.schedule_if_moved(outcome, now, ResizeTrigger::Mount);

        if self.registry.begin_initialization() {
            let cwd = self.session_cwd();
            self.spawn_queue.push(SpawnJob {
                origin: SpawnOrigin::Default,
                cwd,
            });
        }
    }

    fn remount(&mut self, now: Instant, trigger: ResizeTrigger) {
        let outcome = self.mount.sync(&mut self.registry);
        self.schedule_if_moved(outcome, now, trigger);
    }

    fn schedule_if_moved(
        &mut self,
        outcome: Option<MountOutcome>,
        now: Instant,
        trigger: ResizeTrigger,
    ) {
        if matches!(
            outcome,
            Some(MountOutcome::FirstMount | MountOutcome::Moved)
        ) {
            self.resize.schedule(now, trigger);
        }
    }

    fn relayout(&mut self, now: Instant, trigger: ResizeTrigger) {
        let (width, height) = self.panel.viewport_size();
        self.mount.set_viewport_size(width, height);
        if self.mount.is_visible() {
            self.resize.schedule(now, trigger);
        }
    }

    fn teardown(&mut self) {
        self.resize.cancel();
        self.spawn_queue.clear();
        self.mount.set_visible(false, &mut self.registry);
        self.registry.dispose_all();
        self.panel.set_open(false);
        self.torn_down = true;
        info!("Terminal panel torn down");
    }

    // ── Host events ───────────────────────────────────────────────────────

    pub fn handle_host_event(&mut self, event: HostEvent) {
        self.registry.dispatch(event);
    }

    /// Dispatch every host event that has already arrived.
    pub fn drain_host_events(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.host_events.try_recv() {
            self.handle_host_event(event);
            count += 1;
        }
        count
    }

    // ── Spawns ────────────────────────────────────────────────────────────

    pub fn handle_spawn_completion(&mut self, completion: SpawnCompletion, now: Instant) {
        self.spawns_in_flight = self.spawns_in_flight.saturating_sub(1);
        if self.torn_down {
            // The host still started a process nobody will show.
            if let Ok(spawned) = completion.result {
                self.registry.host().kill(&spawned.session_id);
            }
            return;
        }

        let result = self.registry.complete_spawn(completion.result);
        if completion.origin == SpawnOrigin::Default {
            self.registry.finish_initialization();
        }

        match result {
            Ok(_) => {
                let outcome = self.mount.sync(&mut self.registry);
                if outcome.is_some() {
                    self.resize.schedule(now, ResizeTrigger::SessionCreated);
                }
            }
            Err(e) => {
                let message = self.registry.take_error().unwrap_or_else(|| e.to_string());
                self.debug_console.push(LogLevel::Error, message.clone());
                self.notify(PanelNotice::SpawnFailed(message));
            }
        }
    }

    /// Start every queued spawn on its own task.
    fn launch_spawns(&mut self) {
        for job in std::mem::take(&mut self.spawn_queue) {
            let request = self.registry.spawn_request(job.cwd);
            let tx = self.spawn_tx.clone();
            let origin = job.origin;
            self.spawns_in_flight += 1;
            tokio::spawn(async move {
                let result = request.await;
                let _ = tx.send(SpawnCompletion { origin, result });
            });
        }
    }

    /// Run queued spawns inline, one after the other.
    pub async fn complete_pending_spawns(&mut self) -> usize {
        let jobs = std::mem::take(&mut self.spawn_queue);
        let count = jobs.len();
        for job in jobs {
            self.spawns_in_flight += 1;
            let result = self.registry.spawn_request(job.cwd).await;
            self.handle_spawn_completion(
                SpawnCompletion {
                    origin: job.origin,
                    result,
                },
                Instant::now(),
            );
        }
        count
    }

    // ── Timers ────────────────────────────────────────────────────────────

    /// Run any fit passes that are due.
    pub fn tick(&mut self, now: Instant) -> Option<FitOutcome> {
        self.resize
            .run_due(now, &mut self.registry, self.mount.viewport())
    }

    // ── Event loop ────────────────────────────────────────────────────────

    /// Drive the panel until `Teardown` or until the command channel closes.
    pub async fn run(&mut self, mut commands: mpsc::UnboundedReceiver<PanelCommand>) {
        while !self.torn_down {
            self.launch_spawns();
            let deadline = self.resize.next_deadline();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, Instant::now()),
                    None => self.handle_command(PanelCommand::Teardown, Instant::now()),
                },
                Some(event) = self.host_events.recv() => self.handle_host_event(event),
                Some(completion) = self.spawn_rx.recv() => {
                    self.handle_spawn_completion(completion, Instant::now());
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.tick(Instant::now());
                }
            }
        }
    }
}

