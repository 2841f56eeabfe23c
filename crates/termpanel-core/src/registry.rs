use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::binding::EmulatorBinding;
use crate::constants::terminal as term_consts;
use crate::emulator::EmulatorFactory;
use crate::error::{PanelError, Result};
use crate::host::{HostEvent, ProcessHost, SessionId, SpawnedProcess, TermSize};

/// One shell process as tracked by the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalSession {
    pub id: SessionId,
    pub shell_name: String,
    pub working_directory: PathBuf,
    /// Last component of the working directory, shown next to the shell name.
    pub folder_name: String,
    pub is_pty: bool,
    pub alive: bool,
    pub exit_code: Option<i32>,
}

impl TerminalSession {
    fn from_spawned(spawned: SpawnedProcess) -> Self {
        let folder_name = spawned
            .cwd
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id: spawned.session_id,
            shell_name: spawned.shell,
            working_directory: spawned.cwd,
            folder_name,
            is_pty: spawned.is_pty,
            alive: true,
            exit_code: None,
        }
    }
}

/// Guards the "open the panel, get one terminal" path against re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
}

/// A row of the shell-picker dropdown.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerEntry {
    /// 1-based position in the session list.
    pub index: usize,
    pub id: SessionId,
    pub label: String,
    pub alive: bool,
    pub active: bool,
}

/// Host events for ids the registry does not know yet. The host can report a
/// new session's first output before the spawn result reaches the registry.
#[derive(Debug, Default)]
struct EarlyEvents {
    events: HashMap<SessionId, Vec<HostEvent>>,
    output_bytes: usize,
}

impl EarlyEvents {
    fn hold(&mut self, event: HostEvent) {
        if let HostEvent::Output { session_id, data } = &event {
            if self.output_bytes + data.len() > term_consts::EARLY_OUTPUT_LIMIT {
                debug!(
                    "Dropping {} early bytes for terminal {session_id}",
                    data.len()
                );
                return;
            }
            self.output_bytes += data.len();
        }
        self.events
            .entry(event.session_id().clone())
            .or_default()
            .push(event);
    }

    fn take(&mut self, id: &SessionId) -> Vec<HostEvent> {
        let events = self.events.remove(id).unwrap_or_default();
        for event in &events {
            if let HostEvent::Output { data, .. } = event {
                self.output_bytes -= data.len();
            }
        }
        events
    }

    fn clear(&mut self) {
        if !self.events.is_empty() {
            debug!("Discarding early events for {} unknown terminal(s)", self.events.len());
        }
        self.events.clear();
        self.output_bytes = 0;
    }
}

/// Owns every session and its emulator binding, and which one is active.
pub struct SessionRegistry {
    host: Arc<dyn ProcessHost>,
    factory: Box<dyn EmulatorFactory>,
    sessions: Vec<TerminalSession>,
    bindings: HashMap<SessionId, EmulatorBinding>,
    active: Option<SessionId>,
    init: InitState,
    last_error: Option<String>,
    spawns_pending: usize,
    early: EarlyEvents,
}

impl SessionRegistry {
    pub fn new(host: Arc<dyn ProcessHost>, factory: Box<dyn EmulatorFactory>) -> Self {
        Self {
            host,
            factory,
            sessions: Vec::new(),
            bindings: HashMap::new(),
            active: None,
            init: InitState::Uninitialized,
            last_error: None,
            spawns_pending: 0,
            early: EarlyEvents::default(),
        }
    }

    pub fn host(&self) -> &Arc<dyn ProcessHost> {
        &self.host
    }

    /// The registry is the only consumer of host push events.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<HostEvent> {
        self.host.subscribe()
    }

    // ── Creation ──────────────────────────────────────────────────────────

    /// Ask the host for a new process. Owns everything it needs, so it can run
    /// on another task while the registry keeps handling events. Every request
    /// must be followed by one `complete_spawn` with its result.
    pub fn spawn_request(
        &mut self,
        cwd: Option<PathBuf>,
    ) -> impl Future<Output = Result<SpawnedProcess>> + Send + 'static {
        self.spawns_pending += 1;
        let host = Arc::clone(&self.host);
        async move { host.create(cwd.as_deref()).await }
    }

    /// Register the outcome of a spawn request. On success the new session is
    /// appended and becomes active; on failure nothing but `last_error` changes.
    pub fn complete_spawn(&mut self, result: Result<SpawnedProcess>) -> Result<SessionId> {
        self.spawns_pending = self.spawns_pending.saturating_sub(1);
        let registered = self.register_spawned(result);
        if self.spawns_pending == 0 {
            self.early.clear();
        }
        registered
    }

    fn register_spawned(&mut self, result: Result<SpawnedProcess>) -> Result<SessionId> {
        let spawned = match result {
            Ok(spawned) => spawned,
            Err(e) => return Err(self.record_spawn_failure(e)),
        };

        if self.bindings.contains_key(&spawned.session_id) {
            let err = PanelError::spawn(format!(
                "host returned session id {} which is already in use",
                spawned.session_id
            ));
            return Err(self.record_spawn_failure(err));
        }

        let id = spawned.session_id.clone();
        let (emulator, fit) = self.factory.create(&id);
        let binding = EmulatorBinding::new(id.clone(), emulator, fit, Arc::clone(&self.host));
        self.bindings.insert(id.clone(), binding);

        let session = TerminalSession::from_spawned(spawned);
        info!(
            "Terminal {} started: {} in {}",
            id,
            session.shell_name,
            session.working_directory.display()
        );
        self.sessions.push(session);
        self.active = Some(id.clone());
        self.last_error = None;

        for event in self.early.take(&id) {
            self.dispatch(event);
        }
        Ok(id)
    }

    pub async fn create_session(&mut self, cwd: Option<&Path>) -> Result<SessionId> {
        let result = self.spawn_request(cwd.map(Path::to_path_buf)).await;
        self.complete_spawn(result)
    }

    fn record_spawn_failure(&mut self, err: PanelError) -> PanelError {
        let err = err.into_spawn_failure();
        warn!("{err}");
        self.last_error = Some(err.to_string());
        err
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Hand the pending error to the UI; it is shown once.
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    // ── Default session latch ─────────────────────────────────────────────

    pub fn init_state(&self) -> InitState {
        self.init
    }

    /// Returns true when the caller should spawn the default session.
    pub fn begin_initialization(&mut self) -> bool {
        match self.init {
            InitState::Uninitialized if self.sessions.is_empty() => {
                self.init = InitState::Initializing;
                true
            }
            InitState::Uninitialized => {
                self.init = InitState::Ready;
                false
            }
            InitState::Initializing | InitState::Ready => false,
        }
    }

    /// Called once the default spawn has resolved, whatever the outcome.
    pub fn finish_initialization(&mut self) {
        if self.init == InitState::Initializing {
            self.init = InitState::Ready;
        }
    }

    /// The panel was closed. An in-flight default spawn keeps the latch held.
    pub fn reset_initialization(&mut self) {
        if self.init == InitState::Ready {
            self.init = InitState::Uninitialized;
        }
    }

    /// Spawn a first session unless one exists or is already being spawned.
    /// `None` means nothing was requested.
    pub async fn ensure_default_session(
        &mut self,
        cwd: Option<&Path>,
    ) -> Option<Result<SessionId>> {
        if !self.begin_initialization() {
            return None;
        }
        let result = self.create_session(cwd).await;
        self.finish_initialization();
        Some(result)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Terminate and forget a session. The host is not waited on.
    pub fn kill_session(&mut self, id: &SessionId) -> bool {
        let Some(index) = self.index_of(id) else {
            debug!("Ignoring kill for unknown terminal {id}");
            return false;
        };

        self.host.kill(id);
        if let Some(mut binding) = self.bindings.remove(id) {
            binding.dispose();
        }
        self.sessions.remove(index);

        if self.active.as_ref() == Some(id) {
            self.active = if self.sessions.is_empty() {
                None
            } else {
                let next = index.min(self.sessions.len() - 1);
                Some(self.sessions[next].id.clone())
            };
        }

        info!("Terminal {id} killed");
        true
    }

    /// The process ended on its own. The session stays listed so its final
    /// output can still be read.
    pub fn mark_exited(&mut self, id: &SessionId, exit_code: Option<i32>) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| &s.id == id) else {
            debug!("Exit event for unknown terminal {id}");
            return false;
        };
        if !session.alive {
            return false;
        }
        session.alive = false;
        session.exit_code = exit_code;

        if let Some(binding) = self.bindings.get_mut(id) {
            binding.write(term_consts::EXIT_NOTICE.as_bytes());
        }
        info!("Terminal {id} exited (code {exit_code:?})");
        true
    }

    /// Returns true when the active session actually changed.
    pub fn set_active(&mut self, id: &SessionId) -> bool {
        if self.active.as_ref() == Some(id) || self.index_of(id).is_none() {
            return false;
        }
        self.active = Some(id.clone());
        true
    }

    /// Kill everything. Used when the owning view is torn down.
    pub fn dispose_all(&mut self) {
        for session in self.sessions.drain(..) {
            self.host.kill(&session.id);
        }
        for (_, mut binding) in self.bindings.drain() {
            binding.dispose();
        }
        self.active = None;
        self.init = InitState::Uninitialized;
        self.spawns_pending = 0;
        self.early.clear();
    }

    /// Spawn requests whose result has not been registered yet.
    pub fn spawns_pending(&self) -> usize {
        self.spawns_pending
    }

    // ── Event demultiplexing ──────────────────────────────────────────────

    /// Route a host event to its session. Events for unknown ids are held
    /// while a spawn is outstanding and dropped otherwise.
    pub fn dispatch(&mut self, event: HostEvent) {
        if self.spawns_pending > 0 && !self.contains(event.session_id()) {
            self.early.hold(event);
            return;
        }
        match event {
            HostEvent::Output { session_id, data } => match self.bindings.get_mut(&session_id) {
                Some(binding) => binding.write(&data),
                None => debug!(
                    "Dropping {} bytes for unknown terminal {session_id}",
                    data.len()
                ),
            },
            HostEvent::Exit {
                session_id,
                exit_code,
            } => {
                self.mark_exited(&session_id, exit_code);
            }
        }
    }

    // ── Host forwarding ───────────────────────────────────────────────────

    /// Send input to a live session. Returns false when the id is unknown or
    /// the process is gone.
    pub fn write(&self, id: &SessionId, data: &[u8]) -> bool {
        if !self.is_alive(id) {
            debug!("Ignoring write to dead terminal {id}");
            return false;
        }
        self.host.write(id, data);
        true
    }

    /// Apply `size` to the session's emulator and, if it changed since the last
    /// send, to the host. Returns true when the host was told.
    pub fn resize(&mut self, id: &SessionId, size: TermSize) -> bool {
        let alive = self.is_alive(id);
        let Some(binding) = self.bindings.get_mut(id) else {
            debug!("Ignoring resize for unknown terminal {id}");
            return false;
        };
        binding.apply_size(size);
        if !alive {
            return false;
        }
        if binding.should_send(size) {
            self.host.resize(id, size);
            return true;
        }
        false
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn sessions(&self) -> &[TerminalSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &SessionId) -> Option<&TerminalSession> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.bindings.contains_key(id)
    }

    pub fn is_alive(&self, id: &SessionId) -> bool {
        self.get(id).is_some_and(|s| s.alive)
    }

    pub fn active_id(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    pub fn active_session(&self) -> Option<&TerminalSession> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    pub fn binding(&self, id: &SessionId) -> Option<&EmulatorBinding> {
        self.bindings.get(id)
    }

    pub fn binding_mut(&mut self, id: &SessionId) -> Option<&mut EmulatorBinding> {
        self.bindings.get_mut(id)
    }

    pub fn active_binding_mut(&mut self) -> Option<&mut EmulatorBinding> {
        let id = self.active.clone()?;
        self.bindings.get_mut(&id)
    }

    pub fn index_of(&self, id: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| &s.id == id)
    }

    /// Session `offset` positions away from the active one, wrapping around.
    pub fn neighbor_of_active(&self, offset: isize) -> Option<SessionId> {
        let len = self.sessions.len() as isize;
        if len == 0 {
            return None;
        }
        let current = self
            .active
            .as_ref()
            .and_then(|id| self.index_of(id))
            .unwrap_or(0) as isize;
        let next = (current + offset.rem_euclid(len)) % len;
        Some(self.sessions[next as usize].id.clone())
    }

    pub fn picker_entries(&self) -> Vec<PickerEntry> {
        self.sessions
            .iter()
            .enumerate()
            .map(|(i, session)| PickerEntry {
                index: i + 1,
                id: session.id.clone(),
                label: format!("{}: {}", i + 1, session.shell_name),
                alive: session.alive,
                active: self.active.as_ref() == Some(&session.id),
            })
            .collect()
    }
}
