#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use termpanel_core::emulator::InputHandler;
use termpanel_core::*;

// ========================================================================
// Fake process host
// ========================================================================

/// Issues ids "t1", "t2", ... and records every call.
#[derive(Default)]
pub struct FakeHost {
    bus: HostEventBus,
    next_id: AtomicU64,
    fail_next: AtomicBool,
    greeting: Mutex<Option<String>>,
    pub creates: Mutex<Vec<Option<PathBuf>>>,
    pub writes: Mutex<Vec<(SessionId, Vec<u8>)>>,
    pub resizes: Mutex<Vec<(SessionId, TermSize)>>,
    pub kills: Mutex<Vec<SessionId>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `create` fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Output every new session prints before `create` even returns, the way
    /// a shell prompt can overtake the spawn response.
    pub fn set_greeting(&self, greeting: &str) {
        *self.greeting.lock().unwrap() = Some(greeting.to_string());
    }

    pub fn emit_output(&self, id: &str, data: &str) {
        self.bus.publish(HostEvent::Output {
            session_id: SessionId::new(id),
            data: data.as_bytes().to_vec(),
        });
    }

    pub fn emit_exit(&self, id: &str, exit_code: Option<i32>) {
        self.bus.publish(HostEvent::Exit {
            session_id: SessionId::new(id),
            exit_code,
        });
    }

    pub fn create_count(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    pub fn writes(&self) -> Vec<(SessionId, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn resizes(&self) -> Vec<(SessionId, TermSize)> {
        self.resizes.lock().unwrap().clone()
    }

    pub fn kills(&self) -> Vec<SessionId> {
        self.kills.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessHost for FakeHost {
    async fn create(&self, cwd: Option<&Path>) -> Result<SpawnedProcess> {
        self.creates
            .lock()
            .unwrap()
            .push(cwd.map(Path::to_path_buf));
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PanelError::host("shell not found"));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("t{n}");
        if let Some(greeting) = self.greeting.lock().unwrap().clone() {
            self.emit_output(&session_id, &greeting);
        }
        Ok(SpawnedProcess {
            session_id: SessionId::new(session_id),
            shell: "bash".to_string(),
            cwd: cwd
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("/home/user")),
            is_pty: true,
        })
    }

    fn write(&self, session_id: &SessionId, data: &[u8]) {
        self.writes
            .lock()
            .unwrap()
            .push((session_id.clone(), data.to_vec()));
    }

    fn resize(&self, session_id: &SessionId, size: TermSize) {
        self.resizes.lock().unwrap().push((session_id.clone(), size));
    }

    fn kill(&self, session_id: &SessionId) {
        self.kills.lock().unwrap().push(session_id.clone());
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<HostEvent> {
        self.bus.subscribe()
    }
}

// ========================================================================
// Fake emulator
// ========================================================================

#[derive(Default)]
pub struct EmulatorState {
    pub buffer: Vec<u8>,
    pub opens: usize,
    pub reattaches: usize,
    pub detaches: usize,
    pub disposes: usize,
    pub focuses: usize,
    pub attached_to: Option<ViewportId>,
    pub size: Option<TermSize>,
    pub input: Option<InputHandler>,
}

pub type SharedEmulator = Arc<Mutex<EmulatorState>>;

pub struct FakeEmulator {
    state: SharedEmulator,
}

impl Emulator for FakeEmulator {
    fn open(&mut self, viewport: &Viewport) {
        let mut state = self.state.lock().unwrap();
        state.opens += 1;
        state.attached_to = Some(viewport.id);
    }

    fn reattach(&mut self, viewport: &Viewport) {
        let mut state = self.state.lock().unwrap();
        state.reattaches += 1;
        state.attached_to = Some(viewport.id);
    }

    fn detach(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.detaches += 1;
        state.attached_to = None;
    }

    fn write(&mut self, data: &[u8]) {
        self.state.lock().unwrap().buffer.extend_from_slice(data);
    }

    fn resize(&mut self, size: TermSize) {
        self.state.lock().unwrap().size = Some(size);
    }

    fn focus(&mut self) {
        self.state.lock().unwrap().focuses += 1;
    }

    fn dispose(&mut self) {
        self.state.lock().unwrap().disposes += 1;
    }

    fn on_input(&mut self, handler: InputHandler) {
        self.state.lock().unwrap().input = Some(handler);
    }
}

/// Fit driven by the test instead of by pixels.
pub struct ScriptedFit {
    size: Arc<Mutex<Option<TermSize>>>,
}

impl FitCalculator for ScriptedFit {
    fn compute_fit(&self, viewport: &Viewport) -> Option<TermSize> {
        if !viewport.is_measurable() {
            return None;
        }
        *self.size.lock().unwrap()
    }
}

/// Hands out fake emulators and keeps a handle on each one's state.
#[derive(Clone, Default)]
pub struct FakeFactory {
    states: Arc<Mutex<HashMap<SessionId, SharedEmulator>>>,
    fit: Arc<Mutex<Option<TermSize>>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        let factory = Self::default();
        factory.set_fit(Some(TermSize::new(80, 24)));
        factory
    }

    pub fn set_fit(&self, size: Option<TermSize>) {
        *self.fit.lock().unwrap() = size;
    }

    pub fn state(&self, id: &str) -> SharedEmulator {
        Arc::clone(
            self.states
                .lock()
                .unwrap()
                .get(&SessionId::new(id))
                .expect("no emulator for session"),
        )
    }

    pub fn buffer(&self, id: &str) -> String {
        String::from_utf8_lossy(&self.state(id).lock().unwrap().buffer).into_owned()
    }

    /// Simulate the user typing into a session's emulator.
    pub fn type_into(&self, id: &str, data: &[u8]) {
        let state = self.state(id);
        let handler = state.lock().unwrap().input.take();
        if let Some(mut handler) = handler {
            handler(data);
            state.lock().unwrap().input = Some(handler);
        }
    }
}

impl EmulatorFactory for FakeFactory {
    fn create(&mut self, session_id: &SessionId) -> (Box<dyn Emulator>, Box<dyn FitCalculator>) {
        let state = SharedEmulator::default();
        self.states
            .lock()
            .unwrap()
            .insert(session_id.clone(), Arc::clone(&state));
        (
            Box::new(FakeEmulator { state }),
            Box::new(ScriptedFit {
                size: Arc::clone(&self.fit),
            }),
        )
    }
}

// ========================================================================
// Builders
// ========================================================================

pub fn registry() -> (SessionRegistry, Arc<FakeHost>, FakeFactory) {
    let host = FakeHost::new();
    let factory = FakeFactory::new();
    let registry = SessionRegistry::new(host.clone(), Box::new(factory.clone()));
    (registry, host, factory)
}

pub fn panel() -> (TerminalPanel, Arc<FakeHost>, FakeFactory) {
    let host = FakeHost::new();
    let factory = FakeFactory::new();
    let panel = TerminalPanel::new(&Settings::default(), host.clone(), Box::new(factory.clone()));
    (panel, host, factory)
}

pub fn id(s: &str) -> SessionId {
    SessionId::new(s)
}
