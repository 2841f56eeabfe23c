//! Emulator that hands bytes straight to the user's terminal.
//!
//! The real terminal does the escape-sequence work. While a session is not
//! on screen its output only goes into the history, which is replayed when
//! the session is shown again.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use termpanel_core::emulator::{
    Emulator, EmulatorFactory, FitCalculator, InputHandler, MonospaceFit, Viewport,
};
use termpanel_core::host::{SessionId, TermSize};

/// Clear screen, clear scrollback, cursor home.
const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[3J\x1b[H";

pub type SharedOutput = Arc<Mutex<Box<dyn Write + Send>>>;

pub struct PassthroughEmulator {
    out: SharedOutput,
    history: VecDeque<u8>,
    history_limit: usize,
    attached: bool,
    disposed: bool,
    size: Option<TermSize>,
}

impl PassthroughEmulator {
    pub fn new(out: SharedOutput, history_limit: usize) -> Self {
        Self {
            out,
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
            attached: false,
            disposed: false,
            size: None,
        }
    }

    pub fn history(&self) -> Vec<u8> {
        self.history.iter().copied().collect()
    }

    pub fn size(&self) -> Option<TermSize> {
        self.size
    }

    fn emit(&self, data: &[u8]) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if out.write_all(data).and_then(|_| out.flush()).is_err() {
            tracing::debug!("Terminal output write failed");
        }
    }

    /// Show this session: wipe whatever the previous one left and replay.
    fn redraw(&self) {
        let (front, back) = self.history.as_slices();
        let mut frame = Vec::with_capacity(CLEAR_SCREEN.len() + front.len() + back.len());
        frame.extend_from_slice(CLEAR_SCREEN);
        frame.extend_from_slice(front);
        frame.extend_from_slice(back);
        self.emit(&frame);
    }
}

impl Emulator for PassthroughEmulator {
    fn open(&mut self, _viewport: &Viewport) {
        self.attached = true;
        self.redraw();
    }

    fn reattach(&mut self, _viewport: &Viewport) {
        self.attached = true;
        self.redraw();
    }

    fn detach(&mut self) {
        self.attached = false;
    }

    fn write(&mut self, data: &[u8]) {
        if self.disposed {
            return;
        }
        self.history.extend(data);
        let overflow = self.history.len().saturating_sub(self.history_limit);
        self.history.drain(..overflow);
        if self.attached {
            self.emit(data);
        }
    }

    fn resize(&mut self, size: TermSize) {
        self.size = Some(size);
    }

    fn focus(&mut self) {}

    fn dispose(&mut self) {
        self.disposed = true;
        self.attached = false;
        self.history.clear();
    }

    // Keystrokes are read from stdin by the app and sent as panel input.
    fn on_input(&mut self, _handler: InputHandler) {}
}

/// Fits to the real terminal rather than to pixels. When the terminal cannot
/// report its size, the viewport is measured with the configured font metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalFit {
    fallback: MonospaceFit,
}

impl TerminalFit {
    pub fn new(fallback: MonospaceFit) -> Self {
        Self { fallback }
    }

    /// `terminal` is the real terminal's `(cols, rows)`, if it has one.
    pub fn fit_with(&self, terminal: Option<(u16, u16)>, viewport: &Viewport) -> Option<TermSize> {
        if !viewport.is_measurable() {
            return None;
        }
        match terminal {
            Some((cols, rows)) => Some(TermSize::new(cols.max(1), rows.max(1))),
            None => self.fallback.compute_fit(viewport),
        }
    }
}

impl FitCalculator for TerminalFit {
    fn compute_fit(&self, viewport: &Viewport) -> Option<TermSize> {
        self.fit_with(crossterm::terminal::size().ok(), viewport)
    }
}

pub struct PassthroughFactory {
    out: SharedOutput,
    history_limit: usize,
    fit: TerminalFit,
}

impl PassthroughFactory {
    pub fn new(out: SharedOutput, history_limit: usize, fit: TerminalFit) -> Self {
        Self {
            out,
            history_limit,
            fit,
        }
    }

    pub fn stdout(history_limit: usize, fit: TerminalFit) -> Self {
        Self::new(
            Arc::new(Mutex::new(Box::new(std::io::stdout()))),
            history_limit,
            fit,
        )
    }

    /// The writer every emulator draws through, for anything else that has
    /// to reach the screen.
    pub fn output(&self) -> SharedOutput {
        Arc::clone(&self.out)
    }
}

impl EmulatorFactory for PassthroughFactory {
    fn create(&mut self, _session_id: &SessionId) -> (Box<dyn Emulator>, Box<dyn FitCalculator>) {
        (
            Box::new(PassthroughEmulator::new(
                Arc::clone(&self.out),
                self.history_limit,
            )),
            Box::new(self.fit),
        )
    }
}
