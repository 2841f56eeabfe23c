//! Contract with the terminal-emulator library, plus the default fit calculator.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::TerminalSettings;
use crate::constants::terminal as term_consts;
use crate::host::{SessionId, TermSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportId(u64);

impl ViewportId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The single shared container terminal output is drawn into.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub id: ViewportId,
    pub width_px: f32,
    pub height_px: f32,
    /// False while the panel is closed or another tab is showing.
    pub in_document: bool,
}

impl Viewport {
    pub fn new(width_px: f32, height_px: f32) -> Self {
        Self {
            id: ViewportId::next(),
            width_px,
            height_px,
            in_document: true,
        }
    }

    pub fn is_measurable(&self) -> bool {
        self.in_document && self.width_px > 0.0 && self.height_px > 0.0
    }
}

/// Receives keystrokes typed into an emulator.
pub type InputHandler = Box<dyn FnMut(&[u8]) + Send>;

/// One terminal-emulator instance. Owns its scrollback, cursor and grid.
pub trait Emulator: Send {
    /// First attachment: build the presentation node inside `viewport`.
    fn open(&mut self, viewport: &Viewport);

    /// Move the existing presentation node into `viewport`.
    fn reattach(&mut self, viewport: &Viewport);

    /// Take the presentation node out of whatever container holds it.
    fn detach(&mut self);

    fn write(&mut self, data: &[u8]);

    fn resize(&mut self, size: TermSize);

    fn focus(&mut self);

    fn dispose(&mut self);

    fn on_input(&mut self, handler: InputHandler);
}

pub trait FitCalculator: Send {
    /// `None` when the viewport cannot be measured yet.
    fn compute_fit(&self, viewport: &Viewport) -> Option<TermSize>;
}

/// Builds the emulator and fit calculator for a newly created session.
pub trait EmulatorFactory: Send {
    fn create(&mut self, session_id: &SessionId) -> (Box<dyn Emulator>, Box<dyn FitCalculator>);
}

/// Fit from monospace font metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceFit {
    pub font_size: f32,
    pub line_height: f32,
}

impl Default for MonospaceFit {
    fn default() -> Self {
        Self {
            font_size: term_consts::FONT_SIZE,
            line_height: term_consts::LINE_HEIGHT,
        }
    }
}

impl From<&TerminalSettings> for MonospaceFit {
    fn from(settings: &TerminalSettings) -> Self {
        Self::new(settings.font_size, settings.line_height)
    }
}

impl MonospaceFit {
    pub fn new(font_size: f32, line_height: f32) -> Self {
        Self {
            font_size,
            line_height,
        }
    }

    pub fn cell_width(&self) -> f32 {
        self.font_size * term_consts::MONOSPACE_CHAR_WIDTH_RATIO
    }

    pub fn cell_height(&self) -> f32 {
        self.font_size * self.line_height
    }
}

impl FitCalculator for MonospaceFit {
    fn compute_fit(&self, viewport: &Viewport) -> Option<TermSize> {
        if !viewport.is_measurable() || self.cell_width() <= 0.0 || self.cell_height() <= 0.0 {
            return None;
        }
        let cols = (viewport.width_px / self.cell_width()).floor().max(1.0);
        let rows = (viewport.height_px / self.cell_height()).floor().max(1.0);
        Some(TermSize::new(
            cols.min(u16::MAX as f32) as u16,
            rows.min(u16::MAX as f32) as u16,
        ))
    }
}
