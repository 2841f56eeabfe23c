pub mod logs;
pub mod ports;
pub mod problems;

pub use logs::{LogBuffer, LogEntry, LogLevel};
pub use ports::{ForwardedPort, PortList};
pub use problems::{ProblemFilter, ProblemGroup, ProblemsView};

use serde::{Deserialize, Serialize};

use crate::config::PanelSettings;
use crate::constants::panel as panel_consts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelTab {
    Problems,
    Output,
    Debug,
    Terminal,
    Ports,
}

impl PanelTab {
    pub const ALL: [PanelTab; 5] = [
        PanelTab::Problems,
        PanelTab::Output,
        PanelTab::Debug,
        PanelTab::Terminal,
        PanelTab::Ports,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PanelTab::Problems => "Problems",
            PanelTab::Output => "Output",
            PanelTab::Debug => "Debug Console",
            PanelTab::Terminal => "Terminal",
            PanelTab::Ports => "Ports",
        }
    }

    /// Toolbar buttons shown on the right of the tab strip.
    pub fn actions(&self) -> &'static [PanelAction] {
        match self {
            PanelTab::Problems => &[],
            PanelTab::Output => &[PanelAction::ClearOutput],
            PanelTab::Debug => &[PanelAction::ClearDebug],
            PanelTab::Terminal => &[
                PanelAction::NewTerminal,
                PanelAction::SplitTerminal,
                PanelAction::KillTerminal,
            ],
            PanelTab::Ports => &[PanelAction::ForwardPort],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    NewTerminal,
    SplitTerminal,
    KillTerminal,
    ClearOutput,
    ClearDebug,
    ForwardPort,
}

impl PanelAction {
    pub fn title(&self) -> &'static str {
        match self {
            PanelAction::NewTerminal => "New Terminal",
            PanelAction::SplitTerminal => "Split Terminal",
            PanelAction::KillTerminal => "Kill Terminal",
            PanelAction::ClearOutput => "Clear Output",
            PanelAction::ClearDebug => "Clear Console",
            PanelAction::ForwardPort => "Forward a Port",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
}

/// Document-wide styling applied while the resize handle is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalDragStyle {
    pub cursor: &'static str,
    pub user_select_disabled: bool,
}

/// Outer chrome of the bottom panel: tab selection, height and maximize state.
#[derive(Debug, Clone)]
pub struct PanelState {
    settings: PanelSettings,
    active_tab: PanelTab,
    panel_height_px: f32,
    is_maximized: bool,
    is_open: bool,
    drag: DragState,
    window_width: f32,
    window_height: f32,
    sidebar_width: f32,
}

impl PanelState {
    pub fn new(settings: PanelSettings, window_width: f32, window_height: f32) -> Self {
        let mut state = Self {
            panel_height_px: settings.default_height,
            settings,
            active_tab: PanelTab::Terminal,
            is_maximized: false,
            is_open: false,
            drag: DragState::Idle,
            window_width,
            window_height,
            sidebar_width: 0.0,
        };
        state.panel_height_px = state.clamp_height(state.panel_height_px);
        state
    }

    // ── Tabs ──────────────────────────────────────────────────────────────

    pub fn active_tab(&self) -> PanelTab {
        self.active_tab
    }

    pub fn select_tab(&mut self, tab: PanelTab) -> bool {
        if self.active_tab == tab {
            return false;
        }
        self.active_tab = tab;
        true
    }

    /// Whether the terminal viewport is currently part of the layout.
    pub fn terminal_visible(&self) -> bool {
        self.is_open && self.active_tab == PanelTab::Terminal
    }

    // ── Open / close ──────────────────────────────────────────────────────

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn set_open(&mut self, open: bool) -> bool {
        if self.is_open == open {
            return false;
        }
        self.is_open = open;
        if !open {
            self.end_drag();
        }
        true
    }

    // ── Height ────────────────────────────────────────────────────────────

    pub fn panel_height(&self) -> f32 {
        self.panel_height_px
    }

    pub fn is_maximized(&self) -> bool {
        self.is_maximized
    }

    /// Height actually used for layout.
    pub fn effective_height(&self) -> f32 {
        if self.is_maximized {
            (self.window_height - self.settings.maximized_offset).max(0.0)
        } else {
            self.panel_height_px
        }
    }

    /// Pixel size of the terminal viewport below the tab strip.
    pub fn viewport_size(&self) -> (f32, f32) {
        let width = (self.window_width - self.sidebar_width).max(0.0);
        let height = (self.effective_height() - self.settings.header_height).max(0.0);
        (width, height)
    }

    /// Lower bound wins when the window is too short for both.
    pub fn clamp_height(&self, height: f32) -> f32 {
        let upper = self.window_height - self.settings.edge_margin;
        height.min(upper).max(self.settings.min_height)
    }

    pub fn toggle_maximize(&mut self) -> f32 {
        self.is_maximized = !self.is_maximized;
        if self.is_maximized {
            self.end_drag();
        }
        self.effective_height()
    }

    pub fn set_window_size(&mut self, width: f32, height: f32) {
        self.window_width = width;
        self.window_height = height;
        self.panel_height_px = self.clamp_height(self.panel_height_px);
    }

    pub fn window_size(&self) -> (f32, f32) {
        (self.window_width, self.window_height)
    }

    pub fn set_sidebar_width(&mut self, width: f32) -> bool {
        let width = width.max(0.0);
        if (self.sidebar_width - width).abs() < f32::EPSILON {
            return false;
        }
        self.sidebar_width = width;
        true
    }

    // ── Drag resize ───────────────────────────────────────────────────────

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    /// Pointer pressed on the resize handle. The handle is hidden while
    /// maximized, so the press is ignored then.
    pub fn pointer_down(&mut self) -> bool {
        if self.is_maximized || !self.is_open {
            return false;
        }
        self.drag = DragState::Dragging;
        true
    }

    /// New height while dragging, `None` when idle.
    pub fn pointer_move(&mut self, pointer_y: f32) -> Option<f32> {
        if self.drag != DragState::Dragging {
            return None;
        }
        let height = self.clamp_height(self.window_height - pointer_y);
        self.panel_height_px = height;
        Some(height)
    }

    /// Pointer released anywhere in the window.
    pub fn pointer_up(&mut self) -> bool {
        self.end_drag()
    }

    fn end_drag(&mut self) -> bool {
        let was_dragging = self.drag == DragState::Dragging;
        self.drag = DragState::Idle;
        was_dragging
    }

    pub fn global_drag_style(&self) -> Option<GlobalDragStyle> {
        match self.drag {
            DragState::Dragging => Some(GlobalDragStyle {
                cursor: panel_consts::DRAG_CURSOR,
                user_select_disabled: true,
            }),
            DragState::Idle => None,
        }
    }
}
