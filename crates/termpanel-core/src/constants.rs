/// termpanel — centralized constants.
/// Defaults for settings, layout metrics and wire names live here.

// ─── Terminal ─────────────────────────────────────────────────────────────────

pub mod terminal {
    /// Written into a session's buffer when its process exits on its own.
    pub const EXIT_NOTICE: &str = "\r\n\x1b[33m[Process exited]\x1b[0m\r\n";
    pub const FONT_SIZE: f32 = 13.0;
    pub const LINE_HEIGHT: f32 = 1.2;
    pub const SCROLLBACK: usize = 1000;
    /// Output held for a session whose spawn result has not been registered yet.
    pub const EARLY_OUTPUT_LIMIT: usize = 64 * 1024;
    pub const MONOSPACE_CHAR_WIDTH_RATIO: f32 = 0.601;
    pub const TERM_TYPE: &str = "xterm-256color";
    pub const COLOR_TERM: &str = "truecolor";
}

// ─── Panel Layout ─────────────────────────────────────────────────────────────

pub mod panel {
    pub const DEFAULT_HEIGHT: f32 = 250.0;
    pub const MIN_HEIGHT: f32 = 100.0;
    /// Space kept free above the panel while dragging.
    pub const EDGE_MARGIN: f32 = 100.0;
    /// Title bar height subtracted from the window when maximized.
    pub const MAXIMIZED_CHROME_OFFSET: f32 = 32.0;
    /// Tab strip above the terminal viewport.
    pub const HEADER_HEIGHT: f32 = 35.0;
    pub const DEFAULT_WINDOW_WIDTH: f32 = 1400.0;
    pub const DEFAULT_WINDOW_HEIGHT: f32 = 800.0;
    pub const LOG_CAPACITY: usize = 5000;
    pub const PROBLEMS_AUTO_EXPAND: usize = 5;
    pub const DRAG_CURSOR: &str = "ns-resize";
}

// ─── Resize ───────────────────────────────────────────────────────────────────

pub mod resize {
    /// One immediate fit plus two follow-ups while layout settles.
    pub const RETRY_DELAYS_MS: &[u64] = &[0, 50, 150];
}

// ─── Process Host Wire Protocol ───────────────────────────────────────────────

pub mod host {
    pub const DEFAULT_PROGRAM: &str = "termpanel-host";
    pub const METHOD_CREATE: &str = "terminal.create";
    pub const METHOD_WRITE: &str = "terminal.write";
    pub const METHOD_RESIZE: &str = "terminal.resize";
    pub const METHOD_KILL: &str = "terminal.kill";
    pub const NOTIFY_OUTPUT: &str = "terminal.output";
    pub const NOTIFY_EXIT: &str = "terminal.exit";
}

// ─── Config Paths ─────────────────────────────────────────────────────────────

pub mod paths {
    pub const CONFIG_DIR: &str = "termpanel";
    pub const CONFIG_FILE: &str = "config.toml";
}
