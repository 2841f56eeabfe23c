use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{self, panel as panel_consts, terminal as term_consts};
use crate::error::PanelError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub terminal: TerminalSettings,
    #[serde(default)]
    pub panel: PanelSettings,
    #[serde(default)]
    pub resize: ResizeSettings,
    #[serde(default)]
    pub host: HostSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    /// Working directory for new sessions when no workspace folder is open.
    pub default_cwd: Option<PathBuf>,
    pub font_size: f32,
    pub line_height: f32,
    pub scrollback: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    pub default_height: f32,
    pub min_height: f32,
    pub edge_margin: f32,
    pub maximized_offset: f32,
    pub header_height: f32,
    pub log_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeSettings {
    pub retry_delays_ms: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            default_cwd: None,
            font_size: term_consts::FONT_SIZE,
            line_height: term_consts::LINE_HEIGHT,
            scrollback: term_consts::SCROLLBACK,
        }
    }
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            default_height: panel_consts::DEFAULT_HEIGHT,
            min_height: panel_consts::MIN_HEIGHT,
            edge_margin: panel_consts::EDGE_MARGIN,
            maximized_offset: panel_consts::MAXIMIZED_CHROME_OFFSET,
            header_height: panel_consts::HEADER_HEIGHT,
            log_capacity: panel_consts::LOG_CAPACITY,
        }
    }
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            retry_delays_ms: constants::resize::RETRY_DELAYS_MS.to_vec(),
        }
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            program: constants::host::DEFAULT_PROGRAM.to_string(),
            args: Vec::new(),
        }
    }
}

impl ResizeSettings {
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(constants::paths::CONFIG_DIR)
            .join(constants::paths::CONFIG_FILE)
    }

    /// Load from the default location, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match Self::load_from(&config_path) {
            Ok(settings) => settings,
            Err(e) => {
                if config_path.exists() {
                    tracing::warn!("Ignoring invalid config {}: {e}", config_path.display());
                }
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, PanelError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<(), PanelError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), PanelError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PanelError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), PanelError> {
        // Written negated so NaN is rejected too.
        if !(self.terminal.font_size > 0.0 && self.terminal.line_height > 0.0) {
            return Err(PanelError::Config(
                "terminal font_size and line_height must be positive".to_string(),
            ));
        }
        if !(self.panel.min_height >= 0.0 && self.panel.edge_margin >= 0.0) {
            return Err(PanelError::Config(
                "panel min_height and edge_margin must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
