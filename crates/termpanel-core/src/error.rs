use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Failed to spawn terminal: {0}")]
    Spawn(String),

    #[error("Process host error: {0}")]
    Host(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl PanelError {
    pub fn spawn(message: impl Into<String>) -> Self {
        Self::Spawn(message.into())
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::Host(message.into())
    }

    /// Host-side failures surface to the user as spawn failures; everything else
    /// keeps its own category.
    pub fn into_spawn_failure(self) -> Self {
        match self {
            Self::Spawn(_) => self,
            other => Self::Spawn(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PanelError>;
