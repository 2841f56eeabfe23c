//! Contract with the external process host that owns the shell processes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::error::Result;

/// Opaque session identifier issued by the process host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Terminal geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl TermSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl fmt::Display for TermSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// What the host reports back for a successful `create`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedProcess {
    pub session_id: SessionId,
    pub shell: String,
    pub cwd: PathBuf,
    pub is_pty: bool,
}

/// Push events from the host. One global stream covers every session.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Output { session_id: SessionId, data: Vec<u8> },
    Exit { session_id: SessionId, exit_code: Option<i32> },
}

impl HostEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            HostEvent::Output { session_id, .. } | HostEvent::Exit { session_id, .. } => {
                session_id
            }
        }
    }
}

/// Request/response for `create`, fire-and-forget for everything else.
///
/// `write`, `resize` and `kill` must never block and must tolerate ids the
/// host no longer knows about.
#[async_trait]
pub trait ProcessHost: Send + Sync {
    async fn create(&self, cwd: Option<&Path>) -> Result<SpawnedProcess>;

    fn write(&self, session_id: &SessionId, data: &[u8]);

    fn resize(&self, session_id: &SessionId, size: TermSize);

    fn kill(&self, session_id: &SessionId);

    /// Subscribe to output/exit events for all sessions.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<HostEvent>;
}
