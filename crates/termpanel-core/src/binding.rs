use std::sync::Arc;

use crate::emulator::{Emulator, FitCalculator, Viewport, ViewportId};
use crate::host::{ProcessHost, SessionId, TermSize};

/// How a `mount` call attached the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// The emulator was opened for the first time.
    FirstMount,
    /// An existing presentation node was moved into the viewport.
    Moved,
    /// Already attached to this viewport; nothing changed.
    AlreadyMounted,
}

/// Persistent per-session emulator state.
///
/// Lives from session creation until kill. Mounting only changes where the
/// presentation node sits; the emulator and everything it buffered stay put.
pub struct EmulatorBinding {
    session_id: SessionId,
    emulator: Box<dyn Emulator>,
    fit: Box<dyn FitCalculator>,
    host: Arc<dyn ProcessHost>,
    mounted_in: Option<ViewportId>,
    opened: bool,
    disposed: bool,
    /// Last size applied to the emulator grid.
    size: Option<TermSize>,
    /// Last size sent to the process host.
    last_sent: Option<TermSize>,
}

impl EmulatorBinding {
    pub fn new(
        session_id: SessionId,
        mut emulator: Box<dyn Emulator>,
        fit: Box<dyn FitCalculator>,
        host: Arc<dyn ProcessHost>,
    ) -> Self {
        let input_host = Arc::clone(&host);
        let input_id = session_id.clone();
        emulator.on_input(Box::new(move |data: &[u8]| {
            input_host.write(&input_id, data);
        }));

        Self {
            session_id,
            emulator,
            fit,
            host,
            mounted_in: None,
            opened: false,
            disposed: false,
            size: None,
            last_sent: None,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted_in.is_some()
    }

    pub fn mounted_in(&self) -> Option<ViewportId> {
        self.mounted_in
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn size(&self) -> Option<TermSize> {
        self.size
    }

    pub fn last_sent(&self) -> Option<TermSize> {
        self.last_sent
    }

    /// Append host output. Works whether or not the binding is visible.
    pub fn write(&mut self, data: &[u8]) {
        if self.disposed {
            return;
        }
        self.emulator.write(data);
    }

    /// Forward keystrokes to the process behind this session.
    pub fn send_input(&self, data: &[u8]) {
        if self.disposed {
            return;
        }
        self.host.write(&self.session_id, data);
    }

    /// Attach to `viewport`. `None` once the binding has been disposed.
    pub fn mount(&mut self, viewport: &Viewport) -> Option<MountOutcome> {
        if self.disposed {
            return None;
        }
        if self.mounted_in == Some(viewport.id) {
            return Some(MountOutcome::AlreadyMounted);
        }
        self.mounted_in = Some(viewport.id);
        if self.opened {
            self.emulator.reattach(viewport);
            Some(MountOutcome::Moved)
        } else {
            self.opened = true;
            self.emulator.open(viewport);
            Some(MountOutcome::FirstMount)
        }
    }

    pub fn unmount(&mut self) {
        if self.mounted_in.take().is_some() && !self.disposed {
            self.emulator.detach();
        }
    }

    pub fn focus(&mut self) {
        if !self.disposed {
            self.emulator.focus();
        }
    }

    pub fn fit(&self, viewport: &Viewport) -> Option<TermSize> {
        if self.disposed {
            return None;
        }
        self.fit.compute_fit(viewport)
    }

    /// Resize the emulator grid. Returns false when the size is unchanged.
    pub fn apply_size(&mut self, size: TermSize) -> bool {
        if self.disposed || self.size == Some(size) {
            return false;
        }
        self.size = Some(size);
        self.emulator.resize(size);
        true
    }

    /// Whether `size` still has to be sent to the host; records it as sent.
    pub fn should_send(&mut self, size: TermSize) -> bool {
        if self.last_sent == Some(size) {
            return false;
        }
        self.last_sent = Some(size);
        true
    }

    /// Release emulator and fit resources. Only the first call has any effect.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if self.mounted_in.take().is_some() {
            self.emulator.detach();
        }
        self.emulator.dispose();
        self.disposed = true;
    }
}

impl Drop for EmulatorBinding {
    fn drop(&mut self) {
        if !self.disposed {
            tracing::warn!(
                "Emulator binding for {} dropped without explicit dispose",
                self.session_id
            );
            self.dispose();
        }
    }
}
