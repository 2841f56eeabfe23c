use tracing::debug;

use crate::binding::MountOutcome;
use crate::emulator::Viewport;
use crate::host::SessionId;
use crate::registry::SessionRegistry;

/// Keeps the active session's emulator in the one shared viewport.
///
/// Only this type attaches or detaches bindings. Inactive bindings stay alive
/// and keep buffering; they are simply not in the viewport.
pub struct MountCoordinator {
    viewport: Viewport,
    mounted: Option<SessionId>,
    visible: bool,
}

impl MountCoordinator {
    pub fn new(viewport: Viewport) -> Self {
        let visible = viewport.in_document;
        Self {
            viewport,
            mounted: None,
            visible,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn mounted(&self) -> Option<&SessionId> {
        self.mounted.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_viewport_size(&mut self, width_px: f32, height_px: f32) {
        self.viewport.width_px = width_px;
        self.viewport.height_px = height_px;
    }

    /// Show or hide the terminal area. Hiding detaches the mounted binding but
    /// never disposes it.
    pub fn set_visible(
        &mut self,
        visible: bool,
        registry: &mut SessionRegistry,
    ) -> Option<MountOutcome> {
        self.visible = visible;
        self.viewport.in_document = visible;
        self.sync(registry)
    }

    /// Attach whichever session is active. Call after the active session
    /// changes or the terminal area becomes visible again.
    pub fn sync(&mut self, registry: &mut SessionRegistry) -> Option<MountOutcome> {
        if !self.visible {
            self.detach_current(registry);
            return None;
        }

        let Some(target) = registry.active_id().cloned() else {
            self.detach_current(registry);
            return None;
        };

        if self.mounted.as_ref() != Some(&target) {
            self.detach_current(registry);
        }

        let binding = registry.binding_mut(&target)?;
        let outcome = binding.mount(&self.viewport)?;
        if outcome != MountOutcome::AlreadyMounted {
            binding.focus();
            debug!("Terminal {target} mounted ({outcome:?})");
        }
        self.mounted = Some(target);
        Some(outcome)
    }

    /// Forget a session that has been killed. Its binding is already disposed.
    pub fn forget(&mut self, id: &SessionId) {
        if self.mounted.as_ref() == Some(id) {
            self.mounted = None;
        }
    }

    fn detach_current(&mut self, registry: &mut SessionRegistry) {
        if let Some(previous) = self.mounted.take() {
            if let Some(binding) = registry.binding_mut(&previous) {
                binding.unmount();
            }
        }
    }
}
