use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::ResizeSettings;
use crate::emulator::Viewport;
use crate::host::TermSize;
use crate::registry::SessionRegistry;

/// Fixed schedule of fit passes after a layout change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(mut delays: Vec<Duration>) -> Self {
        if delays.is_empty() {
            delays.push(Duration::ZERO);
        }
        delays.sort();
        delays.dedup();
        Self { delays }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        ResizeSettings::default().into()
    }
}

impl From<ResizeSettings> for RetryPolicy {
    fn from(settings: ResizeSettings) -> Self {
        Self::new(settings.retry_delays())
    }
}

/// What caused a fit to be scheduled. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTrigger {
    Mount,
    SessionCreated,
    WindowResize,
    PanelDrag,
    MaximizeToggle,
    SidebarResize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// No active session.
    Idle,
    /// The viewport could not be measured; a later pass will retry.
    Unmeasurable,
    /// Fit computed but identical to what the host already has.
    Unchanged(TermSize),
    /// New size sent to the host.
    Sent(TermSize),
}

/// Converges the active session's rows/cols with the viewport's pixel size.
pub struct ResizeSynchronizer {
    policy: RetryPolicy,
    pending: Vec<Instant>,
}

impl ResizeSynchronizer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            pending: Vec::new(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Queue one pass per retry delay, starting at `now`.
    pub fn schedule(&mut self, now: Instant, trigger: ResizeTrigger) {
        trace!("Scheduling fit passes for {trigger:?}");
        for delay in self.policy.delays() {
            self.pending.push(now + *delay);
        }
        self.pending.sort();
        self.pending.dedup();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().copied()
    }

    pub fn pending_passes(&self) -> usize {
        self.pending.len()
    }

    pub fn cancel(&mut self) {
        self.pending.clear();
    }

    /// Run every pass that is due at `now`. Returns the outcome of the last one.
    pub fn run_due(
        &mut self,
        now: Instant,
        registry: &mut SessionRegistry,
        viewport: &Viewport,
    ) -> Option<FitOutcome> {
        let due = self.pending.partition_point(|deadline| *deadline <= now);
        if due == 0 {
            return None;
        }
        self.pending.drain(..due);

        // Passes due at the same moment would measure the same layout.
        Some(Self::fit_pass(registry, viewport))
    }

    /// Measure once and propagate the result.
    pub fn fit_pass(registry: &mut SessionRegistry, viewport: &Viewport) -> FitOutcome {
        let Some(id) = registry.active_id().cloned() else {
            return FitOutcome::Idle;
        };
        let Some(size) = registry.binding(&id).and_then(|b| b.fit(viewport)) else {
            trace!("Fit for terminal {id} unavailable; waiting for layout");
            return FitOutcome::Unmeasurable;
        };

        if registry.resize(&id, size) {
            debug!("Terminal {id} resized to {size}");
            FitOutcome::Sent(size)
        } else {
            FitOutcome::Unchanged(size)
        }
    }
}

impl Default for ResizeSynchronizer {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
