pub mod binding;
pub mod config;
pub mod constants;
pub mod emulator;
pub mod error;
pub mod events;
pub mod host;
pub mod mount;
pub mod panel;
pub mod registry;
pub mod resize;
pub mod terminal;

// Re-export key types
pub use binding::{EmulatorBinding, MountOutcome};
pub use config::Settings;
pub use emulator::{Emulator, EmulatorFactory, FitCalculator, MonospaceFit, Viewport, ViewportId};
pub use error::{PanelError, Result};
pub use events::HostEventBus;
pub use host::{HostEvent, ProcessHost, SessionId, SpawnedProcess, TermSize};
pub use mount::MountCoordinator;
pub use panel::{PanelState, PanelTab};
pub use registry::{InitState, PickerEntry, SessionRegistry, TerminalSession};
pub use resize::{FitOutcome, ResizeSynchronizer, ResizeTrigger, RetryPolicy};
pub use terminal::{PanelCommand, PanelNotice, SpawnCompletion, SpawnJob, SpawnOrigin, TerminalPanel};
