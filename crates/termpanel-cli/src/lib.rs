// Library interface for termpanel-cli
// This allows integration tests to access internal modules

pub mod app;
pub mod emulator;
pub mod keys;

// Re-export commonly used items for easier testing
pub use emulator::{PassthroughEmulator, PassthroughFactory, TerminalFit};
pub use keys::{KeyAction, KeyRouter};
