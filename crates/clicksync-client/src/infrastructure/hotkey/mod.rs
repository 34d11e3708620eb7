//! Global hotkey watcher implementations.

pub mod console;
pub mod mock;

pub use console::{ConsoleCommand, ConsoleHotkeyWatcher, CONSOLE_HELP};
pub use mock::MockHotkeyWatcher;
