//! Application layer for clicksync-client.
//!
//! The application layer knows *what* to do (connect, reconnect, watch the
//! hotkey, replay clicks) and delegates *how* to traits implemented in the
//! infrastructure layer:
//!
//! | Trait                 | Implemented by                              |
//! |-----------------------|---------------------------------------------|
//! | `Transport`/`Connector` | `infrastructure::network`                 |
//! | `LocalInputDriver`    | `infrastructure::input_driver`              |
//! | `GlobalHotkeyWatcher` | `infrastructure::hotkey`                    |

pub mod backoff;
pub mod hotkey_watch;
pub mod replay_click;
pub mod session_manager;
pub mod transport;

pub use backoff::Backoff;
pub use hotkey_watch::{GlobalHotkeyWatcher, HotkeyPress, HotkeyTrigger, HotkeyWatchLifecycle, WatchHandle};
pub use replay_click::{LocalInputDriver, PlatformError, ReplayClickUseCase};
pub use session_manager::{ClientSessionManager, ConnectionState, TriggerOutcome};
pub use transport::{Connector, Transport};
