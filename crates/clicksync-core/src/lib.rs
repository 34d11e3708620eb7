//! # clicksync-core
//!
//! Shared library for ClickSync containing the JSON wire protocol, the
//! normalized coordinate type, the transport error taxonomy, and the hotkey
//! key-code translation tables.
//!
//! This crate is used by both the relay server and the client application.
//! It has zero dependencies on OS APIs, sockets, or async runtimes.
//!
//! # Architecture overview
//!
//! ClickSync mirrors a mouse click across machines: one machine presses a
//! hotkey, its cursor position is normalized to a fraction of the screen, and
//! every other connected machine clicks at the same relative position.
//!
//! - **`protocol`** – How events travel over the network.  Every message is a
//!   JSON object with a `"type"` discriminant, decoded into the closed
//!   [`RelayEvent`] enum.  Coordinates are validated at decode time.
//!
//! - **`keymap`** – Translation of user-facing hotkey labels (`"f5"`,
//!   `"escape"`) into the native key code reported by each operating system
//!   family (Windows VK codes, X11 KeySyms, macOS CGKeyCodes).
//!
//! - **`error`** – The [`TransportError`] taxonomy shared by the client
//!   transport and the relay's per-session sinks.

pub mod error;
pub mod keymap;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `clicksync_core::RelayEvent` instead of the full module path.
pub use error::TransportError;
pub use keymap::{HotkeyLabel, KeyMapper, PlatformFamily};
pub use protocol::codec::{decode_event, encode_event, ProtocolError};
pub use protocol::messages::{HotkeyAdvert, RelayEvent};
pub use protocol::point::{Axis, NormalizedPoint};
