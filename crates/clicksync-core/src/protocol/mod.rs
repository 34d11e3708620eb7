//! Protocol module containing the relay event types and the JSON codec.

pub mod codec;
pub mod messages;
pub mod point;

pub use codec::{decode_event, encode_event, ProtocolError};
pub use messages::{HotkeyAdvert, RelayEvent, WireMessage};
pub use point::{Axis, NormalizedPoint};
