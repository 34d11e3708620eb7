//! ClickSync relay message types.
//!
//! Every message on the wire is a JSON object with a `"type"` field that
//! identifies the variant; all other fields sit in the same object:
//!
//! ```json
//! {"type":"sync_click","relX":0.25,"relY":0.75}
//! {"type":"execute_click","relX":0.25,"relY":0.75}
//! {"type":"ping"}
//! {"type":"update_hotkey","action":"sync_click","key":"f5"}
//! ```
//!
//! # Two layers
//!
//! - [`WireMessage`] is the raw serde shape.  It carries unchecked `f64`
//!   coordinates and has a catch-all `Unknown` variant so that unrecognised
//!   `"type"` values do not become decode errors.
//! - [`RelayEvent`] is the closed, validated event the rest of the system
//!   works with.  Converting a `WireMessage` into a `RelayEvent` rejects
//!   out-of-range coordinates.

use serde::{Deserialize, Serialize};

use crate::protocol::codec::ProtocolError;
use crate::protocol::point::NormalizedPoint;

// ── Raw wire shape ────────────────────────────────────────────────────────────

/// The serde representation of a wire message.
///
/// Field names follow the established wire format (`relX`/`relY` in camel
/// case, type tags in snake case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// Client → relay: the local hotkey fired at this relative position.
    SyncClick {
        #[serde(rename = "relX")]
        rel_x: f64,
        #[serde(rename = "relY")]
        rel_y: f64,
    },

    /// Relay → client: replay a click at this relative position.
    ExecuteClick {
        #[serde(rename = "relX")]
        rel_x: f64,
        #[serde(rename = "relY")]
        rel_y: f64,
    },

    /// Client → relay: application-level liveness refresh.
    Ping,

    /// Client → relay: advisory notice that the client's hotkey changed.
    UpdateHotkey { action: String, key: String },

    /// Relay → other clients: a peer's hotkey changed.
    HotkeyUpdate { action: String, key: String },

    /// Any `"type"` value this build does not know about.
    #[serde(other)]
    Unknown,
}

// ── Validated events ──────────────────────────────────────────────────────────

/// Advisory hotkey metadata: which action is bound to which key label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyAdvert {
    /// The action the key triggers (currently always `"sync_click"`).
    pub action: String,
    /// The lower-case hotkey label, e.g. `"f5"`.
    pub key: String,
}

/// A validated relay event.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Outbound trigger observed locally by a client.
    SyncClick(NormalizedPoint),
    /// Inbound instruction to replay a click.
    ExecuteClick(NormalizedPoint),
    /// Application-level liveness refresh.
    Ping,
    /// A client advertises its hotkey binding.
    UpdateHotkey(HotkeyAdvert),
    /// The relay forwards another client's hotkey binding.
    HotkeyUpdate(HotkeyAdvert),
}

impl RelayEvent {
    /// Returns the wire `type` string for this event.
    ///
    /// Used in log messages so that payloads are not dumped wholesale.
    pub fn type_name(&self) -> &'static str {
        match self {
            RelayEvent::SyncClick(_) => "sync_click",
            RelayEvent::ExecuteClick(_) => "execute_click",
            RelayEvent::Ping => "ping",
            RelayEvent::UpdateHotkey(_) => "update_hotkey",
            RelayEvent::HotkeyUpdate(_) => "hotkey_update",
        }
    }

    /// Returns the event the relay fans out to the other sessions when it
    /// receives `self`, or `None` if `self` is not relayed.
    ///
    /// | received        | forwarded        |
    /// |-----------------|------------------|
    /// | `sync_click`    | `execute_click`  |
    /// | `update_hotkey` | `hotkey_update`  |
    /// | anything else   | nothing          |
    pub fn relayed(&self) -> Option<RelayEvent> {
        match self {
            RelayEvent::SyncClick(point) => Some(RelayEvent::ExecuteClick(*point)),
            RelayEvent::UpdateHotkey(advert) => Some(RelayEvent::HotkeyUpdate(advert.clone())),
            _ => None,
        }
    }
}

impl From<&RelayEvent> for WireMessage {
    fn from(event: &RelayEvent) -> Self {
        match event {
            RelayEvent::SyncClick(p) => WireMessage::SyncClick {
                rel_x: p.x(),
                rel_y: p.y(),
            },
            RelayEvent::ExecuteClick(p) => WireMessage::ExecuteClick {
                rel_x: p.x(),
                rel_y: p.y(),
            },
            RelayEvent::Ping => WireMessage::Ping,
            RelayEvent::UpdateHotkey(a) => WireMessage::UpdateHotkey {
                action: a.action.clone(),
                key: a.key.clone(),
            },
            RelayEvent::HotkeyUpdate(a) => WireMessage::HotkeyUpdate {
                action: a.action.clone(),
                key: a.key.clone(),
            },
        }
    }
}

impl WireMessage {
    /// Validates the raw message.
    ///
    /// Returns `Ok(None)` for [`WireMessage::Unknown`]: unknown types are
    /// ignored, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CoordinateOutOfRange`] if a click carries a
    /// coordinate outside `[0.0, 1.0]`.
    pub fn into_event(self) -> Result<Option<RelayEvent>, ProtocolError> {
        let event = match self {
            WireMessage::SyncClick { rel_x, rel_y } => {
                RelayEvent::SyncClick(NormalizedPoint::new(rel_x, rel_y)?)
            }
            WireMessage::ExecuteClick { rel_x, rel_y } => {
                RelayEvent::ExecuteClick(NormalizedPoint::new(rel_x, rel_y)?)
            }
            WireMessage::Ping => RelayEvent::Ping,
            WireMessage::UpdateHotkey { action, key } => {
                RelayEvent::UpdateHotkey(HotkeyAdvert { action, key })
            }
            WireMessage::HotkeyUpdate { action, key } => {
                RelayEvent::HotkeyUpdate(HotkeyAdvert { action, key })
            }
            WireMessage::Unknown => return Ok(None),
        };
        Ok(Some(event))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
