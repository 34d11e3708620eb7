//! JSON codec for ClickSync relay messages.
//!
//! Each WebSocket text frame carries exactly one JSON object.  Decoding is a
//! two-step process: `serde_json` parses the frame into a [`WireMessage`],
//! then [`WireMessage::into_event`] validates it into a [`RelayEvent`].
//!
//! # Error policy
//!
//! | Input                              | Result                           |
//! |------------------------------------|----------------------------------|
//! | valid, known `type`                | `Ok(Some(event))`                |
//! | valid JSON, unknown `type`         | `Ok(None)` (ignored)             |
//! | not JSON / missing `type` / fields | `Err(ProtocolError::Malformed)`  |
//! | coordinate outside `[0, 1]`        | `Err(CoordinateOutOfRange)`      |
//!
//! Callers drop the offending message and keep the connection open.

use thiserror::Error;

use crate::protocol::messages::{RelayEvent, WireMessage};
use crate::protocol::point::Axis;

/// Errors that can occur while encoding or decoding a relay message.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProtocolError {
    /// The frame is not valid JSON or lacks required fields.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A click coordinate lies outside the normalized range.
    #[error("{axis} = {value} is outside [0, 1]")]
    CoordinateOutOfRange { axis: Axis, value: f64 },

    /// A pixel position could not be normalized against an empty screen.
    #[error("invalid screen size {width}x{height}")]
    InvalidScreenSize { width: u32, height: u32 },

    /// The event could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`RelayEvent`] as a JSON string suitable for a text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.  In practice
/// this cannot happen for validated events, but the error is propagated
/// rather than unwrapped.
///
/// # Examples
///
/// ```rust
/// use clicksync_core::{encode_event, NormalizedPoint, RelayEvent};
///
/// let event = RelayEvent::ExecuteClick(NormalizedPoint::new(0.5, 0.25).unwrap());
/// let json = encode_event(&event).unwrap();
/// assert_eq!(json, r#"{"type":"execute_click","relX":0.5,"relY":0.25}"#);
/// ```
pub fn encode_event(event: &RelayEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(&WireMessage::from(event)).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decodes one text frame into a [`RelayEvent`].
///
/// Returns `Ok(None)` when the frame is well-formed JSON with a `type` this
/// build does not recognise.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] for unparseable frames and
/// [`ProtocolError::CoordinateOutOfRange`] for out-of-range clicks.
///
/// # Examples
///
/// ```rust
/// use clicksync_core::{decode_event, RelayEvent};
///
/// let event = decode_event(r#"{"type":"sync_click","relX":0.25,"relY":0.75}"#)
///     .unwrap()
///     .unwrap();
/// assert!(matches!(event, RelayEvent::SyncClick(_)));
///
/// assert_eq!(decode_event(r#"{"type":"future_thing"}"#).unwrap(), None);
/// ```
pub fn decode_event(text: &str) -> Result<Option<RelayEvent>, ProtocolError> {
    let raw: WireMessage =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    raw.into_event()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::HotkeyAdvert;
    use crate::protocol::point::NormalizedPoint;

    #[test]
    fn test_decode_sync_click() {
        // Arrange
        let text = r#"{"type":"sync_click","relX":0.25,"relY":0.75}"#;

        // Act
        let event = decode_event(text).unwrap().unwrap();

        // Assert
        assert_eq!(
            event,
            RelayEvent::SyncClick(NormalizedPoint::new(0.25, 0.75).unwrap())
        );
    }

    #[test]
    fn test_decode_accepts_integer_boundaries() {
        // JSON integers 0 and 1 must be read as 0.0 and 1.0.
        let event = decode_event(r#"{"type":"sync_click","relX":0,"relY":1}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            RelayEvent::SyncClick(NormalizedPoint::new(0.0, 1.0).unwrap())
        );
    }

    #[test]
    fn test_decode_rejects_negative_coordinate() {
        let err = decode_event(r#"{"type":"sync_click","relX":-0.1,"relY":0.5}"#).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::CoordinateOutOfRange { axis: Axis::X, .. }
        ));
    }

    #[test]
    fn test_decode_rejects_coordinate_above_one() {
        let err = decode_event(r#"{"type":"sync_click","relX":0.5,"relY":1.01}"#).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::CoordinateOutOfRange { axis: Axis::Y, .. }
        ));
    }

    #[test]
    fn test_decode_missing_field_is_malformed() {
        let err = decode_event(r#"{"type":"sync_click","relX":0.5}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_string_coordinate_is_malformed() {
        // Strings are never coerced to numbers.
        let err = decode_event(r#"{"type":"sync_click","relX":"0.5","relY":0.5}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_not_json_is_malformed() {
        assert!(matches!(
            decode_event("click!").unwrap_err(),
            ProtocolError::Malformed(_)
        ));
    }

    #[test]
    fn test_decode_missing_type_is_malformed() {
        assert!(matches!(
            decode_event(r#"{"relX":0.5,"relY":0.5}"#).unwrap_err(),
            ProtocolError::Malformed(_)
        ));
    }

    #[test]
    fn test_decode_unknown_type_is_ignored() {
        assert_eq!(decode_event(r#"{"type":"relative_command","relX":0.5}"#).unwrap(), None);
    }

    #[test]
    fn test_decode_ping() {
        assert_eq!(
            decode_event(r#"{"type":"ping"}"#).unwrap(),
            Some(RelayEvent::Ping)
        );
    }

    #[test]
    fn test_decode_update_hotkey() {
        let event = decode_event(r#"{"type":"update_hotkey","action":"sync_click","key":"f6"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            RelayEvent::UpdateHotkey(HotkeyAdvert {
                action: "sync_click".to_string(),
                key: "f6".to_string(),
            })
        );
    }

    #[test]
    fn test_encode_execute_click_uses_wire_field_names() {
        let event = RelayEvent::ExecuteClick(NormalizedPoint::new(0.25, 0.75).unwrap());
        let json = encode_event(&event).unwrap();
        assert_eq!(json, r#"{"type":"execute_click","relX":0.25,"relY":0.75}"#);
    }

    #[test]
    fn test_encode_ping() {
        assert_eq!(encode_event(&RelayEvent::Ping).unwrap(), r#"{"type":"ping"}"#);
    }

    #[test]
    fn test_encode_hotkey_update() {
        let event = RelayEvent::HotkeyUpdate(HotkeyAdvert {
            action: "sync_click".to_string(),
            key: "escape".to_string(),
        });
        assert_eq!(
            encode_event(&event).unwrap(),
            r#"{"type":"hotkey_update","action":"sync_click","key":"escape"}"#
        );
    }
}
