//! Inbound message handling.
//!
//! [`handle_inbound`] takes one text frame from a session and applies it to
//! the registry:
//!
//! | Inbound         | Action                                          |
//! |-----------------|-------------------------------------------------|
//! | `sync_click`    | fan out `execute_click` to every other session  |
//! | `update_hotkey` | record it, fan out `hotkey_update`              |
//! | `ping`          | nothing beyond the activity refresh             |
//! | relay-only type | ignored with a warning                          |
//! | unknown type    | ignored                                         |
//! | malformed       | dropped with a warning, session stays open      |
//!
//! The activity refresh itself happens in the read loop for every frame,
//! before this function is called.

use clicksync_core::{decode_event, ProtocolError, RelayEvent};
use tracing::{debug, info, warn};

use crate::application::registry::{DispatchReport, SessionId, SessionRegistry};

/// What [`handle_inbound`] did with a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    /// The event was relayed to the other sessions.
    Relayed(DispatchReport),
    /// Application-level ping; nothing else to do.
    Pinged,
    /// A message only the relay is supposed to send (`execute_click`,
    /// `hotkey_update`) arrived from a client.
    Ignored(&'static str),
    /// A well-formed message with a `type` this build does not know.
    Unknown,
    /// The frame could not be decoded or failed validation.
    Rejected(ProtocolError),
}

/// Applies one inbound text frame from `sender` to `registry`.
pub async fn handle_inbound(
    registry: &SessionRegistry,
    sender: SessionId,
    text: &str,
) -> InboundOutcome {
    let event = match decode_event(text) {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!(session = %sender, "ignoring message with unknown type");
            return InboundOutcome::Unknown;
        }
        Err(e) => {
            warn!(session = %sender, error = %e, "dropping invalid message");
            return InboundOutcome::Rejected(e);
        }
    };

    match &event {
        RelayEvent::SyncClick(point) => {
            let report = registry.dispatch(sender, &event).await;
            info!(
                session = %sender,
                rel_x = point.x(),
                rel_y = point.y(),
                recipients = report.delivered.len(),
                "click relayed"
            );
            InboundOutcome::Relayed(report)
        }
        RelayEvent::UpdateHotkey(advert) => {
            registry.update_hotkey(sender, advert).await;
            info!(session = %sender, action = %advert.action, key = %advert.key, "hotkey updated");
            InboundOutcome::Relayed(registry.dispatch(sender, &event).await)
        }
        RelayEvent::Ping => InboundOutcome::Pinged,
        RelayEvent::ExecuteClick(_) | RelayEvent::HotkeyUpdate(_) => {
            let kind = event.type_name();
            warn!(session = %sender, kind, "client sent a relay-only message; ignored");
            InboundOutcome::Ignored(kind)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::SessionSink;
    use async_trait::async_trait;
    use clicksync_core::{NormalizedPoint, TransportError};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CollectingSink {
        sent: Mutex<Vec<RelayEvent>>,
    }

    #[async_trait]
    impl SessionSink for CollectingSink {
        async fn send(&self, event: &RelayEvent) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(event.clone());
            Ok(())
        }

        async fn close(&self) {}
    }

    async fn two_sessions() -> (SessionRegistry, SessionId, Arc<CollectingSink>, Arc<CollectingSink>) {
        let registry = SessionRegistry::new();
        let a_sink = Arc::new(CollectingSink::default());
        let b_sink = Arc::new(CollectingSink::default());
        let a = registry.admit(a_sink.clone()).await;
        registry.admit(b_sink.clone()).await;
        (registry, a, a_sink, b_sink)
    }

    #[tokio::test]
    async fn test_sync_click_reaches_peer_as_execute_click() {
        // Arrange
        let (registry, a, a_sink, b_sink) = two_sessions().await;

        // Act
        let outcome = handle_inbound(&registry, a, r#"{"type":"sync_click","relX":0.25,"relY":0.75}"#).await;

        // Assert
        assert!(matches!(outcome, InboundOutcome::Relayed(ref r) if r.delivered.len() == 1));
        assert!(a_sink.sent.lock().unwrap().is_empty());
        assert_eq!(
            *b_sink.sent.lock().unwrap(),
            vec![RelayEvent::ExecuteClick(NormalizedPoint::new(0.25, 0.75).unwrap())]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_click_is_rejected_and_not_relayed() {
        let (registry, a, _a_sink, b_sink) = two_sessions().await;

        let outcome = handle_inbound(&registry, a, r#"{"type":"sync_click","relX":1.2,"relY":0.5}"#).await;

        assert!(matches!(
            outcome,
            InboundOutcome::Rejected(ProtocolError::CoordinateOutOfRange { .. })
        ));
        assert!(b_sink.sent.lock().unwrap().is_empty());
        // The sender is not punished for a bad message.
        assert!(registry.contains(a).await);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_rejected() {
        let (registry, a, _, b_sink) = two_sessions().await;

        let outcome = handle_inbound(&registry, a, "{not json").await;

        assert!(matches!(outcome, InboundOutcome::Rejected(ProtocolError::Malformed(_))));
        assert!(b_sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ping_is_not_relayed() {
        let (registry, a, _, b_sink) = two_sessions().await;

        assert_eq!(handle_inbound(&registry, a, r#"{"type":"ping"}"#).await, InboundOutcome::Pinged);
        assert!(b_sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_click_from_client_is_ignored() {
        let (registry, a, _, b_sink) = two_sessions().await;

        let outcome = handle_inbound(&registry, a, r#"{"type":"execute_click","relX":0.5,"relY":0.5}"#).await;

        assert_eq!(outcome, InboundOutcome::Ignored("execute_click"));
        assert!(b_sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_is_ignored() {
        let (registry, a, _, _) = two_sessions().await;
        let outcome = handle_inbound(&registry, a, r#"{"type":"relative_click","relX":0.5,"relY":0.5}"#).await;
        assert_eq!(outcome, InboundOutcome::Unknown);
    }

    #[tokio::test]
    async fn test_update_hotkey_is_recorded_and_fanned_out() {
        let (registry, a, _, b_sink) = two_sessions().await;

        handle_inbound(&registry, a, r#"{"type":"update_hotkey","action":"sync_click","key":"f6"}"#).await;

        let map = registry.hotkeys(a).await.unwrap();
        assert_eq!(map.get("sync_click").map(String::as_str), Some("f6"));
        let sent = b_sink.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].type_name(), "hotkey_update");
    }
}
