use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::JournalEvent;

/// Envelope wrapping a journal event with its emission time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEnvelope {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: JournalEvent,
}

/// Handle for emitting journal events
///
/// Cheaply cloneable; every component that mutates persisted state holds one.
/// A disabled handle drops events silently.
#[derive(Debug, Clone)]
pub struct JournalHandle {
    tx: Option<mpsc::Sender<JournalEnvelope>>,
}

impl JournalHandle {
    /// Create a new journal handle from a channel sender
    pub fn new(tx: mpsc::Sender<JournalEnvelope>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A handle that discards every event
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Emit a journal event
    ///
    /// Waits for channel capacity. If the writer is gone the error is logged
    /// and the caller carries on.
    pub async fn emit(&self, event: JournalEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        let envelope = JournalEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = tx.send(envelope).await {
            tracing::error!("Failed to emit journal event: {}", e);
        }
    }

    /// Try to emit a journal event without waiting
    ///
    /// Returns true if the event was queued.
    pub fn try_emit(&self, event: JournalEvent) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        let envelope = JournalEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit journal event: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> JournalEvent {
        JournalEvent::RunStarted {
            url: "https://x/1".to_string(),
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn test_emit_event() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = JournalHandle::new(tx);

        handle.emit(started()).await;

        let envelope = rx.recv().await.expect("Should receive event");
        assert!(matches!(envelope.event, JournalEvent::RunStarted { .. }));
    }

    #[tokio::test]
    async fn test_disabled_handle_drops_events() {
        let handle = JournalHandle::disabled();
        assert!(!handle.is_enabled());
        handle.emit(started()).await;
        assert!(!handle.try_emit(started()));
    }

    #[test]
    fn test_try_emit_full_channel() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = JournalHandle::new(tx);

        assert!(handle.try_emit(started()));
        // Second should fail (channel full)
        assert!(!handle.try_emit(started()));
    }

    #[tokio::test]
    async fn test_emit_closed_channel() {
        let (tx, rx) = mpsc::channel::<JournalEnvelope>(10);
        let handle = JournalHandle::new(tx);
        drop(rx);

        // Logged, not propagated
        handle.emit(started()).await;
    }

    #[test]
    fn test_envelope_is_flat() {
        let envelope = JournalEnvelope {
            timestamp: Utc::now(),
            event: started(),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "run_started");
        assert_eq!(json["url"], "https://x/1");
        assert!(json["timestamp"].is_string());
    }
}
