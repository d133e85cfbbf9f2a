//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`LifecycleEvent`]s.
//! The run orchestrator publishes archive events as it commits; the
//! worker subscribes an audit logger, and a reporting surface can attach
//! its own subscriber. Shared via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use costplane_core::archive::ArchiveReason;

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// An optimization lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Dot-separated event name, e.g. `"optimization.archived"`.
    pub event_type: String,

    pub organization_id: Uuid,
    pub cloud_account_id: Uuid,
    pub module: String,
    pub resource_id: Uuid,

    /// Present on archive events.
    pub reason: Option<ArchiveReason>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    /// Event published for every optimization moved to the archive.
    pub fn archived(
        organization_id: Uuid,
        cloud_account_id: Uuid,
        module: impl Into<String>,
        resource_id: Uuid,
        reason: ArchiveReason,
        description: &str,
    ) -> Self {
        Self {
            event_type: "optimization.archived".into(),
            organization_id,
            cloud_account_id,
            module: module.into(),
            resource_id,
            reason: Some(reason),
            payload: serde_json::json!({ "description": description }),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`LifecycleEvent`].
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: LifecycleEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_archive_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let org = Uuid::now_v7();
        let account = Uuid::now_v7();
        let resource = Uuid::now_v7();
        bus.publish(LifecycleEvent::archived(
            org,
            account,
            "rightsizing",
            resource,
            ArchiveReason::RecommendationApplied,
            "flavor changed",
        ));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "optimization.archived");
        assert_eq!(received.organization_id, org);
        assert_eq!(received.reason, Some(ArchiveReason::RecommendationApplied));
        assert_eq!(received.payload["description"], "flavor changed");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(LifecycleEvent::archived(
            Uuid::now_v7(),
            Uuid::now_v7(),
            "abandoned_images",
            Uuid::now_v7(),
            ArchiveReason::OptionsChanged,
            "organization options changed",
        ));

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(LifecycleEvent::archived(
            Uuid::now_v7(),
            Uuid::now_v7(),
            "rightsizing",
            Uuid::now_v7(),
            ArchiveReason::ResourceDeleted,
            "resource deleted",
        ));
    }
}
