//! In-process alert topic backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for alert notifications inside
//! the process. Bridges to external pub/sub systems, dashboards and audit
//! sinks subscribe to it; the [`BusChannel`] publishes to it as one of the
//! notifier's channels.

use async_trait::async_trait;
use tokio::sync::broadcast;
use vigil_core::NotificationEvent;

use crate::channel::{ChannelError, NotificationChannel};

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out topic.
///
/// Every subscriber independently receives every published event. When the
/// buffer is full the oldest unconsumed events are dropped and slow
/// receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<NotificationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it; zero means the
    /// event was dropped.
    pub fn publish(&self, event: NotificationEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// BusChannel
// ---------------------------------------------------------------------------

/// Notification channel that publishes to an [`EventBus`] topic.
pub struct BusChannel {
    topic: String,
    bus: std::sync::Arc<EventBus>,
}

impl BusChannel {
    pub fn new(topic: impl Into<String>, bus: std::sync::Arc<EventBus>) -> Self {
        Self {
            topic: topic.into(),
            bus,
        }
    }
}

#[async_trait]
impl NotificationChannel for BusChannel {
    fn name(&self) -> &str {
        "bus"
    }

    async fn send(&self, event: &NotificationEvent) -> Result<(), ChannelError> {
        let receivers = self.bus.publish(event.clone());
        if receivers == 0 {
            tracing::debug!(topic = %self.topic, "No subscribers on alert topic");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use vigil_core::{EventKind, Severity, TargetKey};

    use super::*;

    fn event() -> NotificationEvent {
        NotificationEvent {
            resource_ref: TargetKey::new("wh-1", "warehouse", "queued_queries"),
            metric_name: "queued_queries".into(),
            region_or_scope: "acct-1".into(),
            kind: EventKind::Triggered,
            severity: Severity::Warning,
            value: 42.0,
            threshold: 40.0,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.publish(event()), 2);

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1, e2);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(event()), 0);
    }

    #[tokio::test]
    async fn bus_channel_publishes_to_topic() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let channel = BusChannel::new("alerts", Arc::clone(&bus));

        channel.send(&event()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.metric_name, "queued_queries");
        assert_eq!(channel.name(), "bus");
    }
}
