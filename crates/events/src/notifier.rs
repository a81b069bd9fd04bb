//! Notification dispatch.
//!
//! The scheduler never waits on delivery: it pushes events into a bounded
//! queue through a [`NotifierHandle`], and a background task running
//! [`Notifier::run`] drains the queue and fans each event out to every
//! channel with a per-channel timeout.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vigil_core::NotificationEvent;

use crate::channel::{ChannelError, NotificationChannel};

/// Default per-channel delivery timeout.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(20);

// ---------------------------------------------------------------------------
// dispatch
// ---------------------------------------------------------------------------

/// Outcome of delivering one event to every channel.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Names of channels that accepted the event.
    pub delivered: Vec<String>,
    /// Channel name and error for every failed channel.
    pub failed: Vec<(String, ChannelError)>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deliver `event` to every channel concurrently.
///
/// Each attempt is bounded by `timeout`. A failure is logged and recorded in
/// the report; it never prevents the other channels from being attempted.
pub async fn dispatch(
    event: &NotificationEvent,
    channels: &[Arc<dyn NotificationChannel>],
    timeout: Duration,
) -> DispatchReport {
    let attempts = channels.iter().map(|channel| async move {
        let result = match tokio::time::timeout(timeout, channel.send(event)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(timeout)),
        };
        (channel.name().to_string(), result)
    });

    let mut report = DispatchReport::default();
    for (name, result) in join_all(attempts).await {
        match result {
            Ok(()) => {
                tracing::debug!(
                    channel = %name,
                    kind = %event.kind,
                    resource_id = %event.resource_ref.resource_id,
                    "Notification delivered"
                );
                report.delivered.push(name);
            }
            Err(e) => {
                tracing::error!(
                    channel = %name,
                    kind = %event.kind,
                    resource_id = %event.resource_ref.resource_id,
                    metric = %event.metric_name,
                    error = %e,
                    "Notification delivery failed"
                );
                report.failed.push((name, e));
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Background delivery service for alert notifications.
pub struct Notifier {
    channels: Vec<Arc<dyn NotificationChannel>>,
    delivery_timeout: Duration,
}

impl Notifier {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, delivery_timeout: Duration) -> Self {
        Self {
            channels,
            delivery_timeout,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver one event to every configured channel.
    pub async fn dispatch(&self, event: &NotificationEvent) -> DispatchReport {
        dispatch(event, &self.channels, self.delivery_timeout).await
    }

    /// Create the queue and spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(
        self,
        queue_capacity: usize,
        cancel: CancellationToken,
    ) -> (NotifierHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let handle = tokio::spawn(self.run(receiver, cancel));
        (NotifierHandle { sender }, handle)
    }

    /// Drain the queue until it closes or `cancel` fires.
    ///
    /// On cancellation, events already queued are still delivered before the
    /// task exits.
    pub async fn run(
        self,
        mut receiver: mpsc::Receiver<NotificationEvent>,
        cancel: CancellationToken,
    ) {
        tracing::info!(channels = self.channels.len(), "Notifier started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    receiver.close();
                    let mut drained = 0usize;
                    while let Some(event) = receiver.recv().await {
                        self.dispatch(&event).await;
                        drained += 1;
                    }
                    tracing::info!(drained, "Notifier cancelled");
                    break;
                }
                next = receiver.recv() => match next {
                    Some(event) => {
                        self.dispatch(&event).await;
                    }
                    None => {
                        tracing::info!("Notification queue closed, notifier shutting down");
                        break;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NotifierHandle
// ---------------------------------------------------------------------------

/// Cheap, cloneable producer side of the notification queue.
#[derive(Clone)]
pub struct NotifierHandle {
    sender: mpsc::Sender<NotificationEvent>,
}

impl NotifierHandle {
    /// Queue an event without waiting.
    ///
    /// Returns `false` when the queue is full or closed; the event is
    /// dropped (it is already in history) and a warning is logged.
    pub fn enqueue(&self, event: NotificationEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    kind = %event.kind,
                    resource_id = %event.resource_ref.resource_id,
                    metric = %event.metric_name,
                    "Notification queue full, dropping notification"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(
                    kind = %event.kind,
                    resource_id = %event.resource_ref.resource_id,
                    "Notifier stopped, dropping notification"
                );
                false
            }
        }
    }

    /// A handle backed by a caller-owned queue, for embedding the notifier
    /// in another task or for inspecting queued events.
    pub fn from_sender(sender: mpsc::Sender<NotificationEvent>) -> Self {
        Self { sender }
    }
}
