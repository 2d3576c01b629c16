//! Bounded, time-decaying queue of user-visible alert notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

/// Most notifications kept at once.
pub const MAX_NOTIFICATIONS: usize = 5;
/// Delay after a push before the oldest entry is dropped.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct AlertNotification {
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Notification queue with FIFO-paced expiry.
///
/// Every push schedules one removal of whatever entry is oldest once the TTL
/// has elapsed, so the queue drains at the cadence of pushes rather than per
/// entry.
pub struct AlertNotifier {
    queue: Arc<Mutex<VecDeque<AlertNotification>>>,
    capacity: usize,
    ttl: Duration,
    stop: broadcast::Sender<()>,
}

impl AlertNotifier {
    pub fn new() -> Self {
        Self::with_limits(MAX_NOTIFICATIONS, NOTIFICATION_TTL)
    }

    pub fn with_limits(capacity: usize, ttl: Duration) -> Self {
        let (stop, _) = broadcast::channel(1);
        Self {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(capacity + 1))),
            capacity,
            ttl,
            stop,
        }
    }

    /// Append a notification, dropping the oldest beyond capacity.
    pub fn push(&self, message: impl Into<String>) {
        let notification = AlertNotification {
            message: message.into(),
            created_at: Utc::now(),
        };
        tracing::info!("Notification: {}", notification.message);

        {
            let mut queue = lock(&self.queue);
            queue.push_back(notification);
            while queue.len() > self.capacity {
                queue.pop_front();
            }
        }

        self.schedule_expiry();
    }

    fn schedule_expiry(&self) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => {
                tracing::warn!("No runtime available, notification will not expire");
                return;
            }
        };

        let queue = self.queue.clone();
        let ttl = self.ttl;
        let mut stop_rx = self.stop.subscribe();

        handle.spawn(async move {
            tokio::select! {
                _ = stop_rx.recv() => {}
                _ = tokio::time::sleep(ttl) => {
                    lock(&queue).pop_front();
                }
            }
        });
    }

    /// Current notifications, oldest first.
    pub fn notifications(&self) -> Vec<AlertNotification> {
        lock(&self.queue).iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel pending expiries. Entries already queued stay.
    pub fn shutdown(&self) {
        let _ = self.stop.send(());
    }
}

impl Default for AlertNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(queue: &Mutex<VecDeque<AlertNotification>>) -> MutexGuard<'_, VecDeque<AlertNotification>> {
    queue.lock().unwrap_or_else(|e| e.into_inner())
}
