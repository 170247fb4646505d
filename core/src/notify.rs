//! Notification relay between the engine and the host.
//!
//! The engine delivers asynchronous messages (schema changes, deployment
//! progress, bridge-side failure reports) through a callback that may run
//! on an engine-managed thread, interleaved with any command. Instead of
//! calling back into the host from a foreign thread, the bridge enqueues
//! every message onto a shared queue; the host's control thread drains it
//! at a safe point.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::SessionId;

/// One engine-originated (or bridge-originated) message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Session the message concerns; `SessionId::NONE` for global
    /// messages.
    pub session: SessionId,
    pub message_type: String,
    pub message_value: String,
}

impl Notification {
    pub fn new<T: Into<String>, V: Into<String>>(
        session: SessionId,
        message_type: T,
        message_value: V,
    ) -> Self {
        Notification {
            session,
            message_type: message_type.into(),
            message_value: message_value.into(),
        }
    }
}

/// Thread-safe FIFO of pending notifications.
///
/// Clone to share: the engine-side callback holds one handle, the bridge
/// holds another, the host may hold a third. Pushes from any thread are
/// visible to the next drain.
#[derive(Debug, Clone, Default)]
pub struct NotificationQueue {
    inner: Arc<Mutex<VecDeque<Notification>>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a message. Never blocks beyond the queue lock.
    pub fn push(&self, notification: Notification) {
        debug!(
            session = notification.session.raw(),
            kind = %notification.message_type,
            "notification enqueued"
        );
        self.lock().push_back(notification);
    }

    /// Remove and return all pending messages, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.lock().drain(..).collect()
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned lock only means a panic elsewhere mid-push; the queue
    // itself is still a valid VecDeque, so keep serving it.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notification>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
