use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Key of the notice shown while the connection is down.
pub const CONNECTION_LOST: &str = "connection-lost";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    /// Command the notice refers to, so the UI can e.g. re-enable a button.
    pub command: Option<String>,
    /// Set for notices that stay until their cause is resolved.
    pub persistent: Option<String>,
    #[serde(skip)]
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    entries: Vec<Notification>,
}

/// Toast-style notices: transient ones expire on their own, persistent ones
/// are cleared by whoever fixed the problem.
#[derive(Debug)]
pub struct Notifications {
    ttl: Duration,
    inner: Mutex<Inner>,
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Notifications {
            ttl,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn push_transient(&self, message: impl Into<String>, command: Option<String>) -> u64 {
        let message = message.into();
        tracing::info!(%message, command = ?command, "notification");
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(Notification {
            id,
            message,
            command,
            persistent: None,
            expires_at: Some(Instant::now() + self.ttl),
        });
        id
    }

    /// Shows a persistent notice unless one with the same key is up already.
    pub fn push_persistent(&self, key: &str, message: impl Into<String>) -> bool {
        let mut inner = self.inner.lock();
        if inner.entries.iter().any(|n| n.persistent.as_deref() == Some(key)) {
            return false;
        }
        let message = message.into();
        tracing::warn!(%message, key, "persistent notification");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(Notification {
            id,
            message,
            command: None,
            persistent: Some(key.to_string()),
            expires_at: None,
        });
        true
    }

    pub fn clear_persistent(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|n| n.persistent.as_deref() != Some(key));
        before != inner.entries.len()
    }

    /// Dismisses every transient notice; persistent ones stay.
    pub fn dismiss_transient(&self) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|n| n.persistent.is_some());
        before - inner.entries.len()
    }

    pub fn has_persistent(&self, key: &str) -> bool {
        self.inner
            .lock()
            .entries
            .iter()
            .any(|n| n.persistent.as_deref() == Some(key))
    }

    /// Live notices, oldest first. Expired transient ones are dropped.
    pub fn active(&self) -> Vec<Notification> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.entries.retain(|n| n.expires_at.map_or(true, |t| t > now));
        inner.entries.clone()
    }
}
