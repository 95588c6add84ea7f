//! Transient user-facing notifications.
//!
//! Stores publish here when a background operation fails; the UI decides
//! how long to show them. Nobody listening is fine.

use tokio::sync::broadcast;

const NOTIFICATION_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    /// Store or subsystem that raised it.
    pub source: &'static str,
    pub message: String,
}

#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn publish(&self, level: NotificationLevel, source: &'static str, message: impl Into<String>) {
        let notification = Notification {
            level,
            source,
            message: message.into(),
        };
        // Err only means there are no receivers.
        let _ = self.sender.send(notification);
    }

    pub fn error(&self, source: &'static str, message: impl Into<String>) {
        self.publish(NotificationLevel::Error, source, message);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_errors() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.error("rulesets", "disk full");

        let received = rx.recv().await.unwrap();
        assert_eq!(received.level, NotificationLevel::Error);
        assert_eq!(received.source, "rulesets");
        assert_eq!(received.message, "disk full");
    }

    #[test]
    fn publishing_without_listeners_is_harmless() {
        Notifier::new().error("user", "nobody hears this");
    }
}
