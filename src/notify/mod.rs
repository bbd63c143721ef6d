//! User-facing notifications
//!
//! Alerts, connection state transitions and the terminal "lost connection"
//! event are fanned out over a broadcast channel. Consumers subscribe; a send
//! with nobody listening is silently dropped.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::alerts::Severity;
use crate::stream::ConnectionState;

/// Default broadcast buffer; slow receivers lag rather than block senders.
const NOTIFICATION_BUFFER: usize = 256;

/// How prominently a notification should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

impl From<Severity> for NotificationLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical | Severity::High => NotificationLevel::Error,
            Severity::Medium => NotificationLevel::Warning,
            Severity::Low => NotificationLevel::Info,
        }
    }
}

/// A notification emitted by the sync layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A new alert (pushed or synthesized from a regression) arrived
    Alert {
        level: NotificationLevel,
        severity: Severity,
        pop_code: String,
        message: String,
    },
    /// Reconnection attempts were exhausted
    ConnectionLost { attempts: u32 },
    /// The connection moved to a new state
    StateChanged { state: ConnectionState },
}

/// Cloneable handle for publishing and subscribing to notifications.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publishes a notification. Returns the number of receivers reached.
    pub fn publish(&self, notification: Notification) -> usize {
        // Ignore error if no receivers are listening
        self.sender.send(notification).unwrap_or(0)
    }

    pub fn alert(&self, severity: Severity, pop_code: &str, message: &str) -> usize {
        self.publish(Notification::Alert {
            level: severity.into(),
            severity,
            pop_code: pop_code.to_string(),
            message: message.to_string(),
        })
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
