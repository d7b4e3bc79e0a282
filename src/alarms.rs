// File: src/alarms.rs
// Threshold alerts raised by the publish loop and the sinks that surface them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

/// A reading that reached the configured threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    /// Reading that triggered the alert (ppm)
    pub value: i64,

    /// Threshold in effect for the session
    pub threshold: i64,

    /// Topic the reading was published to
    pub topic: String,

    /// Operator-facing text
    pub message: String,

    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(value: i64, threshold: i64, topic: impl Into<String>) -> Self {
        Self {
            value,
            threshold,
            topic: topic.into(),
            message: format!("CO2 level has reached {} ppm, exceeding the limit!", value),
            raised_at: Utc::now(),
        }
    }

    /// Alert for `value`, if it is at or above `threshold`.
    pub fn check(value: i64, threshold: i64, topic: &str) -> Option<Self> {
        (value >= threshold).then(|| Self::new(value, threshold, topic))
    }
}

/// Receives alerts from the publish loop.
///
/// Called on the loop's task, so implementations must not block.
pub trait AlertSink: Send + Sync {
    fn raise(&self, alert: &Alert);
}

/// Writes alerts to the log at warn level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn raise(&self, alert: &Alert) {
        warn!(value = alert.value, threshold = alert.threshold, "{}", alert.message);
    }
}

/// Forwards alerts to a front end over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelAlertSink {
    tx: mpsc::UnboundedSender<Alert>,
}

impl ChannelAlertSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelAlertSink {
    fn raise(&self, alert: &Alert) {
        // Receiver gone means the front end is shutting down
        let _ = self.tx.send(alert.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_message_names_value() {
        let alert = Alert::new(6009, 6000, "classe/hayder/co2");
        assert_eq!(alert.message, "CO2 level has reached 6009 ppm, exceeding the limit!");
        assert_eq!(alert.topic, "classe/hayder/co2");
    }

    #[test]
    fn test_check_is_inclusive() {
        assert!(Alert::check(5999, 6000, "t").is_none());
        assert_eq!(Alert::check(6000, 6000, "t").map(|a| a.value), Some(6000));
        assert_eq!(Alert::check(6010, 6000, "t").map(|a| a.value), Some(6010));
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelAlertSink::channel();
        sink.raise(&Alert::new(7000, 6000, "t"));
        let alert = rx.try_recv().unwrap();
        assert_eq!(alert.value, 7000);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, rx) = ChannelAlertSink::channel();
        drop(rx);
        sink.raise(&Alert::new(7000, 6000, "t"));
    }
}
