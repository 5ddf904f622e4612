//! Notification dispatch collaborator.
//!
//! The reservation engine emits notification events (booking confirmed,
//! cancelled, updated, ride completed) to a Kafka topic; rendering and
//! delivery (email/SMS/push) happen downstream and outside this service.
//! Dispatch is strictly fire-and-forget: a failed publish is logged and
//! never fails the business operation that triggered it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Which message the delivery pipeline should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    ReservationConfirmed,
    ReservationCancelled,
    ReservationUpdated,
    ReservationCompleted,
}

/// One notification event as published to the topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient address (email), resolved by the caller.
    pub recipient: String,
    pub template: Template,
    /// Template variables (names, car, date range, ...).
    pub data: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient: impl Into<String>, template: Template, data: serde_json::Value) -> Self {
        Self {
            recipient: recipient.into(),
            template,
            data,
            sent_at: Utc::now(),
        }
    }
}

/// Contract the services dispatch through.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish one notification event. Callers treat failures as
    /// best-effort: log and move on.
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Kafka-backed [`Notifier`].
pub struct KafkaNotifier {
    producer: FutureProducer,
    topic: String,
}

impl KafkaNotifier {
    /// Create a producer for the given brokers and topic.
    pub fn new(brokers: &[String], topic: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("message.timeout.ms", "5000")
            .create()
            .context("Failed to create Kafka producer")?;

        info!(topic = %topic, "Notification producer initialized");

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for KafkaNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        let data = serde_json::to_string(&notification)
            .context("Failed to serialize notification to JSON")?;

        let record = FutureRecord::to(&self.topic)
            .key(&notification.recipient)
            .payload(&data);

        match self
            .producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(kafka_err, _)| anyhow::anyhow!("Kafka error: {kafka_err:?}"))
        {
            Ok(_) => {
                info!(
                    recipient = %notification.recipient,
                    template = ?notification.template,
                    "Notification published"
                );
                Ok(())
            }
            Err(e) => {
                error!(error = ?e, "Failed to publish notification");
                Err(e)
            }
        }
    }
}

/// Fallback [`Notifier`] used when no broker is configured or reachable:
/// events are logged instead of published, so the core flows stay usable
/// in development.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        info!(
            recipient = %notification.recipient,
            template = ?notification.template,
            data = %notification.data,
            "Notification (log-only)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_serializes_with_snake_case_template() {
        let notification = Notification::new(
            "customer@example.com",
            Template::ReservationConfirmed,
            serde_json::json!({"carName": "Swift", "startDate": "2024-06-01"}),
        );
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["recipient"], "customer@example.com");
        assert_eq!(json["template"], "reservation_confirmed");
        assert_eq!(json["data"]["carName"], "Swift");
    }

    #[test]
    fn test_notification_round_trip() {
        let notification = Notification::new(
            "owner@example.com",
            Template::ReservationCancelled,
            serde_json::json!({"carName": "Polo"}),
        );
        let json = serde_json::to_string(&notification).unwrap();
        let parsed: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.recipient, notification.recipient);
        assert_eq!(parsed.template, Template::ReservationCancelled);
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = LogNotifier;
        let result = notifier
            .notify(Notification::new(
                "someone@example.com",
                Template::ReservationCompleted,
                serde_json::json!({}),
            ))
            .await;
        assert!(result.is_ok());
    }
}
