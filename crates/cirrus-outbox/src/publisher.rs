//! At-least-once alert publisher.
//!
//! Drains pending outbox rows to the broker. A row is only marked SENT
//! after the broker accepts it, so a crash between publish and mark
//! re-delivers on the next drain. Consumers must dedupe by alert id.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::broker::MessageBroker;
use super::error::OutboxError;
use super::models::AlertMessage;
use super::repository::Outbox;
use super::retry::Backoff;

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub topic: String,
    pub dead_letter_topic: String,
    /// Broker attempts per alert within one drain, including the first.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Rows claimed per drain call.
    pub batch_size: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: String::from("weather.alerts"),
            dead_letter_topic: String::from("weather.alerts.dlq"),
            max_attempts: 3,
            backoff: Backoff::Fixed {
                delay: Duration::from_millis(500),
            },
            batch_size: 100,
        }
    }
}

/// Outcome of one drain call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Rows delivered and marked SENT.
    pub published: usize,
    /// Rows that exhausted their attempts and were marked FAILED.
    pub failed: usize,
    /// Rows another worker claimed first.
    pub skipped: usize,
}

pub struct AlertPublisher {
    outbox: Arc<Outbox>,
    broker: Arc<dyn MessageBroker>,
    config: PublisherConfig,
}

impl AlertPublisher {
    pub fn new(outbox: Arc<Outbox>, broker: Arc<dyn MessageBroker>, config: PublisherConfig) -> Self {
        Self {
            outbox,
            broker,
            config,
        }
    }

    /// Publish one batch of pending alerts and settle each row.
    pub async fn drain(&self) -> Result<DrainReport, OutboxError> {
        let pending = self.outbox.fetch_pending(self.config.batch_size).await?;
        let mut report = DrainReport::default();

        for row in pending {
            let message = AlertMessage::from_row(&row);
            let payload = match serde_json::to_vec(&message) {
                Ok(payload) => payload,
                Err(error) => {
                    // A row that cannot serialize will never deliver.
                    warn!(alert_id = %row.id, %error, "unserializable alert, failing row");
                    self.outbox.mark_failed(&row.id).await?;
                    report.failed += 1;
                    continue;
                }
            };
            let key = row.location_id.to_string();

            if self.publish_with_retry(&key, &payload).await {
                if self.outbox.mark_sent(&row.id).await? {
                    debug!(alert_id = %row.id, "alert published");
                    report.published += 1;
                } else {
                    report.skipped += 1;
                }
                continue;
            }

            // Exhausted. Dead-letter is best effort; the FAILED row
            // remains the durable trace either way.
            if let Err(error) = self
                .broker
                .publish(&self.config.dead_letter_topic, &key, &payload)
                .await
            {
                warn!(alert_id = %row.id, %error, "dead-letter publish failed");
            }
            if self.outbox.mark_failed(&row.id).await? {
                report.failed += 1;
            } else {
                report.skipped += 1;
            }
        }

        Ok(report)
    }

    async fn publish_with_retry(&self, key: &str, payload: &[u8]) -> bool {
        for attempt in 0..self.config.max_attempts {
            match self.broker.publish(&self.config.topic, key, payload).await {
                Ok(()) => return true,
                Err(error) => {
                    warn!(%key, attempt, %error, "broker publish failed");
                    if attempt + 1 < self.config.max_attempts {
                        tokio::time::sleep(self.config.backoff.delay(attempt)).await;
                    }
                }
            }
        }
        false
    }
}
