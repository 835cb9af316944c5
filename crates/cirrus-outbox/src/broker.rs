//! Message broker abstraction for alert delivery.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use cirrus_core::{HttpClient, HttpRequest};

use super::error::BrokerError;

pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + 'a>>;

/// Downstream message broker. Publishes are keyed so consumers can
/// partition per location.
pub trait MessageBroker: Send + Sync {
    fn publish<'a>(&'a self, topic: &'a str, key: &'a str, payload: &'a [u8]) -> PublishFuture<'a>;
}

/// One message as recorded by the in-memory broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// In-process broker for tests and mock mode. Records every accepted
/// publish and can be told to fail the next N attempts.
#[derive(Default)]
pub struct InMemoryBroker {
    messages: Mutex<Vec<PublishedMessage>>,
    fail_remaining: AtomicU32,
}

impl InMemoryBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `count` publish calls fail with `Unavailable`.
    pub fn fail_times(&self, count: u32) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn messages_on(&self, topic: &str) -> Vec<PublishedMessage> {
        self.messages()
            .into_iter()
            .filter(|message| message.topic == topic)
            .collect()
    }
}

impl MessageBroker for InMemoryBroker {
    fn publish<'a>(&'a self, topic: &'a str, key: &'a str, payload: &'a [u8]) -> PublishFuture<'a> {
        Box::pin(async move {
            let remaining = self.fail_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
                return Err(BrokerError::Unavailable(String::from("simulated outage")));
            }

            if let Ok(mut messages) = self.messages.lock() {
                messages.push(PublishedMessage {
                    topic: topic.to_string(),
                    key: key.to_string(),
                    payload: payload.to_vec(),
                });
            }
            Ok(())
        })
    }
}

/// Broker that posts each message to an HTTP endpoint, one request per
/// publish. The topic and key travel as headers.
pub struct HttpBroker {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
}

impl HttpBroker {
    pub fn new(http_client: Arc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }
}

impl MessageBroker for HttpBroker {
    fn publish<'a>(&'a self, topic: &'a str, key: &'a str, payload: &'a [u8]) -> PublishFuture<'a> {
        Box::pin(async move {
            let body = String::from_utf8_lossy(payload).into_owned();
            let request = HttpRequest::post(&self.endpoint)
                .with_header("content-type", "application/json")
                .with_header("x-cirrus-topic", topic)
                .with_header("x-cirrus-key", key)
                .with_body(body);

            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

            if response.is_success() {
                Ok(())
            } else {
                Err(BrokerError::Rejected(format!(
                    "endpoint returned status {}",
                    response.status
                )))
            }
        })
    }
}
