//! # Cirrus Outbox
//!
//! Sqlite-backed storage and at-least-once alert delivery for Cirrus.
//!
//! ## Overview
//!
//! Reconciled weather records and their alert candidates are persisted
//! in a single transaction (the outbox pattern), then a publisher
//! drains pending alerts to a broker:
//!
//! - **`Outbox`**: weather record upserts plus the alert outbox table
//! - **`AlertPublisher`**: claims pending rows, publishes with retry,
//!   dead-letters exhausted rows
//! - **`MessageBroker`**: delivery trait with in-memory and HTTP
//!   implementations
//!
//! ## Delivery Semantics
//!
//! Rows move `PENDING -> SENT` or `PENDING -> FAILED` exactly once, via
//! optimistic updates guarded on the current status. A crash after the
//! broker accepted a message but before the row was marked re-delivers
//! it on the next drain, so consumers dedupe by alert id.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cirrus_outbox::{AlertPublisher, InMemoryBroker, Outbox, OutboxConfig, PublisherConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let outbox = Arc::new(Outbox::new(OutboxConfig::in_memory()).await?);
//!     let broker = InMemoryBroker::new();
//!
//!     let publisher = AlertPublisher::new(outbox, broker, PublisherConfig::default());
//!     let report = publisher.drain().await?;
//!     println!("published {}", report.published);
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod error;
pub mod models;
pub mod publisher;
pub mod repository;
pub mod retry;

pub use broker::{HttpBroker, InMemoryBroker, MessageBroker, PublishFuture, PublishedMessage};
pub use error::{BrokerError, OutboxError};
pub use models::{AlertMessage, AlertRow, AlertStatus, WeatherRow};
pub use publisher::{AlertPublisher, DrainReport, PublisherConfig};
pub use repository::{Outbox, OutboxConfig, StatusCounts};
pub use retry::Backoff;
