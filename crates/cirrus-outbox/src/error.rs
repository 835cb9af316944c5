use thiserror::Error;

/// Errors from the outbox storage layer.
#[derive(Error, Debug)]
pub enum OutboxError {
    #[error("database connection error: {0}")]
    ConnectionError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("alert not found: {0}")]
    AlertNotFound(String),

    #[error("invalid outbox row: {0}")]
    InvalidRow(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by a message broker implementation.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("publish rejected: {0}")]
    Rejected(String),

    #[error("publish timed out")]
    Timeout,
}
