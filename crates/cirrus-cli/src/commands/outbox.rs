use serde::Serialize;
use std::sync::Arc;

use cirrus_core::ReqwestHttpClient;
use cirrus_outbox::{
    AlertPublisher, HttpBroker, InMemoryBroker, MessageBroker, Outbox, OutboxConfig,
    PublisherConfig,
};

use crate::cli::{Cli, DrainArgs};
use crate::error::CliError;

use super::render;

#[derive(Debug, Serialize)]
struct DrainResponseData {
    published: usize,
    failed: usize,
    skipped: usize,
}

#[derive(Debug, Serialize)]
struct StatusResponseData {
    pending: u64,
    sent: u64,
    failed: u64,
}

pub async fn drain(cli: &Cli, args: &DrainArgs) -> Result<(), CliError> {
    let outbox = Arc::new(
        Outbox::new(OutboxConfig {
            url: cli.db.clone(),
        })
        .await?,
    );

    let broker: Arc<dyn MessageBroker> = match &args.broker_url {
        Some(url) => Arc::new(HttpBroker::new(Arc::new(ReqwestHttpClient::new()), url)),
        None => InMemoryBroker::new(),
    };

    let publisher = AlertPublisher::new(
        outbox,
        broker,
        PublisherConfig {
            batch_size: args.batch_size,
            ..PublisherConfig::default()
        },
    );
    let report = publisher.drain().await?;

    render(
        &DrainResponseData {
            published: report.published,
            failed: report.failed,
            skipped: report.skipped,
        },
        cli.pretty,
    )
}

pub async fn status(cli: &Cli) -> Result<(), CliError> {
    let outbox = Outbox::new(OutboxConfig {
        url: cli.db.clone(),
    })
    .await?;
    let counts = outbox.status_counts().await?;

    render(
        &StatusResponseData {
            pending: counts.pending,
            sent: counts.sent,
            failed: counts.failed,
        },
        cli.pretty,
    )
}
