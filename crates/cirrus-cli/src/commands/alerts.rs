use serde::Serialize;
use std::sync::Arc;

use cirrus_core::AlertCandidate;
use cirrus_outbox::{Outbox, OutboxConfig};

use crate::cli::{Cli, ForecastArgs};
use crate::error::CliError;

use super::{reconciled_records, render};

#[derive(Debug, Serialize)]
struct AlertsResponseData {
    location: String,
    records_stored: usize,
    alerts_enqueued: usize,
    alerts: Vec<AlertCandidate>,
}

pub async fn run(cli: &Cli, args: &ForecastArgs) -> Result<(), CliError> {
    let (location, records) = reconciled_records(cli, args).await?;

    let candidates = cirrus_core::rules::evaluate(
        &location,
        &records,
        time::OffsetDateTime::now_utc(),
    );

    let outbox = Arc::new(
        Outbox::new(OutboxConfig {
            url: cli.db.clone(),
        })
        .await?,
    );
    outbox.record_pass(&records, &candidates).await?;

    render(
        &AlertsResponseData {
            location: location.name.clone(),
            records_stored: records.len(),
            alerts_enqueued: candidates.len(),
            alerts: candidates,
        },
        cli.pretty,
    )
}
