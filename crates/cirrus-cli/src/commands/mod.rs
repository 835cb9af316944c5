mod alerts;
mod forecast;
mod outbox;

use cirrus_core::{
    CanonicalWeatherRecord, ForecastFetcher, ForecastProvider, IssuanceCache, Location, ProviderId,
    ProviderSetBuilder, SystemClock,
};
use std::sync::Arc;
use time::UtcOffset;

use crate::cli::{Cli, Command, ForecastArgs, OutboxCommand, ProviderSelector};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Forecast(args) => forecast::run(cli, args).await,
        Command::Alerts(args) => alerts::run(cli, args).await,
        Command::Outbox(args) => match &args.command {
            OutboxCommand::Drain(drain_args) => outbox::drain(cli, drain_args).await,
            OutboxCommand::Status => outbox::status(cli).await,
        },
    }
}

pub(crate) fn civil_offset(cli: &Cli) -> Result<UtcOffset, CliError> {
    UtcOffset::from_hms(cli.utc_offset_hours, 0, 0)
        .map_err(|_| CliError::Command(format!("invalid utc offset {}", cli.utc_offset_hours)))
}

pub(crate) fn select_provider(
    cli: &Cli,
    selector: ProviderSelector,
    offset: UtcOffset,
) -> Result<Arc<dyn ForecastProvider>, CliError> {
    let builder = if cli.mock {
        ProviderSetBuilder::new().with_mock_mode()
    } else {
        ProviderSetBuilder::new().with_real_clients()
    };
    let providers = builder.with_utc_offset(offset).build();

    let id = match selector {
        ProviderSelector::Kma => ProviderId::Kma,
        ProviderSelector::Openweather => ProviderId::OpenWeather,
    };
    providers
        .get(id)
        .ok_or_else(|| CliError::Command(format!("provider {id} is not configured")))
}

/// Shared fetch + reconcile pipeline behind `forecast` and `alerts`.
pub(crate) async fn reconciled_records(
    cli: &Cli,
    args: &ForecastArgs,
) -> Result<(Location, Vec<CanonicalWeatherRecord>), CliError> {
    let offset = civil_offset(cli)?;
    let provider = select_provider(cli, args.provider, offset)?;
    let location = Location::new(args.location_id, &args.name, args.lat, args.lon, offset)?;

    let fetcher = ForecastFetcher::new(
        provider.clone(),
        IssuanceCache::with_default_ttl(),
        SystemClock,
    );
    let outcome = fetcher.fetch(&location).await;
    tracing::debug!(
        items = outcome.items.len(),
        attempted = outcome.attempted.len(),
        "fetch pass complete"
    );

    let records = cirrus_core::Reconciler::for_provider(provider.as_ref()).reconcile(
        &location,
        &outcome.items,
        time::OffsetDateTime::now_utc(),
    );
    Ok((location, records))
}

pub(crate) fn render<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
