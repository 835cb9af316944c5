use serde::Serialize;

use cirrus_core::CanonicalWeatherRecord;

use crate::cli::{Cli, ForecastArgs};
use crate::error::CliError;

use super::{reconciled_records, render};

#[derive(Debug, Serialize)]
struct ForecastResponseData {
    location: String,
    records: Vec<CanonicalWeatherRecord>,
}

pub async fn run(cli: &Cli, args: &ForecastArgs) -> Result<(), CliError> {
    let (location, records) = reconciled_records(cli, args).await?;

    render(
        &ForecastResponseData {
            location: location.name.clone(),
            records,
        },
        cli.pretty,
    )
}
