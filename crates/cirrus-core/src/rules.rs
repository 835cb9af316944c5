//! Threshold alert rules.
//!
//! Pure evaluation over reconciled records. Records are grouped by their
//! local calendar date and each rule fires at most once per date, so a
//! single pass yields between zero and three candidates per date.

use std::collections::BTreeMap;

use time::{Date, OffsetDateTime};

use crate::domain::{AlertCandidate, AlertType, CanonicalWeatherRecord, Location, WindCategory};

/// Absolute day-over-day temperature swing that triggers an alert, degrees.
pub const TEMPERATURE_DELTA_THRESHOLD: f64 = 1.0;

/// Hourly precipitation that triggers an alert, mm.
pub const PRECIPITATION_THRESHOLD_MM: f64 = 5.0;

/// Evaluate every rule against every record and return the candidates.
///
/// `now` stamps `created_at`; evaluation itself depends only on the
/// record contents.
pub fn evaluate(
    location: &Location,
    records: &[CanonicalWeatherRecord],
    now: OffsetDateTime,
) -> Vec<AlertCandidate> {
    let mut by_date: BTreeMap<Date, Vec<&CanonicalWeatherRecord>> = BTreeMap::new();
    for record in records {
        by_date
            .entry(record.forecast_at.to_offset(location.utc_offset).date())
            .or_default()
            .push(record);
    }

    let mut candidates = Vec::new();
    for (date, day_records) in &by_date {
        if let Some(trigger) = day_records
            .iter()
            .find(|record| record.temperature_delta_vs_yesterday.abs() >= TEMPERATURE_DELTA_THRESHOLD)
        {
            candidates.push(AlertCandidate::new(
                location.id,
                AlertType::TemperatureChange,
                format!(
                    "{}: temperature on {} swings {:+.1} degrees versus yesterday",
                    location.name, date, trigger.temperature_delta_vs_yesterday,
                ),
                now,
            ));
        }

        if day_records
            .iter()
            .any(|record| record.wind_category == WindCategory::Strong)
        {
            candidates.push(AlertCandidate::new(
                location.id,
                AlertType::WindChange,
                format!("{}: strong wind expected on {}", location.name, date),
                now,
            ));
        }

        if let Some(trigger) = day_records
            .iter()
            .find(|record| record.precipitation_amount >= PRECIPITATION_THRESHOLD_MM)
        {
            candidates.push(AlertCandidate::new(
                location.id,
                AlertType::PrecipitationChange,
                format!(
                    "{}: precipitation on {} reaches {:.1} mm/h",
                    location.name, date, trigger.precipitation_amount,
                ),
                now,
            ));
        }
    }

    candidates
}
