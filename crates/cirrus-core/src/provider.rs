//! Provider contract.
//!
//! Every upstream forecast source implements [`ForecastProvider`] and hands
//! back the same canonical item shape, so selection and reconciliation never
//! branch on which upstream produced the data.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{GridPoint, Issuance, RawForecastItem};
use crate::ValidationError;

/// Registered upstream identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Kma,
    OpenWeather,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kma => "kma",
            Self::OpenWeather => "openweather",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "kma" => Ok(Self::Kma),
            "openweather" => Ok(Self::OpenWeather),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Vec<RawForecastItem>> + Send + 'a>>;

/// Upstream forecast source contract.
///
/// Failure semantics are part of the contract: transport errors, malformed
/// bodies, and non-success envelopes all collapse to an empty list at this
/// boundary. Callers treat empty as "no data", never as an error.
///
/// Implementations must be `Send + Sync`; they are stateless with respect to
/// coordinates and safe to call concurrently for different cells.
pub trait ForecastProvider: Send + Sync {
    /// Unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Usable issuances for "now", newest first. When "now" precedes the
    /// earliest bulletin of the day, the list starts from the previous day's
    /// latest issuance.
    fn issuance_candidates(&self, now: OffsetDateTime) -> Vec<Issuance>;

    /// Yesterday's issuances usable for delta backfill, newest first.
    /// Providers without historical access return an empty list.
    fn backfill_candidates(&self, now: OffsetDateTime) -> Vec<Issuance>;

    /// Hour offsets probed (in order) when the prior-day slot has no value
    /// at the exact time-of-day. Provider-specific because cadences differ.
    fn neighbor_offsets(&self) -> &'static [i64];

    /// Fetch the bulletin for a grid cell. Every returned item is stamped
    /// with `issuance`.
    fn fetch_grid<'a>(&'a self, grid: GridPoint, issuance: Issuance) -> FetchFuture<'a>;

    /// Lat/lon fetch form; reprojects onto the grid and delegates.
    fn fetch_lat_lon<'a>(&'a self, lat: f64, lon: f64, issuance: Issuance) -> FetchFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_round_trip() {
        for id in [ProviderId::Kma, ProviderId::OpenWeather] {
            assert_eq!(ProviderId::parse(id.as_str()).expect("known id"), id);
        }
        assert!(ProviderId::parse("accuweather").is_err());
    }
}
