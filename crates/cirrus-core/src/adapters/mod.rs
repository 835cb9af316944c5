//! Upstream provider adapters.
//!
//! Each adapter speaks one upstream dialect and returns the canonical
//! [`RawForecastItem`](crate::domain::RawForecastItem) shape. Failures are
//! absorbed here: a caller only ever sees a possibly-empty list.

mod kma;
mod openweather;

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::UtcOffset;

pub use kma::KmaAdapter;
pub use openweather::OpenWeatherAdapter;

use crate::http_client::ReqwestHttpClient;
use crate::provider::{ForecastProvider, ProviderId};

/// Why an upstream call produced no data. Never escapes the adapter
/// boundary; logged and collapsed into an empty result.
#[derive(Debug, Error)]
pub(crate) enum UpstreamError {
    #[error("rate budget exhausted; retry in {seconds:.2}s", seconds = .0.as_secs_f64())]
    Throttled(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("upstream envelope rejected the request: {0}")]
    Envelope(String),
    #[error("malformed upstream body: {0}")]
    Malformed(String),
}

/// Builder assembling the configured provider set.
///
/// API keys come from the environment (`CIRRUS_KMA_API_KEY` /
/// `KMA_API_KEY`, `CIRRUS_OPENWEATHER_API_KEY` / `OPENWEATHER_API_KEY`)
/// unless set explicitly. A provider without a key runs in deterministic
/// mock mode.
#[derive(Debug, Default)]
pub struct ProviderSetBuilder {
    use_mock: bool,
    kma_api_key: Option<String>,
    openweather_api_key: Option<String>,
    utc_offset: Option<UtcOffset>,
}

impl ProviderSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All providers fabricate deterministic data; no network calls.
    pub fn with_mock_mode(mut self) -> Self {
        self.use_mock = true;
        self
    }

    /// Read API keys from the environment and use real transports where a
    /// key is present.
    pub fn with_real_clients(mut self) -> Self {
        self.use_mock = false;
        self.kma_api_key = env::var("CIRRUS_KMA_API_KEY")
            .or_else(|_| env::var("KMA_API_KEY"))
            .ok();
        self.openweather_api_key = env::var("CIRRUS_OPENWEATHER_API_KEY")
            .or_else(|_| env::var("OPENWEATHER_API_KEY"))
            .ok();
        self
    }

    pub fn with_kma_key(mut self, key: impl Into<String>) -> Self {
        self.kma_api_key = Some(key.into());
        self
    }

    pub fn with_openweather_key(mut self, key: impl Into<String>) -> Self {
        self.openweather_api_key = Some(key.into());
        self
    }

    /// Civil zone the lat/lon-based upstream's timestamps are converted to.
    pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }

    pub fn build(self) -> ProviderSet {
        let offset = self.utc_offset.unwrap_or(UtcOffset::UTC);
        let mut providers: HashMap<ProviderId, Arc<dyn ForecastProvider>> = HashMap::new();

        let kma: Arc<dyn ForecastProvider> = match (self.use_mock, self.kma_api_key) {
            (false, Some(key)) => Arc::new(KmaAdapter::with_http_client(
                Arc::new(ReqwestHttpClient::new()),
                key,
            )),
            _ => Arc::new(KmaAdapter::default()),
        };
        providers.insert(ProviderId::Kma, kma);

        let openweather: Arc<dyn ForecastProvider> =
            match (self.use_mock, self.openweather_api_key) {
                (false, Some(key)) => Arc::new(
                    OpenWeatherAdapter::with_http_client(Arc::new(ReqwestHttpClient::new()), key)
                        .with_utc_offset(offset),
                ),
                _ => Arc::new(OpenWeatherAdapter::default().with_utc_offset(offset)),
            };
        providers.insert(ProviderId::OpenWeather, openweather);

        ProviderSet { providers }
    }
}

/// Registry of configured providers, selected by id.
pub struct ProviderSet {
    providers: HashMap<ProviderId, Arc<dyn ForecastProvider>>,
}

impl ProviderSet {
    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn ForecastProvider>> {
        self.providers.get(&id).cloned()
    }
}

/// Deterministic seed for mock payload generation.
pub(crate) fn grid_seed(nx: i32, ny: i32) -> u64 {
    let mut seed = 17_u64;
    for part in [nx as i64, ny as i64] {
        seed = seed
            .wrapping_mul(31)
            .wrapping_add(part.unsigned_abs());
    }
    seed
}
