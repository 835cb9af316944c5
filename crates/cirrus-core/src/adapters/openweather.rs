use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use time::{OffsetDateTime, Time, UtcOffset};

use crate::adapters::{grid_seed, UpstreamError};
use crate::domain::{Category, ForecastSlotKey, GridPoint, Issuance, RawForecastItem};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{FetchFuture, ForecastProvider, ProviderId};
use crate::throttling::ThrottlingQueue;

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
const REQUEST_TIMEOUT_MS: u64 = 5_000;
const ENTRY_HOURS: f64 = 3.0;

/// Three-hour cadence: widen the prior-day probe in three-hour steps.
const NEIGHBOR_OFFSETS: [i64; 8] = [3, -3, 6, -6, 9, -9, 12, -12];

/// Lat/lon-based forecast adapter (provider B).
///
/// Serves timestamped three-hourly entries which are exploded into the
/// canonical category/date/time/value item shape before merging. There is
/// no bulletin concept upstream, so the sole issuance candidate is "now"
/// truncated to the hour, and no historical backfill exists.
#[derive(Clone)]
pub struct OpenWeatherAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    throttling: ThrottlingQueue,
    utc_offset: UtcOffset,
    use_real_api: bool,
}

impl Default for OpenWeatherAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            api_key: std::env::var("CIRRUS_OPENWEATHER_API_KEY")
                .unwrap_or_else(|_| String::from("demo")),
            throttling: ThrottlingQueue::new(Duration::from_secs(60), 60),
            utc_offset: UtcOffset::UTC,
            use_real_api: false,
        }
    }
}

impl OpenWeatherAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            api_key: api_key.into(),
            use_real_api,
            ..Self::default()
        }
    }

    /// Civil zone entry timestamps are converted into before slotting.
    pub fn with_utc_offset(mut self, utc_offset: UtcOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    async fn try_fetch(
        &self,
        lat: f64,
        lon: f64,
        issuance: Issuance,
        grid: GridPoint,
    ) -> Result<Vec<RawForecastItem>, UpstreamError> {
        if let Err(delay) = self.throttling.acquire() {
            return Err(UpstreamError::Throttled(delay));
        }

        let url = format!(
            "{BASE_URL}?lat={lat}&lon={lon}&units=metric&appid={}",
            urlencoding::encode(&self.api_key)
        );
        let request = HttpRequest::get(url).with_timeout_ms(REQUEST_TIMEOUT_MS);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| UpstreamError::Transport(error.message().to_owned()))?;
        if !response.is_success() {
            return Err(UpstreamError::Status(response.status));
        }

        let envelope: OwEnvelope = serde_json::from_str(&response.body)
            .map_err(|error| UpstreamError::Malformed(error.to_string()))?;
        if let Some(code) = envelope.cod.as_ref() {
            let ok = code.as_str() == Some("200") || code.as_u64() == Some(200);
            if !ok {
                return Err(UpstreamError::Envelope(code.to_string()));
            }
        }

        let mut items = Vec::new();
        for entry in envelope.list {
            self.explode_entry(&entry, issuance, grid, &mut items);
        }
        Ok(items)
    }

    /// One upstream entry becomes one item per canonical category.
    fn explode_entry(
        &self,
        entry: &OwEntry,
        issuance: Issuance,
        grid: GridPoint,
        items: &mut Vec<RawForecastItem>,
    ) {
        let Ok(at) = OffsetDateTime::from_unix_timestamp(entry.dt) else {
            return;
        };
        let local = at.to_offset(self.utc_offset);
        let Ok(slot_time) = Time::from_hms(local.hour(), 0, 0) else {
            return;
        };
        let slot = ForecastSlotKey::new(local.date(), slot_time);

        let mut push = |category: Category, value: String| {
            items.push(RawForecastItem::new(category, slot, issuance, value, grid));
        };

        push(Category::Temperature, format!("{:.1}", entry.main.temp));
        push(Category::DailyMax, format!("{:.1}", entry.main.temp_max));
        push(Category::DailyMin, format!("{:.1}", entry.main.temp_min));
        push(Category::Humidity, format!("{:.0}", entry.main.humidity));
        if let Some(wind) = &entry.wind {
            push(Category::WindSpeed, format!("{:.1}", wind.speed));
        }
        if let Some(pop) = entry.pop {
            push(
                Category::PrecipitationProbability,
                format!("{:.0}", pop * 100.0),
            );
        }

        let condition = entry.weather.first().map(|w| w.id).unwrap_or(800);
        let (sky_code, precipitation_code) = map_condition(condition);
        push(Category::Sky, sky_code.to_string());
        push(Category::PrecipitationType, precipitation_code.to_string());

        let volume = entry
            .rain
            .as_ref()
            .and_then(|v| v.three_hour)
            .or_else(|| entry.snow.as_ref().and_then(|v| v.three_hour))
            .unwrap_or(0.0);
        push(
            Category::PrecipitationAmount,
            format!("{:.1}", volume / ENTRY_HOURS),
        );
    }

    /// Deterministic three-hourly entries for offline runs.
    fn mock_items(&self, grid: GridPoint, issuance: Issuance) -> Vec<RawForecastItem> {
        let seed = grid_seed(grid.nx, grid.ny).wrapping_add(u64::from(issuance.date.ordinal()));
        let start = OffsetDateTime::new_in_offset(issuance.date, issuance.time, self.utc_offset);
        let mut items = Vec::new();

        for step in 0..40_i64 {
            let at = start + time::Duration::hours(3 * (step + 1));
            let mix = seed.wrapping_add(step as u64);

            let temperature = 11.0 + (mix.wrapping_mul(13) % 160) as f64 / 10.0;
            let entry = OwEntry {
                dt: at.unix_timestamp(),
                main: OwMain {
                    temp: temperature,
                    temp_max: temperature + 1.5,
                    temp_min: temperature - 1.5,
                    humidity: (35 + mix % 55) as f64,
                },
                weather: vec![OwWeather {
                    id: [800, 802, 804, 500][(mix % 4) as usize],
                }],
                wind: Some(OwWind {
                    speed: (mix.wrapping_mul(17) % 110) as f64 / 10.0,
                }),
                pop: Some((mix % 10) as f64 / 10.0),
                rain: if mix % 4 == 3 {
                    Some(OwVolume {
                        three_hour: Some(1.8),
                    })
                } else {
                    None
                },
                snow: None,
            };
            self.explode_entry(&entry, issuance, grid, &mut items);
        }

        items
    }
}

impl ForecastProvider for OpenWeatherAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    fn issuance_candidates(&self, now: OffsetDateTime) -> Vec<Issuance> {
        let truncated = Time::from_hms(now.time().hour(), 0, 0)
            .unwrap_or(Time::MIDNIGHT);
        vec![Issuance::new(now.date(), truncated)]
    }

    fn backfill_candidates(&self, _now: OffsetDateTime) -> Vec<Issuance> {
        Vec::new()
    }

    fn neighbor_offsets(&self) -> &'static [i64] {
        &NEIGHBOR_OFFSETS
    }

    fn fetch_grid<'a>(&'a self, grid: GridPoint, issuance: Issuance) -> FetchFuture<'a> {
        Box::pin(async move {
            let (lat, lon) = grid.to_lat_lon();
            self.fetch_lat_lon(lat, lon, issuance).await
        })
    }

    fn fetch_lat_lon<'a>(&'a self, lat: f64, lon: f64, issuance: Issuance) -> FetchFuture<'a> {
        Box::pin(async move {
            let grid = match GridPoint::from_lat_lon(lat, lon) {
                Ok(grid) => grid,
                Err(error) => {
                    tracing::warn!(provider = "openweather", %error, "coordinate rejected");
                    return Vec::new();
                }
            };

            if !self.use_real_api {
                return self.mock_items(grid, issuance);
            }
            match self.try_fetch(lat, lon, issuance, grid).await {
                Ok(items) => items,
                Err(error) => {
                    tracing::warn!(
                        provider = "openweather",
                        %issuance,
                        grid = %grid,
                        %error,
                        "fetch absorbed into empty result"
                    );
                    Vec::new()
                }
            }
        })
    }
}

/// Upstream condition id to canonical (sky, precipitation) codes.
fn map_condition(id: i64) -> (i32, i32) {
    match id {
        800 => (1, 0),
        801 | 802 => (3, 0),
        803 | 804 => (4, 0),
        200..=299 => (4, 4),
        300..=399 => (4, 1),
        511 => (4, 2),
        500..=599 => (4, 1),
        611..=616 => (4, 2),
        600..=699 => (4, 3),
        700..=799 => (4, 0),
        _ => (4, 0),
    }
}

#[derive(Debug, Deserialize)]
struct OwEnvelope {
    #[serde(default)]
    cod: Option<serde_json::Value>,
    #[serde(default)]
    list: Vec<OwEntry>,
}

#[derive(Debug, Deserialize)]
struct OwEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: Option<OwWind>,
    #[serde(default)]
    pop: Option<f64>,
    #[serde(default)]
    rain: Option<OwVolume>,
    #[serde(default)]
    snow: Option<OwVolume>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwVolume {
    #[serde(rename = "3h", default)]
    three_hour: Option<f64>,
}
