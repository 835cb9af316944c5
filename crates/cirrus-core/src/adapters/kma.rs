use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use time::{OffsetDateTime, Time, UtcOffset};

use crate::adapters::{grid_seed, UpstreamError};
use crate::domain::{
    format_compact_date, format_compact_time, parse_compact_date, parse_compact_time, Category,
    ForecastSlotKey, GridPoint, Issuance, RawForecastItem,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{FetchFuture, ForecastProvider, ProviderId};
use crate::throttling::ThrottlingQueue;

const BASE_URL: &str = "https://apis.data.go.kr/1360000/VilageFcstInfoService_2.0";
const PAGE_SIZE: u32 = 1_000;
const REQUEST_TIMEOUT_MS: u64 = 5_000;
const RESULT_CODE_OK: &str = "00";

/// Bulletin publication times, newest first.
const BASE_TIMES: [Time; 8] = [
    time::macros::time!(23:00),
    time::macros::time!(20:00),
    time::macros::time!(17:00),
    time::macros::time!(14:00),
    time::macros::time!(11:00),
    time::macros::time!(08:00),
    time::macros::time!(05:00),
    time::macros::time!(02:00),
];

/// Hourly cadence: probe the adjacent one and two hour slots.
const NEIGHBOR_OFFSETS: [i64; 4] = [1, -1, 2, -2];

/// Grid-based short-range forecast adapter (provider A).
///
/// Hourly slots, eight bulletins a day, result-code envelope around
/// category/date/time/value tuples.
#[derive(Clone)]
pub struct KmaAdapter {
    http_client: Arc<dyn HttpClient>,
    service_key: String,
    throttling: ThrottlingQueue,
    use_real_api: bool,
}

impl Default for KmaAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            service_key: std::env::var("CIRRUS_KMA_API_KEY")
                .unwrap_or_else(|_| String::from("demo")),
            throttling: ThrottlingQueue::new(Duration::from_secs(60), 60),
            use_real_api: false,
        }
    }
}

impl KmaAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, service_key: impl Into<String>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            service_key: service_key.into(),
            use_real_api,
            ..Self::default()
        }
    }

    async fn try_fetch(
        &self,
        grid: GridPoint,
        issuance: Issuance,
    ) -> Result<Vec<RawForecastItem>, UpstreamError> {
        if let Err(delay) = self.throttling.acquire() {
            return Err(UpstreamError::Throttled(delay));
        }

        let url = format!(
            "{BASE_URL}/getVilageFcst?serviceKey={}&dataType=JSON&numOfRows={PAGE_SIZE}&pageNo=1&base_date={}&base_time={}&nx={}&ny={}",
            urlencoding::encode(&self.service_key),
            format_compact_date(issuance.date),
            format_compact_time(issuance.time),
            grid.nx,
            grid.ny,
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

        let envelope: KmaEnvelope = serde_json::from_str(&response.body)
            .map_err(|error| UpstreamError::Malformed(error.to_string()))?;
        if envelope.response.header.result_code != RESULT_CODE_OK {
            return Err(UpstreamError::Envelope(format!(
                "{} ({})",
                envelope.response.header.result_msg, envelope.response.header.result_code
            )));
        }

        let rows = envelope
            .response
            .body
            .map(|body| body.items.item)
            .unwrap_or_default();

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let category = Category::parse(&row.category).ok()?;
                let date = parse_compact_date(&row.fcst_date).ok()?;
                let time = parse_compact_time(&row.fcst_time).ok()?;
                Some(RawForecastItem::new(
                    category,
                    ForecastSlotKey::new(date, time),
                    issuance,
                    row.fcst_value,
                    grid,
                ))
            })
            .collect())
    }

    /// Deterministic bulletin for offline runs: hourly slots from the hour
    /// after the issuance through two days out, plus daily extremes.
    fn mock_items(&self, grid: GridPoint, issuance: Issuance) -> Vec<RawForecastItem> {
        let seed = grid_seed(grid.nx, grid.ny)
            .wrapping_add(u64::from(issuance.date.ordinal()))
            .wrapping_mul(31)
            .wrapping_add(u64::from(issuance.time.hour()));

        let start = OffsetDateTime::new_in_offset(issuance.date, issuance.time, UtcOffset::UTC)
            + time::Duration::HOUR;
        let mut items = Vec::new();
        let mut extreme_dates = Vec::new();

        for hour_index in 0..48_i64 {
            let at = start + time::Duration::hours(hour_index);
            let slot = ForecastSlotKey::new(
                at.date(),
                Time::from_hms(at.hour(), 0, 0).unwrap_or(Time::MIDNIGHT),
            );
            let step = seed.wrapping_add(hour_index as u64);

            let temperature = 12.0 + (step.wrapping_mul(7) % 150) as f64 / 10.0;
            let humidity = 40 + step % 50;
            let wind = (step.wrapping_mul(11) % 120) as f64 / 10.0;
            let sky = [1, 3, 4][(step % 3) as usize];
            let rainy = step % 9 == 0;
            let pty = if rainy { 1 } else { 0 };
            let pop = if rainy { 70 } else { (step % 40) as i64 };
            let pcp = if rainy { "1~4mm" } else { "no precipitation" };

            items.push(RawForecastItem::new(
                Category::Temperature,
                slot,
                issuance,
                format!("{temperature:.1}"),
                grid,
            ));
            items.push(RawForecastItem::new(
                Category::Humidity,
                slot,
                issuance,
                humidity.to_string(),
                grid,
            ));
            items.push(RawForecastItem::new(
                Category::WindSpeed,
                slot,
                issuance,
                format!("{wind:.1}"),
                grid,
            ));
            items.push(RawForecastItem::new(
                Category::Sky,
                slot,
                issuance,
                sky.to_string(),
                grid,
            ));
            items.push(RawForecastItem::new(
                Category::PrecipitationType,
                slot,
                issuance,
                pty.to_string(),
                grid,
            ));
            items.push(RawForecastItem::new(
                Category::PrecipitationProbability,
                slot,
                issuance,
                pop.to_string(),
                grid,
            ));
            items.push(RawForecastItem::new(
                Category::PrecipitationAmount,
                slot,
                issuance,
                pcp,
                grid,
            ));

            if !extreme_dates.contains(&at.date()) {
                extreme_dates.push(at.date());
                let day_seed = seed.wrapping_add(u64::from(at.date().ordinal()));
                let low = 8.0 + (day_seed % 60) as f64 / 10.0;
                let high = low + 8.0 + (day_seed % 40) as f64 / 10.0;
                let morning = ForecastSlotKey::new(at.date(), time::macros::time!(06:00));
                let afternoon = ForecastSlotKey::new(at.date(), time::macros::time!(15:00));
                items.push(RawForecastItem::new(
                    Category::DailyMin,
                    morning,
                    issuance,
                    format!("{low:.1}"),
                    grid,
                ));
                items.push(RawForecastItem::new(
                    Category::DailyMax,
                    afternoon,
                    issuance,
                    format!("{high:.1}"),
                    grid,
                ));
            }
        }

        items
    }
}

impl ForecastProvider for KmaAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Kma
    }

    fn issuance_candidates(&self, now: OffsetDateTime) -> Vec<Issuance> {
        let today: Vec<Issuance> = BASE_TIMES
            .iter()
            .filter(|base| **base <= now.time())
            .map(|base| Issuance::new(now.date(), *base))
            .collect();
        if !today.is_empty() {
            return today;
        }

        // Before the day's earliest bulletin: start from yesterday's latest.
        let Some(yesterday) = now.date().previous_day() else {
            return Vec::new();
        };
        BASE_TIMES
            .iter()
            .map(|base| Issuance::new(yesterday, *base))
            .collect()
    }

    fn backfill_candidates(&self, now: OffsetDateTime) -> Vec<Issuance> {
        let Some(yesterday) = now.date().previous_day() else {
            return Vec::new();
        };
        BASE_TIMES
            .iter()
            .take(2)
            .map(|base| Issuance::new(yesterday, *base))
            .collect()
    }

    fn neighbor_offsets(&self) -> &'static [i64] {
        &NEIGHBOR_OFFSETS
    }

    fn fetch_grid<'a>(&'a self, grid: GridPoint, issuance: Issuance) -> FetchFuture<'a> {
        Box::pin(async move {
            if !self.use_real_api {
                return self.mock_items(grid, issuance);
            }
            match self.try_fetch(grid, issuance).await {
                Ok(items) => items,
                Err(error) => {
                    tracing::warn!(
                        provider = "kma",
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

    fn fetch_lat_lon<'a>(&'a self, lat: f64, lon: f64, issuance: Issuance) -> FetchFuture<'a> {
        Box::pin(async move {
            match GridPoint::from_lat_lon(lat, lon) {
                Ok(grid) => self.fetch_grid(grid, issuance).await,
                Err(error) => {
                    tracing::warn!(provider = "kma", %error, "coordinate rejected");
                    Vec::new()
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct KmaEnvelope {
    response: KmaResponse,
}

#[derive(Debug, Deserialize)]
struct KmaResponse {
    header: KmaHeader,
    #[serde(default)]
    body: Option<KmaBody>,
}

#[derive(Debug, Deserialize)]
struct KmaHeader {
    #[serde(rename = "resultCode")]
    result_code: String,
    #[serde(rename = "resultMsg", default)]
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct KmaBody {
    items: KmaItems,
}

#[derive(Debug, Deserialize)]
struct KmaItems {
    #[serde(default)]
    item: Vec<KmaItem>,
}

#[derive(Debug, Deserialize)]
struct KmaItem {
    category: String,
    #[serde(rename = "fcstDate")]
    fcst_date: String,
    #[serde(rename = "fcstTime")]
    fcst_time: String,
    #[serde(rename = "fcstValue")]
    fcst_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use std::future::Future;
    use std::pin::Pin;
    use time::macros::{date, datetime, time};

    struct CannedHttpClient {
        response: Result<HttpResponse, HttpError>,
    }

    impl HttpClient for CannedHttpClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn canned(body: &str) -> KmaAdapter {
        KmaAdapter::with_http_client(
            Arc::new(CannedHttpClient {
                response: Ok(HttpResponse::ok_json(body)),
            }),
            "key",
        )
    }

    #[test]
    fn candidates_descend_from_the_latest_bulletin_at_or_before_now() {
        let adapter = KmaAdapter::default();
        let candidates = adapter.issuance_candidates(datetime!(2026-08-28 21:10 +09:00));

        assert_eq!(
            candidates.first().copied(),
            Some(Issuance::new(date!(2026 - 08 - 28), time!(20:00)))
        );
        assert_eq!(candidates.len(), 7);
        assert!(candidates.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn before_the_earliest_bulletin_candidates_step_back_a_day() {
        let adapter = KmaAdapter::default();
        let candidates = adapter.issuance_candidates(datetime!(2026-08-28 01:30 +09:00));

        assert_eq!(
            candidates.first().copied(),
            Some(Issuance::new(date!(2026 - 08 - 27), time!(23:00)))
        );
        assert_eq!(candidates.len(), 8);
    }

    #[test]
    fn backfill_uses_at_most_two_of_yesterdays_bulletins_newest_first() {
        let adapter = KmaAdapter::default();
        let candidates = adapter.backfill_candidates(datetime!(2026-08-28 09:00 +09:00));

        assert_eq!(
            candidates,
            vec![
                Issuance::new(date!(2026 - 08 - 27), time!(23:00)),
                Issuance::new(date!(2026 - 08 - 27), time!(20:00)),
            ]
        );
    }

    #[tokio::test]
    async fn non_ok_result_code_collapses_to_empty() {
        let adapter = canned(
            r#"{"response":{"header":{"resultCode":"03","resultMsg":"NO_DATA"}}}"#,
        );
        let items = adapter
            .fetch_grid(
                GridPoint::new(60, 127),
                Issuance::new(date!(2026 - 08 - 28), time!(20:00)),
            )
            .await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_collapses_to_empty() {
        let adapter = canned("not json at all");
        let items = adapter
            .fetch_grid(
                GridPoint::new(60, 127),
                Issuance::new(date!(2026 - 08 - 28), time!(20:00)),
            )
            .await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn valid_envelope_yields_stamped_items() {
        let adapter = canned(
            r#"{"response":{"header":{"resultCode":"00","resultMsg":"OK"},"body":{"items":{"item":[
                {"category":"TMP","fcstDate":"20260828","fcstTime":"2000","fcstValue":"18"},
                {"category":"POP","fcstDate":"20260828","fcstTime":"2000","fcstValue":"60"},
                {"category":"XYZ","fcstDate":"20260828","fcstTime":"2000","fcstValue":"1"}
            ]}}}}"#,
        );
        let issuance = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
        let items = adapter.fetch_grid(GridPoint::new(60, 127), issuance).await;

        // The unknown category row is dropped, the rest carry the issuance.
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.issuance() == issuance));
    }

    #[tokio::test]
    async fn mock_bulletin_is_deterministic() {
        let adapter = KmaAdapter::default();
        let issuance = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
        let first = adapter.fetch_grid(GridPoint::new(60, 127), issuance).await;
        let second = adapter.fetch_grid(GridPoint::new(60, 127), issuance).await;

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
