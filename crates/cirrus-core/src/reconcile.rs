//! Forecast reconciliation.
//!
//! Turns a merged item list into canonical per-slot weather records for a
//! bounded window (today through +4 days). Yesterday's data participates
//! only as the comparison baseline and never becomes a record of its own.

use std::collections::{BTreeMap, HashMap};

use time::{Date, Duration, OffsetDateTime};

use crate::domain::{
    parse_precipitation_amount, round_to_tenth, CanonicalWeatherRecord, Category, ForecastSlotKey,
    Location, PrecipitationForm, RawForecastItem, SkyCondition, WindCategory,
};
use crate::provider::ForecastProvider;

/// Days past today a slot may fall on and still produce a record.
pub const FORECAST_HORIZON_DAYS: i64 = 4;

/// Per-provider reconciliation engine.
///
/// The neighbor offsets are provider-specific because upstream cadences
/// differ: an hourly feed probes ±1h/±2h, a three-hourly feed ±3h..±12h.
pub struct Reconciler {
    neighbor_offsets: &'static [i64],
}

impl Reconciler {
    pub const fn new(neighbor_offsets: &'static [i64]) -> Self {
        Self { neighbor_offsets }
    }

    pub fn for_provider(provider: &dyn ForecastProvider) -> Self {
        Self::new(provider.neighbor_offsets())
    }

    /// Produce the canonical records for one location from one merged item
    /// set. Re-running on the same input yields an identical list.
    pub fn reconcile(
        &self,
        location: &Location,
        items: &[RawForecastItem],
        now: OffsetDateTime,
    ) -> Vec<CanonicalWeatherRecord> {
        let today = now.to_offset(location.utc_offset).date();
        let window_start = today.previous_day().unwrap_or(today);
        let window_end = today + Duration::days(FORECAST_HORIZON_DAYS);
        let in_window = |date: Date| date >= window_start && date <= window_end;

        // Daily extremes are sometimes reported once per date rather than
        // per slot; collect them up front as the slot-level fallback.
        let mut daily_max: HashMap<Date, f64> = HashMap::new();
        let mut daily_min: HashMap<Date, f64> = HashMap::new();
        for item in items.iter().filter(|item| in_window(item.forecast_date)) {
            let Some(value) = item.numeric_value() else {
                continue;
            };
            match item.category {
                Category::DailyMax => {
                    daily_max
                        .entry(item.forecast_date)
                        .and_modify(|current| *current = current.max(value))
                        .or_insert(value);
                }
                Category::DailyMin => {
                    daily_min
                        .entry(item.forecast_date)
                        .and_modify(|current| *current = current.min(value))
                        .or_insert(value);
                }
                _ => {}
            }
        }

        // Slot buckets, indexed by category within each bucket. BTreeMap
        // keeps output ordering deterministic.
        let mut buckets: BTreeMap<ForecastSlotKey, HashMap<Category, &RawForecastItem>> =
            BTreeMap::new();
        let mut temperature_index: HashMap<ForecastSlotKey, f64> = HashMap::new();
        let mut humidity_index: HashMap<ForecastSlotKey, f64> = HashMap::new();

        for item in items.iter().filter(|item| in_window(item.forecast_date)) {
            let slot = item.slot();
            buckets.entry(slot).or_default().insert(item.category, item);

            match (item.category, item.numeric_value()) {
                (Category::Temperature, Some(value)) => {
                    temperature_index.insert(slot, value);
                }
                (Category::Humidity, Some(value)) => {
                    humidity_index.insert(slot, value);
                }
                _ => {}
            }
        }

        let mut records = Vec::new();
        for (slot, bucket) in &buckets {
            if slot.date < today || slot.date > window_end {
                continue;
            }

            // No record without a current temperature reading.
            let Some(temperature_item) = bucket.get(&Category::Temperature) else {
                continue;
            };
            let Some(temperature) = temperature_item.numeric_value() else {
                continue;
            };

            let temperature_max =
                numeric(bucket, Category::DailyMax).or_else(|| daily_max.get(&slot.date).copied());
            let temperature_min =
                numeric(bucket, Category::DailyMin).or_else(|| daily_min.get(&slot.date).copied());

            let prior_temperature = self.prior_day_value(&temperature_index, *slot);
            let temperature_delta = prior_temperature
                .map(|prior| round_to_tenth(temperature - prior))
                .unwrap_or(0.0);

            let humidity = numeric(bucket, Category::Humidity);
            let humidity_delta = match (humidity, self.prior_day_value(&humidity_index, *slot)) {
                (Some(current), Some(prior)) => round_to_tenth(current - prior),
                _ => 0.0,
            };

            let sky = code(bucket, Category::Sky)
                .map(SkyCondition::from_code)
                .unwrap_or(SkyCondition::Unknown);
            let precipitation_type = code(bucket, Category::PrecipitationType)
                .map(PrecipitationForm::from_code)
                .unwrap_or(PrecipitationForm::Unknown);
            let precipitation_amount = bucket
                .get(&Category::PrecipitationAmount)
                .map(|item| parse_precipitation_amount(&item.value))
                .unwrap_or(0.0);
            let precipitation_probability =
                numeric(bucket, Category::PrecipitationProbability).map(|value| value as i32);
            let wind_speed = numeric(bucket, Category::WindSpeed);
            let wind_category = WindCategory::from_speed(wind_speed.unwrap_or(0.0));

            let issued_at = bucket
                .values()
                .map(|item| item.issuance())
                .max()
                .unwrap_or(temperature_item.issuance())
                .instant(location.utc_offset);

            records.push(CanonicalWeatherRecord {
                location_id: location.id,
                issued_at,
                forecast_at: slot.instant(location.utc_offset),
                temperature_current: temperature,
                temperature_max,
                temperature_min,
                sky,
                precipitation_type,
                precipitation_amount,
                precipitation_probability,
                wind_speed,
                wind_category,
                humidity,
                temperature_delta_vs_yesterday: temperature_delta,
                humidity_delta_vs_yesterday: humidity_delta,
            });
        }

        records
    }

    /// Prior-day lookup at the identical time-of-day, widening through the
    /// provider's offset sequence before giving up.
    fn prior_day_value(
        &self,
        index: &HashMap<ForecastSlotKey, f64>,
        slot: ForecastSlotKey,
    ) -> Option<f64> {
        let prior = slot.prior_day();
        if prior == slot {
            return None;
        }
        if let Some(value) = index.get(&prior) {
            return Some(*value);
        }
        for offset in self.neighbor_offsets {
            if let Some(probe) = prior.shifted_hours(*offset) {
                if let Some(value) = index.get(&probe) {
                    return Some(*value);
                }
            }
        }
        None
    }
}

fn numeric(bucket: &HashMap<Category, &RawForecastItem>, category: Category) -> Option<f64> {
    bucket.get(&category).and_then(|item| item.numeric_value())
}

fn code(bucket: &HashMap<Category, &RawForecastItem>, category: Category) -> Option<i32> {
    bucket
        .get(&category)
        .and_then(|item| item.value.trim().parse::<i32>().ok())
}
