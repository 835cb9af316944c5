//! Issuance selection and fallback.
//!
//! Given "now" and a location, decide which bulletin to request, stitch
//! together a sufficient window of data (including yesterday's baseline),
//! and merge everything down to one item per (category, slot).

use std::collections::HashMap;
use std::sync::Arc;

use time::{Date, Time};

use crate::cache::{IssuanceCache, IssuanceCacheKey};
use crate::clock::Clock;
use crate::domain::{Category, Location, RawForecastItem};
use crate::provider::ForecastProvider;

/// Outcome of one fetch pass for a location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Merged, recency-deduplicated items. Empty means "no data for this
    /// location", which is expected, not an error.
    pub items: Vec<RawForecastItem>,
    /// Issuances that were tried before one answered.
    pub attempted: Vec<crate::domain::Issuance>,
}

/// Per-location fetch coordinator for one provider.
pub struct ForecastFetcher<C: Clock> {
    provider: Arc<dyn ForecastProvider>,
    cache: IssuanceCache,
    clock: C,
}

impl<C: Clock> ForecastFetcher<C> {
    pub fn new(provider: Arc<dyn ForecastProvider>, cache: IssuanceCache, clock: C) -> Self {
        Self {
            provider,
            cache,
            clock,
        }
    }

    pub fn provider(&self) -> &Arc<dyn ForecastProvider> {
        &self.provider
    }

    /// Run the full selection algorithm for a location.
    pub async fn fetch(&self, location: &Location) -> FetchOutcome {
        let now = self.clock.now().to_offset(location.utc_offset);
        let mut attempted = Vec::new();
        let mut collected: Vec<RawForecastItem> = Vec::new();

        for issuance in self.provider.issuance_candidates(now) {
            attempted.push(issuance);
            let items = self.fetch_one(location, issuance).await;
            if !items.is_empty() {
                collected = items;
                break;
            }
        }

        if collected.is_empty() {
            return FetchOutcome {
                items: Vec::new(),
                attempted,
            };
        }

        // Yesterday's values are only needed as the delta baseline; backfill
        // when today's bulletin carries none of them.
        if let Some(yesterday) = now.date().previous_day() {
            let has_baseline = collected
                .iter()
                .any(|item| item.forecast_date == yesterday);
            if !has_baseline {
                for issuance in self.provider.backfill_candidates(now) {
                    attempted.push(issuance);
                    let items = self.fetch_one(location, issuance).await;
                    if !items.is_empty() {
                        collected.extend(items);
                        break;
                    }
                }
            }
        }

        FetchOutcome {
            items: merge_latest(collected),
            attempted,
        }
    }

    /// One issuance request with cache read-through. An empty answer evicts
    /// any stale cache entry for the key so a known-empty result is not
    /// replayed on the next pass.
    async fn fetch_one(
        &self,
        location: &Location,
        issuance: crate::domain::Issuance,
    ) -> Vec<RawForecastItem> {
        let key = IssuanceCacheKey::new(location.grid, issuance);
        if let Some(cached) = self.cache.get(&key).await {
            if !cached.is_empty() {
                return cached;
            }
        }

        let items = self.provider.fetch_grid(location.grid, issuance).await;
        if items.is_empty() {
            self.cache.evict(&key).await;
        } else {
            self.cache.put(key, items.clone()).await;
        }
        items
    }
}

/// Deduplicate by (category, forecast date, forecast time), keeping the
/// most recently issued item, then sort for a deterministic merge output.
pub fn merge_latest(items: Vec<RawForecastItem>) -> Vec<RawForecastItem> {
    let mut by_key: HashMap<(Category, Date, Time), RawForecastItem> =
        HashMap::with_capacity(items.len());

    for item in items {
        let key = (item.category, item.forecast_date, item.forecast_time);
        match by_key.get(&key) {
            Some(existing) if existing.issuance() >= item.issuance() => {}
            _ => {
                by_key.insert(key, item);
            }
        }
    }

    let mut merged: Vec<RawForecastItem> = by_key.into_values().collect();
    merged.sort_by(|a, b| {
        (a.forecast_date, a.forecast_time, a.category.code())
            .cmp(&(b.forecast_date, b.forecast_time, b.category.code()))
    });
    merged
}
