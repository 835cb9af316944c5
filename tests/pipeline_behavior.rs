//! Behavior-driven tests for the fetch pipeline
//!
//! These tests verify HOW the system selects issuances, falls back to older
//! bases, handles the cache on empty upstream answers, and turns reconciled
//! records into alert candidates.

use cirrus_core::{
    cache::{IssuanceCache, IssuanceCacheKey},
    clock::FixedClock,
    domain::{
        Category, ForecastSlotKey, GridPoint, Issuance, Location, RawForecastItem, WindCategory,
    },
    provider::{FetchFuture, ForecastProvider, ProviderId},
    rules,
    selection::ForecastFetcher,
    AlertType, Reconciler,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use time::macros::{date, datetime, time};
use time::{Date, OffsetDateTime, Time, UtcOffset};

const OFFSETS: &[i64] = &[1, -1, 2, -2];

/// Provider whose answers are scripted per issuance. Unscripted
/// issuances answer empty, like an upstream that has no bulletin yet.
struct ScriptedProvider {
    candidates: Vec<Issuance>,
    backfill: Vec<Issuance>,
    responses: HashMap<Issuance, Vec<RawForecastItem>>,
    calls: Mutex<Vec<Issuance>>,
}

impl ScriptedProvider {
    fn new(candidates: Vec<Issuance>, backfill: Vec<Issuance>) -> Self {
        Self {
            candidates,
            backfill,
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn respond(mut self, issuance: Issuance, items: Vec<RawForecastItem>) -> Self {
        self.responses.insert(issuance, items);
        self
    }

    fn calls(&self) -> Vec<Issuance> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ForecastProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Kma
    }

    fn issuance_candidates(&self, _now: OffsetDateTime) -> Vec<Issuance> {
        self.candidates.clone()
    }

    fn backfill_candidates(&self, _now: OffsetDateTime) -> Vec<Issuance> {
        self.backfill.clone()
    }

    fn neighbor_offsets(&self) -> &'static [i64] {
        OFFSETS
    }

    fn fetch_grid<'a>(&'a self, _grid: GridPoint, issuance: Issuance) -> FetchFuture<'a> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(issuance);
            }
            self.responses.get(&issuance).cloned().unwrap_or_default()
        })
    }

    fn fetch_lat_lon<'a>(&'a self, _lat: f64, _lon: f64, issuance: Issuance) -> FetchFuture<'a> {
        self.fetch_grid(GridPoint::new(0, 0), issuance)
    }
}

fn location() -> Location {
    Location::new(7, "seoul", 37.5665, 126.9780, UtcOffset::UTC).expect("valid location")
}

fn item(issuance: Issuance, category: Category, date: Date, at: Time, value: &str) -> RawForecastItem {
    RawForecastItem::new(
        category,
        ForecastSlotKey::new(date, at),
        issuance,
        value,
        location().grid,
    )
}

fn clock() -> FixedClock {
    FixedClock(datetime!(2026-08-28 21:10 UTC))
}

// =============================================================================
// Issuance Selection: Fallback
// =============================================================================

#[tokio::test]
async fn when_primary_issuance_is_empty_system_falls_back_to_older_base() {
    // Given: the newest bulletin has not materialized yet
    let primary = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
    let older = Issuance::new(date!(2026 - 08 - 28), time!(17:00));
    let provider = Arc::new(
        ScriptedProvider::new(vec![primary, older], vec![]).respond(
            older,
            vec![
                item(older, Category::Temperature, date!(2026 - 08 - 28), time!(22:00), "21.0"),
                item(older, Category::Temperature, date!(2026 - 08 - 27), time!(22:00), "19.0"),
            ],
        ),
    );
    let fetcher = ForecastFetcher::new(provider.clone(), IssuanceCache::with_default_ttl(), clock());

    // When: a fetch pass runs
    let outcome = fetcher.fetch(&location()).await;

    // Then: the older base answered, and both candidates were attempted
    assert_eq!(outcome.items.len(), 2);
    assert!(outcome.items.iter().all(|i| i.issuance() == older));
    assert_eq!(outcome.attempted, vec![primary, older]);
    assert_eq!(provider.calls(), vec![primary, older]);
}

#[tokio::test]
async fn when_every_issuance_is_empty_outcome_is_empty_not_an_error() {
    // Given: no bulletin answers at all
    let first = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
    let second = Issuance::new(date!(2026 - 08 - 28), time!(17:00));
    let provider = Arc::new(ScriptedProvider::new(vec![first, second], vec![]));
    let fetcher = ForecastFetcher::new(provider, IssuanceCache::with_default_ttl(), clock());

    // When: a fetch pass runs
    let outcome = fetcher.fetch(&location()).await;

    // Then: empty items, with the full attempt trail
    assert!(outcome.items.is_empty());
    assert_eq!(outcome.attempted, vec![first, second]);
}

// =============================================================================
// Issuance Selection: Cache Interaction
// =============================================================================

#[tokio::test]
async fn when_upstream_answers_empty_the_stale_cache_entry_is_evicted_exactly_once() {
    // Given: a stale cached entry for the primary issuance
    let primary = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
    let older = Issuance::new(date!(2026 - 08 - 28), time!(17:00));
    let provider = Arc::new(ScriptedProvider::new(vec![primary, older], vec![]).respond(
        older,
        vec![item(older, Category::Temperature, date!(2026 - 08 - 28), time!(22:00), "20.0")],
    ));
    let cache = IssuanceCache::with_default_ttl();
    cache
        .put(IssuanceCacheKey::new(location().grid, primary), vec![])
        .await;

    let fetcher = ForecastFetcher::new(provider, cache.clone(), clock());

    // When: the pass finds the primary empty upstream
    let outcome = fetcher.fetch(&location()).await;

    // Then: the dead key was removed once, and the fallback data came through
    assert_eq!(cache.evictions(), 1);
    assert_eq!(outcome.items.len(), 1);
    assert!(cache
        .get(&IssuanceCacheKey::new(location().grid, primary))
        .await
        .is_none());
}

#[tokio::test]
async fn when_cache_holds_a_live_entry_the_upstream_is_not_called() {
    // Given: a fresh cached bulletin for the primary issuance
    let primary = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
    let provider = Arc::new(ScriptedProvider::new(vec![primary], vec![]));
    let cache = IssuanceCache::with_default_ttl();
    let cached_item = item(primary, Category::Temperature, date!(2026 - 08 - 28), time!(22:00), "23.0");
    cache
        .put(
            IssuanceCacheKey::new(location().grid, primary),
            vec![cached_item],
        )
        .await;

    let fetcher = ForecastFetcher::new(provider.clone(), cache, clock());

    // When: a fetch pass runs
    let outcome = fetcher.fetch(&location()).await;

    // Then: the cached bulletin was used, no upstream call happened
    assert_eq!(outcome.items.len(), 1);
    assert!(provider.calls().is_empty());
}

// =============================================================================
// Issuance Selection: Baseline Backfill
// =============================================================================

#[tokio::test]
async fn when_todays_bulletin_lacks_yesterday_slots_backfill_is_fetched() {
    // Given: today's bulletin carries only today, yesterday's has the baseline
    let primary = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
    let yesterdays = Issuance::new(date!(2026 - 08 - 27), time!(23:00));
    let provider = Arc::new(
        ScriptedProvider::new(vec![primary], vec![yesterdays])
            .respond(
                primary,
                vec![item(primary, Category::Temperature, date!(2026 - 08 - 28), time!(22:00), "24.0")],
            )
            .respond(
                yesterdays,
                vec![item(yesterdays, Category::Temperature, date!(2026 - 08 - 27), time!(22:00), "20.0")],
            ),
    );
    let fetcher = ForecastFetcher::new(provider, IssuanceCache::with_default_ttl(), clock());

    // When: a fetch pass runs
    let outcome = fetcher.fetch(&location()).await;

    // Then: both days are present, so the delta baseline exists
    assert_eq!(outcome.items.len(), 2);
    assert!(outcome
        .items
        .iter()
        .any(|i| i.forecast_date == date!(2026 - 08 - 27)));
}

#[tokio::test]
async fn when_the_same_slot_arrives_twice_the_newer_issuance_wins() {
    // Given: overlapping data where the backfill repeats a slot
    let primary = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
    let yesterdays = Issuance::new(date!(2026 - 08 - 27), time!(23:00));
    let provider = Arc::new(
        ScriptedProvider::new(vec![primary], vec![yesterdays])
            .respond(
                primary,
                vec![item(primary, Category::Temperature, date!(2026 - 08 - 28), time!(22:00), "24.0")],
            )
            .respond(
                yesterdays,
                vec![
                    item(yesterdays, Category::Temperature, date!(2026 - 08 - 27), time!(22:00), "20.0"),
                    // Same slot as the primary's item, from the older base
                    item(yesterdays, Category::Temperature, date!(2026 - 08 - 28), time!(22:00), "19.0"),
                ],
            ),
    );
    let fetcher = ForecastFetcher::new(provider, IssuanceCache::with_default_ttl(), clock());

    // When: a fetch pass runs
    let outcome = fetcher.fetch(&location()).await;

    // Then: the duplicated slot keeps the most recently issued value
    let todays: Vec<_> = outcome
        .items
        .iter()
        .filter(|i| i.forecast_date == date!(2026 - 08 - 28))
        .collect();
    assert_eq!(todays.len(), 1);
    assert_eq!(todays[0].value, "24.0");
    assert_eq!(todays[0].issuance(), primary);
}

// =============================================================================
// Pipeline: Fetch -> Reconcile -> Rules
// =============================================================================

#[tokio::test]
async fn when_temperature_swings_four_degrees_a_temperature_alert_fires() {
    // Given: a bulletin with a strong day-over-day warm-up
    let primary = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
    let provider = Arc::new(ScriptedProvider::new(vec![primary], vec![]).respond(
        primary,
        vec![
            item(primary, Category::Temperature, date!(2026 - 08 - 27), time!(22:00), "18.0"),
            item(primary, Category::Temperature, date!(2026 - 08 - 28), time!(22:00), "22.0"),
        ],
    ));
    let fetcher = ForecastFetcher::new(provider.clone(), IssuanceCache::with_default_ttl(), clock());

    // When: the full pass runs
    let outcome = fetcher.fetch(&location()).await;
    let records = Reconciler::for_provider(provider.as_ref()).reconcile(
        &location(),
        &outcome.items,
        clock().0,
    );
    let candidates = rules::evaluate(&location(), &records, clock().0);

    // Then: the 4.0 degree delta crosses the 1.0 threshold
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].temperature_delta_vs_yesterday, 4.0);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].alert_type, AlertType::TemperatureChange);
    assert_eq!(candidates[0].location_id, 7);
}

#[tokio::test]
async fn when_wind_is_strong_exactly_one_wind_alert_fires_for_the_date() {
    // Given: two strong-wind slots on the same date
    let primary = Issuance::new(date!(2026 - 08 - 28), time!(20:00));
    let provider = Arc::new(ScriptedProvider::new(vec![primary], vec![]).respond(
        primary,
        vec![
            item(primary, Category::Temperature, date!(2026 - 08 - 28), time!(21:00), "20.0"),
            item(primary, Category::WindSpeed, date!(2026 - 08 - 28), time!(21:00), "10.5"),
            item(primary, Category::Temperature, date!(2026 - 08 - 28), time!(22:00), "19.5"),
            item(primary, Category::WindSpeed, date!(2026 - 08 - 28), time!(22:00), "11.0"),
        ],
    ));
    let fetcher = ForecastFetcher::new(provider.clone(), IssuanceCache::with_default_ttl(), clock());

    // When: the full pass runs
    let outcome = fetcher.fetch(&location()).await;
    let records = Reconciler::for_provider(provider.as_ref()).reconcile(
        &location(),
        &outcome.items,
        clock().0,
    );
    let candidates = rules::evaluate(&location(), &records, clock().0);

    // Then: both slots are Strong but the date yields one alert
    assert!(records
        .iter()
        .all(|record| record.wind_category == WindCategory::Strong));
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].alert_type, AlertType::WindChange);
}
