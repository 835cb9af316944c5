//! Behavior-driven tests for reconciliation
//!
//! These tests verify HOW raw forecast items become canonical weather
//! records: the mandatory-temperature rule, day-over-day delta search,
//! rounding, and idempotence over realistic adapter output.

use cirrus_core::{
    adapters::{KmaAdapter, OpenWeatherAdapter},
    domain::{Category, ForecastSlotKey, GridPoint, Issuance, Location, RawForecastItem},
    provider::ForecastProvider,
    Reconciler,
};
use time::macros::{date, datetime, time};
use time::{Date, Time, UtcOffset};

const OFFSETS: &[i64] = &[1, -1, 2, -2];

fn location() -> Location {
    Location::new(7, "seoul", 37.5665, 126.9780, UtcOffset::UTC).expect("valid location")
}

fn item(category: Category, date: Date, at: Time, value: &str) -> RawForecastItem {
    RawForecastItem::new(
        category,
        ForecastSlotKey::new(date, at),
        Issuance::new(date!(2026 - 08 - 28), time!(05:00)),
        value,
        GridPoint::new(60, 127),
    )
}

// =============================================================================
// Reconciliation: Mandatory Temperature
// =============================================================================

#[test]
fn when_a_slot_has_no_temperature_no_record_is_emitted_for_it() {
    // Given: one complete slot and one temperature-less slot
    let items = vec![
        item(Category::Temperature, date!(2026 - 08 - 28), time!(10:00), "21.0"),
        item(Category::Humidity, date!(2026 - 08 - 28), time!(10:00), "60"),
        item(Category::Humidity, date!(2026 - 08 - 28), time!(11:00), "62"),
        item(Category::Sky, date!(2026 - 08 - 28), time!(11:00), "3"),
    ];

    // When: reconciliation runs
    let records = Reconciler::new(OFFSETS).reconcile(
        &location(),
        &items,
        datetime!(2026-08-28 09:00 UTC),
    );

    // Then: only the slot with a temperature reading survives
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].forecast_at, datetime!(2026-08-28 10:00 UTC));
    assert_eq!(records[0].humidity, Some(60.0));
}

// =============================================================================
// Reconciliation: Day-Over-Day Deltas
// =============================================================================

#[test]
fn when_the_exact_prior_slot_exists_the_delta_is_the_rounded_difference() {
    // Given: a prior-day value at the identical time-of-day
    let items = vec![
        item(Category::Temperature, date!(2026 - 08 - 27), time!(09:00), "18.0"),
        item(Category::Temperature, date!(2026 - 08 - 28), time!(09:00), "20.05"),
    ];

    // When: reconciliation runs
    let records = Reconciler::new(OFFSETS).reconcile(
        &location(),
        &items,
        datetime!(2026-08-28 09:00 UTC),
    );

    // Then: 2.05 rounds half away from zero to 2.1
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].temperature_delta_vs_yesterday, 2.1);
}

#[test]
fn when_the_prior_value_sits_outside_the_offset_window_delta_is_zero() {
    // Given: yesterday has data only five hours away from the slot
    let items = vec![
        item(Category::Temperature, date!(2026 - 08 - 27), time!(14:00), "10.0"),
        item(Category::Temperature, date!(2026 - 08 - 28), time!(09:00), "22.0"),
    ];

    // When: reconciliation runs with a +-2h search window
    let records = Reconciler::new(OFFSETS).reconcile(
        &location(),
        &items,
        datetime!(2026-08-28 09:00 UTC),
    );

    // Then: the search gives up and the delta defaults to 0.0
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].temperature_delta_vs_yesterday, 0.0);
}

#[test]
fn when_humidity_has_a_baseline_its_delta_is_computed_independently() {
    // Given: temperature and humidity baselines at different prior slots
    let items = vec![
        item(Category::Temperature, date!(2026 - 08 - 27), time!(09:00), "18.0"),
        item(Category::Humidity, date!(2026 - 08 - 27), time!(10:00), "50"),
        item(Category::Temperature, date!(2026 - 08 - 28), time!(09:00), "20.0"),
        item(Category::Humidity, date!(2026 - 08 - 28), time!(09:00), "57"),
    ];

    // When: reconciliation runs
    let records = Reconciler::new(OFFSETS).reconcile(
        &location(),
        &items,
        datetime!(2026-08-28 09:00 UTC),
    );

    // Then: humidity found its baseline via the +1h probe
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].temperature_delta_vs_yesterday, 2.0);
    assert_eq!(records[0].humidity_delta_vs_yesterday, 7.0);
}

// =============================================================================
// Reconciliation: Adapter Integration
// =============================================================================

#[tokio::test]
async fn when_the_grid_mock_bulletin_is_reconciled_every_record_is_complete() {
    // Given: the deterministic offline grid adapter
    let adapter = KmaAdapter::default();
    let now = datetime!(2026-08-28 09:00 UTC);
    let issuance = adapter
        .issuance_candidates(now)
        .into_iter()
        .next()
        .expect("at least one candidate");

    // When: its bulletin is fetched and reconciled
    let items = adapter.fetch_grid(location().grid, issuance).await;
    let records = Reconciler::for_provider(&adapter).reconcile(&location(), &items, now);

    // Then: records exist, are in-window, and are sorted by forecast instant
    assert!(!records.is_empty());
    for record in &records {
        assert!(record.forecast_at.date() >= date!(2026 - 08 - 28));
        assert!(record.temperature_current.is_finite());
    }
    for pair in records.windows(2) {
        assert!(pair[0].forecast_at <= pair[1].forecast_at);
    }
}

#[tokio::test]
async fn when_the_point_mock_bulletin_is_reconciled_slots_follow_its_cadence() {
    // Given: the deterministic offline point adapter
    let adapter = OpenWeatherAdapter::default();
    let now = datetime!(2026-08-28 09:00 UTC);
    let issuance = adapter
        .issuance_candidates(now)
        .into_iter()
        .next()
        .expect("sole candidate");

    // When: its bulletin is fetched and reconciled
    let items = adapter.fetch_lat_lon(37.5665, 126.9780, issuance).await;
    let records = Reconciler::for_provider(&adapter).reconcile(&location(), &items, now);

    // Then: consecutive records are three hours apart
    assert!(records.len() >= 2);
    for pair in records.windows(2) {
        let gap = pair[1].forecast_at - pair[0].forecast_at;
        assert_eq!(gap.whole_hours(), 3);
    }
}

// =============================================================================
// Reconciliation: Idempotence
// =============================================================================

#[test]
fn when_the_same_input_is_reconciled_twice_the_output_bytes_are_identical() {
    // Given: a mixed bulletin
    let items = vec![
        item(Category::Temperature, date!(2026 - 08 - 27), time!(09:00), "18.0"),
        item(Category::Temperature, date!(2026 - 08 - 28), time!(09:00), "22.0"),
        item(Category::Humidity, date!(2026 - 08 - 28), time!(09:00), "55"),
        item(Category::Sky, date!(2026 - 08 - 28), time!(09:00), "4"),
        item(Category::PrecipitationType, date!(2026 - 08 - 28), time!(09:00), "1"),
        item(Category::PrecipitationAmount, date!(2026 - 08 - 28), time!(09:00), "1~4mm"),
        item(Category::Temperature, date!(2026 - 08 - 29), time!(09:00), "23.0"),
    ];
    let reconciler = Reconciler::new(OFFSETS);
    let now = datetime!(2026-08-28 09:00 UTC);

    // When: reconciliation runs twice
    let first = reconciler.reconcile(&location(), &items, now);
    let second = reconciler.reconcile(&location(), &items, now);

    // Then: serialized output is byte-for-byte identical
    let first_json = serde_json::to_vec(&first).expect("serializable");
    let second_json = serde_json::to_vec(&second).expect("serializable");
    assert_eq!(first_json, second_json);
}
