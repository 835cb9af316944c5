//! # Cirrus Core
//!
//! Core contracts and domain types for the Cirrus weather pipeline.
//!
//! ## Overview
//!
//! This crate provides the foundational components for Cirrus:
//!
//! - **Canonical domain models** for locations, forecast slots, and weather records
//! - **Provider adapters** for the KMA grid feed and the OpenWeather point feed
//! - **Issuance selection** with cache read-through and fallback to older bases
//! - **Reconciliation** of raw items into per-slot records with day-over-day deltas
//! - **Alert rules** evaluated per calendar date against reconciled records
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (KMA, OpenWeather) |
//! | [`cache`] | Per-issuance response cache with TTL and eviction |
//! | [`clock`] | Injectable time source |
//! | [`domain`] | Domain models (Location, slots, categories, records) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`provider`] | Forecast provider trait and identifiers |
//! | [`reconcile`] | Raw-item to canonical-record reconciliation |
//! | [`rules`] | Threshold alert evaluation |
//! | [`selection`] | Issuance fallback and recency merge |
//! | [`throttling`] | Rate limiting support |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cirrus_core::{
//!     ForecastFetcher, Location, ProviderId, ProviderSetBuilder, Reconciler, SystemClock,
//! };
//! use time::macros::offset;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let providers = ProviderSetBuilder::new().with_mock_mode().build();
//!     let provider = providers.get(ProviderId::Kma).ok_or("no provider")?;
//!
//!     let location = Location::new(1, "seoul", 37.5665, 126.9780, offset!(+9))?;
//!     let cache = cirrus_core::IssuanceCache::with_default_ttl();
//!     let fetcher = ForecastFetcher::new(provider.clone(), cache, SystemClock);
//!
//!     let outcome = fetcher.fetch(&location).await;
//!     let records = Reconciler::for_provider(provider.as_ref()).reconcile(
//!         &location,
//!         &outcome.items,
//!         time::OffsetDateTime::now_utc(),
//!     );
//!     println!("{} records", records.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Caller   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ ForecastFetcher │────▶│ Issuance Cache   │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Provider        │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest/none)   │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Reconciler      │────▶│ Alert Rules      │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Security
//!
//! - API keys are read from environment variables only (never logged)
//! - All HTTP requests use TLS via rustls
//! - Input validation on all domain types

pub mod adapters;
pub mod cache;
pub mod clock;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod provider;
pub mod reconcile;
pub mod rules;
pub mod selection;
pub mod throttling;

// Re-export commonly used types at crate root for convenience

// Adapter construction
pub use adapters::{KmaAdapter, OpenWeatherAdapter, ProviderSet, ProviderSetBuilder};

// Caching
pub use cache::{IssuanceCache, IssuanceCacheKey};

// Clock
pub use clock::{Clock, FixedClock, SystemClock};

// Domain models
pub use domain::{
    AlertCandidate, AlertType, CanonicalWeatherRecord, Category, ForecastSlotKey, GridPoint,
    Issuance, Location, PrecipitationForm, RawForecastItem, SkyCondition, WindCategory,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Provider contract
pub use provider::{FetchFuture, ForecastProvider, ProviderId};

// Reconciliation
pub use reconcile::{Reconciler, FORECAST_HORIZON_DAYS};

// Alert rules
pub use rules::{evaluate, PRECIPITATION_THRESHOLD_MM, TEMPERATURE_DELTA_THRESHOLD};

// Selection
pub use selection::{merge_latest, FetchOutcome, ForecastFetcher};

// Throttling
pub use throttling::ThrottlingQueue;
