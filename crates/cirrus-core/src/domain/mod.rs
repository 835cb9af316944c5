//! Canonical domain types shared across adapters, selection, reconciliation,
//! and the alert rules.

mod codes;
mod geo;
mod record;
mod slot;

pub use codes::{parse_precipitation_amount, PrecipitationForm, SkyCondition, WindCategory};
pub use geo::{GridPoint, Location};
pub use record::{round_to_tenth, AlertCandidate, AlertType, CanonicalWeatherRecord};
pub use slot::{
    format_compact_date, format_compact_time, parse_compact_date, parse_compact_time, Category,
    ForecastSlotKey, Issuance, RawForecastItem,
};
