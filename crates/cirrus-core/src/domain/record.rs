use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{PrecipitationForm, SkyCondition, WindCategory};

/// One reconciled forecast for one location and slot.
///
/// Exactly one record exists per `(location, forecast_at)` after a
/// reconciliation pass. Records are never edited; a later pass supersedes
/// them wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalWeatherRecord {
    pub location_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub forecast_at: OffsetDateTime,
    pub temperature_current: f64,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub sky: SkyCondition,
    pub precipitation_type: PrecipitationForm,
    /// mm/h lower-bound estimate.
    pub precipitation_amount: f64,
    pub precipitation_probability: Option<i32>,
    pub wind_speed: Option<f64>,
    pub wind_category: WindCategory,
    pub humidity: Option<f64>,
    /// 0.0 when no comparable prior-day value exists within the search
    /// window; missing data and "no change" are deliberately conflated here.
    pub temperature_delta_vs_yesterday: f64,
    pub humidity_delta_vs_yesterday: f64,
}

/// Which change-alert rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    TemperatureChange,
    WindChange,
    PrecipitationChange,
}

impl AlertType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TemperatureChange => "temperature_change",
            Self::WindChange => "wind_change",
            Self::PrecipitationChange => "precipitation_change",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "temperature_change" => Some(Self::TemperatureChange),
            "wind_change" => Some(Self::WindChange),
            "precipitation_change" => Some(Self::PrecipitationChange),
            _ => None,
        }
    }
}

impl Display for AlertType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change-alert produced by rule evaluation, pending outbox persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub id: Uuid,
    pub location_id: i64,
    pub alert_type: AlertType,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AlertCandidate {
    pub fn new(
        location_id: i64,
        alert_type: AlertType,
        message: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            location_id,
            alert_type,
            message: message.into(),
            created_at,
        }
    }
}

/// Round half-up (away from zero) to one decimal place.
///
/// All day-over-day deltas pass through this before being stored.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
