use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use cirrus_core::{AlertCandidate, AlertType};

/// Delivery state of an outbox row. Transitions are monotonic:
/// `Pending` may move to `Sent` or `Failed`, and neither terminal
/// state ever moves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Pending,
    Sent,
    Failed,
}

impl AlertStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "SENT" => Some(Self::Sent),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One row of the alert outbox table. Timestamps are RFC 3339 text.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertRow {
    pub id: String,
    pub location_id: i64,
    pub alert_type: String,
    pub message: String,
    pub status: String,
    pub created_at: String,
}

impl AlertRow {
    pub fn status(&self) -> Option<AlertStatus> {
        AlertStatus::parse(&self.status)
    }

    pub fn alert_type(&self) -> Option<AlertType> {
        AlertType::parse(&self.alert_type)
    }
}

/// One persisted canonical weather record. Kept flat for sqlite; the
/// coded fields are stored by their string names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeatherRow {
    pub location_id: i64,
    pub issued_at: String,
    pub forecast_at: String,
    pub temperature_current: f64,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub sky: String,
    pub precipitation_type: String,
    pub precipitation_amount: f64,
    pub precipitation_probability: Option<i64>,
    pub wind_speed: Option<f64>,
    pub wind_category: String,
    pub humidity: Option<f64>,
    pub temperature_delta_vs_yesterday: f64,
    pub humidity_delta_vs_yesterday: f64,
}

/// Wire payload published to the broker for one alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertMessage {
    pub id: String,
    pub location_id: i64,
    pub alert_type: String,
    pub message: String,
    pub created_at: String,
}

impl AlertMessage {
    pub fn from_row(row: &AlertRow) -> Self {
        Self {
            id: row.id.clone(),
            location_id: row.location_id,
            alert_type: row.alert_type.clone(),
            message: row.message.clone(),
            created_at: row.created_at.clone(),
        }
    }
}

pub(crate) fn candidate_created_at(candidate: &AlertCandidate) -> String {
    candidate
        .created_at
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| candidate.created_at.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [AlertStatus::Pending, AlertStatus::Sent, AlertStatus::Failed] {
            assert_eq!(AlertStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AlertStatus::parse("pending"), None);
    }
}
