use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time, UtcOffset};

use crate::domain::GridPoint;
use crate::ValidationError;

const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year][month][day]");
const TIME_FORMAT: &[FormatItem<'_>] = format_description!("[hour][minute]");

/// Parse an upstream `YYYYMMDD` date.
pub fn parse_compact_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input, DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        value: input.to_owned(),
    })
}

/// Parse an upstream `HHmm` time.
pub fn parse_compact_time(input: &str) -> Result<Time, ValidationError> {
    Time::parse(input, TIME_FORMAT).map_err(|_| ValidationError::InvalidTime {
        value: input.to_owned(),
    })
}

/// Render a date as upstream `YYYYMMDD`.
pub fn format_compact_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .expect("compact date format is infallible")
}

/// Render a time as upstream `HHmm`.
pub fn format_compact_time(time: Time) -> String {
    time.format(TIME_FORMAT)
        .expect("compact time format is infallible")
}

/// Measurement category reported by an upstream forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Temperature,
    DailyMax,
    DailyMin,
    Sky,
    PrecipitationType,
    PrecipitationProbability,
    PrecipitationAmount,
    Humidity,
    WindSpeed,
}

impl Category {
    /// Wire code used by the grid-based upstream.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Temperature => "TMP",
            Self::DailyMax => "TMX",
            Self::DailyMin => "TMN",
            Self::Sky => "SKY",
            Self::PrecipitationType => "PTY",
            Self::PrecipitationProbability => "POP",
            Self::PrecipitationAmount => "PCP",
            Self::Humidity => "REH",
            Self::WindSpeed => "WSD",
        }
    }

    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        match code {
            "TMP" => Ok(Self::Temperature),
            "TMX" => Ok(Self::DailyMax),
            "TMN" => Ok(Self::DailyMin),
            "SKY" => Ok(Self::Sky),
            "PTY" => Ok(Self::PrecipitationType),
            "POP" => Ok(Self::PrecipitationProbability),
            "PCP" => Ok(Self::PrecipitationAmount),
            "REH" => Ok(Self::Humidity),
            "WSD" => Ok(Self::WindSpeed),
            other => Err(ValidationError::UnknownCategory {
                value: other.to_owned(),
            }),
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One forecast instant `(date, time)`, distinct from the issuance time.
///
/// Structural equality; two items describe the same slot iff their keys are
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForecastSlotKey {
    pub date: Date,
    pub time: Time,
}

impl ForecastSlotKey {
    pub const fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }

    /// The forecast instant in the location's civil zone.
    pub fn instant(self, offset: UtcOffset) -> OffsetDateTime {
        OffsetDateTime::new_in_offset(self.date, self.time, offset)
    }

    /// Same time-of-day on the previous calendar day.
    pub fn prior_day(self) -> Self {
        Self {
            date: self.date.previous_day().unwrap_or(self.date),
            time: self.time,
        }
    }

    /// Same date shifted by whole hours; `None` when the shift crosses a
    /// date boundary (the widening search never leaves the probed day).
    pub fn shifted_hours(self, hours: i64) -> Option<Self> {
        let total = i64::from(self.time.hour()) + hours;
        if !(0..24).contains(&total) {
            return None;
        }
        let time = Time::from_hms(total as u8, self.time.minute(), 0).ok()?;
        Some(Self {
            date: self.date,
            time,
        })
    }
}

impl Display for ForecastSlotKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            format_compact_date(self.date),
            format_compact_time(self.time)
        )
    }
}

/// A published bulletin base `(date, time)`.
///
/// Newer issuances supersede older ones for the same slot; the derived
/// ordering compares `(date, time)` lexicographically, so "most recently
/// issued wins" is a plain `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Issuance {
    pub date: Date,
    pub time: Time,
}

impl Issuance {
    pub const fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }

    /// The publication instant in the given civil zone.
    pub fn instant(self, offset: UtcOffset) -> OffsetDateTime {
        OffsetDateTime::new_in_offset(self.date, self.time, offset)
    }
}

impl Display for Issuance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}",
            format_compact_date(self.date),
            format_compact_time(self.time)
        )
    }
}

/// One upstream-reported value for one category at one slot.
///
/// Immutable; adapters build these fresh per call and stamp them with the
/// issuance actually requested so deduplication can compare recency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawForecastItem {
    pub category: Category,
    pub forecast_date: Date,
    pub forecast_time: Time,
    pub issue_date: Date,
    pub issue_time: Time,
    pub value: String,
    pub grid: GridPoint,
}

impl RawForecastItem {
    pub fn new(
        category: Category,
        slot: ForecastSlotKey,
        issuance: Issuance,
        value: impl Into<String>,
        grid: GridPoint,
    ) -> Self {
        Self {
            category,
            forecast_date: slot.date,
            forecast_time: slot.time,
            issue_date: issuance.date,
            issue_time: issuance.time,
            value: value.into(),
            grid,
        }
    }

    pub const fn slot(&self) -> ForecastSlotKey {
        ForecastSlotKey::new(self.forecast_date, self.forecast_time)
    }

    pub const fn issuance(&self) -> Issuance {
        Issuance::new(self.issue_date, self.issue_time)
    }

    /// The numeric reading, when the category carries one.
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}
