//! Coded-field mapping tables.
//!
//! Every provider-specific code is normalized through a single data-driven
//! table here instead of conditionals scattered through the adapters; tests
//! walk the tables exhaustively.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Canonical sky condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkyCondition {
    Clear,
    MostlyCloudy,
    Cloudy,
    Unknown,
}

const SKY_TABLE: &[(i32, SkyCondition)] = &[
    (1, SkyCondition::Clear),
    (3, SkyCondition::MostlyCloudy),
    (4, SkyCondition::Cloudy),
];

impl SkyCondition {
    pub fn from_code(code: i32) -> Self {
        SKY_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, condition)| *condition)
            .unwrap_or(Self::Unknown)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::MostlyCloudy => "mostly_cloudy",
            Self::Cloudy => "cloudy",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for SkyCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical precipitation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecipitationForm {
    None,
    Rain,
    RainSnow,
    Snow,
    Shower,
    Unknown,
}

const PRECIPITATION_TABLE: &[(i32, PrecipitationForm)] = &[
    (0, PrecipitationForm::None),
    (1, PrecipitationForm::Rain),
    (2, PrecipitationForm::RainSnow),
    (3, PrecipitationForm::Snow),
    (4, PrecipitationForm::Shower),
];

impl PrecipitationForm {
    pub fn from_code(code: i32) -> Self {
        PRECIPITATION_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, form)| *form)
            .unwrap_or(Self::Unknown)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rain => "rain",
            Self::RainSnow => "rain_snow",
            Self::Snow => "snow",
            Self::Shower => "shower",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for PrecipitationForm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wind strength bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindCategory {
    Weak,
    Moderate,
    Strong,
}

const MODERATE_WIND_MPS: f64 = 4.0;
const STRONG_WIND_MPS: f64 = 9.0;

impl WindCategory {
    /// Bucket a wind speed in m/s.
    pub fn from_speed(speed_mps: f64) -> Self {
        if speed_mps >= STRONG_WIND_MPS {
            Self::Strong
        } else if speed_mps >= MODERATE_WIND_MPS {
            Self::Moderate
        } else {
            Self::Weak
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

impl Display for WindCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const NO_PRECIPITATION_TEXTS: &[&str] = &["no precipitation", "less than 1mm", "-", ""];

/// Parse an upstream precipitation amount into an mm/h lower-bound estimate.
///
/// The upstream mixes free text ("no precipitation"), banded ranges
/// ("1~4mm", "50mm~"), and plain readings ("3.2mm"); ranges collapse to
/// their lower bound, unparseable input to 0.0.
pub fn parse_precipitation_amount(raw: &str) -> f64 {
    let text = raw.trim().to_ascii_lowercase();
    if NO_PRECIPITATION_TEXTS.contains(&text.as_str()) {
        return 0.0;
    }

    let lower_bound = match text.split_once('~') {
        Some((low, _)) => low,
        None => text.as_str(),
    };
    let digits: String = lower_bound
        .chars()
        .take_while(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect();

    digits.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}
