//! Date selector to timestamp conversion for the date filters.
//!
//! "From" dates cover the whole selected day starting at 00:00:00 UTC and
//! "to" dates end at 23:59:59 UTC. Disabled dates convert to 0.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::ReportError;

/// A calendar date picked in a date filter.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct DateSelection {
    #[serde(deserialize_with = "lenient_u32")]
    pub day: u32,

    #[serde(deserialize_with = "lenient_u32")]
    pub month: u32,

    #[serde(deserialize_with = "lenient_i32")]
    pub year: i32,

    /// Whether the date takes part in filtering.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub enabled: bool,
}

/// Request body for timestamp conversion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub datefrom: Option<DateSelection>,

    #[serde(default)]
    pub dateto: Option<DateSelection>,
}

/// A problem found while converting dates.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Warning {
    /// Which input the warning is about.
    pub item: String,

    pub warningcode: String,

    pub message: String,
}

/// Converted timestamps. When `warnings` is non-empty the timestamps must
/// not be applied to a report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Timestamps {
    pub timestampfrom: i64,
    pub timestampto: i64,
    pub warnings: Vec<Warning>,
}

impl Timestamps {
    pub fn is_valid(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl DateSelection {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            day,
            month,
            year,
            enabled: true,
        }
    }

    fn date(&self) -> Result<NaiveDate, ReportError> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or(ReportError::InvalidDate {
            year: self.year,
            month: self.month,
            day: self.day,
        })
    }

    /// Unix timestamp of 00:00:00 UTC on this day.
    pub fn start_of_day(&self) -> Result<i64, ReportError> {
        Ok(self.date()?.and_time(NaiveTime::MIN).and_utc().timestamp())
    }

    /// Unix timestamp of 23:59:59 UTC on this day.
    pub fn end_of_day(&self) -> Result<i64, ReportError> {
        let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        Ok(self.date()?.and_time(end).and_utc().timestamp())
    }
}

/// Convert the selected dates to filter timestamps.
pub fn convert(range: &DateRange) -> Timestamps {
    let mut warnings = Vec::new();

    let timestampfrom = match range.datefrom.filter(|d| d.enabled) {
        Some(date) => match date.start_of_day() {
            Ok(ts) => ts,
            Err(e) => {
                warnings.push(invalid_date_warning("datefrom", "From", &e));
                0
            }
        },
        None => 0,
    };

    let timestampto = match range.dateto.filter(|d| d.enabled) {
        Some(date) => match date.end_of_day() {
            Ok(ts) => ts,
            Err(e) => {
                warnings.push(invalid_date_warning("dateto", "To", &e));
                0
            }
        },
        None => 0,
    };

    if timestampfrom > 0 && timestampto > 0 && timestampfrom > timestampto {
        warnings.push(Warning {
            item: "dates".to_string(),
            warningcode: "invaliddaterange".to_string(),
            message: "The 'From' date must be before the 'To' date.".to_string(),
        });
    }

    if !warnings.is_empty() {
        tracing::debug!(count = warnings.len(), "date filter conversion produced warnings");
    }

    Timestamps {
        timestampfrom,
        timestampto,
        warnings,
    }
}

fn invalid_date_warning(item: &str, label: &str, error: &ReportError) -> Warning {
    Warning {
        item: item.to_string(),
        warningcode: "invaliddate".to_string(),
        message: format!("The '{label}' date is invalid: {error}."),
    }
}

/// Numbers arrive from form widgets either as JSON numbers or strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    fn into_i64<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected a number, got '{s}'"))),
        }
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = NumberOrString::deserialize(deserializer)?.into_i64()?;
    u32::try_from(value).map_err(serde::de::Error::custom)
}

fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = NumberOrString::deserialize(deserializer)?.into_i64()?;
    i32::try_from(value).map_err(serde::de::Error::custom)
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(i64),
        String(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Number(n) => Ok(n != 0),
        Flag::String(s) => match s.trim() {
            "1" | "true" => Ok(true),
            "0" | "false" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a flag, got '{other}'"
            ))),
        },
    }
}
