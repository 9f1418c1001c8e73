//! `<number><unit>` durations used by `queryFrequency`, `queryPeriod` and
//! `lookbackDuration`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([mhd])$").expect("duration regex must compile"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    fn minutes(self) -> u64 {
        match self {
            DurationUnit::Minutes => 1,
            DurationUnit::Hours => 60,
            DurationUnit::Days => 1440,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("Duration cannot be empty")]
    Empty,
    #[error("Duration must end with 'm', 'h', or 'd'")]
    BadUnit,
    #[error("Duration '{0}' must be a whole number followed by 'm', 'h', or 'd'")]
    BadFormat(String),
    #[error("Duration '{0}' is too large")]
    Overflow(String),
}

/// A parsed duration such as `5m`, `1h` or `14d`. Units are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDuration {
    pub value: u64,
    pub unit: DurationUnit,
    minutes: u64,
}

impl RuleDuration {
    pub fn minutes(&self) -> u64 {
        self.minutes
    }
}

impl FromStr for RuleDuration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, DurationError> {
        let lower = s.to_ascii_lowercase();
        if lower.trim().is_empty() {
            return Err(DurationError::Empty);
        }
        let Some(caps) = DURATION_RE.captures(&lower) else {
            return Err(if lower.ends_with(['m', 'h', 'd']) {
                DurationError::BadFormat(s.to_string())
            } else {
                DurationError::BadUnit
            });
        };
        let value: u64 = caps[1]
            .parse()
            .map_err(|_| DurationError::Overflow(s.to_string()))?;
        let unit = match &caps[2] {
            "m" => DurationUnit::Minutes,
            "h" => DurationUnit::Hours,
            "d" => DurationUnit::Days,
            _ => unreachable!("regex only admits m, h or d"),
        };
        let minutes = value
            .checked_mul(unit.minutes())
            .ok_or_else(|| DurationError::Overflow(s.to_string()))?;
        Ok(RuleDuration {
            value,
            unit,
            minutes,
        })
    }
}

impl fmt::Display for RuleDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            DurationUnit::Minutes => 'm',
            DurationUnit::Hours => 'h',
            DurationUnit::Days => 'd',
        };
        write!(f, "{}{unit}", self.value)
    }
}
