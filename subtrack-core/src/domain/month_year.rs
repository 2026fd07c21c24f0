//! Month-year calendar value
//!
//! Subscriptions only track which month they start and end in. The textual
//! form is always `MM-YYYY` (e.g. `07-2025`); storage uses the first day of
//! the month as a SQL `DATE`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn month_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{2})-(\d{4})$").expect("valid month-year regex"))
}

/// A calendar month in a given year
///
/// Ordering is chronological: by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthYear {
    // Field order matters for the derived Ord
    year: u16,
    month: u8,
}

/// Error returned when a string is not a valid `MM-YYYY` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMonthYearError(String);

impl fmt::Display for ParseMonthYearError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected MM-YYYY, got {:?}", self.0)
    }
}

impl std::error::Error for ParseMonthYearError {}

impl MonthYear {
    /// Upper bound used when a cost query has no explicit period end
    pub const FAR_FUTURE: MonthYear = MonthYear {
        year: 2100,
        month: 12,
    };

    pub fn new(month: u32, year: i32) -> Option<Self> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return None;
        }
        Some(Self {
            year: year as u16,
            month: month as u8,
        })
    }

    pub fn month(&self) -> u32 {
        u32::from(self.month)
    }

    pub fn year(&self) -> i32 {
        i32::from(self.year)
    }

    /// First day of the month, the representation stored in the database
    pub fn first_day(&self) -> NaiveDate {
        // Components are range-checked on construction
        NaiveDate::from_ymd_opt(self.year(), self.month(), 1).unwrap_or(NaiveDate::MIN)
    }

    /// Truncate a full date to its month
    pub fn from_date(date: NaiveDate) -> Option<Self> {
        Self::new(date.month(), date.year())
    }
}

impl FromStr for MonthYear {
    type Err = ParseMonthYearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = month_year_pattern()
            .captures(s)
            .ok_or_else(|| ParseMonthYearError(s.to_string()))?;

        let month: u32 = caps[1]
            .parse()
            .map_err(|_| ParseMonthYearError(s.to_string()))?;
        let year: i32 = caps[2]
            .parse()
            .map_err(|_| ParseMonthYearError(s.to_string()))?;

        Self::new(month, year).ok_or_else(|| ParseMonthYearError(s.to_string()))
    }
}

impl fmt::Display for MonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month, self.year)
    }
}

impl Serialize for MonthYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
