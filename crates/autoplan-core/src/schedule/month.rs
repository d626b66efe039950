use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar month, displayed and stored as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    first: NaiveDate,
}

/// Error returned when a month string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month: {0:?} (expected YYYY-MM, YYYY-MM-DD or an RFC 3339 timestamp)")]
pub struct MonthParseError(pub String);

impl Month {
    /// Build a month from its year and 1-based month number.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=9999).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    /// The month a date falls in.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first.pred_opt().unwrap_or(self.first)
    }

    /// The following month.
    pub fn next(&self) -> Self {
        Self {
            first: self
                .first
                .checked_add_months(Months::new(1))
                .unwrap_or(self.first),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first && date <= self.last_day()
    }

    /// Every day of the month, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let last = self.last_day();
        self.first.iter_days().take_while(move |d| *d <= last)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    /// Accepts `YYYY-MM`, `YYYY-MM-DD`, RFC 3339 timestamps and naive
    /// `YYYY-MM-DDTHH:MM:SS` timestamps.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || MonthParseError(s.to_owned());

        if s.len() == 7 {
            let (year, month) = s.split_once('-').ok_or_else(err)?;
            let year: i32 = year.parse().map_err(|_| err())?;
            let month: u32 = month.parse().map_err(|_| err())?;
            return Self::new(year, month).ok_or_else(err);
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::containing(date));
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::containing(ts.date_naive()));
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Self::containing(ts.date()));
        }
        Err(err())
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_accepted_formats() {
        let expected = Month::new(2026, 11).unwrap();
        for input in [
            "2026-11",
            "2026-11-20",
            " 2026-11-01 ",
            "2026-11-15T10:00:00Z",
            "2026-11-15T10:00:00-03:00",
            "2026-11-15T10:00:00.123",
        ] {
            assert_eq!(input.parse::<Month>().unwrap(), expected, "input {input:?}");
        }
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", "2026-13", "2026-00", "11/2026", "novembro", "2026-1"] {
            assert!(input.parse::<Month>().is_err(), "input {input:?}");
        }
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(Month::new(2026, 3).unwrap().to_string(), "2026-03");
    }

    #[test]
    fn month_bounds() {
        let feb = Month::new(2028, 2).unwrap();
        assert_eq!(feb.first_day(), date(2028, 2, 1));
        assert_eq!(feb.last_day(), date(2028, 2, 29));
        assert_eq!(feb.days().count(), 29);

        let dec = Month::new(2026, 12).unwrap();
        assert_eq!(dec.last_day(), date(2026, 12, 31));
        assert_eq!(dec.next(), Month::new(2027, 1).unwrap());
        assert!(dec.contains(date(2026, 12, 31)));
        assert!(!dec.contains(date(2027, 1, 1)));
    }

    #[test]
    fn serde_uses_display_form() {
        let month = Month::new(2026, 11).unwrap();
        assert_eq!(serde_json::to_value(month).unwrap(), serde_json::json!("2026-11"));
        let back: Month = serde_json::from_value(serde_json::json!("2026-11-30")).unwrap();
        assert_eq!(back, month);
    }
}
