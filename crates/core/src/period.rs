use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Calendar-month token (`YYYY-MM`) over which session quotas are counted.
///
/// Periods are always computed in UTC so every instance agrees on the
/// month boundary regardless of the host timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

impl PeriodKey {
    /// Build a period from a year and a 1-based month.
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidPeriod(format!("{year:04}-{month:02}")));
        }
        if !(0..=9999).contains(&year) {
            return Err(CoreError::InvalidPeriod(format!("{year}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// The period containing the given instant.
    #[must_use]
    pub fn from_datetime(at: &DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The period immediately after this one.
    #[must_use]
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidPeriod(s.to_owned());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4
            || month.len() != 2
            || !year.bytes().all(|b| b.is_ascii_digit())
            || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(p: PeriodKey) -> Self {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn formats_zero_padded() {
        let at = Utc.with_ymd_and_hms(2024, 7, 3, 12, 0, 0).unwrap();
        assert_eq!(PeriodKey::from_datetime(&at).to_string(), "2024-07");
    }

    #[test]
    fn utc_boundary() {
        let last = Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap();
        let first = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(PeriodKey::from_datetime(&last).to_string(), "2024-05");
        assert_eq!(PeriodKey::from_datetime(&first).to_string(), "2024-06");
    }

    #[test]
    fn parse_roundtrip_and_rejects_garbage() {
        let p: PeriodKey = "2024-12".parse().unwrap();
        assert_eq!(p.year(), 2024);
        assert_eq!(p.month(), 12);
        assert_eq!(p.next().to_string(), "2025-01");

        for bad in ["2024-13", "2024-00", "24-01", "2024-1", "2024/01", "abcd-ef", ""] {
            assert!(bad.parse::<PeriodKey>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn ordering_follows_calendar() {
        let may: PeriodKey = "2024-05".parse().unwrap();
        let june: PeriodKey = "2024-06".parse().unwrap();
        let next_year: PeriodKey = "2025-01".parse().unwrap();
        assert!(may < june);
        assert!(june < next_year);
    }
}
