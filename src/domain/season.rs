//! Calendar months and ingredient seasons.
//!
//! A season runs from `start` to `end` inclusive. When `end` is earlier in
//! the year than `start` the season wraps through December into January,
//! so `Nov..Feb` covers November, December, January and February.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("month must be between 1 and 12, got {0}")]
pub struct InvalidMonth(pub i64);

/// Month of the year, 1 = January through 12 = December.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Month(u8);

impl Month {
    pub fn new(month: i64) -> Result<Self, InvalidMonth> {
        if (1..=12).contains(&month) {
            Ok(Month(month as u8))
        } else {
            Err(InvalidMonth(month))
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// The following month, December rolls over to January.
    pub fn succ(&self) -> Month {
        Month(self.0 % 12 + 1)
    }
}

impl TryFrom<i64> for Month {
    type Error = InvalidMonth;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Month::new(value)
    }
}

impl From<Month> for i64 {
    fn from(month: Month) -> Self {
        month.0 as i64
    }
}

/// An inclusive run of months, possibly wrapping past December.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Season {
    pub start: Month,
    pub end: Month,
}

impl Season {
    pub fn new(start: Month, end: Month) -> Self {
        Season { start, end }
    }

    /// Build a season from raw month numbers.
    pub fn from_numbers(start: i64, end: i64) -> Result<Self, InvalidMonth> {
        Ok(Season::new(Month::new(start)?, Month::new(end)?))
    }

    /// True when the season crosses the turn of the year.
    pub fn wraps(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, month: Month) -> bool {
        if self.wraps() {
            month >= self.start || month <= self.end
        } else {
            month >= self.start && month <= self.end
        }
    }

    /// Months in the season, in calendar order starting at `start`.
    pub fn months(&self) -> Vec<Month> {
        let mut months = vec![self.start];
        let mut current = self.start;
        while current != self.end {
            current = current.succ();
            months.push(current);
        }
        months
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(n: i64) -> Month {
        Month::new(n).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        assert!(Month::new(1).is_ok());
        assert!(Month::new(12).is_ok());
        assert_eq!(Month::new(0), Err(InvalidMonth(0)));
        assert_eq!(Month::new(13), Err(InvalidMonth(13)));
    }

    #[test]
    fn test_month_succ_wraps() {
        assert_eq!(m(12).succ(), m(1));
        assert_eq!(m(5).succ(), m(6));
    }

    #[test]
    fn test_plain_season() {
        let season = Season::new(m(5), m(7));
        assert!(!season.wraps());
        assert!(season.contains(m(6)));
        assert!(!season.contains(m(8)));
        assert_eq!(season.months(), vec![m(5), m(6), m(7)]);
    }

    #[test]
    fn test_wrapping_season() {
        let season = Season::new(m(11), m(2));
        assert!(season.wraps());
        assert!(season.contains(m(12)));
        assert!(season.contains(m(1)));
        assert!(!season.contains(m(6)));
        assert_eq!(season.months(), vec![m(11), m(12), m(1), m(2)]);
        assert_eq!(season.months().len(), 4);
    }

    #[test]
    fn test_single_month_season() {
        let season = Season::new(m(3), m(3));
        assert!(!season.wraps());
        assert_eq!(season.months(), vec![m(3)]);
    }

    #[test]
    fn test_month_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Month>("13").is_err());
        let season: Season = serde_json::from_str(r#"{"start":10,"end":4}"#).unwrap();
        assert_eq!(season, Season::new(m(10), m(4)));
    }
}
