//! Trading-day gate.
//!
//! The polling daemon runs from a scheduler every morning; this predicate
//! decides whether there is a session to poll at all. The national-holiday
//! table is an external concern, so the check sits behind a trait and the
//! shipped implementation covers what never changes: weekends and the
//! exchange's fixed year-end/new-year closures, plus an injectable list of
//! extra closure dates.

use chrono::{Datelike, NaiveDate, Weekday};

pub trait TradingCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool;
}

/// Tokyo Stock Exchange closure rules.
#[derive(Debug, Clone, Default)]
pub struct JpxCalendar {
    extra_closures: Vec<NaiveDate>,
}

impl JpxCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds ad-hoc closure dates (national holidays, disaster closures).
    pub fn with_closures(closures: Vec<NaiveDate>) -> Self {
        Self {
            extra_closures: closures,
        }
    }

    /// Reads extra closures from `MARKET_HOLIDAYS` (comma-separated
    /// `YYYY-MM-DD`), ignoring entries that do not parse.
    pub fn from_env() -> Self {
        let closures = std::env::var("MARKET_HOLIDAYS")
            .map(|raw| {
                raw.split(',')
                    .filter_map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                    .collect()
            })
            .unwrap_or_default();
        Self::with_closures(closures)
    }
}

impl TradingCalendar for JpxCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        // Exchange year-end/new-year closure: Dec 31 and Jan 1-3.
        let closed_fixed = matches!(
            (date.month(), date.day()),
            (12, 31) | (1, 1) | (1, 2) | (1, 3)
        );
        if closed_fixed {
            return false;
        }
        !self.extra_closures.contains(&date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekends_are_closed() {
        let cal = JpxCalendar::new();
        assert!(!cal.is_trading_day(d(2024, 1, 6))); // Saturday
        assert!(!cal.is_trading_day(d(2024, 1, 7))); // Sunday
        assert!(cal.is_trading_day(d(2024, 1, 9))); // Tuesday
    }

    #[test]
    fn year_end_and_new_year_are_closed() {
        let cal = JpxCalendar::new();
        assert!(!cal.is_trading_day(d(2024, 12, 31)));
        assert!(!cal.is_trading_day(d(2025, 1, 1)));
        assert!(!cal.is_trading_day(d(2025, 1, 2)));
        assert!(!cal.is_trading_day(d(2025, 1, 3)));
    }

    #[test]
    fn extra_closures_are_respected() {
        let cal = JpxCalendar::with_closures(vec![d(2024, 2, 12)]);
        assert!(!cal.is_trading_day(d(2024, 2, 12)));
        assert!(cal.is_trading_day(d(2024, 2, 13)));
    }
}
