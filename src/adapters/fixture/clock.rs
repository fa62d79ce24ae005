//! Clock pinned to a single instant.

use chrono::{DateTime, Utc};

use crate::ports::clock::Clock;

/// Clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Pins the clock to midnight UTC of the given `YYYY-MM-DD` date.
    ///
    /// # Panics
    ///
    /// Panics if `date` is not a valid calendar date; intended for test setup.
    #[must_use]
    pub fn at_date(date: &str) -> Self {
        let day = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap_or_else(|e| panic!("invalid fixture date {date}: {e}"));
        Self(day.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_date_is_midnight_utc() {
        let clock = FixedClock::at_date("2026-03-01");
        assert_eq!(clock.now().to_rfc3339(), "2026-03-01T00:00:00+00:00");
    }
}
