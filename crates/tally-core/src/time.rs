//! Calendar-day resolution and day arithmetic.

use chrono::{Duration, Local, NaiveDate};
use tally_domain::MonthKey;

/// Clock abstracts access to the current calendar day so computations remain deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current local calendar day.
    fn today(&self) -> NaiveDate;

    /// Returns `today` minus `n` calendar days.
    fn days_ago(&self, n: u32) -> NaiveDate {
        days_before(self.today(), n)
    }

    /// Returns the month containing `today`.
    fn current_month(&self) -> MonthKey {
        MonthKey::of(self.today())
    }
}

/// Reads the wall clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always answers the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Steps back `n` calendar days, crossing month and year boundaries.
pub fn days_before(day: NaiveDate, n: u32) -> NaiveDate {
    day - Duration::days(i64::from(n))
}

/// The `YYYY-MM` prefix used to select a month's transactions.
pub fn month_prefix(month: u32, year: i32) -> String {
    format!("{:04}-{:02}", year, month)
}
