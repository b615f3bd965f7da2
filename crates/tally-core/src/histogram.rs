//! Completion counts for the last seven calendar days.

use chrono::NaiveDate;
use serde::Serialize;
use tally_domain::HabitCompletion;

use crate::time::days_before;

pub const HISTOGRAM_DAYS: usize = 7;

/// Per-day completion counts across all habits, oldest first, ending at `ending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyHistogram {
    pub ending: NaiveDate,
    pub counts: [u32; HISTOGRAM_DAYS],
}

impl WeeklyHistogram {
    pub fn empty(ending: NaiveDate) -> Self {
        Self {
            ending,
            counts: [0; HISTOGRAM_DAYS],
        }
    }

    /// Completions recorded on the last day of the window.
    pub fn today(&self) -> u32 {
        self.counts[HISTOGRAM_DAYS - 1]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Pairs every count with its calendar day, oldest first.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.counts.iter().enumerate().map(move |(idx, count)| {
            let offset = (HISTOGRAM_DAYS - 1 - idx) as u32;
            (days_before(self.ending, offset), *count)
        })
    }
}

/// Builds the seven-day histogram ending at `today`.
pub fn weekly_histogram(completions: &[HabitCompletion], today: NaiveDate) -> WeeklyHistogram {
    let mut histogram = WeeklyHistogram::empty(today);
    for completion in completions {
        let offset = (today - completion.completed_on).num_days();
        if (0..HISTOGRAM_DAYS as i64).contains(&offset) {
            histogram.counts[HISTOGRAM_DAYS - 1 - offset as usize] += 1;
        }
    }
    histogram
}
