//! Domain types representing month-scoped budget categories.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::MonthKey;

/// A spending bucket with a limit that applies to exactly one month of one year.
///
/// Categories do not roll over: a category created for January has no bearing on
/// February transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetCategory {
    pub id: Uuid,
    pub name: String,
    /// Zero means the category is not limit-tracked.
    #[serde(default)]
    pub monthly_limit: f64,
    pub month: u32,
    pub year: i32,
}

impl BudgetCategory {
    pub fn new(name: impl Into<String>, monthly_limit: f64, scope: MonthKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            monthly_limit,
            month: scope.month,
            year: scope.year,
        }
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey {
            year: self.year,
            month: self.month,
        }
    }

    pub fn is_scoped_to(&self, scope: MonthKey) -> bool {
        self.month_key() == scope
    }
}
