//! Cross-domain read model for the top-level view.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use tally_domain::{Habit, HabitCompletion, MonthKey, Transaction};
use tracing::debug;

use crate::{
    budget::{transactions_in_month, BudgetSummary},
    histogram::{weekly_histogram, WeeklyHistogram},
    streak::top_streak,
    CoreError,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub as_of: NaiveDate,
    pub total_habits: usize,
    /// Distinct habits with a completion dated `as_of`.
    pub completed_today: usize,
    /// `completed_today / total_habits`, 0 when there are no habits.
    pub completion_ratio: f64,
    pub top_streak: u32,
    pub weekly: WeeklyHistogram,
    /// Totals for the calendar month containing `as_of`.
    pub budget: BudgetSummary,
}

impl DashboardSnapshot {
    pub fn empty(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            total_habits: 0,
            completed_today: 0,
            completion_ratio: 0.0,
            top_streak: 0,
            weekly: WeeklyHistogram::empty(as_of),
            budget: BudgetSummary::default(),
        }
    }
}

/// Recomputes the whole dashboard from the three upstream tables.
///
/// `transactions` may hold any range of dates; only the current month is totalled.
pub fn build_dashboard(
    habits: &[Habit],
    completions: &[HabitCompletion],
    transactions: &[Transaction],
    today: NaiveDate,
) -> Result<DashboardSnapshot, CoreError> {
    let habit_ids: HashSet<_> = habits.iter().map(|habit| habit.id).collect();
    let completed_today = completions
        .iter()
        .filter(|completion| completion.completed_on == today)
        .filter(|completion| habit_ids.contains(&completion.habit_id))
        .map(|completion| completion.habit_id)
        .collect::<HashSet<_>>()
        .len();
    let total_habits = habits.len();

    let month = MonthKey::of(today);
    let budget = BudgetSummary::from_transactions(transactions_in_month(transactions, month))?;

    debug!(
        habits = total_habits,
        completions = completions.len(),
        transactions = transactions.len(),
        %today,
        "dashboard recomputed"
    );

    Ok(DashboardSnapshot {
        as_of: today,
        total_habits,
        completed_today,
        completion_ratio: completion_ratio(completed_today, total_habits),
        top_streak: top_streak(habits, completions, today),
        weekly: weekly_histogram(completions, today),
        budget,
    })
}

/// `completed / total`, 0 when `total` is 0.
pub fn completion_ratio(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}
