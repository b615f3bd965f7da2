//! Consecutive-day streaks ending today.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use tally_domain::{Habit, HabitCompletion};
use uuid::Uuid;

/// Streak state of a single habit as of one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakResult {
    pub habit_id: Uuid,
    pub streak: u32,
    pub completed_today: bool,
}

/// A habit paired with its current streak, as the habit list displays it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitWithStreak {
    pub habit: Habit,
    pub streak: u32,
    pub completed_today: bool,
}

/// Counts consecutive days ending at `today` that appear in `days`.
///
/// A streak that does not include `today` is broken, so the result is 0 whenever
/// `today` itself is missing. Duplicate days count once.
pub fn current_streak<I>(days: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: HashSet<NaiveDate> = days.into_iter().collect();
    walk_back(&days, today)
}

fn walk_back(days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut cursor = Some(today);
    while let Some(day) = cursor.filter(|day| days.contains(day)) {
        streak += 1;
        cursor = day.pred_opt();
    }
    streak
}

/// Computes the streak of `habit_id` from a completion list that may cover other habits.
pub fn streak_for_habit(
    habit_id: Uuid,
    completions: &[HabitCompletion],
    today: NaiveDate,
) -> StreakResult {
    let days: HashSet<NaiveDate> = completions
        .iter()
        .filter(|completion| completion.habit_id == habit_id)
        .map(|completion| completion.completed_on)
        .collect();
    StreakResult {
        habit_id,
        streak: walk_back(&days, today),
        completed_today: days.contains(&today),
    }
}

/// Groups completion days by habit in one pass.
pub fn completion_days_by_habit(
    completions: &[HabitCompletion],
) -> HashMap<Uuid, HashSet<NaiveDate>> {
    let mut by_habit: HashMap<Uuid, HashSet<NaiveDate>> = HashMap::new();
    for completion in completions {
        by_habit
            .entry(completion.habit_id)
            .or_default()
            .insert(completion.completed_on);
    }
    by_habit
}

/// Streaks for every habit, in the order the habits were supplied.
pub fn habit_streaks(
    habits: &[Habit],
    completions: &[HabitCompletion],
    today: NaiveDate,
) -> Vec<HabitWithStreak> {
    let by_habit = completion_days_by_habit(completions);
    let empty = HashSet::new();
    habits
        .iter()
        .map(|habit| {
            let days = by_habit.get(&habit.id).unwrap_or(&empty);
            HabitWithStreak {
                habit: habit.clone(),
                streak: walk_back(days, today),
                completed_today: days.contains(&today),
            }
        })
        .collect()
}

/// The longest current streak across `habits`, or 0 when there are none.
pub fn top_streak(habits: &[Habit], completions: &[HabitCompletion], today: NaiveDate) -> u32 {
    let by_habit = completion_days_by_habit(completions);
    habits
        .iter()
        .filter_map(|habit| by_habit.get(&habit.id))
        .map(|days| walk_back(days, today))
        .max()
        .unwrap_or(0)
}
