//! Completion toggling on top of the store's point queries.

use chrono::NaiveDate;
use tally_domain::HabitCompletion;
use tracing::info;
use uuid::Uuid;

use crate::{storage::TrackerStore, CoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Marked,
    Unmarked,
    /// The habit was already in the requested state.
    Unchanged,
}

/// Brings the (habit, day) completion into the requested state.
///
/// Unmarking a day with no completion is a no-op; marking an already marked day
/// never creates a duplicate.
pub fn set_completion(
    store: &dyn TrackerStore,
    habit_id: Uuid,
    day: NaiveDate,
    completed: bool,
) -> Result<ToggleOutcome, CoreError> {
    let existing = store.completion(habit_id, day)?;
    let outcome = match (existing, completed) {
        (Some(completion), false) => {
            store.delete_completion(completion.id)?;
            ToggleOutcome::Unmarked
        }
        (None, true) => {
            store.insert_completion(HabitCompletion::new(habit_id, day))?;
            ToggleOutcome::Marked
        }
        _ => ToggleOutcome::Unchanged,
    };
    info!(%habit_id, %day, ?outcome, "completion set");
    Ok(outcome)
}

/// Flips the (habit, day) completion based on what storage currently holds.
pub fn toggle_completion(
    store: &dyn TrackerStore,
    habit_id: Uuid,
    day: NaiveDate,
) -> Result<ToggleOutcome, CoreError> {
    let completed = store.completion(habit_id, day)?.is_some();
    set_completion(store, habit_id, day, !completed)
}
