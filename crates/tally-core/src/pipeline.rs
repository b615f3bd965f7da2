//! Recomputes read models whenever their upstream tables change.
//!
//! Each [`Aggregator`] is a pure function of a [`TrackerData`] snapshot and the
//! current day. A [`Recomputer`] binds one aggregator to a store subscription and
//! keeps the most recent result in a [`Published`] slot for presentation to read.
//! [`attach`] drives several read models from one subscription and samples the
//! clock once per notification, so every model is computed for the same day.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use chrono::NaiveDate;
use tally_domain::MonthKey;
use tracing::{debug, warn};

use crate::{
    budget::{budget_overview, BudgetOverview},
    dashboard::{build_dashboard, DashboardSnapshot},
    storage::{Change, SubscriptionId, Table, TrackerData, TrackerStore},
    streak::{habit_streaks, HabitWithStreak},
    time::Clock,
    CoreError,
};

pub trait Aggregator: Send + Sync {
    type Output: Send + Sync;

    fn name(&self) -> &'static str;

    /// Tables whose changes invalidate the output.
    fn inputs(&self) -> &'static [Table];

    fn compute(&self, data: &TrackerData, today: NaiveDate) -> Result<Self::Output, CoreError>;
}

/// Habit list with per-habit streaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct HabitsAggregator;

impl Aggregator for HabitsAggregator {
    type Output = Vec<HabitWithStreak>;

    fn name(&self) -> &'static str {
        "habits"
    }

    fn inputs(&self) -> &'static [Table] {
        &[Table::Habits, Table::Completions]
    }

    fn compute(&self, data: &TrackerData, today: NaiveDate) -> Result<Self::Output, CoreError> {
        Ok(habit_streaks(&data.all_habits(), &data.completions, today))
    }
}

/// Budget overview for the month containing the current day.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetAggregator;

impl Aggregator for BudgetAggregator {
    type Output = BudgetOverview;

    fn name(&self) -> &'static str {
        "budget"
    }

    fn inputs(&self) -> &'static [Table] {
        &[Table::Categories, Table::Transactions]
    }

    fn compute(&self, data: &TrackerData, today: NaiveDate) -> Result<Self::Output, CoreError> {
        budget_overview(&data.categories, &data.transactions, MonthKey::of(today))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardAggregator;

impl Aggregator for DashboardAggregator {
    type Output = DashboardSnapshot;

    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn inputs(&self) -> &'static [Table] {
        &[Table::Habits, Table::Completions, Table::Transactions]
    }

    fn compute(&self, data: &TrackerData, today: NaiveDate) -> Result<Self::Output, CoreError> {
        build_dashboard(&data.habits, &data.completions, &data.transactions, today)
    }
}

/// Latest published value of a read model plus a counter of publications.
///
/// Each value is tagged with the store revision it was computed from. A value from
/// an older revision than the one already published is discarded, so overlapping
/// notifications can never roll the model back.
pub struct Published<T> {
    slot: RwLock<Slot<T>>,
}

struct Slot<T> {
    generation: u64,
    revision: u64,
    value: Option<Arc<T>>,
}

impl<T> Published<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Slot {
                generation: 0,
                revision: 0,
                value: None,
            }),
        }
    }

    pub fn latest(&self) -> Option<Arc<T>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    /// Number of values published so far.
    pub fn generation(&self) -> u64 {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// Store revision of the published value.
    pub fn revision(&self) -> u64 {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .revision
    }

    /// Publishes `value` unless a newer revision is already out; returns what is current.
    fn publish(&self, revision: u64, value: T) -> (bool, Arc<T>) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = &slot.value {
            if revision < slot.revision {
                return (false, Arc::clone(current));
            }
        }
        let value = Arc::new(value);
        slot.generation += 1;
        slot.revision = revision;
        slot.value = Some(Arc::clone(&value));
        (true, value)
    }
}

impl<T> Default for Published<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Object-safe face of a [`Recomputer`], letting one subscription drive several.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn refresh(&self, data: &TrackerData, today: NaiveDate) -> Result<(), CoreError>;

    fn on_change(&self, change: &Change, today: NaiveDate);
}

pub struct Recomputer<A: Aggregator> {
    aggregator: A,
    published: Published<A::Output>,
}

impl<A: Aggregator> Recomputer<A> {
    pub fn new(aggregator: A) -> Self {
        Self {
            aggregator,
            published: Published::new(),
        }
    }

    pub fn latest(&self) -> Option<Arc<A::Output>> {
        self.published.latest()
    }

    pub fn generation(&self) -> u64 {
        self.published.generation()
    }

    /// Computes from `data` as of `today` and publishes the result.
    ///
    /// Returns the value current after the call, which is the previously published
    /// one when `data` is older than it.
    pub fn recompute(
        &self,
        data: &TrackerData,
        today: NaiveDate,
    ) -> Result<Arc<A::Output>, CoreError> {
        let output = self.aggregator.compute(data, today)?;
        let (published, current) = self.published.publish(data.revision, output);
        if published {
            debug!(
                aggregator = self.aggregator.name(),
                %today,
                revision = data.revision,
                habits = data.habits.len(),
                completions = data.completions.len(),
                transactions = data.transactions.len(),
                "read model published"
            );
        } else {
            debug!(
                aggregator = self.aggregator.name(),
                revision = data.revision,
                current = self.published.revision(),
                "stale read model discarded"
            );
        }
        Ok(current)
    }

    /// Recomputes when the change touches one of the aggregator's inputs.
    ///
    /// A failed recompute keeps the previous value published.
    pub fn on_change(&self, change: &Change, today: NaiveDate) {
        if !change.touches(self.aggregator.inputs()) {
            return;
        }
        if let Err(err) = self.recompute(&change.snapshot, today) {
            warn!(
                aggregator = self.aggregator.name(),
                error = %err,
                "recompute failed; keeping previous value"
            );
        }
    }
}

impl<A: Aggregator> ReadModel for Recomputer<A> {
    fn name(&self) -> &'static str {
        self.aggregator.name()
    }

    fn refresh(&self, data: &TrackerData, today: NaiveDate) -> Result<(), CoreError> {
        self.recompute(data, today).map(|_| ())
    }

    fn on_change(&self, change: &Change, today: NaiveDate) {
        Recomputer::on_change(self, change, today);
    }
}

/// Publishes initial values and subscribes `models` to future changes.
///
/// The clock is sampled once per notification and shared by every model.
pub fn attach(
    store: &Arc<dyn TrackerStore>,
    clock: Arc<dyn Clock>,
    models: &[Arc<dyn ReadModel>],
) -> Result<SubscriptionId, CoreError> {
    let snapshot = store.snapshot()?;
    let today = clock.today();
    for model in models {
        model.refresh(&snapshot, today)?;
    }
    let targets: Vec<Weak<dyn ReadModel>> = models.iter().map(Arc::downgrade).collect();
    Ok(store.subscribe(Arc::new(move |change: &Change| {
        let today = clock.today();
        for model in targets.iter().filter_map(Weak::upgrade) {
            model.on_change(change, today);
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commands::toggle_completion, store::TableStore, time::FixedClock};
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc, Mutex,
        },
        thread,
    };
    use tally_domain::{BudgetCategory, Habit, HabitColor, Transaction, TransactionKind};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(today()))
    }

    fn attach_one<A>(store: &Arc<dyn TrackerStore>, recomputer: &Arc<Recomputer<A>>)
    where
        A: Aggregator + 'static,
    {
        let model: Arc<dyn ReadModel> = Arc::clone(recomputer) as Arc<dyn ReadModel>;
        attach(store, clock(), &[model]).unwrap();
    }

    struct CountingClock {
        day: NaiveDate,
        calls: AtomicUsize,
    }

    impl Clock for CountingClock {
        fn today(&self) -> NaiveDate {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.day
        }
    }

    #[test]
    fn dashboard_follows_writes() {
        let store: Arc<dyn TrackerStore> = Arc::new(TableStore::in_memory());
        let dashboard = Arc::new(Recomputer::new(DashboardAggregator));
        attach_one(&store, &dashboard);
        assert_eq!(dashboard.generation(), 1);
        assert_eq!(dashboard.latest().unwrap().total_habits, 0);

        let habit = store
            .insert_habit(Habit::new("Read", "", HabitColor::default()))
            .unwrap();
        toggle_completion(store.as_ref(), habit, today()).unwrap();

        let latest = dashboard.latest().unwrap();
        assert_eq!(latest.total_habits, 1);
        assert_eq!(latest.completed_today, 1);
        assert_eq!(latest.top_streak, 1);
        assert_eq!(dashboard.generation(), 3);
    }

    #[test]
    fn unrelated_tables_do_not_recompute() {
        let store: Arc<dyn TrackerStore> = Arc::new(TableStore::in_memory());
        let habits = Arc::new(Recomputer::new(HabitsAggregator));
        attach_one(&store, &habits);

        store
            .insert_transaction(Transaction::new(5.0, TransactionKind::Income, today()))
            .unwrap();
        assert_eq!(habits.generation(), 1);
    }

    #[test]
    fn budget_recomputes_on_category_delete() {
        let store: Arc<dyn TrackerStore> = Arc::new(TableStore::in_memory());
        let budget = Arc::new(Recomputer::new(BudgetAggregator));
        attach_one(&store, &budget);

        let food = BudgetCategory::new("Food", 100.0, MonthKey::of(today()));
        let food_id = store.insert_category(food).unwrap();
        store
            .insert_transaction(
                Transaction::new(80.0, TransactionKind::Expense, today()).with_category(Some(food_id)),
            )
            .unwrap();
        let overview = budget.latest().unwrap();
        assert_eq!(overview.categories.len(), 1);
        assert_eq!(overview.categories[0].spent, 80.0);

        store.delete_category(food_id).unwrap();
        let overview = budget.latest().unwrap();
        assert!(overview.categories.is_empty());
        assert_eq!(overview.transactions[0].category_id, None);
        assert_eq!(overview.summary.total_expenses, 80.0);
    }

    #[test]
    fn repeated_recompute_is_idempotent() {
        let store = TableStore::in_memory();
        store
            .insert_habit(Habit::new("Read", "", HabitColor::default()))
            .unwrap();
        let recomputer = Recomputer::new(DashboardAggregator);
        let snapshot = store.snapshot().unwrap();
        let first = recomputer.recompute(&snapshot, today()).unwrap();
        let second = recomputer.recompute(&snapshot, today()).unwrap();
        assert_eq!(*first, *second);
        assert_eq!(recomputer.generation(), 2);
    }

    #[test]
    fn dropped_recomputer_is_not_called() {
        let store: Arc<dyn TrackerStore> = Arc::new(TableStore::in_memory());
        let habits = Arc::new(Recomputer::new(HabitsAggregator));
        attach_one(&store, &habits);
        drop(habits);
        store
            .insert_habit(Habit::new("Read", "", HabitColor::default()))
            .unwrap();
    }

    #[test]
    fn failed_recompute_keeps_previous_value() {
        let budget = Recomputer::new(BudgetAggregator);
        let before = budget.recompute(&TrackerData::default(), today()).unwrap();

        let mut broken = TrackerData::default();
        broken.revision = 1;
        broken
            .transactions
            .push(Transaction::new(0.0, TransactionKind::Expense, today()));
        let change = Change {
            tables: vec![Table::Transactions],
            snapshot: Arc::new(broken),
        };
        budget.on_change(&change, today());

        assert_eq!(budget.generation(), 1);
        assert!(Arc::ptr_eq(&budget.latest().unwrap(), &before));
    }

    #[test]
    fn older_revision_never_replaces_newer() {
        let habits = Recomputer::new(HabitsAggregator);
        let mut newer = TrackerData::default();
        newer.revision = 2;
        newer
            .habits
            .push(Habit::new("Read", "", HabitColor::default()));
        let mut older = TrackerData::default();
        older.revision = 1;

        habits.recompute(&newer, today()).unwrap();
        let current = habits.recompute(&older, today()).unwrap();

        assert_eq!(current.len(), 1);
        assert_eq!(habits.latest().unwrap().len(), 1);
        assert_eq!(habits.generation(), 1);
    }

    #[test]
    fn overlapping_notifications_keep_the_newest_revision() {
        let store: Arc<dyn TrackerStore> = Arc::new(TableStore::in_memory());
        let (blocked_tx, blocked_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let gate = Mutex::new(Some((blocked_tx, release_rx)));
        store.subscribe(Arc::new(move |_: &Change| {
            let pending = gate.lock().unwrap().take();
            if let Some((blocked, release)) = pending {
                blocked.send(()).unwrap();
                release.recv().unwrap();
            }
        }));
        let dashboard = Arc::new(Recomputer::new(DashboardAggregator));
        attach_one(&store, &dashboard);

        let first_writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .insert_habit(Habit::new("First", "", HabitColor::default()))
                    .unwrap();
            })
        };
        blocked_rx.recv().unwrap();
        store
            .insert_habit(Habit::new("Second", "", HabitColor::default()))
            .unwrap();
        assert_eq!(dashboard.latest().unwrap().total_habits, 2);

        release_tx.send(()).unwrap();
        first_writer.join().unwrap();

        assert_eq!(store.snapshot().unwrap().habits.len(), 2);
        assert_eq!(dashboard.latest().unwrap().total_habits, 2);
    }

    #[test]
    fn one_change_samples_the_clock_once() {
        let counting = Arc::new(CountingClock {
            day: today(),
            calls: AtomicUsize::new(0),
        });
        let store: Arc<dyn TrackerStore> = Arc::new(TableStore::in_memory());
        let habits = Arc::new(Recomputer::new(HabitsAggregator));
        let dashboard = Arc::new(Recomputer::new(DashboardAggregator));
        let models: [Arc<dyn ReadModel>; 2] = [habits.clone(), dashboard.clone()];
        attach(&store, counting.clone(), &models).unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

        store
            .insert_habit(Habit::new("Read", "", HabitColor::default()))
            .unwrap();

        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
        assert_eq!(habits.generation(), 2);
        assert_eq!(dashboard.generation(), 2);
        assert_eq!(dashboard.latest().unwrap().as_of, today());
    }
}
