//! Application facade wiring storage, the clock, the user profile and the
//! derived read models together.

use std::sync::Arc;

use chrono::NaiveDate;
use tally_config::{Config, ConfigManager};
use tally_core::{
    attach, month_prefix,
    validation::{parse_amount, parse_limit, require_month, require_name},
    Aggregator, BudgetAggregator, BudgetOverview, Clock, DashboardAggregator, DashboardSnapshot,
    HabitWithStreak, HabitsAggregator, ReadModel, Recomputer, SubscriptionId, TableStore,
    ToggleOutcome, TrackerStore,
};
use tally_domain::{
    BudgetCategory, Habit, HabitColor, HabitCompletion, Transaction, TransactionKind,
};
use tally_storage_json::open_store;
use tracing::info;
use uuid::Uuid;

use crate::TrackerError;

/// Owns the store and keeps the habit, budget and dashboard read models current.
///
/// Every write goes through the store; the recomputers subscribed to it publish
/// fresh read models before the write call returns.
pub struct Tracker {
    store: Arc<dyn TrackerStore>,
    clock: Arc<dyn Clock>,
    config: Config,
    config_manager: Option<ConfigManager>,
    habits: Arc<Recomputer<HabitsAggregator>>,
    budget: Arc<Recomputer<BudgetAggregator>>,
    dashboard: Arc<Recomputer<DashboardAggregator>>,
    subscription: SubscriptionId,
}

impl Tracker {
    pub fn new(
        store: Arc<dyn TrackerStore>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Result<Self, TrackerError> {
        let habits = Arc::new(Recomputer::new(HabitsAggregator));
        let budget = Arc::new(Recomputer::new(BudgetAggregator));
        let dashboard = Arc::new(Recomputer::new(DashboardAggregator));
        let models: [Arc<dyn ReadModel>; 3] = [habits.clone(), budget.clone(), dashboard.clone()];
        let subscription = attach(&store, Arc::clone(&clock), &models)?;
        Ok(Self {
            store,
            clock,
            config,
            config_manager: None,
            habits,
            budget,
            dashboard,
            subscription,
        })
    }

    /// A tracker with no durable storage.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Result<Self, TrackerError> {
        Self::new(Arc::new(TableStore::in_memory()), clock, Config::default())
    }

    /// Loads the profile through `manager` and opens the JSON store in its data directory.
    pub fn open(manager: ConfigManager, clock: Arc<dyn Clock>) -> Result<Self, TrackerError> {
        let config = manager.load()?;
        let data_dir = config.resolve_data_dir();
        let store = open_store(&data_dir)?;
        info!(data_dir = %data_dir.display(), "tracker opened");
        let mut tracker = Self::new(Arc::new(store), clock, config)?;
        tracker.config_manager = Some(manager);
        Ok(tracker)
    }

    pub fn store(&self) -> &Arc<dyn TrackerStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // Profile

    pub fn initials(&self) -> String {
        self.config.initials()
    }

    /// Updates the display name, saving the profile when it was loaded from disk.
    pub fn set_display_name(&mut self, input: &str) -> Result<(), TrackerError> {
        self.config.set_display_name(input);
        if let Some(manager) = &self.config_manager {
            manager.save(&self.config)?;
        }
        info!(display_name = %self.config.display_name, "profile updated");
        Ok(())
    }

    // Read models

    pub fn habits(&self) -> Result<Arc<Vec<HabitWithStreak>>, TrackerError> {
        self.latest(&self.habits)
    }

    pub fn budget(&self) -> Result<Arc<BudgetOverview>, TrackerError> {
        self.latest(&self.budget)
    }

    pub fn dashboard(&self) -> Result<Arc<DashboardSnapshot>, TrackerError> {
        self.latest(&self.dashboard)
    }

    /// Recomputes every read model against the current day, e.g. after midnight.
    pub fn refresh(&self) -> Result<(), TrackerError> {
        let snapshot = self.store.snapshot()?;
        let today = self.today();
        self.habits.recompute(&snapshot, today)?;
        self.budget.recompute(&snapshot, today)?;
        self.dashboard.recompute(&snapshot, today)?;
        Ok(())
    }

    fn latest<A: Aggregator>(
        &self,
        recomputer: &Recomputer<A>,
    ) -> Result<Arc<A::Output>, TrackerError> {
        if let Some(value) = recomputer.latest() {
            return Ok(value);
        }
        let snapshot = self.store.snapshot()?;
        Ok(recomputer.recompute(&snapshot, self.today())?)
    }

    // Habits

    /// Creates a habit; `color` falls back to the profile's default habit color.
    pub fn add_habit(
        &self,
        name: &str,
        description: &str,
        color: Option<HabitColor>,
    ) -> Result<Uuid, TrackerError> {
        let name = require_name("habit", name)?;
        let color = color.unwrap_or(self.config.default_habit_color);
        let id = self
            .store
            .insert_habit(Habit::new(name, description.trim(), color))?;
        Ok(id)
    }

    pub fn update_habit(&self, mut habit: Habit) -> Result<(), TrackerError> {
        habit.name = require_name("habit", &habit.name)?;
        self.store.update_habit(habit)?;
        Ok(())
    }

    /// Deletes the habit and, with it, all of its completions.
    pub fn delete_habit(&self, habit_id: Uuid) -> Result<(), TrackerError> {
        self.store.delete_habit(habit_id)?;
        Ok(())
    }

    pub fn completions_for_habit(&self, habit_id: Uuid) -> Result<Vec<HabitCompletion>, TrackerError> {
        Ok(self.store.completions_for_habit(habit_id)?)
    }

    pub fn toggle_completion(
        &self,
        habit_id: Uuid,
        day: NaiveDate,
    ) -> Result<ToggleOutcome, TrackerError> {
        Ok(tally_core::toggle_completion(self.store.as_ref(), habit_id, day)?)
    }

    pub fn toggle_today(&self, habit_id: Uuid) -> Result<ToggleOutcome, TrackerError> {
        self.toggle_completion(habit_id, self.today())
    }

    pub fn set_completion(
        &self,
        habit_id: Uuid,
        day: NaiveDate,
        completed: bool,
    ) -> Result<ToggleOutcome, TrackerError> {
        Ok(tally_core::set_completion(
            self.store.as_ref(),
            habit_id,
            day,
            completed,
        )?)
    }

    // Budget

    /// Records a transaction dated today from raw amount input.
    pub fn add_transaction(
        &self,
        amount_input: &str,
        kind: TransactionKind,
        description: &str,
        category_id: Option<Uuid>,
    ) -> Result<Uuid, TrackerError> {
        let amount = parse_amount(amount_input)?;
        let transaction = Transaction::new(amount, kind, self.today())
            .with_category(category_id)
            .with_description(description);
        Ok(self.store.insert_transaction(transaction)?)
    }

    pub fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), TrackerError> {
        self.store.delete_transaction(transaction_id)?;
        Ok(())
    }

    pub fn transactions_for_month(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<Transaction>, TrackerError> {
        require_month(month, year)?;
        Ok(self.store.transactions_for_month(&month_prefix(month, year))?)
    }

    /// Creates a category scoped to the current month.
    pub fn add_category(&self, name: &str, limit_input: &str) -> Result<Uuid, TrackerError> {
        let name = require_name("category", name)?;
        let category =
            BudgetCategory::new(name, parse_limit(limit_input), self.clock.current_month());
        Ok(self.store.insert_category(category)?)
    }

    pub fn update_category(&self, mut category: BudgetCategory) -> Result<(), TrackerError> {
        category.name = require_name("category", &category.name)?;
        require_month(category.month, category.year)?;
        if !category.monthly_limit.is_finite() || category.monthly_limit < 0.0 {
            category.monthly_limit = 0.0;
        }
        self.store.update_category(category)?;
        Ok(())
    }

    /// Deletes the category; its transactions stay, uncategorized.
    pub fn delete_category(&self, category_id: Uuid) -> Result<(), TrackerError> {
        self.store.delete_category(category_id)?;
        Ok(())
    }

    pub fn categories_for_month(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<BudgetCategory>, TrackerError> {
        let scope = require_month(month, year)?;
        Ok(self.store.categories_for_month(scope)?)
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}
