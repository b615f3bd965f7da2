//! Contract between the metrics layer and its persistence collaborator.

use std::{fmt, sync::Arc};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_domain::{BudgetCategory, Habit, HabitCompletion, MonthKey, Transaction};
use uuid::Uuid;

use crate::{budget::checked_amount, CoreError};

/// Persisted collections a write can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Habits,
    Completions,
    Categories,
    Transactions,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Table::Habits => "habits",
            Table::Completions => "completions",
            Table::Categories => "categories",
            Table::Transactions => "transactions",
        };
        f.write_str(label)
    }
}

/// Notification emitted after every successful write, carrying the post-write state.
#[derive(Debug, Clone)]
pub struct Change {
    pub tables: Vec<Table>,
    pub snapshot: Arc<TrackerData>,
}

impl Change {
    pub fn touches(&self, tables: &[Table]) -> bool {
        self.tables.iter().any(|table| tables.contains(table))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub type ChangeListener = Arc<dyn Fn(&Change) + Send + Sync>;

/// Every persisted table at one point in time.
///
/// The mutation helpers enforce the store's referential rules: deleting a habit
/// cascades to its completions, deleting a category clears it from transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerData {
    /// Bumped by the store on every committed write; not persisted.
    #[serde(skip)]
    pub revision: u64,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub completions: Vec<HabitCompletion>,
    #[serde(default)]
    pub categories: Vec<BudgetCategory>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl TrackerData {
    pub fn habit(&self, id: Uuid) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn category(&self, id: Uuid) -> Option<&BudgetCategory> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// Habits, newest first.
    pub fn all_habits(&self) -> Vec<Habit> {
        let mut habits = self.habits.clone();
        habits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        habits
    }

    /// Completions, most recent day first.
    pub fn all_completions(&self) -> Vec<HabitCompletion> {
        let mut completions = self.completions.clone();
        completions.sort_by(|a, b| b.completed_on.cmp(&a.completed_on));
        completions
    }

    pub fn completions_for_habit(&self, habit_id: Uuid) -> Vec<HabitCompletion> {
        self.all_completions()
            .into_iter()
            .filter(|completion| completion.habit_id == habit_id)
            .collect()
    }

    pub fn completion(&self, habit_id: Uuid, day: NaiveDate) -> Option<&HabitCompletion> {
        self.completions
            .iter()
            .find(|completion| completion.habit_id == habit_id && completion.completed_on == day)
    }

    /// Categories scoped to `month`, ordered by name.
    pub fn categories_for_month(&self, month: MonthKey) -> Vec<BudgetCategory> {
        let mut categories: Vec<_> = self
            .categories
            .iter()
            .filter(|category| category.is_scoped_to(month))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        categories
    }

    /// Transactions whose date key starts with `month_prefix`, newest first.
    pub fn transactions_for_month(&self, month_prefix: &str) -> Vec<Transaction> {
        let mut transactions: Vec<_> = self
            .transactions
            .iter()
            .filter(|txn| txn.in_month(month_prefix))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        transactions
    }

    pub fn insert_habit(&mut self, habit: Habit) -> Result<Vec<Table>, CoreError> {
        if self.habit(habit.id).is_some() {
            return Err(CoreError::Validation(format!(
                "habit {} already exists",
                habit.id
            )));
        }
        self.habits.push(habit);
        Ok(vec![Table::Habits])
    }

    pub fn update_habit(&mut self, habit: Habit) -> Result<Vec<Table>, CoreError> {
        let slot = self
            .habits
            .iter_mut()
            .find(|existing| existing.id == habit.id)
            .ok_or(CoreError::HabitNotFound(habit.id))?;
        *slot = habit;
        Ok(vec![Table::Habits])
    }

    pub fn delete_habit(&mut self, habit_id: Uuid) -> Result<Vec<Table>, CoreError> {
        let before = self.habits.len();
        self.habits.retain(|habit| habit.id != habit_id);
        if self.habits.len() == before {
            return Err(CoreError::HabitNotFound(habit_id));
        }
        let mut tables = vec![Table::Habits];
        let completions = self.completions.len();
        self.completions
            .retain(|completion| completion.habit_id != habit_id);
        if self.completions.len() != completions {
            tables.push(Table::Completions);
        }
        Ok(tables)
    }

    /// Inserts unless the habit already has a completion on that day.
    pub fn insert_completion(
        &mut self,
        completion: HabitCompletion,
    ) -> Result<(Uuid, Vec<Table>), CoreError> {
        if self.habit(completion.habit_id).is_none() {
            return Err(CoreError::HabitNotFound(completion.habit_id));
        }
        if let Some(existing) = self.completion(completion.habit_id, completion.completed_on) {
            return Ok((existing.id, Vec::new()));
        }
        let id = completion.id;
        self.completions.push(completion);
        Ok((id, vec![Table::Completions]))
    }

    pub fn delete_completion(&mut self, completion_id: Uuid) -> Result<Vec<Table>, CoreError> {
        let before = self.completions.len();
        self.completions
            .retain(|completion| completion.id != completion_id);
        if self.completions.len() == before {
            return Err(CoreError::CompletionNotFound(completion_id));
        }
        Ok(vec![Table::Completions])
    }

    pub fn insert_category(&mut self, category: BudgetCategory) -> Result<Vec<Table>, CoreError> {
        if self.category(category.id).is_some() {
            return Err(CoreError::Validation(format!(
                "category {} already exists",
                category.id
            )));
        }
        self.categories.push(category);
        Ok(vec![Table::Categories])
    }

    pub fn update_category(&mut self, category: BudgetCategory) -> Result<Vec<Table>, CoreError> {
        let slot = self
            .categories
            .iter_mut()
            .find(|existing| existing.id == category.id)
            .ok_or(CoreError::CategoryNotFound(category.id))?;
        *slot = category;
        Ok(vec![Table::Categories])
    }

    /// Removes the category and clears every transaction reference to it.
    pub fn delete_category(&mut self, category_id: Uuid) -> Result<Vec<Table>, CoreError> {
        let before = self.categories.len();
        self.categories.retain(|category| category.id != category_id);
        if self.categories.len() == before {
            return Err(CoreError::CategoryNotFound(category_id));
        }
        let mut tables = vec![Table::Categories];
        let mut cleared = false;
        for txn in self
            .transactions
            .iter_mut()
            .filter(|txn| txn.category_id == Some(category_id))
        {
            txn.category_id = None;
            cleared = true;
        }
        if cleared {
            tables.push(Table::Transactions);
        }
        Ok(tables)
    }

    pub fn insert_transaction(&mut self, transaction: Transaction) -> Result<Vec<Table>, CoreError> {
        checked_amount(&transaction)?;
        if let Some(category_id) = transaction.category_id {
            if self.category(category_id).is_none() {
                return Err(CoreError::CategoryNotFound(category_id));
            }
        }
        if self.transactions.iter().any(|txn| txn.id == transaction.id) {
            return Err(CoreError::Validation(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        self.transactions.push(transaction);
        Ok(vec![Table::Transactions])
    }

    pub fn delete_transaction(&mut self, transaction_id: Uuid) -> Result<Vec<Table>, CoreError> {
        let before = self.transactions.len();
        self.transactions.retain(|txn| txn.id != transaction_id);
        if self.transactions.len() == before {
            return Err(CoreError::TransactionNotFound(transaction_id));
        }
        Ok(vec![Table::Transactions])
    }
}

/// Read queries, write commands, and change subscription offered by persistence.
pub trait TrackerStore: Send + Sync {
    /// Immutable view of every table.
    fn snapshot(&self) -> Result<Arc<TrackerData>, CoreError>;

    fn all_habits(&self) -> Result<Vec<Habit>, CoreError> {
        Ok(self.snapshot()?.all_habits())
    }
    fn all_completions(&self) -> Result<Vec<HabitCompletion>, CoreError> {
        Ok(self.snapshot()?.all_completions())
    }
    fn completions_for_habit(&self, habit_id: Uuid) -> Result<Vec<HabitCompletion>, CoreError> {
        Ok(self.snapshot()?.completions_for_habit(habit_id))
    }
    fn completion(
        &self,
        habit_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<HabitCompletion>, CoreError> {
        Ok(self.snapshot()?.completion(habit_id, day).cloned())
    }
    fn categories_for_month(&self, month: MonthKey) -> Result<Vec<BudgetCategory>, CoreError> {
        Ok(self.snapshot()?.categories_for_month(month))
    }
    fn transactions_for_month(&self, month_prefix: &str) -> Result<Vec<Transaction>, CoreError> {
        Ok(self.snapshot()?.transactions_for_month(month_prefix))
    }

    fn insert_habit(&self, habit: Habit) -> Result<Uuid, CoreError>;
    fn update_habit(&self, habit: Habit) -> Result<(), CoreError>;
    /// Also deletes the habit's completions.
    fn delete_habit(&self, habit_id: Uuid) -> Result<(), CoreError>;
    fn insert_completion(&self, completion: HabitCompletion) -> Result<Uuid, CoreError>;
    fn delete_completion(&self, completion_id: Uuid) -> Result<(), CoreError>;
    fn insert_category(&self, category: BudgetCategory) -> Result<Uuid, CoreError>;
    fn update_category(&self, category: BudgetCategory) -> Result<(), CoreError>;
    /// Clears the category from transactions rather than deleting them.
    fn delete_category(&self, category_id: Uuid) -> Result<(), CoreError>;
    fn insert_transaction(&self, transaction: Transaction) -> Result<Uuid, CoreError>;
    fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), CoreError>;

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Durable backing for a [`TrackerStore`].
pub trait Persistence: Send + Sync {
    fn load(&self) -> Result<TrackerData, CoreError>;
    fn save(&self, data: &TrackerData) -> Result<(), CoreError>;
}
