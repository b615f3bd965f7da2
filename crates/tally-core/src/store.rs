//! Shared in-process store that publishes a fresh snapshot after every write.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError, RwLock,
};

use tally_domain::{BudgetCategory, Habit, HabitCompletion, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    storage::{
        Change, ChangeListener, Persistence, SubscriptionId, Table, TrackerData, TrackerStore,
    },
    CoreError,
};

/// Copy-on-write table store with optional durable persistence.
///
/// Writes are applied to a copy of the current tables, persisted, and only then
/// swapped in, so a failed write leaves the published snapshot untouched.
/// Listeners run after the write lock is released.
pub struct TableStore {
    data: RwLock<Arc<TrackerData>>,
    listeners: Mutex<Vec<(SubscriptionId, ChangeListener)>>,
    next_subscription: AtomicU64,
    persistence: Option<Box<dyn Persistence>>,
}

impl TableStore {
    pub fn in_memory() -> Self {
        Self::with_data(TrackerData::default())
    }

    pub fn with_data(data: TrackerData) -> Self {
        Self {
            data: RwLock::new(Arc::new(data)),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            persistence: None,
        }
    }

    /// Loads the initial tables from `persistence` and saves through it on every write.
    pub fn open(persistence: Box<dyn Persistence>) -> Result<Self, CoreError> {
        let data = persistence.load()?;
        info!(
            habits = data.habits.len(),
            completions = data.completions.len(),
            categories = data.categories.len(),
            transactions = data.transactions.len(),
            "store opened"
        );
        let mut store = Self::with_data(data);
        store.persistence = Some(persistence);
        Ok(store)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn write<T>(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut TrackerData) -> Result<(T, Vec<Table>), CoreError>,
    ) -> Result<T, CoreError> {
        let change = {
            let mut guard = self
                .data
                .write()
                .map_err(|_| CoreError::Storage("store lock poisoned".into()))?;
            let mut next = TrackerData::clone(&guard);
            let (value, tables) = apply(&mut next)?;
            if tables.is_empty() {
                return Ok(value);
            }
            next.revision = guard.revision + 1;
            if let Some(persistence) = &self.persistence {
                persistence.save(&next).inspect_err(|err| {
                    warn!(operation, error = %err, "failed to persist write");
                })?;
            }
            let snapshot = Arc::new(next);
            *guard = Arc::clone(&snapshot);
            (value, Change { tables, snapshot })
        };
        let (value, change) = change;
        info!(operation, tables = ?change.tables, "store updated");
        self.notify(&change);
        Ok(value)
    }

    fn notify(&self, change: &Change) {
        let listeners: Vec<ChangeListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(change);
        }
    }
}

impl Default for TableStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TrackerStore for TableStore {
    fn snapshot(&self) -> Result<Arc<TrackerData>, CoreError> {
        self.data
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| CoreError::Storage("store lock poisoned".into()))
    }

    fn insert_habit(&self, habit: Habit) -> Result<Uuid, CoreError> {
        let id = habit.id;
        self.write("insert_habit", |data| Ok((id, data.insert_habit(habit)?)))
    }

    fn update_habit(&self, habit: Habit) -> Result<(), CoreError> {
        self.write("update_habit", |data| Ok(((), data.update_habit(habit)?)))
    }

    fn delete_habit(&self, habit_id: Uuid) -> Result<(), CoreError> {
        self.write("delete_habit", |data| Ok(((), data.delete_habit(habit_id)?)))
    }

    fn insert_completion(&self, completion: HabitCompletion) -> Result<Uuid, CoreError> {
        self.write("insert_completion", |data| data.insert_completion(completion))
    }

    fn delete_completion(&self, completion_id: Uuid) -> Result<(), CoreError> {
        self.write("delete_completion", |data| {
            Ok(((), data.delete_completion(completion_id)?))
        })
    }

    fn insert_category(&self, category: BudgetCategory) -> Result<Uuid, CoreError> {
        let id = category.id;
        self.write("insert_category", |data| {
            Ok((id, data.insert_category(category)?))
        })
    }

    fn update_category(&self, category: BudgetCategory) -> Result<(), CoreError> {
        self.write("update_category", |data| {
            Ok(((), data.update_category(category)?))
        })
    }

    fn delete_category(&self, category_id: Uuid) -> Result<(), CoreError> {
        self.write("delete_category", |data| {
            Ok(((), data.delete_category(category_id)?))
        })
    }

    fn insert_transaction(&self, transaction: Transaction) -> Result<Uuid, CoreError> {
        let id = transaction.id;
        self.write("insert_transaction", |data| {
            Ok((id, data.insert_transaction(transaction)?))
        })
    }

    fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), CoreError> {
        self.write("delete_transaction", |data| {
            Ok(((), data.delete_transaction(transaction_id)?))
        })
    }

    fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }
}
