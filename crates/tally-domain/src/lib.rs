//! tally-domain
//!
//! Pure domain models (Habit, HabitCompletion, BudgetCategory, Transaction).
//! No I/O, no storage, no aggregation. Only data types and core enums.

pub mod category;
pub mod common;
pub mod habit;
pub mod transaction;

pub use category::*;
pub use common::*;
pub use habit::*;
pub use transaction::*;
