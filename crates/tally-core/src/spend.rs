//! Per-category spending against monthly limits.

use serde::Serialize;
use tally_domain::{BudgetCategory, Transaction};

use crate::{budget::checked_amount, CoreError};

/// Ratio at which a category enters the warning band.
pub const WARNING_RATIO: f64 = 0.7;
/// Ratio at which a category is considered over budget.
pub const OVER_RATIO: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpendStatus {
    Normal,
    Warning,
    Over,
}

impl SpendStatus {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= OVER_RATIO {
            SpendStatus::Over
        } else if ratio >= WARNING_RATIO {
            SpendStatus::Warning
        } else {
            SpendStatus::Normal
        }
    }
}

/// Spend of one category relative to its limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProgress {
    pub category: BudgetCategory,
    pub spent: f64,
    /// Always within `[0, 1]`.
    pub ratio: f64,
    pub status: SpendStatus,
}

impl CategoryProgress {
    /// Whole-number percentage of the limit used.
    pub fn percent(&self) -> u32 {
        (self.ratio * 100.0).floor() as u32
    }
}

/// `spent / limit` clamped to `[0, 1]`; 0 when no positive limit is set.
pub fn spend_ratio(spent: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        (spent / limit).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Sums expenses tagged with `category`. Income never counts toward spend.
pub fn category_spent<'a, I>(category: &BudgetCategory, transactions: I) -> Result<f64, CoreError>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .filter(|txn| txn.is_expense() && txn.category_id == Some(category.id))
        .try_fold(0.0, |total, txn| Ok(total + checked_amount(txn)?))
}

pub fn category_progress<'a, I>(
    category: &BudgetCategory,
    transactions: I,
) -> Result<CategoryProgress, CoreError>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let spent = category_spent(category, transactions)?;
    let ratio = spend_ratio(spent, category.monthly_limit);
    Ok(CategoryProgress {
        category: category.clone(),
        spent,
        ratio,
        status: SpendStatus::from_ratio(ratio),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_domain::{MonthKey, TransactionKind};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    fn groceries(limit: f64) -> BudgetCategory {
        BudgetCategory::new("Groceries", limit, MonthKey::new(2025, 1).unwrap())
    }

    fn expense(category: &BudgetCategory, amount: f64) -> Transaction {
        Transaction::new(amount, TransactionKind::Expense, date()).with_category(Some(category.id))
    }

    #[test]
    fn status_bands_follow_thresholds() {
        assert_eq!(SpendStatus::from_ratio(0.0), SpendStatus::Normal);
        assert_eq!(SpendStatus::from_ratio(0.69), SpendStatus::Normal);
        assert_eq!(SpendStatus::from_ratio(0.7), SpendStatus::Warning);
        assert_eq!(SpendStatus::from_ratio(0.89), SpendStatus::Warning);
        assert_eq!(SpendStatus::from_ratio(0.9), SpendStatus::Over);
        assert_eq!(SpendStatus::from_ratio(1.0), SpendStatus::Over);
    }

    #[test]
    fn income_and_other_categories_are_excluded() {
        let category = groceries(100.0);
        let other = groceries(100.0);
        let txns = vec![
            expense(&category, 30.0),
            expense(&other, 50.0),
            Transaction::new(500.0, TransactionKind::Income, date()).with_category(Some(category.id)),
            Transaction::new(20.0, TransactionKind::Expense, date()),
        ];
        let progress = category_progress(&category, &txns).unwrap();
        assert_eq!(progress.spent, 30.0);
        assert!((progress.ratio - 0.3).abs() < 1e-9);
        assert_eq!(progress.status, SpendStatus::Normal);
        assert_eq!(progress.percent(), 30);
    }

    #[test]
    fn zero_limit_yields_zero_ratio() {
        let category = groceries(0.0);
        let txns = vec![expense(&category, 80.0)];
        let progress = category_progress(&category, &txns).unwrap();
        assert_eq!(progress.spent, 80.0);
        assert_eq!(progress.ratio, 0.0);
        assert_eq!(progress.status, SpendStatus::Normal);
    }

    #[test]
    fn overspend_is_clamped_to_one() {
        let category = groceries(100.0);
        let txns = vec![expense(&category, 95.0), expense(&category, 60.0)];
        let progress = category_progress(&category, &txns).unwrap();
        assert_eq!(progress.ratio, 1.0);
        assert_eq!(progress.status, SpendStatus::Over);
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn ratio_stays_in_unit_interval() {
        for (spent, limit) in [(0.0, 0.0), (10.0, -5.0), (1e12, 1.0), (3.0, 4.0), (0.0, 50.0)] {
            let ratio = spend_ratio(spent, limit);
            assert!((0.0..=1.0).contains(&ratio), "{spent}/{limit} gave {ratio}");
        }
    }

    #[test]
    fn invalid_amount_fails_fast() {
        let category = groceries(100.0);
        let txns = vec![expense(&category, -4.0)];
        assert!(matches!(
            category_progress(&category, &txns),
            Err(CoreError::InvalidAmount(_))
        ));
    }
}
