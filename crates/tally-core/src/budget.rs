//! Monthly income, expense and balance totals.

use serde::Serialize;
use tally_domain::{BudgetCategory, MonthKey, Transaction};

use crate::{
    spend::{category_progress, CategoryProgress},
    CoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BudgetSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    /// `total_income - total_expenses`.
    pub balance: f64,
}

impl BudgetSummary {
    pub fn new(total_income: f64, total_expenses: f64) -> Self {
        Self {
            total_income,
            total_expenses,
            balance: total_income - total_expenses,
        }
    }

    /// Totals the supplied transactions, which callers have already scoped to one month.
    pub fn from_transactions<'a, I>(transactions: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut income = 0.0;
        let mut expenses = 0.0;
        for txn in transactions {
            let amount = checked_amount(txn)?;
            if txn.is_income() {
                income += amount;
            } else {
                expenses += amount;
            }
        }
        Ok(Self::new(income, expenses))
    }
}

/// Returns the amount, or `InvalidAmount` when it is not a finite positive number.
pub fn checked_amount(txn: &Transaction) -> Result<f64, CoreError> {
    if txn.amount.is_finite() && txn.amount > 0.0 {
        Ok(txn.amount)
    } else {
        Err(CoreError::InvalidAmount(txn.amount))
    }
}

/// Selects the transactions whose date key starts with the month's `YYYY-MM` prefix.
pub fn transactions_in_month(transactions: &[Transaction], month: MonthKey) -> Vec<&Transaction> {
    let prefix = month.prefix();
    transactions
        .iter()
        .filter(|txn| txn.in_month(&prefix))
        .collect()
}

/// The budget screen's read model for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetOverview {
    pub month: MonthKey,
    pub summary: BudgetSummary,
    /// Categories scoped to `month`, ordered by name.
    pub categories: Vec<CategoryProgress>,
    /// Transactions dated within `month`, newest first.
    pub transactions: Vec<Transaction>,
}

pub fn budget_overview(
    categories: &[BudgetCategory],
    transactions: &[Transaction],
    month: MonthKey,
) -> Result<BudgetOverview, CoreError> {
    let mut in_month: Vec<Transaction> = transactions_in_month(transactions, month)
        .into_iter()
        .cloned()
        .collect();
    in_month.sort_by(|a, b| b.date.cmp(&a.date));

    let summary = BudgetSummary::from_transactions(&in_month)?;

    let mut scoped: Vec<&BudgetCategory> = categories
        .iter()
        .filter(|category| category.is_scoped_to(month))
        .collect();
    scoped.sort_by(|a, b| a.name.cmp(&b.name));
    let categories = scoped
        .into_iter()
        .map(|category| category_progress(category, &in_month))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BudgetOverview {
        month,
        summary,
        categories,
        transactions: in_month,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_domain::TransactionKind;

    fn on(y: i32, m: u32, d: u32, amount: f64, kind: TransactionKind) -> Transaction {
        Transaction::new(amount, kind, NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn income_minus_expenses() {
        let txns = vec![
            on(2025, 1, 10, 500.0, TransactionKind::Income),
            on(2025, 1, 11, 200.0, TransactionKind::Expense),
            on(2025, 1, 12, 300.0, TransactionKind::Income),
        ];
        let summary = BudgetSummary::from_transactions(&txns).unwrap();
        assert_eq!(summary.total_income, 800.0);
        assert_eq!(summary.total_expenses, 200.0);
        assert_eq!(summary.balance, 600.0);
    }

    #[test]
    fn empty_month_is_all_zero() {
        let summary = BudgetSummary::from_transactions(&Vec::<Transaction>::new()).unwrap();
        assert_eq!(summary, BudgetSummary::default());
    }

    #[test]
    fn income_total_matches_filtered_sum() {
        let txns = vec![
            on(2025, 1, 1, 12.25, TransactionKind::Income),
            on(2025, 1, 2, 7.5, TransactionKind::Expense),
            on(2025, 1, 3, 0.25, TransactionKind::Income),
        ];
        let direct: f64 = txns.iter().filter(|t| t.is_income()).map(|t| t.amount).sum();
        let summary = BudgetSummary::from_transactions(&txns).unwrap();
        assert_eq!(summary.total_income, direct);
        assert!(summary.total_income + summary.total_expenses >= summary.balance.abs());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let txns = vec![on(2025, 1, 1, 0.0, TransactionKind::Income)];
        assert!(matches!(
            BudgetSummary::from_transactions(&txns),
            Err(CoreError::InvalidAmount(amount)) if amount == 0.0
        ));
        let txns = vec![on(2025, 1, 1, f64::NAN, TransactionKind::Expense)];
        assert!(BudgetSummary::from_transactions(&txns).is_err());
    }

    #[test]
    fn month_filter_uses_prefix() {
        let txns = vec![
            on(2025, 1, 31, 1.0, TransactionKind::Income),
            on(2025, 2, 1, 2.0, TransactionKind::Income),
            on(2024, 1, 15, 4.0, TransactionKind::Income),
        ];
        let january = transactions_in_month(&txns, MonthKey::new(2025, 1).unwrap());
        assert_eq!(january.len(), 1);
        assert_eq!(january[0].amount, 1.0);
    }

    #[test]
    fn overview_scopes_categories_without_rollover() {
        let january = MonthKey::new(2025, 1).unwrap();
        let february = MonthKey::new(2025, 2).unwrap();
        let rent = BudgetCategory::new("Rent", 1000.0, january);
        let food = BudgetCategory::new("Food", 200.0, january);
        let txns = vec![
            on(2025, 1, 3, 150.0, TransactionKind::Expense).with_category(Some(food.id)),
            on(2025, 1, 20, 900.0, TransactionKind::Income),
            on(2025, 2, 2, 75.0, TransactionKind::Expense).with_category(Some(food.id)),
        ];
        let categories = vec![rent, food.clone()];

        let overview = budget_overview(&categories, &txns, january).unwrap();
        assert_eq!(
            overview.categories.iter().map(|c| c.category.name.as_str()).collect::<Vec<_>>(),
            vec!["Food", "Rent"]
        );
        assert_eq!(overview.categories[0].spent, 150.0);
        assert_eq!(overview.transactions.len(), 2);
        assert!(overview.transactions[0].date > overview.transactions[1].date);
        assert_eq!(overview.summary.balance, 750.0);

        // January categories do not carry into February.
        let next = budget_overview(&categories, &txns, february).unwrap();
        assert!(next.categories.is_empty());
        assert_eq!(next.summary.total_expenses, 75.0);
    }
}
