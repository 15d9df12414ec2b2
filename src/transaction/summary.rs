//! Totals of a user's income and expenses.

use serde::{Deserialize, Serialize};

use crate::{
    transaction::{Transaction, TransactionType},
    user::UserId,
};

/// How much a user has earned and spent in total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// The sum of all income.
    pub income: f64,
    /// The sum of all expenses.
    pub expense: f64,
    /// Income minus expenses.
    pub balance: f64,
}

/// Sum the income and expenses of the transactions that belong to `user_id`.
///
/// Totals saturate at [f64::MAX] instead of overflowing to infinity, which
/// JSON cannot represent.
pub fn summarize<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    user_id: &UserId,
) -> Summary {
    let (income, expense) = transactions
        .into_iter()
        .filter(|transaction| &transaction.user_id == user_id)
        .fold(
            (0.0, 0.0),
            |(income, expense), transaction| match transaction.transaction_type {
                TransactionType::Income => (income + transaction.amount, expense),
                TransactionType::Expense => (income, expense + transaction.amount),
            },
        );

    let income = saturate(income);
    let expense = saturate(expense);

    Summary {
        income,
        expense,
        balance: income - expense,
    }
}

fn saturate(total: f64) -> f64 {
    total.min(f64::MAX)
}
