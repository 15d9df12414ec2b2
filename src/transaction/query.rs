//! Filtering, sorting and paging of a user's transactions.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    pagination::{Pagination, PaginationConfig},
    transaction::{Transaction, core::parse_timestamp},
    user::UserId,
};

/// The transaction field to sort by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// When the transaction happened.
    #[default]
    Date,
    /// When the transaction was first stored.
    CreatedAt,
    /// When the transaction was last changed.
    UpdatedAt,
    /// The amount of money.
    Amount,
    /// Income or expense.
    Type,
    /// The category, transactions without one sort first.
    Category,
    /// The note, transactions without one sort first.
    Note,
    /// The transaction ID.
    Id,
}

/// The order to sort transactions in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    #[serde(rename = "asc")]
    Ascending,
    /// Sort in order of decreasing value.
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

/// Defines which of a user's transactions to list, and how.
///
/// Every filter is optional and filters are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilters {
    /// Keep transactions of this type, ignoring case.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Keep transactions in this category, ignoring case.
    pub category: Option<String>,
    /// Keep transactions dated at or after this timestamp.
    pub start_date: Option<String>,
    /// Keep transactions dated at or before this timestamp.
    pub end_date: Option<String>,
    /// Keep transactions with at least this amount.
    pub min_amount: Option<f64>,
    /// Keep transactions with at most this amount.
    pub max_amount: Option<f64>,
    /// The field to sort by, defaults to the date.
    pub sort_by: Option<SortField>,
    /// The sort direction, defaults to descending.
    pub sort_order: Option<SortOrder>,
    /// The one-based page number.
    pub page: Option<i64>,
    /// The maximum number of transactions on a page.
    pub limit: Option<i64>,
}

/// One page of a user's filtered transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    /// How many transactions matched the filters, across all pages.
    pub total: u64,
    /// The one-based page number.
    pub page: u64,
    /// The maximum number of transactions on a page.
    pub limit: u64,
    /// The transactions on this page.
    pub items: Vec<Transaction>,
}

/// An inclusive date bound, where a bound that could not be parsed matches nothing.
#[derive(Clone, Copy)]
enum DateBound {
    Unbounded,
    At(OffsetDateTime),
    Invalid,
}

impl DateBound {
    fn new(text: Option<&str>) -> Self {
        match non_empty(text) {
            None => DateBound::Unbounded,
            Some(text) => parse_timestamp(text).map_or(DateBound::Invalid, DateBound::At),
        }
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|text| !text.trim().is_empty())
}

/// Select, sort and page the transactions in `transactions` that belong to `user_id`.
///
/// Transactions are first scoped to `user_id`, then filtered, then stably
/// sorted and finally paged. `total` counts the filtered transactions before
/// paging.
pub fn query(
    transactions: Vec<Transaction>,
    user_id: &UserId,
    filters: &TransactionFilters,
    config: &PaginationConfig,
) -> TransactionPage {
    let transaction_type = non_empty(filters.transaction_type.as_deref()).map(str::to_lowercase);
    let category = non_empty(filters.category.as_deref()).map(str::to_lowercase);
    let start = DateBound::new(filters.start_date.as_deref());
    let end = DateBound::new(filters.end_date.as_deref());

    let mut items: Vec<Transaction> = transactions
        .into_iter()
        .filter(|transaction| &transaction.user_id == user_id)
        .filter(|transaction| match &transaction_type {
            Some(wanted) => transaction.transaction_type.as_str() == wanted,
            None => true,
        })
        .filter(|transaction| match &category {
            Some(wanted) => transaction
                .category
                .as_ref()
                .is_some_and(|category| &category.to_lowercase() == wanted),
            None => true,
        })
        .filter(|transaction| match start {
            DateBound::Unbounded => true,
            DateBound::At(start) => transaction.date >= start,
            DateBound::Invalid => false,
        })
        .filter(|transaction| match end {
            DateBound::Unbounded => true,
            DateBound::At(end) => transaction.date <= end,
            DateBound::Invalid => false,
        })
        .filter(|transaction| {
            filters
                .min_amount
                .is_none_or(|min_amount| transaction.amount >= min_amount)
                && filters
                    .max_amount
                    .is_none_or(|max_amount| transaction.amount <= max_amount)
        })
        .collect();

    let sort_by = filters.sort_by.unwrap_or_default();
    let sort_order = filters.sort_order.unwrap_or_default();
    // `sort_by` is stable, so ties keep their relative order in both directions.
    items.sort_by(|a, b| match sort_order {
        SortOrder::Ascending => compare(a, b, sort_by),
        SortOrder::Descending => compare(b, a, sort_by),
    });

    let pagination = Pagination::new(filters.page, filters.limit, config);

    TransactionPage {
        total: items.len() as u64,
        page: pagination.page,
        limit: pagination.limit,
        items: pagination.apply(items),
    }
}

fn compare(a: &Transaction, b: &Transaction, sort_by: SortField) -> Ordering {
    match sort_by {
        SortField::Date => a.date.cmp(&b.date),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Amount => a.amount.total_cmp(&b.amount),
        SortField::Type => a.transaction_type.as_str().cmp(b.transaction_type.as_str()),
        SortField::Category => a.category.cmp(&b.category),
        SortField::Note => a.note.cmp(&b.note),
        SortField::Id => a.id.cmp(&b.id),
    }
}
