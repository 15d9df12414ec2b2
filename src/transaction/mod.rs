//! Transaction management for the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the rules for validating and normalizing input
//! - The query engine for filtering, sorting and paging transactions
//! - The `Ledger` service that ties these to the transaction store
//! - Route handlers for the transaction API

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod get_endpoint;
mod ledger;
mod list_endpoint;
mod query;
mod summary;
mod summary_endpoint;

pub use self::core::{
    AmountInput, FieldInput, NormalizedTransaction, Transaction, TransactionId, TransactionInput,
    TransactionType, Validation, merge, normalize, parse_timestamp, validate,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use get_endpoint::get_transaction_endpoint;
pub use ledger::Ledger;
pub use list_endpoint::list_transactions_endpoint;
pub use query::{SortField, SortOrder, TransactionFilters, TransactionPage};
pub use summary::{Summary, summarize};
pub use summary_endpoint::get_summary_endpoint;
