//! Implements a struct that holds the state of the REST server.

use axum::extract::FromRef;

use crate::{pagination::PaginationConfig, stores::TransactionStore, transaction::Ledger};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The ledger holding every user's transactions.
    pub ledger: Ledger,
}

impl AppState {
    /// Create a new [AppState] whose ledger keeps its transactions in `store`.
    ///
    /// `pagination_config` supplies the page and page size used when a list
    /// request does not specify them.
    pub fn new(store: TransactionStore, pagination_config: PaginationConfig) -> Self {
        Self {
            ledger: Ledger::new(store, pagination_config),
        }
    }
}

impl FromRef<AppState> for Ledger {
    fn from_ref(state: &AppState) -> Self {
        state.ledger.clone()
    }
}
