//! The route handler for listing the current user's transactions.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    Error,
    transaction::{Ledger, TransactionFilters, TransactionPage},
    user::UserId,
};

/// A route handler for getting a filtered, sorted page of the user's transactions.
pub async fn list_transactions_endpoint(
    State(ledger): State<Ledger>,
    user_id: UserId,
    Query(filters): Query<TransactionFilters>,
) -> Result<Json<TransactionPage>, Error> {
    ledger
        .run_blocking(move |ledger| ledger.list(&user_id, &filters))
        .await
        .map(Json)
}
