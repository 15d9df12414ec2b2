//! The route handler for getting a single transaction.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    Error,
    transaction::{Ledger, Transaction, TransactionId},
    user::UserId,
};

/// A route handler for getting a transaction by its ID.
///
/// Responds with 404 not found if the transaction does not exist or belongs
/// to another user, so that users cannot know whether another user's
/// transaction exists.
pub async fn get_transaction_endpoint(
    State(ledger): State<Ledger>,
    user_id: UserId,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    ledger
        .run_blocking(move |ledger| ledger.get_by_id(&user_id, &transaction_id))
        .await
        .map(Json)
}
