//! The route handler for deleting a transaction.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Error,
    transaction::{Ledger, TransactionId},
    user::UserId,
};

/// A route handler for deleting a transaction, responds with 204 no content.
///
/// Responds with 404 not found if the transaction does not exist or belongs
/// to another user.
pub async fn delete_transaction_endpoint(
    State(ledger): State<Ledger>,
    user_id: UserId,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let deleted = ledger
        .run_blocking(move |ledger| ledger.delete(&user_id, &transaction_id))
        .await?;

    match deleted {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(Error::NotFound),
    }
}
