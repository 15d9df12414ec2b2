//! The route handler for the current user's income and expense totals.

use axum::{Json, extract::State};

use crate::{
    Error,
    transaction::{Ledger, Summary},
    user::UserId,
};

/// A route handler for getting the user's total income, expenses and balance.
pub async fn get_summary_endpoint(
    State(ledger): State<Ledger>,
    user_id: UserId,
) -> Result<Json<Summary>, Error> {
    ledger
        .run_blocking(move |ledger| ledger.summary(&user_id))
        .await
        .map(Json)
}
