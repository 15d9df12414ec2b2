//! The route handler for creating a transaction.

use axum::{
    Json,
    extract::State,
    http::{HeaderName, StatusCode, header::LOCATION},
};

use crate::{
    Error,
    endpoints::{self, format_endpoint},
    transaction::{Ledger, Transaction, TransactionInput},
    user::UserId,
};

/// A route handler for creating a new transaction, responds with the stored
/// transaction and its location.
pub async fn create_transaction_endpoint(
    State(ledger): State<Ledger>,
    user_id: UserId,
    Json(input): Json<TransactionInput>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<Transaction>), Error> {
    let transaction = ledger
        .run_blocking(move |ledger| ledger.create(&user_id, &input))
        .await?;
    let location = format_endpoint(endpoints::TRANSACTION, transaction.id.as_str());

    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(transaction)))
}

#[cfg(test)]
mod tests {
    use axum::{Json, extract::State, http::StatusCode};

    use crate::{
        Error,
        pagination::PaginationConfig,
        stores::TransactionStore,
        transaction::{Ledger, TransactionInput, TransactionType},
        user::UserId,
    };

    use super::create_transaction_endpoint;

    #[tokio::test]
    async fn creates_transaction() {
        let ledger = Ledger::new(TransactionStore::in_memory(), PaginationConfig::default());

        let (status, [(_, location)], Json(transaction)) = create_transaction_endpoint(
            State(ledger.clone()),
            UserId::new("u1"),
            Json(TransactionInput::new("Income", 100.0).category("Salary")),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(location, format!("/api/transactions/{}", transaction.id));
        assert_eq!(transaction.transaction_type, TransactionType::Income);
        assert_eq!(transaction.category.as_deref(), Some("Salary"));
        assert_eq!(
            ledger.get_by_id(&UserId::new("u1"), &transaction.id),
            Ok(transaction)
        );
    }

    #[tokio::test]
    async fn rejects_invalid_transaction() {
        let ledger = Ledger::new(TransactionStore::in_memory(), PaginationConfig::default());

        let result = create_transaction_endpoint(
            State(ledger),
            UserId::new("u1"),
            Json(TransactionInput::new("income", -1.0)),
        )
        .await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
