//! The route handler for updating a transaction.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    Error,
    transaction::{Ledger, Transaction, TransactionId, TransactionInput},
    user::UserId,
};

/// A route handler for partially updating a transaction, responds with the updated transaction.
pub async fn edit_transaction_endpoint(
    State(ledger): State<Ledger>,
    user_id: UserId,
    Path(transaction_id): Path<TransactionId>,
    Json(updates): Json<TransactionInput>,
) -> Result<Json<Transaction>, Error> {
    let id = transaction_id.clone();

    ledger
        .run_blocking(move |ledger| ledger.update(&user_id, &id, &updates))
        .await
        .inspect_err(|error| {
            if let Error::Validation(_) = error {
                tracing::debug!("Rejected update to transaction {transaction_id}: {error}");
            }
        })
        .map(Json)
}

#[cfg(test)]
mod tests {
    use axum::{
        Json,
        extract::{Path, State},
    };

    use crate::{
        Error,
        pagination::PaginationConfig,
        stores::TransactionStore,
        transaction::{Ledger, TransactionInput},
        user::UserId,
    };

    use super::edit_transaction_endpoint;

    #[tokio::test]
    async fn updates_transaction() {
        let ledger = Ledger::new(TransactionStore::in_memory(), PaginationConfig::default());
        let user_id = UserId::new("u1");
        let created = ledger
            .create(&user_id, &TransactionInput::new("expense", 10.0))
            .unwrap();

        let Json(updated) = edit_transaction_endpoint(
            State(ledger),
            user_id,
            Path(created.id.clone()),
            Json(TransactionInput {
                note: Some("lunch".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(updated.note.as_deref(), Some("lunch"));
        assert_eq!(updated.amount, created.amount);
        assert_eq!(updated.id, created.id);
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let ledger = Ledger::new(TransactionStore::in_memory(), PaginationConfig::default());

        let result = edit_transaction_endpoint(
            State(ledger),
            UserId::new("u1"),
            Path("nope".into()),
            Json(TransactionInput::default()),
        )
        .await;

        assert!(matches!(result, Err(Error::NotFound)));
    }
}
