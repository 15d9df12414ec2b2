//! The ledger service: per-user create, list, get, update and delete on top of
//! the shared transaction store.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    pagination::PaginationConfig,
    stores::{Modification, TransactionStore},
    transaction::{
        Transaction, TransactionFilters, TransactionId, TransactionInput, TransactionPage,
        core::{merge, normalize},
        query::query,
        summary::{Summary, summarize},
    },
    user::UserId,
};

/// Manages every user's transactions in one shared [TransactionStore].
///
/// Users only ever see and change their own transactions. Cloning a ledger
/// is cheap and every clone shares the same store.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<TransactionStore>,
    pagination_config: PaginationConfig,
}

impl Ledger {
    /// Create a ledger on top of `store`.
    pub fn new(store: TransactionStore, pagination_config: PaginationConfig) -> Self {
        Self {
            store: Arc::new(store),
            pagination_config,
        }
    }

    /// Run `operation` on a thread where blocking is allowed.
    ///
    /// Ledger operations wait on the store lock and on disk I/O, so async
    /// code must go through this instead of calling them directly.
    ///
    /// # Errors
    /// Returns the error from `operation`, or [Error::Storage] if the
    /// operation panicked or was cancelled.
    pub async fn run_blocking<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&Ledger) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = self.clone();

        tokio::task::spawn_blocking(move || operation(&ledger))
            .await
            .map_err(|error| {
                tracing::error!("Ledger operation did not complete: {error}");
                Error::Storage(format!("ledger operation did not complete: {error}"))
            })?
    }

    /// Validate `input` and store it as a new transaction owned by `user_id`.
    ///
    /// # Errors
    /// Returns [Error::Validation] with every broken rule if `input` is
    /// invalid, or a storage error if the transaction could not be saved.
    pub fn create(&self, user_id: &UserId, input: &TransactionInput) -> Result<Transaction, Error> {
        let now = OffsetDateTime::now_utc();
        let transaction = normalize(user_id, input, now)?.into_transaction(TransactionId::generate(), now);

        self.store.modify(|transactions| {
            transactions.push(transaction.clone());
            Ok(Modification::Changed(()))
        })?;

        tracing::debug!("Created transaction {} for user {user_id}", transaction.id);
        Ok(transaction)
    }

    /// Get a page of the transactions owned by `user_id` that match `filters`.
    ///
    /// # Errors
    /// Returns a storage error if the transactions could not be loaded.
    pub fn list(
        &self,
        user_id: &UserId,
        filters: &TransactionFilters,
    ) -> Result<TransactionPage, Error> {
        let transactions = self.store.read_all()?;

        Ok(query(transactions, user_id, filters, &self.pagination_config))
    }

    /// Get the transaction with `id` if it is owned by `user_id`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no such transaction or it belongs
    /// to another user, or a storage error if the transactions could not be loaded.
    pub fn get_by_id(&self, user_id: &UserId, id: &TransactionId) -> Result<Transaction, Error> {
        self.store
            .read_all()?
            .into_iter()
            .find(|transaction| &transaction.id == id && &transaction.user_id == user_id)
            .ok_or(Error::NotFound)
    }

    /// Apply `updates` to the transaction with `id` owned by `user_id`.
    ///
    /// The ID and creation time are kept and the update time is refreshed.
    /// Nothing is saved if the updated transaction is invalid.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no such transaction or it belongs
    /// to another user, [Error::Validation] if the updated transaction is
    /// invalid, or a storage error if the change could not be saved.
    pub fn update(
        &self,
        user_id: &UserId,
        id: &TransactionId,
        updates: &TransactionInput,
    ) -> Result<Transaction, Error> {
        let updated = self.store.modify(|transactions| {
            let existing = transactions
                .iter_mut()
                .find(|transaction| &transaction.id == id && &transaction.user_id == user_id)
                .ok_or(Error::NotFound)?;

            // The update time must move forward even if the clock has not.
            let now = OffsetDateTime::now_utc().max(existing.updated_at + Duration::nanoseconds(1));
            let updated = merge(existing, updates, now)?;
            *existing = updated.clone();

            Ok(Modification::Changed(updated))
        })?;

        tracing::debug!("Updated transaction {id} for user {user_id}");
        Ok(updated)
    }

    /// Delete the transaction with `id` owned by `user_id`.
    ///
    /// Returns whether a transaction was found and deleted.
    ///
    /// # Errors
    /// Returns a storage error if the change could not be saved.
    pub fn delete(&self, user_id: &UserId, id: &TransactionId) -> Result<bool, Error> {
        let deleted = self.store.modify(|transactions| {
            let position = transactions
                .iter()
                .position(|transaction| &transaction.id == id && &transaction.user_id == user_id);

            match position {
                Some(position) => {
                    transactions.remove(position);
                    Ok(Modification::Changed(true))
                }
                None => Ok(Modification::Unchanged(false)),
            }
        })?;

        if deleted {
            tracing::debug!("Deleted transaction {id} for user {user_id}");
        }

        Ok(deleted)
    }

    /// Get the total income, expenses and balance of `user_id`.
    ///
    /// # Errors
    /// Returns a storage error if the transactions could not be loaded.
    pub fn summary(&self, user_id: &UserId) -> Result<Summary, Error> {
        let transactions = self.store.read_all()?;

        Ok(summarize(&transactions, user_id))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        sync::{Mutex, mpsc},
        thread,
    };

    use serde_json::json;

    use crate::{
        Error,
        pagination::PaginationConfig,
        stores::{MemoryStorage, Storage, TransactionStore},
        transaction::{
            Ledger, TransactionFilters, TransactionId, TransactionInput, TransactionType,
        },
        user::UserId,
    };

    fn get_test_ledger() -> Ledger {
        Ledger::new(TransactionStore::in_memory(), PaginationConfig::default())
    }

    fn input(value: serde_json::Value) -> TransactionInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn create_list_update_delete_scenario() {
        let ledger = get_test_ledger();
        let user = UserId::new("u1");

        let created = ledger
            .create(&user, &input(json!({ "type": "income", "amount": 100 })))
            .unwrap();
        assert_eq!(created.transaction_type, TransactionType::Income);
        assert_eq!(created.amount, 100.0);
        assert_eq!(created.user_id, user);
        assert!(!created.id.as_str().is_empty());

        let expenses = ledger
            .list(
                &user,
                &TransactionFilters {
                    transaction_type: Some("expense".to_owned()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(expenses.total, 0);
        assert!(expenses.items.is_empty());

        let updated = ledger
            .update(&user, &created.id, &input(json!({ "amount": 50 })))
            .unwrap();
        assert_eq!(updated.amount, 50.0);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        assert_eq!(ledger.delete(&user, &created.id), Ok(true));
        assert_eq!(ledger.get_by_id(&user, &created.id), Err(Error::NotFound));
    }

    #[test]
    fn create_rejects_invalid_input_with_every_message() {
        let ledger = get_test_ledger();

        let got = ledger.create(
            &UserId::new("u1"),
            &input(json!({ "type": "transfer", "amount": "lots" })),
        );

        assert_eq!(
            got,
            Err(Error::Validation(vec![
                "type must be 'income' or 'expense'".to_owned(),
                "amount must be zero or a positive number".to_owned(),
            ]))
        );
        assert_eq!(
            ledger
                .list(&UserId::new("u1"), &TransactionFilters::default())
                .unwrap()
                .total,
            0
        );
    }

    #[test]
    fn users_cannot_see_or_change_each_others_transactions() {
        let ledger = get_test_ledger();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let bobs = ledger
            .create(&bob, &TransactionInput::new("expense", 20.0))
            .unwrap();
        ledger
            .create(&alice, &TransactionInput::new("income", 5.0))
            .unwrap();

        let alices_list = ledger.list(&alice, &TransactionFilters::default()).unwrap();

        assert_eq!(alices_list.total, 1);
        assert!(alices_list.items.iter().all(|t| t.user_id == alice));
        assert_eq!(ledger.get_by_id(&alice, &bobs.id), Err(Error::NotFound));
        assert_eq!(
            ledger.update(&alice, &bobs.id, &TransactionInput::new("income", 1.0)),
            Err(Error::NotFound)
        );
        assert_eq!(ledger.delete(&alice, &bobs.id), Ok(false));
        assert_eq!(ledger.get_by_id(&bob, &bobs.id), Ok(bobs));
    }

    #[test]
    fn invalid_update_leaves_transaction_unchanged() {
        let ledger = get_test_ledger();
        let user = UserId::new("u1");
        let created = ledger
            .create(&user, &TransactionInput::new("expense", 10.0).category("Food"))
            .unwrap();

        let got = ledger.update(
            &user,
            &created.id,
            &input(json!({ "amount": -3, "category": " " })),
        );

        assert!(matches!(got, Err(Error::Validation(errors)) if errors.len() == 2));
        assert_eq!(ledger.get_by_id(&user, &created.id), Ok(created));
    }

    #[test]
    fn update_refreshes_update_time_every_time() {
        let ledger = get_test_ledger();
        let user = UserId::new("u1");
        let created = ledger
            .create(&user, &TransactionInput::new("expense", 10.0))
            .unwrap();

        let mut previous = created.updated_at;
        for amount in 1..=5 {
            let updated = ledger
                .update(&user, &created.id, &TransactionInput {
                    amount: Some((amount as f64).into()),
                    ..Default::default()
                })
                .unwrap();

            assert!(updated.updated_at > previous);
            assert_eq!(updated.created_at, created.created_at);
            previous = updated.updated_at;
        }
    }

    #[test]
    fn missing_transaction_is_not_found() {
        let ledger = get_test_ledger();
        let user = UserId::new("u1");
        let id = TransactionId::from("does-not-exist");

        assert_eq!(ledger.get_by_id(&user, &id), Err(Error::NotFound));
        assert_eq!(
            ledger.update(&user, &id, &TransactionInput::new("income", 1.0)),
            Err(Error::NotFound)
        );
        assert_eq!(ledger.delete(&user, &id), Ok(false));
    }

    #[test]
    fn summary_totals_users_transactions() {
        let ledger = get_test_ledger();
        let user = UserId::new("u1");
        ledger
            .create(&user, &TransactionInput::new("income", 100.0))
            .unwrap();
        ledger
            .create(&user, &TransactionInput::new("expense", 40.0))
            .unwrap();
        ledger
            .create(&UserId::new("u2"), &TransactionInput::new("expense", 1000.0))
            .unwrap();

        let got = ledger.summary(&user).unwrap();

        assert_eq!((got.income, got.expense, got.balance), (100.0, 40.0, 60.0));
    }

    #[test]
    fn concurrent_creates_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(
            TransactionStore::open(dir.path().join("transactions.json")),
            PaginationConfig::default(),
        );
        let count = 32;

        thread::scope(|scope| {
            for i in 0..count {
                let ledger = &ledger;
                scope.spawn(move || {
                    ledger
                        .create(&UserId::new("u1"), &TransactionInput::new("expense", i as f64))
                        .unwrap();
                });
            }
        });

        let got = ledger
            .list(&UserId::new("u1"), &TransactionFilters::default())
            .unwrap();
        assert_eq!(got.total, count);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mixed_mutations_are_all_applied() {
        let ledger = get_test_ledger();
        let user = UserId::new("u1");
        let seeded: Vec<_> = (0..10)
            .map(|_| {
                ledger
                    .create(&user, &TransactionInput::new("expense", 1.0))
                    .unwrap()
            })
            .collect();

        let mut tasks = Vec::new();
        for transaction in seeded.iter().take(5) {
            let (ledger, user, id) = (ledger.clone(), user.clone(), transaction.id.clone());
            tasks.push(tokio::task::spawn_blocking(move || {
                ledger.delete(&user, &id).map(|_| ())
            }));
        }
        for transaction in seeded.iter().skip(5) {
            let (ledger, user, id) = (ledger.clone(), user.clone(), transaction.id.clone());
            tasks.push(tokio::task::spawn_blocking(move || {
                ledger
                    .update(&user, &id, &TransactionInput {
                        amount: Some(2.0.into()),
                        ..Default::default()
                    })
                    .map(|_| ())
            }));
        }
        for _ in 0..5 {
            let (ledger, user) = (ledger.clone(), user.clone());
            tasks.push(tokio::task::spawn_blocking(move || {
                ledger
                    .create(&user, &TransactionInput::new("income", 3.0))
                    .map(|_| ())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let summary = ledger.summary(&user).unwrap();
        assert_eq!(summary.expense, 10.0);
        assert_eq!(summary.income, 15.0);
        assert_eq!(
            ledger.list(&user, &TransactionFilters::default()).unwrap().total,
            10
        );
    }

    #[test]
    fn recovers_from_corrupted_store() {
        let ledger = Ledger::new(
            TransactionStore::new(MemoryStorage::with_document("[{\"broken\": ")),
            PaginationConfig::default(),
        );
        let user = UserId::new("u1");

        assert_eq!(
            ledger.list(&user, &TransactionFilters::default()).unwrap().total,
            0
        );
        let created = ledger
            .create(&user, &TransactionInput::new("income", 1.0))
            .unwrap();
        assert_eq!(ledger.get_by_id(&user, &created.id), Ok(created));
    }

    #[test]
    fn persists_transactions_as_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("transactions.json");
        let ledger = Ledger::new(TransactionStore::open(&path), PaginationConfig::default());

        let created = ledger
            .create(&UserId::new("u1"), &TransactionInput::new("income", 12.5))
            .unwrap();

        let document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document[0]["id"], json!(created.id.as_str()));
        assert_eq!(document[0]["userId"], json!("u1"));
        assert_eq!(document[0]["type"], json!("income"));
        assert_eq!(document[0]["amount"], json!(12.5));
    }

    /// Holds every save until the test lets it through.
    struct GatedStorage {
        inner: MemoryStorage,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl Storage for GatedStorage {
        fn load(&self) -> Result<Option<String>, Error> {
            self.inner.load()
        }

        fn save(&self, document: &str) -> Result<(), Error> {
            self.gate.lock().unwrap().recv().unwrap();
            self.inner.save(document)
        }
    }

    #[tokio::test]
    async fn waiting_on_the_store_does_not_stall_the_runtime() {
        let (release, gate) = mpsc::channel();
        let storage = GatedStorage {
            inner: MemoryStorage::with_document("[]"),
            gate: Mutex::new(gate),
        };
        let ledger = Ledger::new(TransactionStore::new(storage), PaginationConfig::default());

        let pending = tokio::spawn({
            let ledger = ledger.clone();
            async move {
                ledger
                    .run_blocking(|ledger| {
                        ledger.create(&UserId::new("u1"), &TransactionInput::new("income", 1.0))
                    })
                    .await
            }
        });

        // The test runtime has one thread, so getting here while the create
        // is parked means it is not holding that thread.
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        release.send(()).unwrap();
        let created = pending.await.unwrap().unwrap();
        assert_eq!(created.amount, 1.0);
    }

    #[tokio::test]
    async fn panicking_operation_is_a_storage_error() {
        let ledger = get_test_ledger();

        let got = ledger
            .run_blocking(|_| -> Result<(), Error> { panic!("operation failed") })
            .await;

        assert!(matches!(got, Err(Error::Storage(_))));
    }
}
