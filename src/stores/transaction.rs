//! Implements the transaction store: the whole collection persisted as one
//! JSON document behind a single reader/writer lock.

use std::{
    path::PathBuf,
    sync::{RwLock, RwLockWriteGuard},
};

use crate::{
    Error,
    stores::{FileStorage, MemoryStorage, Storage},
    transaction::Transaction,
};

/// The result of a read-modify-write passed to [TransactionStore::modify].
#[derive(Debug, PartialEq)]
pub enum Modification<T> {
    /// The collection was changed and must be persisted.
    Changed(T),
    /// The collection was left as it was, nothing needs to be written.
    Unchanged(T),
}

/// Stores the full collection of transactions for every user.
///
/// Reads may run concurrently with each other. Every write, and every
/// read-modify-write done through [TransactionStore::modify], holds the lock
/// exclusively for its whole duration, so concurrent mutations can never
/// drop each other's changes and readers never see a half written collection.
///
/// The backing document is created on first use. A document that is not a
/// JSON array is reset to an empty collection. Elements of the array that are
/// not valid transactions are dropped and the rest are kept.
pub struct TransactionStore {
    storage: Box<dyn Storage>,
    lock: RwLock<()>,
}

enum Loaded {
    Transactions(Vec<Transaction>),
    Damaged {
        transactions: Vec<Transaction>,
        dropped: usize,
    },
    Missing,
    Corrupted(serde_json::Error),
}

impl TransactionStore {
    /// Create a store that keeps its document in `storage`.
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            lock: RwLock::new(()),
        }
    }

    /// Create a store backed by the JSON file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(FileStorage::new(path))
    }

    /// Create a store that only lives in memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Get every transaction in the store.
    ///
    /// A missing document is initialized to an empty collection, a corrupted
    /// one is reset to an empty collection and invalid records are dropped.
    ///
    /// # Errors
    /// Returns [Error::Storage] if the backing storage cannot be read or
    /// written, or [Error::StoreLockError] if the lock is poisoned.
    pub fn read_all(&self) -> Result<Vec<Transaction>, Error> {
        {
            let _guard = self.lock.read().map_err(|_| Error::StoreLockError)?;

            if let Loaded::Transactions(transactions) = self.load()? {
                return Ok(transactions);
            }
        }

        // Creating or repairing the document is a write, so it needs the lock to itself.
        let guard = self.write_lock()?;
        self.load_or_reset(&guard)
    }

    /// Replace every transaction in the store with `transactions`.
    ///
    /// # Errors
    /// Returns [Error::Storage] if the backing storage cannot be written, or
    /// [Error::StoreLockError] if the lock is poisoned.
    pub fn write_all(&self, transactions: &[Transaction]) -> Result<(), Error> {
        let guard = self.write_lock()?;
        self.save(&guard, transactions)
    }

    /// Run a read-modify-write cycle on the whole collection.
    ///
    /// `modify` receives the current collection and returns whether it changed
    /// it. Changed collections are saved before the lock is released. If
    /// `modify` returns an error nothing is saved.
    ///
    /// # Errors
    /// Returns the error from `modify`, [Error::Storage] if the backing storage
    /// cannot be read or written, or [Error::StoreLockError] if the lock is
    /// poisoned.
    pub fn modify<T, F>(&self, modify: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Vec<Transaction>) -> Result<Modification<T>, Error>,
    {
        let guard = self.write_lock()?;
        let mut transactions = self.load_or_reset(&guard)?;

        match modify(&mut transactions)? {
            Modification::Changed(value) => {
                self.save(&guard, &transactions)?;
                Ok(value)
            }
            Modification::Unchanged(value) => Ok(value),
        }
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, ()>, Error> {
        self.lock.write().map_err(|_| Error::StoreLockError)
    }

    fn load(&self) -> Result<Loaded, Error> {
        let document = match self.storage.load()? {
            Some(document) => document,
            None => return Ok(Loaded::Missing),
        };

        if document.trim().is_empty() {
            return Ok(Loaded::Transactions(Vec::new()));
        }

        let elements: Vec<serde_json::Value> = match serde_json::from_str(&document) {
            Ok(elements) => elements,
            Err(error) => return Ok(Loaded::Corrupted(error)),
        };

        let total = elements.len();
        let transactions: Vec<Transaction> = elements
            .into_iter()
            .filter_map(|element| serde_json::from_value(element).ok())
            .collect();

        match total - transactions.len() {
            0 => Ok(Loaded::Transactions(transactions)),
            dropped => Ok(Loaded::Damaged {
                transactions,
                dropped,
            }),
        }
    }

    /// Load the collection, creating or resetting the document when needed.
    ///
    /// Callers must hold the write lock, which `guard` proves.
    fn load_or_reset(&self, guard: &RwLockWriteGuard<'_, ()>) -> Result<Vec<Transaction>, Error> {
        match self.load()? {
            Loaded::Transactions(transactions) => Ok(transactions),
            Loaded::Missing => {
                tracing::debug!("Transaction store is missing, initializing an empty collection.");
                self.save(guard, &[])?;
                Ok(Vec::new())
            }
            Loaded::Damaged {
                transactions,
                dropped,
            } => {
                tracing::warn!(
                    "Transaction store holds {dropped} invalid record(s), discarding them and \
                    keeping the other {} transaction(s).",
                    transactions.len()
                );
                self.save(guard, &transactions)?;
                Ok(transactions)
            }
            Loaded::Corrupted(error) => {
                tracing::warn!(
                    "Transaction store is corrupted ({error}), resetting it to an empty \
                    collection. Every stored transaction is lost."
                );
                self.save(guard, &[])?;
                Ok(Vec::new())
            }
        }
    }

    fn save(
        &self,
        _guard: &RwLockWriteGuard<'_, ()>,
        transactions: &[Transaction],
    ) -> Result<(), Error> {
        let document = serde_json::to_string_pretty(transactions).map_err(|error| {
            tracing::error!("Could not serialize transactions: {error}");
            Error::Storage(format!("could not serialize transactions: {error}"))
        })?;

        self.storage.save(&document)
    }
}
