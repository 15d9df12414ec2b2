//! Contains the durable storage for the transaction collection.
//!
//! A [TransactionStore] owns the document format and the locking discipline,
//! and delegates the raw bytes to a [Storage] backend so that tests can swap
//! the file on disk for memory.

mod file;
mod memory;
mod transaction;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use transaction::{Modification, TransactionStore};

use crate::Error;

/// Somewhere the serialized transaction collection can be kept.
///
/// Implementers only move whole documents: a [Storage::save] must either
/// replace the previous document completely or leave it untouched.
pub trait Storage: Send + Sync {
    /// Load the current document, or `None` if nothing has been saved yet.
    ///
    /// # Errors
    /// Returns [Error::Storage] if the underlying medium cannot be read.
    fn load(&self) -> Result<Option<String>, Error>;

    /// Replace the current document with `document`.
    ///
    /// # Errors
    /// Returns [Error::Storage] if the underlying medium cannot be written.
    fn save(&self, document: &str) -> Result<(), Error>;
}
