//! Implements an in-memory [Storage], mostly useful for tests.

use std::sync::Mutex;

use crate::{Error, stores::Storage};

/// Keeps the serialized transaction collection in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    document: Mutex<Option<String>>,
}

impl MemoryStorage {
    /// Create an empty storage, as if no document had been saved yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage that already holds `document`.
    pub fn with_document(document: &str) -> Self {
        Self {
            document: Mutex::new(Some(document.to_owned())),
        }
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, Error> {
        self.document
            .lock()
            .map(|document| document.clone())
            .map_err(|_| Error::StoreLockError)
    }

    fn save(&self, document: &str) -> Result<(), Error> {
        let mut current = self.document.lock().map_err(|_| Error::StoreLockError)?;
        *current = Some(document.to_owned());

        Ok(())
    }
}
