//! Implements a [Storage] backed by a single JSON file.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::{Error, stores::Storage};

/// Keeps the transaction collection in one file on disk.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers see either the old or the new document.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a storage for the file at `path`.
    ///
    /// Neither the file nor its parent directories need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "transactions".to_owned());

        self.path
            .with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()))
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<String>, Error> {
        match fs::read_to_string(&self.path) {
            Ok(document) => Ok(Some(document)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => {
                tracing::error!("Could not read {}: {error}", self.path.display());
                Err(Error::Storage(format!(
                    "could not read {}: {error}",
                    self.path.display()
                )))
            }
        }
    }

    fn save(&self, document: &str) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        let result = write_and_rename(&temp_path, &self.path, document);

        if result.is_err() {
            // The rename never happened, so the temp file is the only thing to clean up.
            let _ = fs::remove_file(&temp_path);
        }

        result.map_err(|error| {
            tracing::error!("Could not write {}: {error}", self.path.display());
            Error::Storage(format!("could not write {}: {error}", self.path.display()))
        })
    }
}

fn write_and_rename(temp_path: &Path, path: &Path, document: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    file.write_all(document.as_bytes())?;
    file.sync_all()?;

    fs::rename(temp_path, path)
}
