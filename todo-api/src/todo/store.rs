//! File-backed todo store.
//!
//! The store keeps the authoritative list of [`TodoRecord`]s in memory and
//! mirrors it to a single JSON file. Every operation runs under one exclusive
//! lock, reads included, and every mutation rewrites the whole file through a
//! temporary sibling that is atomically renamed over the target.
//!
//! # Invariants
//! - The in-memory list always equals the last successfully persisted file. A
//!   mutation is applied to a copy of the list and only replaces it once the
//!   write has landed on disk.
//! - The target file is never left truncated or half written.
//! - Nothing returned by the store aliases its internal state.
//! - Once the lock is held there are no await points, so a cancelled caller is
//!   only ever cancelled while waiting for the lock.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use uuid::Uuid;

use super::TodoRecord;

/// Errors raised by [`TodoStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The configured path has no file name component.
    #[error("Data file path '{0}' is invalid")]
    InvalidPath(PathBuf),
    /// The data file exists but does not hold a JSON array of todos.
    #[error("Failed to parse persisted data at '{path}'")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The data file or its directory could not be read or created.
    #[error("Unable to read data file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Writing or replacing the data file failed; the mutation was not applied.
    #[error("Failed to persist data to '{path}'")]
    Durability {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// JSON file store for todos.
///
/// File writes and `sync_all` run synchronously on the calling task while the
/// lock is held, so an operation is never cancelled halfway through a write.
pub struct TodoStore {
    path: PathBuf,
    directory: PathBuf,
    file_name: String,
    records: Mutex<Vec<TodoRecord>>,
}

impl std::fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl TodoStore {
    /// Opens the store at `path`, creating the parent directory and an empty
    /// data file when they do not exist yet.
    ///
    /// # Errors
    ///
    /// * [`StoreError::InvalidPath`] when `path` has no file name.
    /// * [`StoreError::Read`] when the directory cannot be created or the file cannot be read.
    /// * [`StoreError::Corrupt`] when the file exists but cannot be parsed.
    /// * [`StoreError::Durability`] when the initial empty file cannot be written.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_owned)
            .ok_or_else(|| StoreError::InvalidPath(path.clone()))?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&directory).map_err(|source| {
            tracing::error!("Unable to create data directory {}: {}", directory.display(), source);
            StoreError::Read {
                path: path.clone(),
                source,
            }
        })?;

        let store = Self {
            path,
            directory,
            file_name,
            records: Mutex::new(Vec::new()),
        };

        if !store.path.exists() {
            tracing::info!(
                "Data file does not exist, creating new file at {}",
                store.path.display()
            );
            store.persist(&[])?;
            return Ok(store);
        }

        let records = store.load()?;
        tracing::info!(
            "Loaded {} todo items from {}",
            records.len(),
            store.path.display()
        );
        Ok(Self {
            records: Mutex::new(records),
            ..store
        })
    }

    /// Path of the backing data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a copy of every record, in insertion order.
    #[tracing::instrument(skip(self))]
    pub async fn read_all(&self) -> Vec<TodoRecord> {
        let records = self.records.lock().await;
        records.clone()
    }

    /// Returns a copy of the record with the given id, if any.
    #[tracing::instrument(skip(self))]
    pub async fn read_by_id(&self, id: Uuid) -> Option<TodoRecord> {
        let records = self.records.lock().await;
        records.iter().find(|record| record.id == id).cloned()
    }

    /// Appends `record` and persists the list.
    ///
    /// # Errors
    ///
    /// [`StoreError::Durability`] when the list could not be written; the
    /// record is then not part of the store.
    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    pub async fn add(&self, record: TodoRecord) -> Result<TodoRecord, StoreError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        next.push(record.clone());
        self.commit(&mut records, next)?;
        Ok(record)
    }

    /// Replaces the record sharing `record.id` wholesale and persists the list.
    ///
    /// Returns `Ok(None)` without touching the disk when no record has that id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Durability`] when the list could not be written; the
    /// previous version of the record is kept.
    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    pub async fn update(&self, record: TodoRecord) -> Result<Option<TodoRecord>, StoreError> {
        let mut records = self.records.lock().await;
        let Some(index) = records.iter().position(|existing| existing.id == record.id) else {
            return Ok(None);
        };
        let mut next = records.clone();
        next[index] = record.clone();
        self.commit(&mut records, next)?;
        Ok(Some(record))
    }

    /// Removes every record with the given id and persists the list.
    ///
    /// Returns `Ok(false)` without touching the disk when nothing matched.
    ///
    /// # Errors
    ///
    /// [`StoreError::Durability`] when the list could not be written; the
    /// record stays in the store.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        let next: Vec<TodoRecord> = records
            .iter()
            .filter(|record| record.id != id)
            .cloned()
            .collect();
        if next.len() == records.len() {
            return Ok(false);
        }
        self.commit(&mut records, next)?;
        Ok(true)
    }

    /// Persists `next` and, only if that succeeded, makes it the current list.
    fn commit(
        &self,
        records: &mut Vec<TodoRecord>,
        next: Vec<TodoRecord>,
    ) -> Result<(), StoreError> {
        self.persist(&next)?;
        *records = next;
        Ok(())
    }

    fn load(&self) -> Result<Vec<TodoRecord>, StoreError> {
        tracing::info!("Loading existing data from {}", self.path.display());
        let bytes = fs::read(&self.path).map_err(|source| {
            tracing::error!("Unable to read data file {}: {}", self.path.display(), source);
            StoreError::Read {
                path: self.path.clone(),
                source,
            }
        })?;
        // A literal `null` is accepted as an empty list.
        let records: Option<Vec<TodoRecord>> = serde_json::from_slice(&bytes).map_err(|source| {
            tracing::error!(
                "Failed to parse persisted data at {}: {}",
                self.path.display(),
                source
            );
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        Ok(records.unwrap_or_default())
    }

    /// Writes `records` to a fresh temporary file next to the target and renames
    /// it over the target. The temporary file is removed if anything is left behind.
    fn persist(&self, records: &[TodoRecord]) -> Result<(), StoreError> {
        tracing::debug!(
            "Persisting {} todo items to {}",
            records.len(),
            self.path.display()
        );
        let temp_path = self.temp_path();
        let result = serde_json::to_vec_pretty(records)
            .map_err(io::Error::from)
            .and_then(|json| write_and_replace(&temp_path, &self.path, &json));
        remove_leftover(&temp_path);

        result.map_err(|source| {
            tracing::error!("Failed to persist data to {}: {}", self.path.display(), source);
            StoreError::Durability {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn temp_path(&self) -> PathBuf {
        self.directory.join(format!(
            "{}.{}.tmp",
            self.file_name,
            Uuid::new_v4().simple()
        ))
    }
}

fn write_and_replace(temp_path: &Path, target: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp_path, target)
}

fn remove_leftover(temp_path: &Path) {
    match fs::remove_file(temp_path) {
        Ok(()) => tracing::debug!("Removed leftover temp file {}", temp_path.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(
            "Failed to remove temp file {}: {}",
            temp_path.display(),
            err
        ),
    }
}
