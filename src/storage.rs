//! Durable storage of the whole note collection under a single key.
//!
//! A [`KeyValueSlot`] is the raw durable store (a directory of files, or an
//! in-process map). The [`PersistenceAdapter`] serializes the full collection
//! into one JSON blob per write and reads it back on load.
use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use log::{debug, error, info, trace, warn};
use tempfile::NamedTempFile;

use crate::{Note, NoteError, Result};

/// A durable string-valued key-value store.
pub trait KeyValueSlot: Send + Sync {
    /// Returns the stored value, or `None` when the key was never written.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Overwrites the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`, replacing files atomically.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Helper method to get the file path for a key
    fn get_key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueSlot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.get_key_path(key);
        if !path.exists() {
            debug!("No stored value at {}", path.display());
            return Ok(None);
        }

        let value = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read {}: {}", path.display(), e);
            NoteError::Io(e)
        })?;
        trace!("Read {} bytes from {}", value.len(), path.display());
        Ok(Some(value))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        if !self.dir.exists() {
            debug!("Creating storage directory: {}", self.dir.display());
            fs::create_dir_all(&self.dir).map_err(|e| {
                error!("Failed to create directory {}: {}", self.dir.display(), e);
                NoteError::Io(e)
            })?;
        }

        let path = self.get_key_path(key);

        // Write next to the target so the final rename stays on one filesystem
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            NoteError::Io(e)
        })?;

        temp_file.write_all(value.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            NoteError::Io(e)
        })?;

        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            NoteError::Io(e)
        })?;

        temp_file.persist(&path).map_err(|e| {
            error!("Failed to persist file {}: {}", path.display(), e.error);
            NoteError::Io(e.error)
        })?;

        trace!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

const NO_QUOTA: usize = usize::MAX;

/// In-process slot. Clones share the same entries and quota.
///
/// A byte quota makes oversized writes fail the way browser storage does
/// when it is full.
#[derive(Debug, Clone)]
pub struct MemorySlot {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota: Arc<AtomicUsize>,
}

impl Default for MemorySlot {
    fn default() -> Self {
        Self {
            entries: Arc::default(),
            quota: Arc::new(AtomicUsize::new(NO_QUOTA)),
        }
    }
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that rejects any write whose total stored size would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let slot = Self::default();
        slot.set_quota(Some(bytes));
        slot
    }

    pub fn set_quota(&self, quota: Option<usize>) {
        self.quota.store(quota.unwrap_or(NO_QUOTA), Ordering::SeqCst);
    }

    /// Stores a raw value without any checks.
    pub fn insert_raw(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| NoteError::LockAcquisitionFailed {
                message: "Failed to acquire lock on memory slot".to_string(),
            })
    }
}

impl KeyValueSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.get_raw(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock()?;

        let quota = self.quota.load(Ordering::SeqCst);
        if quota != NO_QUOTA {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(NoteError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("quota exceeded: {} of {} bytes", needed, quota),
                )));
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and writes the entire note collection under one storage key.
pub struct PersistenceAdapter {
    slot: Box<dyn KeyValueSlot>,
    key: String,
}

impl PersistenceAdapter {
    pub fn new(slot: impl KeyValueSlot + 'static, key: impl Into<String>) -> Self {
        Self {
            slot: Box::new(slot),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads the stored collection.
    ///
    /// An absent key yields an empty collection. A blob that cannot be read
    /// or parsed yields [`NoteError::Corruption`]; callers fall back to an
    /// empty collection.
    pub fn load(&self) -> Result<Vec<Note>> {
        let blob = match self.slot.read(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                info!("No notes stored under '{}', starting empty", self.key);
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!("Failed to read notes under '{}': {}", self.key, e);
                return Err(NoteError::Corruption {
                    key: self.key.clone(),
                    message: e.to_string(),
                });
            }
        };

        let notes: Vec<Note> = serde_json::from_str(&blob).map_err(|e| {
            warn!("Stored notes under '{}' are malformed: {}", self.key, e);
            NoteError::Corruption {
                key: self.key.clone(),
                message: e.to_string(),
            }
        })?;

        debug!("Loaded {} notes from '{}'", notes.len(), self.key);
        Ok(notes)
    }

    /// Serializes `notes` and overwrites the stored blob.
    pub fn save(&self, notes: &[Note]) -> Result<()> {
        let json = serde_json::to_string(notes).map_err(|e| {
            error!("Failed to serialize notes: {}", e);
            NoteError::Persistence {
                key: self.key.clone(),
                message: e.to_string(),
            }
        })?;

        self.slot.write(&self.key, &json).map_err(|e| {
            error!("Failed to save notes under '{}': {}", self.key, e);
            NoteError::Persistence {
                key: self.key.clone(),
                message: e.to_string(),
            }
        })?;

        debug!("Saved {} notes under '{}'", notes.len(), self.key);
        Ok(())
    }
}
