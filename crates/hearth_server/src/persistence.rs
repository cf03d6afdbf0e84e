//! Player persistence
//!
//! Autosave snapshots players on the game thread and hands the batch to a [`SaveWorker`],
//! which writes it through a [`PlayerStore`] on its own thread. Each player is one file,
//! written to a temporary path and renamed into place so a crash never leaves half a save.

use crate::error::{PersistenceError, PersistenceResult};
use crossbeam_channel::{Sender, TrySendError};
use hearth_core::EntityId;
use hearth_sim::PlayerRecord;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Save file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// JSON (human readable)
    #[default]
    Json,
    /// Binary (compact)
    Binary,
}

impl SaveFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "bin",
        }
    }
}

impl std::str::FromStr for SaveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "binary" | "bin" | "bincode" => Ok(Self::Binary),
            _ => Err(format!("Unknown save format: {}", s)),
        }
    }
}

/// Where player records go
pub trait PlayerStore: Send + Sync {
    /// Persist one player, replacing any earlier save
    fn save(&self, record: &PlayerRecord) -> PersistenceResult<()>;

    /// Every saved player, in id order
    fn load_all(&self) -> PersistenceResult<Vec<PlayerRecord>>;
}

/// One file per player under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    format: SaveFormat,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, format: SaveFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    /// File a player is saved to
    pub fn path_for(&self, id: EntityId) -> PathBuf {
        self.dir
            .join(format!("{}.{}", id.raw(), self.format.extension()))
    }

    /// Load one player, if saved
    pub fn load(&self, id: EntityId) -> PersistenceResult<Option<PlayerRecord>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        self.decode(&path, &bytes).map(Some)
    }

    fn encode(&self, record: &PlayerRecord) -> PersistenceResult<Vec<u8>> {
        match self.format {
            SaveFormat::Json => serde_json::to_vec_pretty(record)
                .map_err(|e| PersistenceError::Serialization(e.to_string())),
            SaveFormat::Binary => bincode::serialize(record)
                .map_err(|e| PersistenceError::Serialization(e.to_string())),
        }
    }

    fn decode(&self, path: &Path, bytes: &[u8]) -> PersistenceResult<PlayerRecord> {
        let result = match self.format {
            SaveFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            SaveFormat::Binary => bincode::deserialize(bytes).map_err(|e| e.to_string()),
        };
        result.map_err(|reason| PersistenceError::Deserialization {
            path: path.to_path_buf(),
            reason,
        })
    }
}

impl PlayerStore for FileStore {
    fn save(&self, record: &PlayerRecord) -> PersistenceResult<()> {
        fs::create_dir_all(&self.dir)?;
        let bytes = self.encode(record)?;

        let path = self.path_for(record.id);
        let tmp = path.with_extension(format!("{}.tmp", self.format.extension()));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        log::trace!("Saved player {} to {}", record.id, path.display());
        Ok(())
    }

    fn load_all(&self) -> PersistenceResult<Vec<PlayerRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.format.extension()) {
                continue;
            }
            let bytes = fs::read(&path)?;
            match self.decode(&path, &bytes) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping unreadable save: {}", e),
            }
        }
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

/// Counters kept by the save worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStats {
    /// Batches written (fully or partly)
    pub batches: u64,
    /// Players written
    pub saved: u64,
    /// Players that failed to write
    pub failures: u64,
    /// Batches refused because the worker was still busy
    pub skipped: u64,
}

/// Background thread that writes player batches through a [`PlayerStore`].
///
/// A failed write is logged and counted; the next autosave captures the player again, so it
/// is retried on the next cycle.
pub struct SaveWorker {
    sender: Option<Sender<Vec<PlayerRecord>>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<Mutex<SaveStats>>,
}

impl SaveWorker {
    /// Spawn the worker. At most `capacity` batches wait in line.
    pub fn start(store: Arc<dyn PlayerStore>, capacity: usize) -> PersistenceResult<Self> {
        let (sender, receiver) = crossbeam_channel::bounded::<Vec<PlayerRecord>>(capacity.max(1));
        let stats = Arc::new(Mutex::new(SaveStats::default()));
        let thread_stats = stats.clone();

        let handle = thread::Builder::new()
            .name("save-worker".to_string())
            .spawn(move || {
                for batch in receiver {
                    let mut saved = 0;
                    let mut failures = 0;
                    for record in &batch {
                        match store.save(record) {
                            Ok(()) => saved += 1,
                            Err(e) => {
                                failures += 1;
                                log::error!("Failed to save player {}: {}", record.id, e);
                            }
                        }
                    }
                    let mut stats = thread_stats.lock();
                    stats.batches += 1;
                    stats.saved += saved;
                    stats.failures += failures;
                    log::debug!("Saved {} players ({} failed)", saved, failures);
                }
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            stats,
        })
    }

    /// Queue a batch. Returns `false` if it was refused.
    pub fn submit(&self, batch: Vec<PlayerRecord>) -> bool {
        let Some(sender) = &self.sender else {
            log::warn!("Save worker finished, dropping {} players", batch.len());
            return false;
        };
        match sender.try_send(batch) {
            Ok(()) => true,
            Err(TrySendError::Full(batch)) => {
                self.stats.lock().skipped += 1;
                log::warn!("Save worker busy, skipping save of {} players", batch.len());
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("Save worker is gone");
                false
            }
        }
    }

    /// Queue a batch, waiting for room if the worker is busy. Used for the shutdown save,
    /// which must not be skipped.
    pub fn submit_final(&self, batch: Vec<PlayerRecord>) -> bool {
        let Some(sender) = &self.sender else {
            log::warn!("Save worker finished, dropping {} players", batch.len());
            return false;
        };
        if sender.send(batch).is_err() {
            log::error!("Save worker is gone");
            return false;
        }
        true
    }

    pub fn stats(&self) -> SaveStats {
        *self.stats.lock()
    }

    /// Write everything queued, then stop the thread. Safe to call more than once.
    pub fn finish(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Save worker panicked");
            }
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.finish();
    }
}
