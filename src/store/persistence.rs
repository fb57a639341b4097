//! World-state persistence layer
//!
//! A JSON-file host for local use: the whole key space is loaded into a
//! [`MemoryWorldState`] on open and written back by [`FileWorldState::save`].

use crate::store::world_state::{MemoryWorldState, StoreError, VersionedValue, WorldState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

/// Format version written into the state file
const STATE_FILE_FORMAT: u32 = 1;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ledger_data"),
            state_file: "world_state.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    /// Record bytes as UTF-8 text
    value: String,
    version: u64,
}

#[derive(Serialize, Deserialize)]
struct StateFile {
    format: u32,
    entries: BTreeMap<String, StoredEntry>,
}

/// World state backed by a JSON file
pub struct FileWorldState {
    config: FileStoreConfig,
    state: MemoryWorldState,
    dirty: bool,
}

impl FileWorldState {
    /// Open the state file, starting empty if it does not exist yet
    pub fn open(config: FileStoreConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.data_dir)?;

        let mut store = Self {
            config,
            state: MemoryWorldState::new(),
            dirty: false,
        };

        let path = store.state_path();
        if path.exists() {
            let file = fs::File::open(&path)?;
            let parsed: StateFile = serde_json::from_reader(BufReader::new(file))?;
            if parsed.format != STATE_FILE_FORMAT {
                return Err(StoreError::InvalidData(format!(
                    "Unsupported state file format {}",
                    parsed.format
                )));
            }
            for (key, entry) in parsed.entries {
                store.state.restore(
                    key,
                    VersionedValue {
                        value: entry.value.into_bytes(),
                        version: entry.version,
                    },
                );
            }
            log::debug!("Loaded {} keys from {:?}", store.state.len(), path);
        }

        Ok(store)
    }

    /// Open with default configuration
    pub fn with_defaults() -> Result<Self, StoreError> {
        Self::open(FileStoreConfig::default())
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, index))
    }

    /// In-memory view of the loaded key space
    pub fn state(&self) -> &MemoryWorldState {
        &self.state
    }

    /// Whether any put happened since open or the last save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.keys()
    }

    /// Write the key space to disk
    pub fn save(&mut self) -> Result<(), StoreError> {
        let path = self.state_path();

        if self.config.backup_enabled && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let mut entries = BTreeMap::new();
        for (key, entry) in self.state.iter() {
            let value = String::from_utf8(entry.value.clone()).map_err(|_| {
                StoreError::InvalidData(format!("Value under {} is not UTF-8", key))
            })?;
            entries.insert(
                key.clone(),
                StoredEntry {
                    value,
                    version: entry.version,
                },
            );
        }
        let file_contents = StateFile {
            format: STATE_FILE_FORMAT,
            entries,
        };

        // Write to temporary file first
        let temp_path = self.config.data_dir.join("world_state.tmp");
        let file = fs::File::create(&temp_path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &file_contents)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;
        self.dirty = false;

        Ok(())
    }

    fn rotate_backups(&self) -> Result<(), StoreError> {
        if self.config.max_backups == 0 {
            return Ok(());
        }

        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let path = self.state_path();

        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StoreStats {
            key_count: self.state.len(),
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

impl WorldState for FileWorldState {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.state.get(key)
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.state.put(key, value)?;
        self.dirty = true;
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StoreStats {
    pub key_count: usize,
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}
