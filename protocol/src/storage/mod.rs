//! # Storage Module
//!
//! Durability for the alias directory. The directory itself is an in-memory
//! map; stores only have to load the whole map at startup and save the whole
//! map after a write.
//!
//! ```text
//! mod.rs    : AliasStore contract, StoreError, MemoryStore
//! json.rs   : JsonFileStore: one pretty-printed JSON object on disk
//! db.rs     : SledStore: embedded sled tree, bincode values
//! ```
//!
//! ## Contract
//!
//! - `load_all` on a store that has never been written returns an empty map.
//!   "Missing" is a fresh start, not a failure.
//! - Any other read or decode failure is an error; the directory treats it
//!   as fatal during construction.
//! - `save_all` replaces the persisted contents with the given map.

pub mod db;
pub mod json;

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::alias::AliasRecord;

pub use db::SledStore;
pub use json::JsonFileStore;

/// Errors that can occur while loading or saving alias records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("encoding error: {0}")]
    Encoding(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Canonical alias -> record, the unit stores load and save.
pub type AliasMap = HashMap<String, AliasRecord>;

/// Persistent key-value-of-records abstraction behind the directory.
pub trait AliasStore: Send + Sync {
    /// Load every persisted record. A store with no backing data yet
    /// returns an empty map.
    fn load_all(&self) -> StoreResult<AliasMap>;

    /// Replace the persisted contents with `records`.
    fn save_all(&self, records: &AliasMap) -> StoreResult<()>;
}

/// Process-local store. Nothing survives a restart; useful for tests and
/// for running the node without a data file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<AliasMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, as if a previous process had saved `records`.
    pub fn with_records(records: AliasMap) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl AliasStore for MemoryStore {
    fn load_all(&self) -> StoreResult<AliasMap> {
        Ok(self.records.read().clone())
    }

    fn save_all(&self, records: &AliasMap) -> StoreResult<()> {
        *self.records.write() = records.clone();
        Ok(())
    }
}
