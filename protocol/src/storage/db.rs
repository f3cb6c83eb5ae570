//! # SledStore: Embedded Alias Storage
//!
//! Persists alias records in a named sled tree. Each record is one entry:
//!
//! | Tree      | Key                       | Value                  |
//! |-----------|---------------------------|------------------------|
//! | `aliases` | canonical alias (UTF-8)   | `bincode(AliasRecord)` |
//!
//! ## Atomicity
//!
//! `save_all` computes the difference between what is on disk and the new
//! map, then applies inserts and removals as a single `Batch`. Either the
//! whole snapshot lands or none of it does.

use sled::{Batch, Db, Tree};
use std::path::Path;

use super::{AliasMap, AliasStore, StoreError, StoreResult};
use crate::alias::AliasRecord;
use crate::config::SLED_ALIAS_TREE;

/// Alias store backed by an embedded sled database.
///
/// sled handles are cheap to clone and thread-safe, so a `SledStore` can be
/// shared behind an `Arc` without extra locking.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    aliases: Tree,
}

impl SledStore {
    /// Open or create a database at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A database that lives in a temp location and disappears on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let aliases = db.open_tree(SLED_ALIAS_TREE)?;
        Ok(Self { db, aliases })
    }

    /// Fetch a single record straight from disk.
    pub fn get(&self, alias: &str) -> StoreResult<Option<AliasRecord>> {
        match self.aliases.get(alias.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Number of persisted records.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

fn encode(record: &AliasRecord) -> StoreResult<Vec<u8>> {
    bincode::serialize(record).map_err(|e| StoreError::Encoding(e.to_string()))
}

fn decode(bytes: &[u8]) -> StoreResult<AliasRecord> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Encoding(e.to_string()))
}

impl AliasStore for SledStore {
    fn load_all(&self) -> StoreResult<AliasMap> {
        let mut records = AliasMap::new();
        for entry in self.aliases.iter() {
            let (key, value) = entry?;
            let alias = String::from_utf8(key.to_vec())
                .map_err(|e| StoreError::Encoding(format!("non-utf8 alias key: {}", e)))?;
            records.insert(alias, decode(&value)?);
        }
        Ok(records)
    }

    fn save_all(&self, records: &AliasMap) -> StoreResult<()> {
        let mut batch = Batch::default();

        for key in self.aliases.iter().keys() {
            let key = key?;
            let stale = std::str::from_utf8(&key)
                .map(|alias| !records.contains_key(alias))
                .unwrap_or(true);
            if stale {
                batch.remove(key);
            }
        }

        for (alias, record) in records {
            batch.insert(alias.as_bytes(), encode(record)?);
        }

        self.aliases.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }
}
