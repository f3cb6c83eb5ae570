//! # Alias Directory
//!
//! The authoritative in-process map from canonical alias to [`AliasRecord`].
//!
//! ## Locking
//!
//! One `parking_lot::RwLock` guards the map. Lookups share the read lock;
//! `put`, `register` and `update` take the write lock for the map mutation
//! only. Snapshotting for persistence holds the read lock just long enough
//! to clone the map; the store write happens after the guard is dropped.
//!
//! Flushes are serialized by a separate mutex held from snapshot to store
//! write. A flush therefore always saves a map at least as new as every
//! write that preceded it, and a snapshot can never overtake a newer one on
//! its way to the store.
//!
//! ## Durability
//!
//! A directory may carry an [`AliasStore`]. Registration flushes the whole
//! map after inserting. A failed flush does not undo the insert: the record
//! stays visible and the caller learns about the failure through
//! [`Durability::FlushFailed`].

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::alias::{is_reserved, normalize, AliasRecord};
use crate::error::{AlsError, AlsResult};
use crate::storage::{AliasMap, AliasStore, StoreError};

/// What happened to a write on its way to the store.
#[derive(Debug)]
pub enum Durability {
    /// The store accepted the new snapshot.
    Flushed,
    /// No store is attached; the write lives only in memory.
    Volatile,
    /// The store refused the snapshot. The in-memory write still stands.
    FlushFailed(StoreError),
}

impl Durability {
    /// True only when the write reached the store.
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Flushed)
    }
}

pub struct AliasDirectory {
    records: RwLock<AliasMap>,
    store: Option<Arc<dyn AliasStore>>,
    flush_lock: Mutex<()>,
}

impl AliasDirectory {
    /// An empty directory with no persistence.
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(AliasMap::new()),
            store: None,
            flush_lock: Mutex::new(()),
        }
    }

    /// Hydrate a directory from `store`.
    ///
    /// A store with nothing in it yet yields an empty directory. Any read or
    /// decode failure is returned as [`AlsError::Persistence`] and no
    /// directory is built.
    pub fn open(store: Arc<dyn AliasStore>) -> AlsResult<Self> {
        let records = rekey(store.load_all()?);
        info!(aliases = records.len(), "alias directory hydrated");
        Ok(Self {
            records: RwLock::new(records),
            store: Some(store),
            flush_lock: Mutex::new(()),
        })
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn get(&self, alias: &str) -> Option<AliasRecord> {
        self.records.read().get(&normalize(alias)).cloned()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.records.read().contains_key(&normalize(alias))
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Canonical aliases currently held, sorted.
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.records.read().keys().cloned().collect();
        aliases.sort_unstable();
        aliases
    }

    /// Unconditional upsert. No validation, no flush.
    ///
    /// Used for bootstrap data and for records copied down from the ledger.
    pub fn put(&self, record: AliasRecord) {
        let record = record.canonicalize();
        debug!(alias = %record.alias, "alias put");
        self.records.write().insert(record.alias.clone(), record);
    }

    /// Bootstrap insert, same as [`put`](Self::put).
    pub fn seed(&self, record: AliasRecord) {
        self.put(record);
    }

    /// Check `record` against the registration rules without inserting it.
    ///
    /// Checks run in order: reserved word, empty alias, empty endpoint list,
    /// duplicate.
    pub fn validate_new(&self, record: &AliasRecord) -> AlsResult<()> {
        let key = normalize(&record.alias);
        if is_reserved(&key) {
            return Err(AlsError::Reserved { alias: key });
        }
        if key.is_empty() {
            return Err(AlsError::InvalidRecord {
                reason: "alias is empty".into(),
            });
        }
        if record.endpoints.is_empty() {
            return Err(AlsError::InvalidRecord {
                reason: format!("alias {} has no endpoints", key),
            });
        }
        if self.contains(&key) {
            return Err(AlsError::AlreadyExists { alias: key });
        }
        Ok(())
    }

    /// Insert a new alias and flush.
    ///
    /// The duplicate check is repeated under the write lock that performs
    /// the insert, so two concurrent registrations of the same alias cannot
    /// both succeed.
    pub fn register(&self, record: AliasRecord) -> AlsResult<Durability> {
        self.validate_new(&record)?;
        let record = record.canonicalize();
        let alias = record.alias.clone();
        {
            let mut records = self.records.write();
            if records.contains_key(&alias) {
                return Err(AlsError::AlreadyExists { alias });
            }
            records.insert(alias.clone(), record);
        }

        let durability = self.flush();
        info!(alias = %alias, durable = durability.is_durable(), "alias registered");
        Ok(durability)
    }

    /// Mutate one record under the write lock.
    ///
    /// `f` sees the stored record and may refuse the change by returning an
    /// error, in which case the record is left as it was. Nothing is flushed.
    pub fn update<F, R>(&self, alias: &str, f: F) -> AlsResult<R>
    where
        F: FnOnce(&mut AliasRecord) -> AlsResult<R>,
    {
        let key = normalize(alias);
        let mut records = self.records.write();
        let current = records
            .get(&key)
            .ok_or_else(|| AlsError::NotFound { alias: key.clone() })?;

        let mut candidate = current.clone();
        let out = f(&mut candidate)?;
        // The closure may not move the record to another key.
        candidate.alias = key.clone();
        records.insert(key, candidate);
        Ok(out)
    }

    /// Copy of the whole map.
    pub fn snapshot(&self) -> AliasMap {
        self.records.read().clone()
    }

    /// Write the current map to the store, if there is one.
    ///
    /// `Flushed` means every write that completed before this call is in
    /// the store.
    pub fn flush(&self) -> Durability {
        let Some(store) = &self.store else {
            return Durability::Volatile;
        };
        let _serial = self.flush_lock.lock();
        let snapshot = self.snapshot();
        match store.save_all(&snapshot) {
            Ok(()) => Durability::Flushed,
            Err(e) => {
                warn!(error = %e, aliases = snapshot.len(), "alias store flush failed");
                Durability::FlushFailed(e)
            }
        }
    }
}

/// Re-key loaded records by canonical alias.
///
/// Older files may carry non-canonical keys, and two of them can collapse
/// onto one alias. The entry stored under the canonical key wins; otherwise
/// the smallest stored key does. Every dropped entry is logged.
fn rekey(loaded: AliasMap) -> AliasMap {
    let mut entries: Vec<(String, AliasRecord)> = loaded
        .into_iter()
        .map(|(stored_key, record)| (stored_key, record.canonicalize()))
        .collect();
    entries.sort_by(|(ka, ra), (kb, rb)| {
        let a_canonical = *ka == ra.alias;
        let b_canonical = *kb == rb.alias;
        b_canonical.cmp(&a_canonical).then_with(|| ka.cmp(kb))
    });

    let mut records = AliasMap::with_capacity(entries.len());
    for (stored_key, record) in entries {
        if records.contains_key(&record.alias) {
            warn!(
                alias = %record.alias,
                stored_key = %stored_key,
                "stored alias collides with another after normalization, dropping it"
            );
            continue;
        }
        records.insert(record.alias.clone(), record);
    }
    records
}

impl Default for AliasDirectory {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for AliasDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliasDirectory")
            .field("aliases", &self.len())
            .field("persistent", &self.has_store())
            .finish()
    }
}
