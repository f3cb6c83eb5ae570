//! JSON file store.
//!
//! The whole directory as one pretty-printed JSON object keyed by canonical
//! alias. Human-editable, diff-friendly, and good enough for directories
//! that fit comfortably in memory (which is all of them, by construction).

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::{AliasMap, AliasStore, StoreResult};

/// Distinguishes staging files of concurrent saves within one process.
static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Alias store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh sibling path for one write-then-rename. No two saves share one.
    fn staging_path(&self) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        PathBuf::from(name)
    }
}

impl AliasStore for JsonFileStore {
    fn load_all(&self) -> StoreResult<AliasMap> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no data file yet, starting empty");
                return Ok(AliasMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let records: AliasMap = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), count = records.len(), "loaded alias records");
        Ok(records)
    }

    fn save_all(&self, records: &AliasMap) -> StoreResult<()> {
        // Sorted keys keep the file stable across saves.
        let ordered: BTreeMap<_, _> = records.iter().collect();
        let bytes = serde_json::to_vec_pretty(&ordered)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let staging = self.staging_path();
        let written = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{AliasRecord, AttestationLevel, Endpoint};
    use crate::storage::StoreError;

    fn sample() -> AliasMap {
        let mut map = AliasMap::new();
        map.insert(
            "koda_dev".into(),
            AliasRecord::new("koda_dev", "K**** M*******")
                .with_attestation(AttestationLevel::Verified)
                .with_endpoint(Endpoint::wallet(1, "AIRTEL_MONEY", "26599...")),
        );
        map.insert(
            "private_user".into(),
            AliasRecord::new("private_user", "P***********")
                .private()
                .with_endpoint(Endpoint::wallet(1, "AIRTEL", "0999000111")),
        );
        map
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_restores_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("als_data.json"));
        let records = sample();

        store.save_all(&records).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, records);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn concurrent_saves_never_collide_on_staging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("als_data.json");
        let records = sample();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = JsonFileStore::new(&path);
                let records = records.clone();
                std::thread::spawn(move || store.save_all(&records))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(JsonFileStore::new(&path).load_all().unwrap(), records);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/deeper/als.json"));
        store.save_all(&sample()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("als_data.json");
        fs::write(&path, b"{ this is not json").unwrap();

        let err = JsonFileStore::new(&path).load_all().unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[test]
    fn file_is_readable_json_keyed_by_alias() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("als_data.json");
        JsonFileStore::new(&path).save_all(&sample()).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["koda_dev"]["attestation"], 2);
        assert_eq!(value["private_user"]["is_private"], true);
    }
}
