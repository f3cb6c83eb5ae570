//! # In-Memory Ledger
//!
//! A process-local [`BlockchainResolver`]. It stands in for the real ledger
//! in tests and when the node runs with `--remote mock`.
//!
//! Registration never overwrites: an alias already on the ledger is
//! refused with [`RemoteError::Rejected`].
//!
//! Besides the record map it keeps per-method call counters, an optional
//! artificial latency and an offline switch, which is what tests need to
//! observe cache behaviour and exercise the failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::{BlockchainResolver, CancelToken, RemoteError};
use crate::alias::{normalize, AliasRecord};

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: RwLock<HashMap<String, AliasRecord>>,
    latency: RwLock<Duration>,
    offline: AtomicBool,
    resolve_calls: AtomicU64,
    register_calls: AtomicU64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.write() = latency;
        self
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// While offline every call fails with [`RemoteError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Put a record straight on the ledger without counting a call.
    pub fn insert(&self, record: AliasRecord) {
        let record = record.canonicalize();
        self.records.write().insert(record.alias.clone(), record);
    }

    pub fn get(&self, alias: &str) -> Option<AliasRecord> {
        self.records.read().get(&normalize(alias)).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Number of `resolve` calls received so far.
    pub fn resolve_calls(&self) -> u64 {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Number of `register_on_chain` calls received so far.
    pub fn register_calls(&self) -> u64 {
        self.register_calls.load(Ordering::SeqCst)
    }

    async fn simulate_round_trip(&self) -> Result<(), RemoteError> {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("ledger is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlockchainResolver for InMemoryLedger {
    async fn resolve(&self, alias: &str, cancel: &CancelToken) -> Result<AliasRecord, RemoteError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let key = normalize(alias);
        cancel
            .run(async {
                self.simulate_round_trip().await?;
                let found = self.records.read().get(&key).cloned();
                debug!(alias = %key, hit = found.is_some(), "ledger lookup");
                found.ok_or_else(|| RemoteError::NotFound { alias: key.clone() })
            })
            .await
    }

    async fn register_on_chain(
        &self,
        record: &AliasRecord,
        cancel: &CancelToken,
    ) -> Result<(), RemoteError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let record = record.clone().canonicalize();
        cancel
            .run(async move {
                self.simulate_round_trip().await?;
                if record.alias.is_empty() {
                    return Err(RemoteError::Rejected {
                        reason: "empty alias".into(),
                    });
                }
                let mut records = self.records.write();
                if records.contains_key(&record.alias) {
                    return Err(RemoteError::Rejected {
                        reason: format!("alias {} already registered", record.alias),
                    });
                }
                debug!(alias = %record.alias, "ledger registration");
                records.insert(record.alias.clone(), record);
                Ok(())
            })
            .await
    }
}
