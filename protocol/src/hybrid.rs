//! # Hybrid Resolver
//!
//! Local directory in front, ledger behind.
//!
//! ```text
//!  resolve(alias)
//!    local hit ───────────────────────────────► signed response
//!    local miss ─► ledger.resolve ─► put locally ─► local resolve ─► signed response
//!                        │
//!                        └─ failure ─► RemoteUnavailable { local miss, remote cause }
//!
//!  register(record)
//!    local policy checks ─► claim alias ─► ledger.register_on_chain ─► local register
//!                               │                   │
//!                               │                   └─ failure ─► RemoteRejected
//!                               └─ already claimed ─► AlreadyExists
//! ```
//!
//! A registration claims its alias before the ledger call and releases it
//! once the local insert is done (or the call fails, or the future is
//! dropped). A second registration of the same alias in that window is
//! refused without reaching the ledger.
//!
//! Misses are never cached: an alias the ledger did not know about is asked
//! for again on the next call. Local errors other than a miss (a suspended
//! alias, for one) are returned without consulting the ledger.
//!
//! Every ledger call runs under the caller's [`CancelToken`] tightened by
//! [`HybridConfig::remote_timeout`]. Nothing is retried here.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alias::{normalize, AliasRecord, AttestationLevel, ResolutionResponse};
use crate::attestation::Attested;
use crate::config::DEFAULT_REMOTE_TIMEOUT;
use crate::crypto::AlsPublicKey;
use crate::directory::{AliasDirectory, Durability};
use crate::error::{AlsError, AlsResult};
use crate::remote::{BlockchainResolver, CancelToken, RemoteError};
use crate::resolver::ResolutionEngine;
use crate::service::AliasService;

#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Upper bound on any single ledger call.
    pub remote_timeout: Duration,
    /// Flush the directory after caching a ledger record.
    pub flush_on_write_back: bool,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            flush_on_write_back: true,
        }
    }
}

/// Counters for the ledger side of the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemoteStats {
    /// Local misses that went to the ledger.
    pub remote_lookups: u64,
    /// Ledger lookups that came back with a record.
    pub remote_hits: u64,
    /// Ledger records that could not be cached durably.
    pub write_back_failures: u64,
}

pub struct HybridResolver {
    local: ResolutionEngine,
    remote: Arc<dyn BlockchainResolver>,
    config: HybridConfig,
    remote_lookups: AtomicU64,
    remote_hits: AtomicU64,
    write_back_failures: AtomicU64,
    registering: Mutex<HashSet<String>>,
}

/// Holds an alias in the in-flight registration set until dropped.
struct Claim<'a> {
    registering: &'a Mutex<HashSet<String>>,
    alias: String,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.registering.lock().remove(&self.alias);
    }
}

impl HybridResolver {
    pub fn new(local: ResolutionEngine, remote: Arc<dyn BlockchainResolver>) -> Self {
        Self::with_config(local, remote, HybridConfig::default())
    }

    pub fn with_config(
        local: ResolutionEngine,
        remote: Arc<dyn BlockchainResolver>,
        config: HybridConfig,
    ) -> Self {
        Self {
            local,
            remote,
            config,
            remote_lookups: AtomicU64::new(0),
            remote_hits: AtomicU64::new(0),
            write_back_failures: AtomicU64::new(0),
            registering: Mutex::new(HashSet::new()),
        }
    }

    pub fn local(&self) -> &ResolutionEngine {
        &self.local
    }

    pub fn directory(&self) -> &Arc<AliasDirectory> {
        self.local.directory()
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn stats(&self) -> RemoteStats {
        RemoteStats {
            remote_lookups: self.remote_lookups.load(Ordering::Relaxed),
            remote_hits: self.remote_hits.load(Ordering::Relaxed),
            write_back_failures: self.write_back_failures.load(Ordering::Relaxed),
        }
    }

    fn remote_token(&self, cancel: &CancelToken) -> CancelToken {
        cancel.clone().with_timeout(self.config.remote_timeout)
    }

    pub async fn resolve(
        &self,
        alias: &str,
        cancel: &CancelToken,
    ) -> AlsResult<ResolutionResponse> {
        let local_miss = match self.local.resolve(alias) {
            Ok(response) => return Ok(response),
            Err(e) if e.is_not_found() => e,
            Err(e) => return Err(e),
        };

        let key = normalize(alias);
        self.remote_lookups.fetch_add(1, Ordering::Relaxed);
        debug!(alias = %key, "local cache miss, querying ledger");

        let token = self.remote_token(cancel);
        let fetched = token
            .run(self.remote.resolve(&key, &token))
            .await
            .and_then(|record| {
                let record = record.canonicalize();
                if record.alias == key {
                    Ok(record)
                } else {
                    Err(RemoteError::Unavailable(format!(
                        "ledger answered for {} instead of {}",
                        record.alias, key
                    )))
                }
            });

        let record = match fetched {
            Ok(record) => record,
            Err(source) => {
                debug!(alias = %key, error = %source, "ledger lookup failed");
                return Err(AlsError::RemoteUnavailable {
                    alias: key,
                    local: Box::new(local_miss),
                    source,
                });
            }
        };

        self.remote_hits.fetch_add(1, Ordering::Relaxed);
        self.write_back(record);
        self.local.resolve(&key)
    }

    /// Cache a ledger record locally. Failures are logged and counted only.
    fn write_back(&self, record: AliasRecord) {
        let alias = record.alias.clone();
        let directory = self.local.directory();
        directory.put(record);

        if !self.config.flush_on_write_back || !directory.has_store() {
            return;
        }
        if let Durability::FlushFailed(e) = directory.flush() {
            self.write_back_failures.fetch_add(1, Ordering::Relaxed);
            warn!(alias = %alias, error = %e, "failed to cache ledger record durably");
        }
    }

    fn claim(&self, alias: &str) -> Option<Claim<'_>> {
        if !self.registering.lock().insert(alias.to_string()) {
            return None;
        }
        Some(Claim {
            registering: &self.registering,
            alias: alias.to_string(),
        })
    }

    pub async fn register(
        &self,
        record: AliasRecord,
        cancel: &CancelToken,
    ) -> AlsResult<Durability> {
        self.local.directory().validate_new(&record)?;
        let record = record.canonicalize();

        let Some(_claim) = self.claim(&record.alias) else {
            debug!(alias = %record.alias, "registration already in flight");
            return Err(AlsError::AlreadyExists {
                alias: record.alias,
            });
        };
        // A registration that finished between the first check and the claim.
        self.local.directory().validate_new(&record)?;

        let token = self.remote_token(cancel);
        if let Err(source) = token.run(self.remote.register_on_chain(&record, &token)).await {
            warn!(alias = %record.alias, error = %source, "ledger refused registration");
            return Err(AlsError::RemoteRejected {
                alias: record.alias,
                source,
            });
        }

        info!(alias = %record.alias, "alias accepted by ledger");
        self.local.register(record)
    }

    pub fn attest(
        &self,
        alias: &str,
        target: AttestationLevel,
        proof: &str,
    ) -> AlsResult<Attested> {
        self.local.attest(alias, target, proof)
    }
}

impl fmt::Debug for HybridResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridResolver")
            .field("local", &self.local)
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

#[async_trait]
impl AliasService for HybridResolver {
    async fn resolve(&self, alias: &str, cancel: &CancelToken) -> AlsResult<ResolutionResponse> {
        HybridResolver::resolve(self, alias, cancel).await
    }

    async fn register(&self, record: AliasRecord, cancel: &CancelToken) -> AlsResult<Durability> {
        HybridResolver::register(self, record, cancel).await
    }

    async fn attest(
        &self,
        alias: &str,
        target: AttestationLevel,
        proof: &str,
    ) -> AlsResult<Attested> {
        HybridResolver::attest(self, alias, target, proof)
    }

    fn public_key(&self) -> Option<AlsPublicKey> {
        self.local.trust().public_key()
    }

    fn remote_stats(&self) -> Option<RemoteStats> {
        Some(self.stats())
    }
}
