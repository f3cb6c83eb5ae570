//! # Remote Ledger Tier
//!
//! The authoritative, slower side of the hybrid directory. The core only
//! ever talks to it through [`BlockchainResolver`]; what sits behind that
//! trait (a ledger client, a contract binding, the in-memory ledger used in
//! tests) is swappable.
//!
//! ```text
//! mod.rs    : BlockchainResolver contract, RemoteError
//! cancel.rs : CancelToken / CancelHandle (caller-owned cancellation + deadline)
//! ledger.rs : InMemoryLedger, a process-local ledger for tests and `mock` mode
//! ```
//!
//! Every call takes a [`CancelToken`]. Implementations must give up as soon
//! as it trips and must not retry internally; retry policy belongs to the
//! caller.

pub mod cancel;
pub mod ledger;

use async_trait::async_trait;
use thiserror::Error;

use crate::alias::AliasRecord;

pub use cancel::{CancelHandle, CancelToken};
pub use ledger::InMemoryLedger;

/// Failures reported by a remote resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("alias not found on blockchain: {alias}")]
    NotFound { alias: String },

    /// The ledger answered and said no.
    #[error("ledger rejected the request: {reason}")]
    Rejected { reason: String },

    /// The ledger could not be reached or did not answer sensibly.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("remote call cancelled")]
    Cancelled,

    #[error("remote call deadline exceeded")]
    DeadlineExceeded,
}

/// Two-method contract with the authoritative alias ledger.
#[async_trait]
pub trait BlockchainResolver: Send + Sync {
    /// Fetch the ledger's record for `alias`.
    async fn resolve(&self, alias: &str, cancel: &CancelToken) -> Result<AliasRecord, RemoteError>;

    /// Submit `record` to the ledger. `Ok` means the ledger accepted it.
    async fn register_on_chain(
        &self,
        record: &AliasRecord,
        cancel: &CancelToken,
    ) -> Result<(), RemoteError>;
}
