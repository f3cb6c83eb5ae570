//! # Error Taxonomy
//!
//! Every failure a caller can observe is a distinct variant, so transports
//! and tests branch on the kind instead of matching message text.
//! [`AlsError::kind`] gives a stable tag for places that need a string.

use thiserror::Error;

use crate::alias::AttestationLevel;
use crate::remote::RemoteError;
use crate::storage::StoreError;

/// Reasons an attestation upgrade is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttestationError {
    /// VERIFIED was requested but no challenge was ever issued.
    #[error("no verification challenge pending for this alias")]
    NoChallengePending,

    #[error("invalid verification proof")]
    InvalidProof,

    #[error("invalid NRIS attestation proof: missing identity certificate prefix")]
    InvalidCertificateFormat,

    /// The target is below the level the alias already holds.
    #[error("attestation downgrade refused: alias is {current}, requested {target}")]
    Downgrade {
        current: AttestationLevel,
        target: AttestationLevel,
    },
}

/// Errors surfaced by the alias directory, resolution engine and hybrid
/// orchestrator.
#[derive(Debug, Error)]
pub enum AlsError {
    #[error("alias not found: {alias}")]
    NotFound { alias: String },

    #[error("alias is suspended: {alias}")]
    Suspended { alias: String },

    #[error("alias is reserved: {alias}")]
    Reserved { alias: String },

    #[error("alias already registered: {alias}")]
    AlreadyExists { alias: String },

    /// The record breaks the registration contract (empty alias, no endpoints).
    #[error("invalid alias record: {reason}")]
    InvalidRecord { reason: String },

    #[error("attestation failed: {0}")]
    Attestation(#[from] AttestationError),

    /// Local miss followed by a remote failure. Both causes are kept.
    #[error("blockchain resolution failed for {alias} (local: {local}): {source}")]
    RemoteUnavailable {
        alias: String,
        local: Box<AlsError>,
        #[source]
        source: RemoteError,
    },

    /// The remote tier refused (or could not take) a registration.
    #[error("failed to register {alias} on blockchain: {source}")]
    RemoteRejected {
        alias: String,
        #[source]
        source: RemoteError,
    },

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl AlsError {
    /// Stable, machine-readable tag for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Suspended { .. } => "suspended",
            Self::Reserved { .. } => "reserved",
            Self::AlreadyExists { .. } => "already_exists",
            Self::InvalidRecord { .. } => "invalid_record",
            Self::Attestation(AttestationError::NoChallengePending) => "no_challenge_pending",
            Self::Attestation(AttestationError::InvalidProof) => "invalid_proof",
            Self::Attestation(AttestationError::InvalidCertificateFormat) => {
                "invalid_certificate_format"
            }
            Self::Attestation(AttestationError::Downgrade { .. }) => "attestation_downgrade",
            Self::RemoteUnavailable { .. } => "remote_unavailable",
            Self::RemoteRejected { .. } => "remote_rejected",
            Self::Persistence(_) => "persistence_failure",
        }
    }

    /// True for a plain local miss, the only error the hybrid tier falls back on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type AlsResult<T> = Result<T, AlsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_per_variant() {
        let errors = [
            AlsError::NotFound { alias: "a".into() },
            AlsError::Suspended { alias: "a".into() },
            AlsError::Reserved { alias: "a".into() },
            AlsError::AlreadyExists { alias: "a".into() },
            AlsError::InvalidRecord { reason: "r".into() },
            AlsError::Attestation(AttestationError::InvalidProof),
            AlsError::Attestation(AttestationError::NoChallengePending),
        ];
        let mut kinds: Vec<_> = errors.iter().map(AlsError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn remote_unavailable_keeps_local_miss() {
        let err = AlsError::RemoteUnavailable {
            alias: "ghost".into(),
            local: Box::new(AlsError::NotFound { alias: "ghost".into() }),
            source: RemoteError::NotFound { alias: "ghost".into() },
        };
        let msg = err.to_string();
        assert!(msg.contains("blockchain resolution failed"));
        assert!(msg.contains("alias not found: ghost"));
        assert_eq!(err.kind(), "remote_unavailable");
    }
}
