//! # Attestation Engine
//!
//! Moves an alias between trust tiers. Each target level has its own proof
//! check; they are independent processes (an OTP challenge for VERIFIED, a
//! national identity certificate for CERTIFIED), so there is no requirement
//! to pass through VERIFIED on the way to CERTIFIED.
//!
//! | Target       | Proof accepted when                                   |
//! |--------------|-------------------------------------------------------|
//! | `UNVERIFIED` | always                                                |
//! | `VERIFIED`   | a challenge is pending and `proof` equals it exactly  |
//! | `CERTIFIED`  | `proof` starts with the `NRIS-` certificate prefix    |
//!
//! By default a target below the alias's current level is refused with
//! [`AttestationError::Downgrade`]. [`AttestationEngine::permissive`] turns
//! that check off.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::alias::{AliasRecord, AttestationLevel};
use crate::config::CERTIFICATE_PREFIX;
use crate::directory::{AliasDirectory, Durability};
use crate::error::{AlsResult, AttestationError};

/// Result of a successful attestation.
#[derive(Debug)]
pub struct Attested {
    pub alias: String,
    pub level: AttestationLevel,
    pub durability: Durability,
}

/// Wire shape of [`Attested`].
#[derive(Debug, Clone, Serialize)]
pub struct AttestationReceipt {
    pub alias: String,
    pub attestation: AttestationLevel,
    pub durable: bool,
}

impl From<&Attested> for AttestationReceipt {
    fn from(attested: &Attested) -> Self {
        Self {
            alias: attested.alias.clone(),
            attestation: attested.level,
            durable: attested.durability.is_durable(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttestationEngine {
    directory: Arc<AliasDirectory>,
    allow_downgrade: bool,
}

impl AttestationEngine {
    /// Engine that refuses downgrades.
    pub fn new(directory: Arc<AliasDirectory>) -> Self {
        Self {
            directory,
            allow_downgrade: false,
        }
    }

    /// Engine that assigns any validated target level, lower ones included.
    pub fn permissive(directory: Arc<AliasDirectory>) -> Self {
        Self {
            directory,
            allow_downgrade: true,
        }
    }

    pub fn allows_downgrade(&self) -> bool {
        self.allow_downgrade
    }

    /// Validate `proof` for `target` and, if it holds, set the alias's level.
    ///
    /// The check and the assignment happen under the directory's write lock.
    /// The directory is flushed afterwards; a flush failure is reported in
    /// [`Attested::durability`].
    pub fn attest(
        &self,
        alias: &str,
        target: AttestationLevel,
        proof: &str,
    ) -> AlsResult<Attested> {
        let allow_downgrade = self.allow_downgrade;
        let canonical = self.directory.update(alias, |record| {
            check_proof(record, target, proof, allow_downgrade)?;
            record.attestation = target;
            Ok(record.alias.clone())
        })?;

        let durability = self.directory.flush();
        info!(alias = %canonical, level = %target, "alias attested");
        Ok(Attested {
            alias: canonical,
            level: target,
            durability,
        })
    }
}

fn check_proof(
    record: &AliasRecord,
    target: AttestationLevel,
    proof: &str,
    allow_downgrade: bool,
) -> Result<(), AttestationError> {
    if !allow_downgrade && target < record.attestation {
        return Err(AttestationError::Downgrade {
            current: record.attestation,
            target,
        });
    }

    match target {
        AttestationLevel::Unverified => Ok(()),
        AttestationLevel::Verified => {
            if record.verification_proof.is_empty() {
                Err(AttestationError::NoChallengePending)
            } else if proof != record.verification_proof {
                Err(AttestationError::InvalidProof)
            } else {
                Ok(())
            }
        }
        AttestationLevel::Certified => {
            if proof.starts_with(CERTIFICATE_PREFIX) {
                Ok(())
            } else {
                Err(AttestationError::InvalidCertificateFormat)
            }
        }
    }
}
