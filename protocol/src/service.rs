//! # Alias Service
//!
//! The operations a transport exposes, behind one trait so the HTTP layer
//! does not care whether it is talking to the local engine alone or to the
//! hybrid resolver in front of a ledger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::alias::{AliasRecord, AliasStatus, AttestationLevel, Endpoint, ResolutionResponse};
use crate::attestation::Attested;
use crate::crypto::AlsPublicKey;
use crate::directory::Durability;
use crate::error::AlsResult;
use crate::hybrid::RemoteStats;
use crate::remote::CancelToken;
use crate::resolver::ResolutionEngine;

#[async_trait]
pub trait AliasService: Send + Sync {
    async fn resolve(&self, alias: &str, cancel: &CancelToken) -> AlsResult<ResolutionResponse>;

    async fn register(&self, record: AliasRecord, cancel: &CancelToken) -> AlsResult<Durability>;

    async fn attest(
        &self,
        alias: &str,
        target: AttestationLevel,
        proof: &str,
    ) -> AlsResult<Attested>;

    /// Key relying parties verify responses against. `None` in unsigned mode.
    fn public_key(&self) -> Option<AlsPublicKey>;

    /// Ledger-side counters, for services that have a ledger behind them.
    fn remote_stats(&self) -> Option<RemoteStats> {
        None
    }
}

#[async_trait]
impl AliasService for ResolutionEngine {
    async fn resolve(&self, alias: &str, _cancel: &CancelToken) -> AlsResult<ResolutionResponse> {
        ResolutionEngine::resolve(self, alias)
    }

    async fn register(&self, record: AliasRecord, _cancel: &CancelToken) -> AlsResult<Durability> {
        ResolutionEngine::register(self, record)
    }

    async fn attest(
        &self,
        alias: &str,
        target: AttestationLevel,
        proof: &str,
    ) -> AlsResult<Attested> {
        ResolutionEngine::attest(self, alias, target, proof)
    }

    fn public_key(&self) -> Option<AlsPublicKey> {
        self.trust().public_key()
    }
}

// ---------------------------------------------------------------------------
// Request / Receipt Types
// ---------------------------------------------------------------------------

/// Body of a registration request.
///
/// Callers choose the alias, mask, endpoints and privacy. Status,
/// attestation and any verification challenge are the service's to set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub alias: String,
    #[serde(default)]
    pub identity_mask: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub is_private: bool,
}

impl RegistrationRequest {
    pub fn into_record(self) -> AliasRecord {
        AliasRecord {
            alias: self.alias,
            status: AliasStatus::Active,
            identity_mask: self.identity_mask,
            attestation: AttestationLevel::Unverified,
            endpoints: self.endpoints,
            verification_proof: String::new(),
            is_private: self.is_private,
        }
    }
}

/// Answer to a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub status: String,
    pub alias: String,
    /// Whether the registration reached the store.
    pub durable: bool,
}

impl RegistrationReceipt {
    pub fn registered(alias: impl Into<String>, durability: &Durability) -> Self {
        Self {
            status: "registered".into(),
            alias: alias.into(),
            durable: durability.is_durable(),
        }
    }
}

/// Body of an attestation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRequest {
    pub alias: String,
    pub level: AttestationLevel,
    #[serde(default)]
    pub proof: String,
}
