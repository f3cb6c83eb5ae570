//! # Alias Records and Resolution Responses
//!
//! The data model shared by the directory, the stores, the remote tier and
//! the HTTP binding. Field names serialize as snake_case and enum values as
//! upper-case tags, which is also the on-disk JSON layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::normalize::normalize;

// ---------------------------------------------------------------------------
// Status & Types
// ---------------------------------------------------------------------------

/// Lifecycle state of an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AliasStatus {
    #[default]
    Active,
    /// Visible to lookups only as an explicit rejection.
    Suspended,
    /// Registered but not fully provisioned. Still resolvable.
    Pending,
}

impl AliasStatus {
    /// Upper-case tag used in canonical strings and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for AliasStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of settlement destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointType {
    #[default]
    Wallet,
    BankAccount,
}

/// Trust tier of an alias's claimed identity.
///
/// Ordered: `Unverified < Verified < Certified`. Serialized as the numeric
/// level (1, 2, 3) so existing data files and ledger payloads stay readable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum AttestationLevel {
    /// Basic registration.
    #[default]
    Unverified = 1,
    /// OTP verified.
    Verified = 2,
    /// National ID verified.
    Certified = 3,
}

impl AttestationLevel {
    /// Numeric level, 1 through 3.
    pub fn level(&self) -> u8 {
        *self as u8
    }
}

impl From<AttestationLevel> for u8 {
    fn from(level: AttestationLevel) -> Self {
        level.level()
    }
}

impl TryFrom<u8> for AttestationLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Unverified),
            2 => Ok(Self::Verified),
            3 => Ok(Self::Certified),
            other => Err(format!("unknown attestation level: {}", other)),
        }
    }
}

impl fmt::Display for AttestationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unverified => "UNVERIFIED",
            Self::Verified => "VERIFIED",
            Self::Certified => "CERTIFIED",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// One settlement destination for an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Lower is preferred.
    #[serde(default)]
    pub priority: i32,
    /// Payment rail identifier, e.g. `AIRTEL_MONEY`.
    pub provider: String,
    #[serde(rename = "type", default)]
    pub endpoint_type: EndpointType,
    /// Raw settlement address. Sensitive.
    pub destination: String,
    /// Advisory transfer method tags.
    #[serde(default)]
    pub supported_methods: Vec<String>,
}

impl Endpoint {
    pub fn new(
        priority: i32,
        provider: impl Into<String>,
        endpoint_type: EndpointType,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            provider: provider.into(),
            endpoint_type,
            destination: destination.into(),
            supported_methods: Vec::new(),
        }
    }

    /// Shorthand for a mobile-money wallet endpoint.
    pub fn wallet(
        priority: i32,
        provider: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self::new(priority, provider, EndpointType::Wallet, destination)
    }

    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_methods = methods.into_iter().map(Into::into).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// AliasRecord
// ---------------------------------------------------------------------------

/// The authoritative record for one alias.
///
/// Records coming out of the directory always carry the canonical alias.
/// Records built by callers may not; the directory normalizes on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub alias: String,
    #[serde(default)]
    pub status: AliasStatus,
    #[serde(default)]
    pub identity_mask: String,
    #[serde(default)]
    pub attestation: AttestationLevel,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Expected answer to the pending verification challenge. Empty means
    /// no challenge has been issued.
    #[serde(default)]
    pub verification_proof: String,
    /// When set, resolution hands out privacy tokens instead of destinations.
    #[serde(default)]
    pub is_private: bool,
}

impl AliasRecord {
    /// A fresh, active, unverified, public record with no endpoints.
    pub fn new(alias: impl Into<String>, identity_mask: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            status: AliasStatus::Active,
            identity_mask: identity_mask.into(),
            attestation: AttestationLevel::Unverified,
            endpoints: Vec::new(),
            verification_proof: String::new(),
            is_private: false,
        }
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_status(mut self, status: AliasStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_verification_proof(mut self, proof: impl Into<String>) -> Self {
        self.verification_proof = proof.into();
        self
    }

    pub fn with_attestation(mut self, level: AttestationLevel) -> Self {
        self.attestation = level;
        self
    }

    /// Mark the record private (blind resolution).
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// The directory key for this record.
    pub fn key(&self) -> String {
        normalize(&self.alias)
    }

    /// Rewrite `alias` into its canonical form.
    pub fn canonicalize(mut self) -> Self {
        self.alias = normalize(&self.alias);
        self
    }
}

// ---------------------------------------------------------------------------
// ResolutionResponse
// ---------------------------------------------------------------------------

/// The signed answer to a resolution request. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResponse {
    /// Alias with the display sigil re-attached.
    pub alias: String,
    pub status: AliasStatus,
    pub identity_mask: String,
    /// Generated fresh (UTC) for every call.
    pub resolution_timestamp: DateTime<Utc>,
    /// Copies of the stored endpoints, tokenized for private aliases.
    pub endpoints: Vec<Endpoint>,
    /// Hex signature over the canonical projection, or `unsigned`.
    pub security_sig: String,
}
