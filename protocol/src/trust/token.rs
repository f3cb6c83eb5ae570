//! # Privacy Tokens
//!
//! A privacy token stands in for a destination in the response to a private
//! alias:
//!
//! ```text
//! TOKEN:<hex Ed25519 signature>:<expiry RFC3339>
//!        signed payload = provider|destination|expiry
//! ```
//!
//! The token proves the service vouched for some destination until `expiry`
//! without revealing which one. Redeeming it for the real destination is a
//! separate, access-controlled path; nothing here tracks redemption.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use thiserror::Error;

use crate::config::{CANONICAL_SEPARATOR, TOKEN_PREFIX, UNSIGNED_MARKER};
use crate::crypto::{AlsPublicKey, AlsSignature};

/// Why a token was refused by a relying party.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed privacy token")]
    Malformed,

    #[error("privacy token expired at {0}")]
    Expired(DateTime<Utc>),

    /// Issued by a service running without a signing key.
    #[error("privacy token is unsigned")]
    Unsigned,

    #[error("privacy token signature does not match")]
    BadSignature,
}

/// A parsed `TOKEN:<sig>:<expiry>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivacyToken {
    /// Hex signature, or the `unsigned` marker.
    pub signature: String,
    pub expiry: DateTime<Utc>,
}

impl PrivacyToken {
    /// Format used for the expiry. Sub-second precision keeps tokens issued
    /// within the same second distinct.
    pub fn format_expiry(expiry: &DateTime<Utc>) -> String {
        expiry.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    /// The exact bytes signed for a destination.
    pub fn payload(provider: &str, destination: &str, expiry: &DateTime<Utc>) -> String {
        format!(
            "{provider}{sep}{destination}{sep}{expiry}",
            sep = CANONICAL_SEPARATOR,
            expiry = Self::format_expiry(expiry),
        )
    }

    /// Split a token string. The expiry itself contains colons, so only the
    /// first separator after the prefix is significant.
    pub fn parse(token: &str) -> Result<Self, TokenError> {
        let rest = token
            .strip_prefix(TOKEN_PREFIX)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or(TokenError::Malformed)?;
        let (signature, expiry) = rest.split_once(':').ok_or(TokenError::Malformed)?;
        if signature.is_empty() {
            return Err(TokenError::Malformed);
        }
        let expiry = DateTime::parse_from_rfc3339(expiry)
            .map_err(|_| TokenError::Malformed)?
            .with_timezone(&Utc);
        Ok(Self {
            signature: signature.to_string(),
            expiry,
        })
    }

    /// Check a token against the destination it claims to cover.
    ///
    /// This is the relying party's side of blind resolution: it must already
    /// know (through the redemption path) which provider and destination the
    /// token is supposed to vouch for.
    pub fn verify(
        &self,
        provider: &str,
        destination: &str,
        public_key: &AlsPublicKey,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        if now > self.expiry {
            return Err(TokenError::Expired(self.expiry));
        }
        if self.signature == UNSIGNED_MARKER {
            return Err(TokenError::Unsigned);
        }
        let signature =
            AlsSignature::from_hex(&self.signature).map_err(|_| TokenError::Malformed)?;
        let payload = Self::payload(provider, destination, &self.expiry);
        if public_key.verify(payload.as_bytes(), &signature) {
            Ok(())
        } else {
            Err(TokenError::BadSignature)
        }
    }
}

impl fmt::Display for PrivacyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            TOKEN_PREFIX,
            self.signature,
            Self::format_expiry(&self.expiry)
        )
    }
}
