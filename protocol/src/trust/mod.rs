//! # Trust Layer
//!
//! Signs resolution responses and issues privacy tokens.
//!
//! ## Canonical string
//!
//! A response signature covers a fixed projection of the response, not its
//! JSON encoding:
//!
//! ```text
//! alias|status|resolution_timestamp|endpoint_count
//! @koda_dev|ACTIVE|2026-10-18T09:14:03Z|1
//! ```
//!
//! The timestamp is RFC3339 in UTC with whole seconds. Relying parties
//! rebuild the same string from the response they received and verify the
//! hex signature in `security_sig` against the service public key.
//!
//! ## Degraded mode
//!
//! Without a signing key the layer still works: responses carry the literal
//! `unsigned` marker and tokens carry it in place of their signature. This
//! keeps development setups resolvable while making the lack of trust
//! obvious to anyone who looks.

pub mod token;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::alias::{Endpoint, ResolutionResponse};
use crate::config::{CANONICAL_SEPARATOR, TOKEN_TTL_SECS, UNSIGNED_MARKER};
use crate::crypto::{AlsKeypair, AlsPublicKey, AlsSignature};

pub use token::{PrivacyToken, TokenError};

/// Holds the service signing key (if any) and performs every signature the
/// service emits.
#[derive(Debug, Clone, Default)]
pub struct TrustLayer {
    keypair: Option<AlsKeypair>,
}

impl TrustLayer {
    pub fn new(keypair: AlsKeypair) -> Self {
        Self {
            keypair: Some(keypair),
        }
    }

    /// A trust layer with no key. Every signature becomes `unsigned`.
    pub fn unsigned() -> Self {
        Self { keypair: None }
    }

    pub fn is_signing(&self) -> bool {
        self.keypair.is_some()
    }

    /// Public key relying parties should verify against.
    pub fn public_key(&self) -> Option<AlsPublicKey> {
        self.keypair.as_ref().map(AlsKeypair::public_key)
    }

    /// The projection of a response that gets signed.
    pub fn canonical_response(response: &ResolutionResponse) -> String {
        format!(
            "{alias}{sep}{status}{sep}{ts}{sep}{count}",
            alias = response.alias,
            status = response.status.as_str(),
            ts = response
                .resolution_timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            count = response.endpoints.len(),
            sep = CANONICAL_SEPARATOR,
        )
    }

    /// Hex signature over [`canonical_response`](Self::canonical_response),
    /// or `unsigned` when no key is configured.
    pub fn sign_response(&self, response: &ResolutionResponse) -> String {
        self.sign_or_mark(Self::canonical_response(response).as_bytes())
    }

    /// Build a privacy token for `endpoint`, valid for [`TOKEN_TTL_SECS`]
    /// after `now`.
    pub fn blind_endpoint(&self, endpoint: &Endpoint, now: DateTime<Utc>) -> String {
        let expiry = now + chrono::Duration::seconds(TOKEN_TTL_SECS);
        let payload = PrivacyToken::payload(&endpoint.provider, &endpoint.destination, &expiry);
        PrivacyToken {
            signature: self.sign_or_mark(payload.as_bytes()),
            expiry,
        }
        .to_string()
    }

    /// Relying-party check of a response's `security_sig`.
    ///
    /// Returns `false` for unsigned responses, malformed hex, or any change to
    /// a field covered by the canonical string.
    pub fn verify_response(response: &ResolutionResponse, public_key: &AlsPublicKey) -> bool {
        let Ok(signature) = AlsSignature::from_hex(&response.security_sig) else {
            return false;
        };
        public_key.verify(Self::canonical_response(response).as_bytes(), &signature)
    }

    fn sign_or_mark(&self, message: &[u8]) -> String {
        match &self.keypair {
            Some(kp) => kp.sign(message).to_hex(),
            None => UNSIGNED_MARKER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasStatus;
    use chrono::TimeZone;

    fn response(ts: DateTime<Utc>) -> ResolutionResponse {
        ResolutionResponse {
            alias: "@koda_dev".into(),
            status: AliasStatus::Active,
            identity_mask: "K**** M*******".into(),
            resolution_timestamp: ts,
            endpoints: vec![Endpoint::wallet(1, "AIRTEL_MONEY", "26599...")],
            security_sig: String::new(),
        }
    }

    #[test]
    fn canonical_string_layout() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 18, 9, 14, 3).unwrap();
        assert_eq!(
            TrustLayer::canonical_response(&response(ts)),
            "@koda_dev|ACTIVE|2026-10-18T09:14:03Z|1"
        );
    }

    #[test]
    fn canonical_string_drops_subsecond_precision() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 18, 9, 14, 3).unwrap()
            + chrono::Duration::milliseconds(750);
        assert!(TrustLayer::canonical_response(&response(ts)).contains("09:14:03Z|"));
    }

    #[test]
    fn signed_response_verifies_with_public_key() {
        let trust = TrustLayer::new(AlsKeypair::generate());
        let mut resp = response(Utc::now());
        resp.security_sig = trust.sign_response(&resp);

        assert_eq!(resp.security_sig.len(), 128);
        assert!(TrustLayer::verify_response(&resp, &trust.public_key().unwrap()));
    }

    #[test]
    fn tampering_breaks_verification() {
        let trust = TrustLayer::new(AlsKeypair::generate());
        let pk = trust.public_key().unwrap();
        let mut resp = response(Utc::now());
        resp.security_sig = trust.sign_response(&resp);

        let mut renamed = resp.clone();
        renamed.alias = "@someone_else".into();
        assert!(!TrustLayer::verify_response(&renamed, &pk));

        let mut suspended = resp.clone();
        suspended.status = AliasStatus::Suspended;
        assert!(!TrustLayer::verify_response(&suspended, &pk));

        let mut padded = resp.clone();
        padded.endpoints.push(Endpoint::wallet(2, "TNM", "0888"));
        assert!(!TrustLayer::verify_response(&padded, &pk));

        let mut later = resp;
        later.resolution_timestamp += chrono::Duration::seconds(5);
        assert!(!TrustLayer::verify_response(&later, &pk));
    }

    #[test]
    fn unsigned_layer_marks_responses() {
        let trust = TrustLayer::unsigned();
        let resp = response(Utc::now());
        assert!(!trust.is_signing());
        assert!(trust.public_key().is_none());
        assert_eq!(trust.sign_response(&resp), UNSIGNED_MARKER);
    }

    #[test]
    fn blinded_endpoint_is_a_verifiable_token() {
        let trust = TrustLayer::new(AlsKeypair::generate());
        let now = Utc::now();
        let ep = Endpoint::wallet(1, "AIRTEL", "0999000111");

        let token = trust.blind_endpoint(&ep, now);
        assert!(token.starts_with("TOKEN:"));
        assert!(!token.contains("0999000111"));

        let parsed = PrivacyToken::parse(&token).unwrap();
        assert_eq!(parsed.expiry - now, chrono::Duration::minutes(10));
        assert!(parsed
            .verify("AIRTEL", "0999000111", &trust.public_key().unwrap(), now)
            .is_ok());
    }

    #[test]
    fn unsigned_layer_still_blinds() {
        let ep = Endpoint::wallet(1, "TNM", "0888111222");
        let token = TrustLayer::unsigned().blind_endpoint(&ep, Utc::now());
        assert!(token.starts_with("TOKEN:unsigned:"));
        assert!(!token.contains("0888111222"));
    }
}
