//! # Resolution Engine
//!
//! Turns a directory record into a signed [`ResolutionResponse`]:
//!
//! 1. normalize and look up, `NotFound` when absent
//! 2. refuse `SUSPENDED` records with `Suspended`
//! 3. stamp a fresh UTC timestamp
//! 4. copy endpoints in stored order, blinding the copies of private records
//! 5. sign the canonical projection
//!
//! `PENDING` records resolve like active ones; the status field tells the
//! caller they are not fully provisioned. Resolution never writes to the
//! directory.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::alias::{
    display_alias, normalize, AliasRecord, AliasStatus, AttestationLevel, ResolutionResponse,
};
use crate::attestation::{AttestationEngine, Attested};
use crate::directory::{AliasDirectory, Durability};
use crate::error::{AlsError, AlsResult};
use crate::trust::TrustLayer;

#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    directory: Arc<AliasDirectory>,
    trust: Arc<TrustLayer>,
    attestation: AttestationEngine,
}

impl ResolutionEngine {
    /// Engine with the default (monotonic) attestation policy.
    pub fn new(directory: Arc<AliasDirectory>, trust: Arc<TrustLayer>) -> Self {
        let attestation = AttestationEngine::new(Arc::clone(&directory));
        Self::with_attestation(directory, trust, attestation)
    }

    pub fn with_attestation(
        directory: Arc<AliasDirectory>,
        trust: Arc<TrustLayer>,
        attestation: AttestationEngine,
    ) -> Self {
        Self {
            directory,
            trust,
            attestation,
        }
    }

    pub fn directory(&self) -> &Arc<AliasDirectory> {
        &self.directory
    }

    pub fn trust(&self) -> &Arc<TrustLayer> {
        &self.trust
    }

    pub fn resolve(&self, alias: &str) -> AlsResult<ResolutionResponse> {
        let key = normalize(alias);
        let record = self
            .directory
            .get(&key)
            .ok_or_else(|| AlsError::NotFound { alias: key.clone() })?;

        if record.status == AliasStatus::Suspended {
            return Err(AlsError::Suspended { alias: key });
        }

        let response = self.build_response(&record);
        debug!(
            alias = %key,
            endpoints = response.endpoints.len(),
            private = record.is_private,
            "alias resolved"
        );
        Ok(response)
    }

    pub fn register(&self, record: AliasRecord) -> AlsResult<Durability> {
        self.directory.register(record)
    }

    pub fn attest(
        &self,
        alias: &str,
        target: AttestationLevel,
        proof: &str,
    ) -> AlsResult<Attested> {
        self.attestation.attest(alias, target, proof)
    }

    fn build_response(&self, record: &AliasRecord) -> ResolutionResponse {
        let now = Utc::now();
        let endpoints = record
            .endpoints
            .iter()
            .map(|endpoint| {
                let mut copy = endpoint.clone();
                if record.is_private {
                    copy.destination = self.trust.blind_endpoint(endpoint, now);
                }
                copy
            })
            .collect();

        let mut response = ResolutionResponse {
            alias: display_alias(&record.alias),
            status: record.status,
            identity_mask: record.identity_mask.clone(),
            resolution_timestamp: now,
            endpoints,
            security_sig: String::new(),
        };
        response.security_sig = self.trust.sign_response(&response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::Endpoint;
    use crate::config::UNSIGNED_MARKER;
    use crate::crypto::AlsKeypair;
    use crate::trust::PrivacyToken;

    fn engine(trust: TrustLayer) -> ResolutionEngine {
        ResolutionEngine::new(Arc::new(AliasDirectory::in_memory()), Arc::new(trust))
    }

    fn koda() -> AliasRecord {
        AliasRecord::new("koda_dev", "K**** M*******")
            .with_endpoint(Endpoint::wallet(1, "AIRTEL_MONEY", "26599..."))
    }

    #[test]
    fn resolves_seeded_alias_with_signature() {
        let engine = engine(TrustLayer::new(AlsKeypair::generate()));
        engine.directory().seed(koda());

        let resp = engine.resolve("@Koda_Dev").unwrap();
        assert_eq!(resp.alias, "@koda_dev");
        assert_eq!(resp.endpoints[0].destination, "26599...");
        assert_ne!(resp.security_sig, UNSIGNED_MARKER);
        assert!(!resp.security_sig.is_empty());

        let pk = engine.trust().public_key().unwrap();
        assert!(TrustLayer::verify_response(&resp, &pk));
    }

    #[test]
    fn unsigned_mode_still_resolves() {
        let engine = engine(TrustLayer::unsigned());
        engine.directory().seed(koda());
        let resp = engine.resolve("koda_dev").unwrap();
        assert_eq!(resp.security_sig, UNSIGNED_MARKER);
    }

    #[test]
    fn missing_alias_is_not_found() {
        let engine = engine(TrustLayer::unsigned());
        let err = engine.resolve("@nobody").unwrap_err();
        assert!(matches!(err, AlsError::NotFound { ref alias } if alias == "nobody"));
    }

    #[test]
    fn suspended_is_distinct_from_not_found() {
        let engine = engine(TrustLayer::unsigned());
        engine.directory().seed(koda().with_status(AliasStatus::Suspended));
        let err = engine.resolve("koda_dev").unwrap_err();
        assert_eq!(err.kind(), "suspended");
    }

    #[test]
    fn pending_resolves_with_status() {
        let engine = engine(TrustLayer::unsigned());
        engine.directory().seed(koda().with_status(AliasStatus::Pending));
        assert_eq!(engine.resolve("koda_dev").unwrap().status, AliasStatus::Pending);
    }

    #[test]
    fn private_alias_gets_tokens_and_store_is_untouched() {
        let engine = engine(TrustLayer::new(AlsKeypair::generate()));
        engine.directory().seed(
            AliasRecord::new("quiet", "Q****")
                .with_endpoint(Endpoint::wallet(1, "AIRTEL", "0999000111"))
                .with_endpoint(Endpoint::wallet(2, "TNM", "0888000222"))
                .private(),
        );

        let resp = engine.resolve("quiet").unwrap();
        assert_eq!(resp.endpoints.len(), 2);
        for ep in &resp.endpoints {
            assert!(ep.destination.starts_with("TOKEN:"));
            assert!(PrivacyToken::parse(&ep.destination).is_ok());
        }
        assert_eq!(resp.endpoints[0].provider, "AIRTEL");
        assert_eq!(
            engine.directory().get("quiet").unwrap().endpoints[0].destination,
            "0999000111"
        );
    }

    #[test]
    fn private_tokens_differ_between_calls() {
        let engine = engine(TrustLayer::new(AlsKeypair::generate()));
        engine.directory().seed(koda().private());

        let first = engine.resolve("koda_dev").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = engine.resolve("koda_dev").unwrap();
        assert_ne!(first.endpoints[0].destination, second.endpoints[0].destination);
    }

    #[test]
    fn register_then_resolve_preserves_endpoint_order() {
        let engine = engine(TrustLayer::new(AlsKeypair::generate()));
        let record = AliasRecord::new("newuser", "N****")
            .with_endpoint(Endpoint::wallet(2, "TNM", "0888111222"))
            .with_endpoint(Endpoint::wallet(1, "AIRTEL_MONEY", "0999111222"));
        engine.register(record).unwrap();

        let resp = engine.resolve("newuser").unwrap();
        let providers: Vec<_> = resp.endpoints.iter().map(|e| e.provider.as_str()).collect();
        assert_eq!(providers, ["TNM", "AIRTEL_MONEY"]);
    }

    #[test]
    fn attest_goes_through_the_engine() {
        let engine = engine(TrustLayer::unsigned());
        engine.directory().seed(koda().with_verification_proof("1234"));
        engine.attest("koda_dev", AttestationLevel::Verified, "1234").unwrap();
        assert_eq!(
            engine.directory().get("koda_dev").unwrap().attestation,
            AttestationLevel::Verified
        );
    }
}
