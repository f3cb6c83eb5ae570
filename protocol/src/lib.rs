// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MW-ALS: Alias Lookup Service Core
//!
//! Maps human-memorable aliases such as `@koda_dev` to the settlement
//! endpoints behind them (mobile-money wallets, bank accounts). Every answer
//! is signed so a relying party can check it came from the service, and
//! aliases marked private get time-boxed privacy tokens in place of their
//! raw destinations.
//!
//! ## Architecture
//!
//! Leaf modules first:
//!
//! - **alias**: normalization, reserved words, the record and response types.
//! - **crypto**: Ed25519 keys and signatures.
//! - **trust**: canonical strings, response signatures, privacy tokens.
//! - **storage**: the store contract plus JSON, sled and in-memory stores.
//! - **directory**: the locked in-process alias map and its durability.
//! - **attestation**: trust-tier upgrades with per-level proof checks.
//! - **resolver**: directory + trust layer = signed responses.
//! - **remote**: the ledger contract, cancellation tokens, an in-memory ledger.
//! - **hybrid**: local cache in front of the ledger.
//! - **service**: the async seam the transport talks to.
//! - **config**: constants that are part of the wire format.
//!
//! ## Quick look
//!
//! ```
//! use std::sync::Arc;
//! use als_protocol::{AliasDirectory, AliasRecord, Endpoint, ResolutionEngine, TrustLayer};
//! use als_protocol::crypto::AlsKeypair;
//!
//! let directory = Arc::new(AliasDirectory::in_memory());
//! directory.seed(
//!     AliasRecord::new("koda_dev", "K**** M*******")
//!         .with_endpoint(Endpoint::wallet(1, "AIRTEL_MONEY", "26599...")),
//! );
//!
//! let trust = Arc::new(TrustLayer::new(AlsKeypair::generate()));
//! let engine = ResolutionEngine::new(directory, trust);
//! let response = engine.resolve("@Koda_Dev").unwrap();
//! assert_eq!(response.alias, "@koda_dev");
//! assert_eq!(response.endpoints[0].destination, "26599...");
//! ```

pub mod alias;
pub mod attestation;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod hybrid;
pub mod remote;
pub mod resolver;
pub mod service;
pub mod storage;
pub mod trust;

pub use alias::{
    display_alias, is_reserved, normalize, AliasRecord, AliasStatus, AttestationLevel, Endpoint,
    EndpointType, ResolutionResponse,
};
pub use attestation::{AttestationEngine, AttestationReceipt, Attested};
pub use directory::{AliasDirectory, Durability};
pub use error::{AlsError, AlsResult, AttestationError};
pub use hybrid::{HybridConfig, HybridResolver, RemoteStats};
pub use remote::{BlockchainResolver, CancelHandle, CancelToken, InMemoryLedger, RemoteError};
pub use resolver::ResolutionEngine;
pub use service::{AliasService, AttestationRequest, RegistrationReceipt, RegistrationRequest};
pub use storage::{AliasStore, JsonFileStore, MemoryStore, SledStore, StoreError};
pub use trust::{PrivacyToken, TokenError, TrustLayer};
