//! # Cryptographic Primitives
//!
//! Thin, typed wrappers around `ed25519-dalek`. Everything the trust layer
//! signs goes through [`AlsKeypair::sign`]; everything a relying party checks
//! goes through [`AlsPublicKey::verify`].

pub mod keys;

pub use keys::{AlsKeypair, AlsPublicKey, AlsSignature, KeyError};
