//! # Alias Module
//!
//! Alias syntax and the data model. Two rules hold everywhere:
//!
//! 1. Directory keys are `normalize(alias)`. The `@` sigil is cosmetic and
//!    only re-attached on output.
//! 2. Resolution responses are derived on demand and never stored.

pub mod normalize;
pub mod record;

pub use normalize::{display_alias, is_reserved, normalize};
pub use record::{
    AliasRecord, AliasStatus, AttestationLevel, Endpoint, EndpointType, ResolutionResponse,
};
