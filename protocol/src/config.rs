//! # Service Configuration & Constants
//!
//! Every magic string and duration in the alias service lives here. Relying
//! parties parse some of these (the token prefix, the `unsigned` marker), so
//! changing them is a wire-format change, not a refactor.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Service Identity
// ---------------------------------------------------------------------------

/// Human-readable service name used in logs and the version banner.
pub const SERVICE_NAME: &str = "MW-ALS";

/// Crate version, surfaced by the node's `version` subcommand.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Alias Syntax
// ---------------------------------------------------------------------------

/// The cosmetic sigil shown in front of aliases. Never part of a directory key.
pub const ALIAS_SIGIL: char = '@';

/// Aliases that nobody gets to register, no matter how they spell them.
/// Compared against the normalized form, so `@Admin` and ` ADMIN ` are both
/// caught.
pub const RESERVED_ALIASES: &[&str] = &[
    "president",
    "government",
    "airtel",
    "tnm",
    "natswitch",
    "mw-als",
    "admin",
];

// ---------------------------------------------------------------------------
// Trust Layer
// ---------------------------------------------------------------------------

/// Signature value attached when the service runs without a signing key.
pub const UNSIGNED_MARKER: &str = "unsigned";

/// Prefix of every privacy token handed out in place of a destination.
pub const TOKEN_PREFIX: &str = "TOKEN";

/// Separator used inside canonical strings and token payloads.
pub const CANONICAL_SEPARATOR: char = '|';

/// How long a privacy token vouches for a destination, in seconds.
pub const TOKEN_TTL_SECS: i64 = 10 * 60;

/// Ed25519 signature length. A hex-encoded signature is twice this.
pub const SIGNATURE_LENGTH: usize = 64;

/// Ed25519 secret seed length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Attestation
// ---------------------------------------------------------------------------

/// Prefix carried by national identity certificates (NRIS-issued blobs).
/// Anything claiming CERTIFIED without it is rejected outright.
pub const CERTIFICATE_PREFIX: &str = "NRIS-";

// ---------------------------------------------------------------------------
// Remote Tier
// ---------------------------------------------------------------------------

/// Default ceiling on a single remote ledger call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP port for the resolution API.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Default JSON data file, relative to the working directory.
pub const DEFAULT_DATA_FILE: &str = "als_data.json";

/// Name of the sled tree that holds alias records.
pub const SLED_ALIAS_TREE: &str = "aliases";
