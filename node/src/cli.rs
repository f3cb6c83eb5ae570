//! # CLI Interface
//!
//! Defines the command-line argument structure for `als-node` using
//! `clap` derive. Supports three subcommands: `run`, `keygen` and
//! `version`. Every `run` option can also come from an `ALS_*`
//! environment variable.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use als_protocol::config::{DEFAULT_DATA_FILE, DEFAULT_HTTP_PORT, DEFAULT_METRICS_PORT};

/// MW-ALS alias lookup service.
///
/// Resolves payment aliases to signed settlement endpoints over HTTP and
/// exposes Prometheus metrics on a separate port.
#[derive(Parser, Debug)]
#[command(
    name = "als-node",
    about = "MW-ALS alias lookup service",
    version,
    propagate_version = true
)]
pub struct AlsNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the alias service.
    Run(RunArgs),
    /// Generate a signing key and write its seed to a file.
    Keygen(KeygenArgs),
    /// Print version information and exit.
    Version,
}

/// Where the alias directory is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Pretty-printed JSON file at `--data`.
    Json,
    /// Embedded sled database in the directory at `--data`.
    Sled,
    /// Nothing is persisted.
    Memory,
}

/// What sits behind the local directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RemoteKind {
    /// Local directory only.
    None,
    /// In-process ledger. Misses fall through to it and registrations go
    /// through it first.
    Mock,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the resolution API.
    #[arg(long, short = 'p', env = "ALS_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "ALS_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Data file (json) or database directory (sled).
    #[arg(long, short = 'd', env = "ALS_DATA", default_value = DEFAULT_DATA_FILE)]
    pub data: PathBuf,

    #[arg(long, value_enum, env = "ALS_STORE", default_value_t = StoreKind::Json)]
    pub store: StoreKind,

    /// Hex-encoded Ed25519 seed for response signing.
    ///
    /// When neither this nor `--key-file` is given, a session key is
    /// generated and its seed printed once to stdout.
    #[arg(long, env = "ALS_SIGNING_KEY", conflicts_with = "key_file")]
    pub key: Option<String>,

    /// File holding a hex seed, as written by `keygen`.
    #[arg(long, env = "ALS_SIGNING_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Run without a signing key. Responses carry `unsigned`.
    #[arg(long, conflicts_with_all = ["key", "key_file"])]
    pub unsigned: bool,

    #[arg(long, value_enum, env = "ALS_REMOTE", default_value_t = RemoteKind::None)]
    pub remote: RemoteKind,

    /// Upper bound on a single ledger call, in milliseconds.
    #[arg(long, env = "ALS_REMOTE_TIMEOUT_MS", default_value_t = 5_000)]
    pub remote_timeout_ms: u64,

    /// Accept attestation targets below an alias's current level.
    #[arg(long)]
    pub allow_attestation_downgrade: bool,

    /// Bearer token for the operator-only `/attest` endpoint. Without one
    /// the endpoint refuses every request.
    #[arg(long, env = "ALS_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "ALS_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Where to write the hex seed. The file is created with mode 0600.
    #[arg(long, short = 'o', default_value = "als_signing.key")]
    pub output: PathBuf,

    /// Overwrite an existing key file.
    #[arg(long)]
    pub force: bool,
}
