// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MW-ALS Node
//!
//! Entry point for the `als-node` binary. Parses CLI arguments, initializes
//! logging and metrics, opens the alias directory, and serves the HTTP API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     start the alias service
//! - `keygen`  generate a signing key file
//! - `version` print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use als_protocol::config::{PROTOCOL_VERSION, SERVICE_NAME};
use als_protocol::crypto::AlsKeypair;
use als_protocol::{
    AliasDirectory, AliasService, AliasStore, AttestationEngine, HybridConfig, HybridResolver,
    InMemoryLedger, JsonFileStore, ResolutionEngine, SledStore, TrustLayer,
};

use cli::{AlsNodeCli, Commands, RemoteKind, StoreKind};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AlsNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen(args) => keygen(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the alias service: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        data = %args.data.display(),
        store = ?args.store,
        remote = ?args.remote,
        "starting als-node"
    );

    // --- Trust layer ---
    let trust = Arc::new(load_trust_layer(&args)?);

    // --- Alias directory ---
    let directory = match open_store(args.store, &args.data)? {
        Some(store) => Arc::new(
            AliasDirectory::open(store)
                .with_context(|| format!("failed to load aliases from {}", args.data.display()))?,
        ),
        None => Arc::new(AliasDirectory::in_memory()),
    };
    tracing::info!(aliases = directory.len(), "alias directory ready");

    // --- Engines ---
    let attestation = if args.allow_attestation_downgrade {
        AttestationEngine::permissive(Arc::clone(&directory))
    } else {
        AttestationEngine::new(Arc::clone(&directory))
    };
    let engine = ResolutionEngine::with_attestation(Arc::clone(&directory), trust, attestation);

    let service: Arc<dyn AliasService> = match args.remote {
        RemoteKind::None => Arc::new(engine),
        RemoteKind::Mock => {
            let config = HybridConfig {
                remote_timeout: Duration::from_millis(args.remote_timeout_ms),
                ..HybridConfig::default()
            };
            tracing::info!(
                timeout_ms = args.remote_timeout_ms,
                "ledger fallback enabled (in-process ledger)"
            );
            Arc::new(HybridResolver::with_config(
                engine,
                Arc::new(InMemoryLedger::new()),
                config,
            ))
        }
    };

    // --- Metrics ---
    let node_metrics =
        Arc::new(NodeMetrics::new().context("failed to register Prometheus metrics")?);

    // --- Operator access ---
    let admin_token: Option<Arc<str>> = args
        .admin_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Arc::from);
    if admin_token.is_none() {
        tracing::warn!("no admin token configured; /attest is disabled");
    }

    // --- Application state ---
    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        service,
        metrics: Arc::clone(&node_metrics),
        admin_token,
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    if directory.has_store() {
        let durability = directory.flush();
        if durability.is_durable() {
            tracing::info!(aliases = directory.len(), "alias directory flushed");
        }
    }

    tracing::info!("als-node stopped");
    Ok(())
}

/// Picks the signing key from the CLI. With no key configured a session key
/// is generated and its seed printed once.
fn load_trust_layer(args: &cli::RunArgs) -> Result<TrustLayer> {
    if args.unsigned {
        tracing::warn!("running without a signing key; responses will not be verifiable");
        return Ok(TrustLayer::unsigned());
    }

    let keypair = if let Some(seed) = &args.key {
        AlsKeypair::from_hex(seed).context("invalid --key seed")?
    } else if let Some(path) = &args.key_file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read key file {}", path.display()))?;
        AlsKeypair::from_hex(contents.trim())
            .with_context(|| format!("invalid seed in key file {}", path.display()))?
    } else {
        let keypair = AlsKeypair::generate();
        println!("Generated session signing key. Keep this seed to reuse it:");
        println!("  {}", keypair.seed_hex());
        tracing::warn!(
            public_key = %keypair.public_key().to_hex(),
            "no signing key configured; generated a session key"
        );
        keypair
    };

    tracing::info!(public_key = %keypair.public_key().to_hex(), "response signing enabled");
    Ok(TrustLayer::new(keypair))
}

/// Opens the configured backing store. `memory` has none.
fn open_store(kind: StoreKind, data: &Path) -> Result<Option<Arc<dyn AliasStore>>> {
    let store: Arc<dyn AliasStore> = match kind {
        StoreKind::Json => Arc::new(JsonFileStore::new(data)),
        StoreKind::Sled => {
            std::fs::create_dir_all(data).with_context(|| {
                format!("failed to create database directory {}", data.display())
            })?;
            Arc::new(
                SledStore::open(data)
                    .with_context(|| format!("failed to open database at {}", data.display()))?,
            )
        }
        StoreKind::Memory => return Ok(None),
    };
    Ok(Some(store))
}

/// Generates a signing key and writes its hex seed to disk.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let path = &args.output;
    if path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    let keypair = AlsKeypair::generate();
    std::fs::write(path, keypair.seed_hex())
        .with_context(|| format!("failed to write signing key to {}", path.display()))?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
    }

    println!("Signing key written.");
    println!("  Key file   : {}", path.display());
    println!("  Public key : {}", keypair.public_key().to_hex());
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("als-node {}", env!("CARGO_PKG_VERSION"));
    println!("service   {}", SERVICE_NAME);
    println!("protocol  {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed that branch never completes.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
