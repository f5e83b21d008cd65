// Copyright (c) 2026 XVault Contributors. MIT License.
// See LICENSE for details.

//! # XVault Node
//!
//! Entry point for the `xvault-node` binary: the adapter between the
//! consensus runtime and the deterministic contract core. Each invocation
//! serves one replica round — load state, process the round's requests off
//! the input descriptor, frame the responses, exit.
//!
//! Subcommands:
//!
//! - `run`     — process one round over the configured descriptors
//! - `digest`  — print the state digest (replica cross-check) and exit
//! - `version` — print build version information

mod cli;
mod logging;
mod transport;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use xvault_contract::ops::{Dispatcher, DispatcherConfig};
use xvault_contract::state::persist;
use xvault_contract::token::{LedgerClient, LedgerSigner, MemoryLedger, MemorySigner, TokenAdapter};

use cli::{Commands, XvaultNodeCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = XvaultNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_round(args).await,
        Commands::Digest(args) => print_digest(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Serve one replica round: load → dispatch → persist-per-mutation → exit.
async fn run_round(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        &format!("xvault_node={0},xvault_contract={0},audit=info", args.log_level),
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        state_file = %args.state_file.display(),
        round_key = %args.round_key,
        team_mode = args.team_mode,
        started_at = %chrono::Utc::now().to_rfc3339(),
        "starting xvault-node round"
    );

    // A corrupt state file is fatal: silently starting empty would fork
    // this replica from the cluster.
    let store = persist::load(&args.state_file)
        .with_context(|| format!("failed to load state from {}", args.state_file.display()))?;
    tracing::info!(vaults = store.vaults().len(), "state ready");

    let adapter = if args.dev_ledger {
        let client: Arc<dyn LedgerClient> = Arc::new(MemoryLedger::new());
        let signers: Vec<Arc<dyn LedgerSigner>> = vec![
            Arc::new(MemorySigner::new("node-signer-1")),
            Arc::new(MemorySigner::new("node-signer-2")),
        ];
        TokenAdapter::with_ledger(args.issuer.clone(), client, signers, args.dev_fallback)
    } else {
        TokenAdapter::simulated(args.issuer.clone())
    };

    let config = DispatcherConfig {
        state_file: args.state_file.clone(),
        gateway_url: args.gateway_url.clone(),
        team_mode: args.team_mode,
        mutable_uri_tokens: args.mutable_uri_tokens,
    };
    let mut dispatcher = Dispatcher::new(store, adapter, config);

    // --- Serve ---
    // The round is raced against SIGINT/SIGTERM: every operation that
    // completed before the signal has already been persisted, so stopping
    // here leaves the replica consistent.
    tokio::select! {
        result = transport::serve_round(
            &mut dispatcher,
            args.input_fd,
            args.output_fd,
            &args.round_key,
        ) => {
            let processed = result?;
            let digest = dispatcher
                .store()
                .digest()
                .map_err(|e| anyhow::anyhow!("digest computation failed: {e}"))?;
            tracing::info!(processed, digest = %digest, "round complete");
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, abandoning round");
        }
    }

    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Print the state digest for replica cross-checks.
fn print_digest(args: cli::DigestArgs) -> Result<()> {
    let store = persist::load(&args.state_file)
        .with_context(|| format!("failed to load state from {}", args.state_file.display()))?;
    let digest = store
        .digest()
        .map_err(|e| anyhow::anyhow!("digest computation failed: {e}"))?;
    println!("{digest}");
    Ok(())
}

/// Print version information to stdout.
fn print_version() {
    println!("xvault-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc       {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}
