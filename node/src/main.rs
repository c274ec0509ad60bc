// Copyright (c) 2026 Keystone Contributors. MIT License.
// See LICENSE for details.

//! # Keystone Node
//!
//! Entry point for the `keystone-node` binary. Parses CLI arguments,
//! initializes logging and metrics, wires the ledger components together,
//! and serves the REST API plus a Prometheus metrics endpoint.
//!
//! Two subcommands:
//!
//! - `run`     -- start the node
//! - `version` -- print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use keystone_ledger::{
    AllowAll, DocketPipeline, LocalWallet, InMemoryChainStore, PipelineConfig,
    RegisterCreationCoordinator, RegisterDirectory, StaticPeerDirectory, TransactionIntake,
};

use cli::{Commands, KeystoneNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = KeystoneNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full node: REST API, metrics endpoint, and (optionally) the
/// scheduled build sweep.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "keystone_node=info,keystone_ledger=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        validator_id = %args.validator_id,
        "starting keystone-node"
    );

    // --- Ledger components ---
    let directory = Arc::new(RegisterDirectory::with_mempool_capacity(
        args.mempool_capacity,
    ));
    let peers = Arc::new(StaticPeerDirectory::single(&args.validator_id));
    let wallet = Arc::new(LocalWallet::new());
    let validator_pubkey = wallet.add_wallet(&args.validator_id);
    tracing::info!(public_key = %validator_pubkey, "validator wallet generated");

    let chain_store = Arc::new(InMemoryChainStore::new());

    let pipeline = Arc::new(DocketPipeline::new(
        directory.clone(),
        peers.clone(),
        wallet,
        chain_store,
        PipelineConfig {
            max_transactions_per_docket: args.max_docket_transactions,
            local_validator_id: Some(args.validator_id.clone()),
            ..PipelineConfig::default()
        },
    ));

    let intake = Arc::new(TransactionIntake::new(directory.clone(), Arc::new(AllowAll)));
    let coordinator = Arc::new(RegisterCreationCoordinator::new(
        directory.clone(),
        peers,
    ));

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        directory,
        intake,
        pipeline: pipeline.clone(),
        coordinator,
        metrics: Arc::clone(&node_metrics),
        version: format!(
            "{} (platform {})",
            env!("CARGO_PKG_VERSION"),
            keystone_ledger::config::PLATFORM_VERSION,
        ),
        started_at: chrono::Utc::now(),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("REST API listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Scheduled build sweep ---
    // Dockets build on demand via POST /registers/:id/dockets; when an
    // interval is configured, a background task also sweeps every active
    // register on the clock.
    let sweep_loop = args.build_interval_secs.map(|secs| {
        let pipeline = pipeline.clone();
        let metrics = Arc::clone(&node_metrics);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(secs.max(1)));
            // The first tick fires immediately; skip it so startup stays quiet.
            interval.tick().await;
            loop {
                interval.tick().await;
                let committed = pipeline.sweep_active_registers().await;
                if committed > 0 {
                    metrics.dockets_committed_total.inc_by(committed as u64);
                    tracing::info!(committed, "scheduled sweep committed dockets");
                }
            }
        })
    });

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
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    if let Some(handle) = sweep_loop {
        handle.abort();
    }
    tracing::info!("keystone-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("keystone-node {}", env!("CARGO_PKG_VERSION"));
    println!("platform      {}", keystone_ledger::config::PLATFORM_VERSION);
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
