// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Blocker Node
//!
//! Entry point for the `blocker-node` binary. Parses CLI arguments, sets up
//! logging and metrics, builds the chain and the node, and serves the peer
//! API until SIGINT/SIGTERM.
//!
//! - `run`     — start the node
//! - `keygen`  — generate a key to use as `--validator-seed`
//! - `status`  — query a running node's `/status`
//! - `version` — print build version information

mod api;
mod cli;
mod client;
mod logging;
mod metrics;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use blocker_protocol::config::{MAX_BLOCK_TRANSACTIONS, PROTOCOL_VERSION};
use blocker_protocol::crypto::keys::PrivateKey;
use blocker_protocol::network::{MempoolConfig, Node, NodeConfig};
use blocker_protocol::storage::Chain;

use cli::{BlockerNodeCli, Commands};
use client::HttpPeerClient;
use logging::{LogFormat, DEFAULT_FILTER};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = BlockerNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen => {
            keygen();
            Ok(())
        }
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn node_config(args: &cli::RunArgs) -> Result<NodeConfig> {
    let validator_key = args
        .validator_seed
        .as_deref()
        .map(PrivateKey::from_seed_hex)
        .transpose()
        .context("invalid --validator-seed")?;

    Ok(NodeConfig {
        version: PROTOCOL_VERSION.to_string(),
        listen_addr: args.advertise.clone().unwrap_or_else(|| args.listen.clone()),
        validator_key,
        bootstrap_nodes: args.bootstrap.clone(),
        block_interval: Duration::from_millis(args.block_interval_ms),
        rpc_timeout: Duration::from_millis(args.rpc_timeout_ms),
        produce_empty_blocks: args.produce_empty_blocks,
        max_block_txs: MAX_BLOCK_TRANSACTIONS,
        mempool: MempoolConfig {
            max_size: args.mempool_size,
        },
    })
}

/// Start the node: chain, peer client, API server, validator loop.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(DEFAULT_FILTER, args.log_format);

    let config = node_config(&args)?;
    tracing::info!(
        listen = %args.listen,
        advertise = %config.listen_addr,
        bootstrap = ?config.bootstrap_nodes,
        validator = config.validator_key.is_some(),
        "starting blocker-node"
    );
    if let Some(key) = &config.validator_key {
        tracing::info!(public_key = %key.public_key(), "validator key loaded");
    }

    let chain = Arc::new(Chain::in_memory().context("failed to initialize chain")?);
    let client = HttpPeerClient::new(config.rpc_timeout).context("failed to build HTTP client")?;
    let node = Node::new(config, chain, Arc::new(client));

    let state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        node: Arc::clone(&node),
        metrics: Arc::new(NodeMetrics::new().context("failed to register metrics")?),
    };

    let router = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind API listener on {}", args.listen))?;
    tracing::info!("API server listening on {}", args.listen);

    node.start();

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    node.shutdown().await;
    served.context("API server error")?;
    tracing::info!("blocker-node stopped");
    Ok(())
}

/// Print a fresh seed and what it controls.
fn keygen() {
    let key = PrivateKey::generate();
    let public_key = key.public_key();
    println!("Seed       : {}", hex::encode(key.seed_bytes()));
    println!("Public key : {}", public_key);
    println!("Address    : {}", public_key.address());
}

/// GET `<url>/status` from a running node and print it.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.url.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("failed to reach {}", url))?
        .error_for_status()?;
    let body: serde_json::Value = response.json().await.context("malformed status reply")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn print_version() {
    println!("blocker-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol     {}", PROTOCOL_VERSION);
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("shutdown signal received, draining connections");
}
