//! # CLI Interface
//!
//! Command-line structure for `blocker-node`, built with `clap` derive.
//! Four subcommands: `run`, `keygen`, `status` and `version`. Every `run`
//! flag can also come from a `BLOCKER_*` environment variable.

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Blocker ledger node.
///
/// Keeps a replicated UTXO chain, gossips transactions, blocks and peers
/// over HTTP, and produces blocks when given a validator key.
#[derive(Parser, Debug)]
#[command(
    name = "blocker-node",
    about = "Blocker peer-to-peer ledger node",
    version,
    propagate_version = true
)]
pub struct BlockerNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Generate a fresh key and print its seed, public key and address.
    Keygen,
    /// Query the status of a running node.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Socket address to serve the peer API on.
    #[arg(long, short = 'l', env = "BLOCKER_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: String,

    /// Address other nodes should use to reach us. Defaults to `--listen`.
    #[arg(long, env = "BLOCKER_ADVERTISE")]
    pub advertise: Option<String>,

    /// Peers to handshake with on start, comma separated.
    #[arg(long, short = 'b', env = "BLOCKER_BOOTSTRAP", value_delimiter = ',')]
    pub bootstrap: Vec<String>,

    /// Hex-encoded 32-byte Ed25519 seed. Makes this node a validator.
    #[arg(long, env = "BLOCKER_VALIDATOR_SEED", hide_env_values = true)]
    pub validator_seed: Option<String>,

    /// Milliseconds between block production rounds.
    #[arg(
        long,
        env = "BLOCKER_BLOCK_INTERVAL_MS",
        default_value_t = 5_000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub block_interval_ms: u64,

    /// Deadline for each outbound peer call, in milliseconds.
    #[arg(long, env = "BLOCKER_RPC_TIMEOUT_MS", default_value_t = 3_000)]
    pub rpc_timeout_ms: u64,

    /// Produce a block every round even when the mempool is empty.
    #[arg(long, env = "BLOCKER_PRODUCE_EMPTY_BLOCKS")]
    pub produce_empty_blocks: bool,

    /// Maximum number of pending transactions.
    #[arg(long, env = "BLOCKER_MEMPOOL_SIZE", default_value_t = 10_000)]
    pub mempool_size: usize,

    /// Log output format.
    #[arg(long, env = "BLOCKER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Base URL of the running node.
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    pub url: String,
}
