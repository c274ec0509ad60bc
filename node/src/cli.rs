//! # CLI Interface
//!
//! Command-line argument structure for `keystone-node` using `clap`
//! derive. Two subcommands: `run` and `version`.

use clap::{Parser, Subcommand};

use keystone_ledger::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

/// Keystone ledger node.
///
/// Serves the register lifecycle and transaction REST API, drives docket
/// builds on demand or on a schedule, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "keystone-node",
    about = "Keystone ledger platform node",
    version,
    propagate_version = true
)]
pub struct KeystoneNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the REST API.
    #[arg(long, env = "KEYSTONE_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "KEYSTONE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Interval in seconds between scheduled build sweeps over all active
    /// registers. Omit to build only on demand via the API.
    #[arg(long, env = "KEYSTONE_BUILD_INTERVAL_SECS")]
    pub build_interval_secs: Option<u64>,

    /// Maximum transactions per docket.
    #[arg(long, env = "KEYSTONE_MAX_DOCKET_TRANSACTIONS", default_value_t = keystone_ledger::config::MAX_TRANSACTIONS_PER_DOCKET)]
    pub max_docket_transactions: usize,

    /// Mempool capacity per register.
    #[arg(long, env = "KEYSTONE_MEMPOOL_CAPACITY", default_value_t = keystone_ledger::config::DEFAULT_MEMPOOL_CAPACITY)]
    pub mempool_capacity: usize,

    /// This node's validator identity, preferred as the designated docket
    /// signer when active.
    #[arg(long, env = "KEYSTONE_VALIDATOR_ID", default_value = "local-validator")]
    pub validator_id: String,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "KEYSTONE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}
