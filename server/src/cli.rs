//! # CLI Interface
//!
//! Defines the command-line argument structure for `nova-wallet` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// NOVA wallet server.
///
/// Accepts transfer requests over HTTP, signs them with the sender's key,
/// records them durably, and publishes them to a ledger node.
#[derive(Parser, Debug)]
#[command(
    name = "nova-wallet",
    about = "NOVA wallet transfer server",
    version,
    propagate_version = true
)]
pub struct NovaWalletCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the wallet binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the wallet server.
    Run(RunArgs),
    /// Create the data directory and write a default `config.toml`.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the configuration file (TOML).
    ///
    /// When omitted, the server looks for `config.toml` in the data
    /// directory and falls back to built-in defaults.
    #[arg(long, short = 'c', env = "NOVA_WALLET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding the wallet database. Overrides the file.
    #[arg(long, short = 'd', env = "NOVA_WALLET_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// HTTP listen address, e.g. `0.0.0.0:8080`. Overrides the file.
    #[arg(long, env = "NOVA_WALLET_LISTEN")]
    pub listen: Option<String>,

    /// Ledger node JSON-RPC endpoint. Overrides the file.
    #[arg(long, env = "NOVA_WALLET_LEDGER_RPC")]
    pub ledger_rpc_url: Option<String>,

    /// Emit JSON log lines instead of human-readable output.
    #[arg(long)]
    pub json_logs: bool,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "NOVA_WALLET_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Overwrite an existing `config.toml`.
    #[arg(long)]
    pub force: bool,
}
