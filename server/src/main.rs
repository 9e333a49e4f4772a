// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NOVA Wallet Server
//!
//! Entry point for the `nova-wallet` binary. Parses CLI arguments, loads
//! the configuration, wires the submission pipeline over the sled database,
//! and serves the HTTP API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the wallet server
//! - `init`    — create the data directory and a default `config.toml`
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod rpc;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use nova_wallet::account::{AccountAuthenticator, SledDirectory};
use nova_wallet::network::{PendingStore, SledPendingStore};
use nova_wallet::storage::{ChainStore, WalletDB};
use nova_wallet::{PipelineSettings, SubmissionPipeline, WalletConfig};

use cli::{Commands, NovaWalletCli};
use logging::LogFormat;
use metrics::{SharedMetrics, WalletMetrics};

/// Name of the configuration file inside the data directory.
const CONFIG_FILE_NAME: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = NovaWalletCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Init(args) => init_data_dir(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Resolves the effective configuration: file (explicit, or the one in the
/// data directory, or defaults), then CLI overrides.
fn load_config(args: &cli::RunArgs) -> Result<WalletConfig> {
    let mut config = match &args.config {
        Some(path) => WalletConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let data_dir = args
                .data_dir
                .clone()
                .unwrap_or_else(|| WalletConfig::default().data_dir);
            let candidate = data_dir.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                WalletConfig::from_toml_file(&candidate).with_context(|| {
                    format!("failed to load config from {}", candidate.display())
                })?
            } else {
                WalletConfig::default()
            }
        }
    };

    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(listen) = &args.listen {
        config.listen_addr = listen.clone();
    }
    if let Some(url) = &args.ledger_rpc_url {
        config.ledger_rpc_url = url.clone();
    }
    Ok(config)
}

/// Starts the wallet server and the background republish task.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, LogFormat::from_flag(args.json_logs));

    let config = load_config(&args)?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        listen = %config.listen_addr,
        ledger = %config.ledger_rpc_url,
        "starting nova-wallet"
    );

    // --- Persistent storage ---
    let db_path = config.db_dir();
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = WalletDB::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Pipeline ---
    let directory = Arc::new(SledDirectory::new(db.clone()));
    let authenticator = AccountAuthenticator::new(directory, config.reserved_usernames.clone());
    let chains = Arc::new(ChainStore::new(db.clone()));
    let pending = Arc::new(
        SledPendingStore::open(db.clone()).context("failed to open pending store")?,
    );
    tracing::info!(unpublished = pending.unpublished()?.len(), "pending store loaded");

    let http = reqwest::Client::builder()
        .timeout(config.publish_timeout())
        .build()
        .context("failed to build HTTP client")?;
    let publisher = Arc::new(rpc::RpcPublishClient::new(
        http,
        config.ledger_rpc_url.clone(),
        pending.clone(),
    ));

    let pipeline = Arc::new(SubmissionPipeline::new(
        authenticator,
        chains,
        pending,
        publisher,
        PipelineSettings::from(&config),
    ));

    // --- Metrics ---
    let wallet_metrics: SharedMetrics =
        Arc::new(WalletMetrics::new().context("failed to register metrics")?);

    // --- Republish loop ---
    let republish = spawn_republish_loop(
        Arc::clone(&pipeline),
        Arc::clone(&wallet_metrics),
        config.republish_interval_secs,
    );

    // --- API server ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        pipeline,
        metrics: wallet_metrics,
    };
    let router = api::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.listen_addr))?;
    tracing::info!("API server listening on {}", config.listen_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(listener, router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Some(handle) = republish {
        handle.abort();
    }
    db.flush().context("failed to flush database")?;
    tracing::info!("nova-wallet stopped");
    Ok(())
}

/// Retries publishing recorded transactions every `interval_secs`.
/// Returns `None` when the interval is zero.
fn spawn_republish_loop(
    pipeline: Arc<SubmissionPipeline>,
    metrics: SharedMetrics,
    interval_secs: u64,
) -> Option<tokio::task::JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::info!("republish task disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match pipeline.republish_pending().await {
                Ok(report) => {
                    metrics.republished_total.inc_by(report.published.len() as u64);
                    metrics
                        .publish_failures_total
                        .inc_by(report.failed.len() as u64);
                    if report.published.is_empty()
                        && report.orphaned.is_empty()
                        && report.still_pending() == 0
                    {
                        continue;
                    }
                    tracing::info!(
                        published = report.published.len(),
                        failed = report.failed.len(),
                        deferred = report.deferred.len(),
                        orphaned = report.orphaned.len(),
                        "republish pass finished"
                    );
                }
                Err(e) => tracing::warn!("republish pass failed: {}", e),
            }
        }
    }))
}

/// Creates the data directory and writes a default configuration file.
fn init_data_dir(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("nova_wallet_server=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config_path = data_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        );
    }

    write_default_config(data_dir, &config_path)?;
    tracing::info!(config = %config_path.display(), "data directory initialized");

    println!("Wallet initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Config file    : {}", config_path.display());
    Ok(())
}

fn write_default_config(data_dir: &Path, config_path: &Path) -> Result<()> {
    let config = WalletConfig {
        data_dir: data_dir.to_path_buf(),
        ..WalletConfig::default()
    };
    let rendered = config.to_toml_string().context("failed to render config")?;
    std::fs::write(config_path, rendered)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("nova-wallet {}", env!("CARGO_PKG_VERSION"));
    println!("tx format   v{}", nova_wallet::config::TRANSACTION_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
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
