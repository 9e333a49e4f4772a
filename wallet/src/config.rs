//! # Wallet Configuration & Constants
//!
//! Every tunable of the submission core lives here. Defaults are exposed as
//! constants so tests and the server binary agree on them, and the
//! [`WalletConfig`] struct is handed explicitly to every constructor that
//! needs it. There is no process-wide configuration state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Marker that distinguishes a literal address from a username in the
/// `recipient` field of a transfer request.
pub const ADDRESS_PREFIX: &str = "0x";

/// Raw address length in bytes (BLAKE3 output).
pub const ADDRESS_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Transaction Limits
// ---------------------------------------------------------------------------

/// Current transaction format version.
pub const TRANSACTION_VERSION: u16 = 1;

/// Default maximum payload size. 16 KiB is plenty for memos and
/// contract call data.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024;

/// Maximum number of fractional digits accepted in an amount string.
pub const MAX_AMOUNT_SCALE: u32 = 18;

/// Transactions stamped further than this into the future are rejected.
pub const MAX_FUTURE_DRIFT: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// The faucet account. Funds leave it only through the faucet service.
pub const FAUCET_USERNAME: &str = "faucet";

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Build attempts per submission when the sender's chain moves underneath us.
pub const DEFAULT_MAX_ORDERING_ATTEMPTS: u32 = 3;

/// Bounded wait for a publish acknowledgment.
pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 10_000;

/// How often the server retries publishing recorded transactions.
pub const DEFAULT_REPUBLISH_INTERVAL_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Default HTTP listen address for the wallet server.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Default ledger node JSON-RPC endpoint.
pub const DEFAULT_LEDGER_RPC_URL: &str = "http://127.0.0.1:9741/rpc";

// ---------------------------------------------------------------------------
// WalletConfig
// ---------------------------------------------------------------------------

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Runtime configuration for the wallet core and server.
///
/// Every field has a default, so a config file only needs the values it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Root directory for all on-disk state.
    pub data_dir: PathBuf,

    /// Upper bound on transaction payload size.
    pub max_payload_bytes: usize,

    /// Usernames that may never send outbound transfers.
    pub reserved_usernames: Vec<String>,

    /// Build attempts before an ordering race is reported to the caller.
    pub max_ordering_attempts: u32,

    /// Publish acknowledgment timeout.
    pub publish_timeout_ms: u64,

    /// Background republish interval. `0` disables the task.
    pub republish_interval_secs: u64,

    /// JSON-RPC endpoint of the ledger node.
    pub ledger_rpc_url: String,

    /// HTTP listen address.
    pub listen_addr: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            reserved_usernames: vec![FAUCET_USERNAME.to_string()],
            max_ordering_attempts: DEFAULT_MAX_ORDERING_ATTEMPTS,
            publish_timeout_ms: DEFAULT_PUBLISH_TIMEOUT_MS,
            republish_interval_secs: DEFAULT_REPUBLISH_INTERVAL_SECS,
            ledger_rpc_url: DEFAULT_LEDGER_RPC_URL.to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

impl WalletConfig {
    /// Loads a TOML config file. Missing keys fall back to defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Renders this config as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Directory holding the sled database.
    pub fn db_dir(&self) -> PathBuf {
        self.data_dir.join("db")
    }

    /// Directory for log files and other operator artifacts.
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Publish timeout as a [`Duration`].
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    /// Returns `true` if `username` is barred from sending.
    pub fn is_reserved(&self, username: &str) -> bool {
        self.reserved_usernames.iter().any(|r| r == username)
    }
}
