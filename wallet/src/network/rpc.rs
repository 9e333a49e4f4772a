//! # JSON-RPC API Definitions
//!
//! Type-safe definitions for the ledger node calls the wallet makes. This
//! module defines the request/response types only; the HTTP client lives
//! in the server binary (using reqwest).
//!
//! The API follows the JSON-RPC 2.0 specification with method names
//! prefixed with `nova_`.
//!
//! ## Method Index
//!
//! | Method                     | Description                            |
//! |----------------------------|----------------------------------------|
//! | `nova_publishTransaction`  | Hand a signed transaction to the node  |

use serde::{Deserialize, Serialize};

use crate::transaction::{Transaction, TransactionHash};

// ---------------------------------------------------------------------------
// RPC Method Enumeration
// ---------------------------------------------------------------------------

/// Supported JSON-RPC methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    /// Submit a signed transaction for inclusion.
    /// Parameters: [`PublishParams`]
    #[serde(rename = "nova_publishTransaction")]
    PublishTransaction,
}

// ---------------------------------------------------------------------------
// Request / Response Envelopes
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version. Always "2.0".
    pub jsonrpc: String,
    /// Request identifier. Echoed back in the response.
    pub id: serde_json::Value,
    pub method: RpcMethod,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: serde_json::Value, method: RpcMethod, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
///
/// Exactly one of `result` or `error` is set by a conforming node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// RPC Errors
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 error object. The node answers `-32003` when it refuses a
/// transaction and the standard `-326xx` codes for malformed calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn transaction_rejected(reason: impl Into<String>) -> Self {
        Self {
            code: -32003,
            message: reason.into(),
            data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed Payloads
// ---------------------------------------------------------------------------

/// Parameters of `nova_publishTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishParams {
    pub hash: TransactionHash,
    pub transaction: Transaction,
}

/// Result of `nova_publishTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub hash: TransactionHash,
    #[serde(default)]
    pub status: String,
}
