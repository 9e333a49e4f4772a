//! JSON-RPC publish client for the ledger node.
//!
//! Looks the recorded transaction up in the pending store and sends it as
//! `nova_publishTransaction`. Transport failures, node errors and malformed
//! replies each map to their own [`PublishError`] variant.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use nova_wallet::network::{
    Acknowledgment, PendingStore, PublishClient, PublishError, PublishParams, PublishResult,
    RpcMethod, RpcRequest, RpcResponse,
};
use nova_wallet::TransactionHash;

/// Publishes recorded transactions over HTTP JSON-RPC.
pub struct RpcPublishClient {
    http: reqwest::Client,
    url: String,
    pending: Arc<dyn PendingStore>,
}

impl RpcPublishClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, pending: Arc<dyn PendingStore>) -> Self {
        Self {
            http,
            url: url.into(),
            pending,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_for(&self, hash: &TransactionHash) -> Result<RpcRequest, PublishError> {
        let entry = self
            .pending
            .get(hash)
            .map_err(|e| PublishError::Transport(e.to_string()))?
            .ok_or(PublishError::UnknownTransaction { hash: *hash })?;

        let params = PublishParams {
            hash: *hash,
            transaction: entry.transaction,
        };
        let params = serde_json::to_value(&params)
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;
        let id = serde_json::Value::String(uuid::Uuid::new_v4().to_string());
        Ok(RpcRequest::new(id, RpcMethod::PublishTransaction, params))
    }
}

/// Interprets a JSON-RPC reply to `nova_publishTransaction`.
pub fn acknowledgment_from(
    hash: &TransactionHash,
    response: RpcResponse,
) -> Result<Acknowledgment, PublishError> {
    if let Some(error) = response.error {
        return Err(PublishError::Rejected {
            code: error.code,
            message: error.message,
        });
    }

    let result = response
        .result
        .ok_or_else(|| PublishError::InvalidResponse("reply has neither result nor error".into()))?;
    let result: PublishResult = serde_json::from_value(result)
        .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;

    if result.hash != *hash {
        return Err(PublishError::InvalidResponse(format!(
            "node acknowledged {} instead of {}",
            result.hash, hash
        )));
    }

    Ok(Acknowledgment {
        hash: result.hash,
        detail: result.status,
    })
}

#[async_trait]
impl PublishClient for RpcPublishClient {
    async fn publish(&self, hash: &TransactionHash) -> Result<Acknowledgment, PublishError> {
        let request = self.request_for(hash)?;
        debug!(%hash, url = %self.url, "publishing transaction");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PublishError::Transport(format!(
                "ledger node answered HTTP {}",
                response.status()
            )));
        }

        let reply: RpcResponse = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;
        acknowledgment_from(hash, reply)
    }
}
