//! # Network Module
//!
//! Everything between an accepted transaction and the ledger node: the
//! durable pending store, the publish client seam, and the JSON-RPC types
//! spoken to the node.
//!
//! ## Architecture
//!
//! ```text
//! mempool.rs  — PendingStore trait and the sled-backed SledPendingStore
//! publish.rs  — PublishClient trait, Acknowledgment, PublishError
//! rpc.rs      — JSON-RPC method definitions and request/response types
//! ```
//!
//! ## Design Decisions
//!
//! - The wallet performs no peer-to-peer networking. Publishing is a single
//!   request to a configured ledger node.
//! - The RPC layer defines types only. The HTTP client lives in the server
//!   binary, so this crate stays transport-agnostic.

pub mod mempool;
pub mod publish;
pub mod rpc;

pub use mempool::{PendingEntry, PendingError, PendingStatus, PendingStore, SledPendingStore};
pub use publish::{Acknowledgment, PublishClient, PublishError};
pub use rpc::{PublishParams, PublishResult, RpcError, RpcMethod, RpcRequest, RpcResponse};
