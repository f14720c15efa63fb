//! Ledger client capability consumed by the txflood engines.
//!
//! The engines never talk to the network directly; everything goes through
//! the [`LedgerClient`] trait: query an account's state, fetch the chain id,
//! and broadcast a signed transaction while blocking until it is committed
//! (not merely accepted into a mempool). [`HttpLedgerClient`] is the
//! production implementation over JSON/HTTP; tests substitute an in-memory
//! ledger.

pub mod http;
pub mod types;

pub use http::HttpLedgerClient;
pub use types::{AccountState, BroadcastResult};

use async_trait::async_trait;
use txflood_types::{Address, SignedTransaction};

/// Errors surfaced by a ledger client.
///
/// Both engines treat query and broadcast failures as unrecoverable: they
/// are never retried at this layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The address is unknown to the network.
    #[error("account {address} not found")]
    NotFound { address: String },

    /// Transport-level failure (unreachable node, timeout, bad status).
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node committed a rejection: the transaction was included but
    /// failed, or was refused outright.
    #[error("transaction rejected (code {code}): {log}")]
    Rejected { code: u32, log: String },
}

/// Capability for querying account state and broadcasting transactions.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Query current on-ledger state for `address`.
    async fn query_account(&self, address: &Address) -> Result<AccountState, ClientError>;

    /// The network identifier transactions must be signed against.
    async fn chain_id(&self) -> Result<String, ClientError>;

    /// Broadcast a signed transaction and block until it is included and
    /// committed. Any error is fatal to the calling engine.
    async fn broadcast_commit(&self, tx: &SignedTransaction)
        -> Result<BroadcastResult, ClientError>;
}
