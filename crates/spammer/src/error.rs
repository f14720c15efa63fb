//! Engine error taxonomy.

use crate::config::ConfigError;
use crate::snapshot::SnapshotError;
use txflood_client::ClientError;

/// Errors produced by the derivation engine and load generator.
///
/// Query and broadcast failures are unrecoverable at the point of
/// occurrence: the engine cancels outstanding work and returns the first
/// error to the caller. Nothing is retried or rolled back, which may leave
/// accounts mid-sequence — acceptable for a load-testing tool.
#[derive(Debug, thiserror::Error)]
pub enum SpamError {
    /// Detected up front: the requested fan-out exceeds what the root
    /// balance can support after fees.
    #[error("insufficient funds: need more than {required}{denom} to fund the run, have {available}{denom}")]
    InsufficientFunds {
        denom: String,
        required: u128,
        available: u128,
    },

    /// An account-state query failed.
    #[error("account query failed: {0}")]
    Query(#[source] ClientError),

    /// A broadcast-and-commit round trip failed.
    #[error("broadcast failed: {0}")]
    Broadcast(#[source] ClientError),

    /// A balance operation would have gone negative. This is a logic error
    /// in the engine's bookkeeping, not a retry condition.
    #[error("balance underflow on account {address}: tried to spend {amount}, only {available} {denom} left")]
    BalanceUnderflow {
        address: String,
        denom: String,
        amount: u128,
        available: u128,
    },

    /// Canonical encoding of a sign document failed.
    #[error("transaction signing failed: {0}")]
    Sign(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The account pool channel closed while work was outstanding.
    #[error("account pool closed unexpectedly")]
    PoolClosed,

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Task(String),
}
