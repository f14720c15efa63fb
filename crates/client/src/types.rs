//! Wire types for ledger client communication.

use serde::{Deserialize, Serialize};
use txflood_types::{Coin, SignedTransaction};

/// On-ledger state of an account, as returned by a query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountState {
    /// Network-assigned immutable account identifier.
    pub account_number: u64,
    /// Number of transactions the network has accepted from this account.
    pub sequence: u64,
    /// All balances held by the account.
    #[serde(default)]
    pub balances: Vec<Coin>,
}

impl AccountState {
    /// Amount of `denom` held by the account (0 if absent).
    pub fn balance_of(&self, denom: &str) -> u128 {
        self.balances
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or(0)
    }
}

/// Result of a committed broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Hex-encoded hash of the committed transaction.
    pub tx_hash: String,
}

/// Request body for `POST /txs/commit`.
#[derive(Debug, Serialize)]
pub struct BroadcastCommitRequest<'a> {
    pub tx: &'a SignedTransaction,
}

/// Response body for `POST /txs/commit`.
///
/// `code` follows the usual convention: 0 means the transaction was
/// committed and executed successfully, anything else is a rejection with
/// details in `log`.
#[derive(Debug, Deserialize)]
pub struct BroadcastCommitResponse {
    pub hash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub log: String,
}

/// Response body for `GET /chain_id`.
#[derive(Debug, Deserialize)]
pub struct ChainIdResponse {
    pub chain_id: String,
}
