//! Flat-file persistence of the account pool.
//!
//! The snapshot is a JSON array with one record per account. Secret
//! material — the signing keypair and the reserved next keypair — is
//! deliberately excluded: a restored pool cannot resume derivation, and a
//! record can only be re-armed for sending by supplying a keypair out of
//! band (see [`SnapshotRecord::into_account`]).

use crate::accounts::Account;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use txflood_types::{Address, Coin, KeyPair};

/// One persisted account. Key-less by design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub chain_id: String,
    pub coin: Coin,
    pub account_number: u64,
    pub sequence: u64,
    pub receiver: Address,
    pub gas: u64,
    pub fee: Coin,
}

impl From<&Account> for SnapshotRecord {
    fn from(account: &Account) -> Self {
        Self {
            chain_id: account.chain_id.clone(),
            coin: account.coin.clone(),
            account_number: account.account_number,
            sequence: account.sequence,
            receiver: account.receiver,
            gas: account.gas_limit,
            fee: account.fee.clone(),
        }
    }
}

impl SnapshotRecord {
    /// Re-arm a restored record with an operator-supplied keypair.
    ///
    /// The result is terminal for splitting purposes: its reserved child
    /// key is fresh and unrelated to whatever the original run held.
    pub fn into_account(self, keypair: KeyPair, remaining_sends: u64) -> Account {
        Account {
            chain_id: self.chain_id,
            coin: self.coin,
            account_number: self.account_number,
            sequence: self.sequence,
            next_keypair: KeyPair::generate(),
            receiver: self.receiver,
            gas_limit: self.gas,
            fee: self.fee,
            keypair,
            remaining_sends,
        }
    }
}

/// Persistence failures. Loading a corrupt or absent file is a hard error.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Write `accounts` to `path` as a pretty-printed JSON array.
pub fn save(path: &Path, accounts: &[Account]) -> Result<(), SnapshotError> {
    let records: Vec<SnapshotRecord> = accounts.iter().map(SnapshotRecord::from).collect();
    let data = serde_json::to_vec_pretty(&records).map_err(|source| SnapshotError::Malformed {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), accounts = records.len(), "snapshot written");
    Ok(())
}

/// Load all records from `path`.
pub fn load(path: &Path) -> Result<Vec<SnapshotRecord>, SnapshotError> {
    let data = std::fs::read(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| SnapshotError::Malformed {
        path: path.display().to_string(),
        source,
    })
}
