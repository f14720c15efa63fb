//! JSON/HTTP implementation of [`LedgerClient`].

use crate::types::{
    AccountState, BroadcastCommitRequest, BroadcastCommitResponse, BroadcastResult,
    ChainIdResponse,
};
use crate::{ClientError, LedgerClient};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use txflood_types::{Address, SignedTransaction};

/// Default timeout for a single broadcast-and-commit round trip.
///
/// Commit waits for block inclusion, so this must comfortably exceed the
/// network's block interval.
const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Ledger client over a node's JSON/HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLedgerClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:26657`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_COMMIT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check whether the node answers its chain id endpoint.
    pub async fn is_ready(&self) -> bool {
        self.chain_id().await.is_ok()
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn query_account(&self, address: &Address) -> Result<AccountState, ClientError> {
        let url = format!("{}/accounts/{}", self.base_url, address);
        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                address: address.to_string(),
            });
        }
        let response = response.error_for_status()?;
        Ok(response.json::<AccountState>().await?)
    }

    async fn chain_id(&self) -> Result<String, ClientError> {
        let url = format!("{}/chain_id", self.base_url);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        Ok(response.json::<ChainIdResponse>().await?.chain_id)
    }

    async fn broadcast_commit(
        &self,
        tx: &SignedTransaction,
    ) -> Result<BroadcastResult, ClientError> {
        let url = format!("{}/txs/commit", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&BroadcastCommitRequest { tx })
            .send()
            .await?
            .error_for_status()?;

        let body: BroadcastCommitResponse = response.json().await?;
        if body.code != 0 {
            return Err(ClientError::Rejected {
                code: body.code,
                log: body.log,
            });
        }
        debug!(hash = %body.hash, signer = %tx.signer(), "transaction committed");
        Ok(BroadcastResult { tx_hash: body.hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = HttpLedgerClient::new("http://localhost:26657/");
        assert_eq!(client.base_url(), "http://localhost:26657");
    }
}
