//! Cosmos SDK REST gateway client with multi-endpoint failover

use super::types::{
    BalanceResponse, BroadcastTxRequest, BroadcastTxResponse, GetTxResponse, LatestBlockResponse,
    BROADCAST_MODE_SYNC,
};
use crate::bridge::{ChainRpc, ChainTx};
use crate::error::{RouterError, RouterResult};
use crate::metrics;

use alloy_primitives::U256;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

pub const TX_PATH: &str = "/cosmos/tx/v1beta1/txs/";
pub const LATEST_BLOCK_PATH: &str = "/cosmos/base/tendermint/v1beta1/blocks/latest";
pub const BALANCE_PATH: &str = "/cosmos/bank/v1beta1/balances/";

/// REST client over an ordered list of gateway endpoints
pub struct CosmosRestClient {
    /// Chain ID used as metrics label
    chain_id: String,
    base_urls: Vec<String>,
    /// Endpoint serving reads; advanced on failure
    current: AtomicUsize,
    client: reqwest::Client,
}

impl CosmosRestClient {
    pub fn new(chain_id: &str, base_urls: &[String], timeout: Duration) -> RouterResult<Self> {
        let base_urls: Vec<String> = base_urls
            .iter()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if base_urls.is_empty() {
            return Err(RouterError::Config(format!(
                "chain {} has no gateway endpoints",
                chain_id
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RouterError::Config(format!("build http client: {}", e)))?;

        Ok(Self {
            chain_id: chain_id.to_string(),
            base_urls,
            current: AtomicUsize::new(0),
            client,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.base_urls
    }

    fn current_url(&self) -> &str {
        let idx = self.current.load(Ordering::Relaxed);
        &self.base_urls[idx % self.base_urls.len()]
    }

    /// Switch reads to the next endpoint
    fn failover(&self) {
        let current = self.current.load(Ordering::Relaxed);
        let next = (current + 1) % self.base_urls.len();
        self.current.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to endpoint {}", self.chain_id, next);
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> RouterResult<T> {
        let rpc_err = |message: String| RouterError::Rpc {
            endpoint: url.to_string(),
            message,
        };

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| rpc_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(rpc_err(format!("status {}: {}", status, body)));
        }
        resp.json::<T>()
            .await
            .map_err(|e| rpc_err(format!("decode response: {}", e)))
    }

    /// GET `path` from the current endpoint, failing over through the rest
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RouterResult<T> {
        let mut last_error = None;
        for _ in 0..self.base_urls.len() {
            let base = self.current_url();
            match self.fetch_json(&format!("{}{}", base, path)).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("Request to chain {} failed: {}", self.chain_id, e);
                    metrics::record_rpc_failure(base);
                    last_error = Some(e);
                    self.failover();
                }
            }
        }
        Err(last_error.unwrap_or_else(|| RouterError::Internal("no endpoints".to_string())))
    }

    async fn post_broadcast(&self, url: &str, req: &BroadcastTxRequest<'_>) -> RouterResult<String> {
        let rpc_err = |message: String| RouterError::Rpc {
            endpoint: url.to_string(),
            message,
        };

        let resp = self
            .client
            .post(url)
            .json(req)
            .send()
            .await
            .map_err(|e| rpc_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(rpc_err(format!("status {}: {}", status, body)));
        }
        let result = resp
            .json::<BroadcastTxResponse>()
            .await
            .map_err(|e| rpc_err(format!("decode response: {}", e)))?
            .tx_response;

        if result.code != 0 {
            warn!(
                chain_id = %self.chain_id,
                txhash = %result.txhash,
                code = result.code,
                raw_log = %result.raw_log,
                "Broadcast tx accepted with nonzero check code"
            );
        }
        Ok(result.txhash)
    }
}

#[async_trait]
impl ChainRpc for CosmosRestClient {
    async fn get_transaction_by_hash(&self, tx_hash: &str) -> RouterResult<ChainTx> {
        let resp: GetTxResponse = self.get_json(&format!("{}{}", TX_PATH, tx_hash)).await?;
        resp.into_chain_tx()
    }

    async fn get_latest_block_number(&self) -> RouterResult<u64> {
        let resp: LatestBlockResponse = self.get_json(LATEST_BLOCK_PATH).await?;
        resp.height()
    }

    async fn get_balance(&self, account: &str, denom: &str) -> RouterResult<U256> {
        let path = format!("{}{}/by_denom?denom={}", BALANCE_PATH, account, denom);
        let resp: BalanceResponse = self.get_json(&path).await?;
        match resp.balance {
            None => Ok(U256::ZERO),
            Some(coin) => U256::from_str_radix(&coin.amount, 10).map_err(|e| {
                RouterError::Decode(format!("invalid balance '{}': {}", coin.amount, e))
            }),
        }
    }

    /// Try each endpoint in configured order until one accepts the transaction
    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> RouterResult<String> {
        let req = BroadcastTxRequest {
            tx_bytes: STANDARD.encode(tx_bytes),
            mode: BROADCAST_MODE_SYNC,
        };

        for base in &self.base_urls {
            let url = format!("{}{}", base, TX_PATH);
            match self.post_broadcast(&url, &req).await {
                Ok(txhash) => {
                    debug!("Broadcast tx {} via {}", txhash, base);
                    metrics::record_broadcast(&self.chain_id, true);
                    return Ok(txhash);
                }
                Err(e) => {
                    warn!("Broadcast to chain {} failed: {}", self.chain_id, e);
                    metrics::record_rpc_failure(base);
                }
            }
        }

        metrics::record_broadcast(&self.chain_id, false);
        Err(RouterError::BroadcastTx)
    }
}
