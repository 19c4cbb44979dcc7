//! Bridge abstraction - the capability set every chain adapter exposes
//!
//! This module provides:
//! - The `Bridge` trait consumed by the router and the verification path
//! - The `ChainRpc` boundary to the chain transport
//! - `BridgeBase`, the chain/gateway/token state shared by adapters
//! - Bounded-retry native balance checks

pub mod balance;

pub use balance::{check_native_balance, RetryPolicy};

use crate::error::{RouterError, RouterResult};
use crate::registry::{RouterLookup, TokenConfigStore};
use crate::types::{parse_chain_id, ChainConfig, GatewayConfig, TokenConfig, VerifyArgs};
use crate::verify::VerifyResult;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One key/value attribute of a transaction event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Typed event emitted while executing a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

/// Events of one message in a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLog {
    #[serde(default)]
    pub msg_index: u32,
    #[serde(default)]
    pub events: Vec<TxEvent>,
}

/// Chain-agnostic view of a fetched transaction, decoded once at the adapter boundary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTx {
    pub hash: String,
    pub height: u64,
    /// Execution status; nonzero means the transaction failed
    pub code: u32,
    /// Block time in unix seconds (zero when unknown)
    pub timestamp: u64,
    pub memo: String,
    pub logs: Vec<TxLog>,
}

/// Transport boundary to a chain's RPC endpoints
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_transaction_by_hash(&self, tx_hash: &str) -> RouterResult<ChainTx>;

    async fn get_latest_block_number(&self) -> RouterResult<u64>;

    async fn get_balance(&self, account: &str, denom: &str) -> RouterResult<U256>;

    /// Submit signed transaction bytes, returning the transaction hash
    async fn broadcast_tx(&self, tx_bytes: &[u8]) -> RouterResult<String>;
}

/// Capabilities of one chain adapter
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Balance of the chain's native coin, used for anti-DOS budget checks
    async fn get_balance(&self, account: &str) -> RouterResult<U256>;

    fn chain_config(&self) -> &ChainConfig;

    fn gateway_config(&self) -> &GatewayConfig;

    fn get_token_config(&self, token: &str) -> Option<Arc<TokenConfig>>;

    /// Token-specific router contract, falling back to the chain's router contract
    fn get_router_contract(&self, token: &str) -> String;

    fn is_valid_address(&self, address: &str) -> bool;

    async fn get_transaction_by_hash(&self, tx_hash: &str) -> RouterResult<ChainTx>;

    async fn get_latest_block_number(&self) -> RouterResult<u64>;

    async fn verify_transaction(
        &self,
        router: &dyn RouterLookup,
        tx_hash: &str,
        args: &VerifyArgs,
    ) -> VerifyResult;

    fn verify_msg_hash(&self, raw_tx: &[u8], msg_hashes: &[String]) -> RouterResult<()>;

    async fn send_transaction(&self, signed_tx: &[u8]) -> RouterResult<String>;
}

/// Chain, gateway and token state shared by chain adapters
#[derive(Debug)]
pub struct BridgeBase {
    chain_config: ChainConfig,
    gateway_config: GatewayConfig,
    /// Parsed form of `chain_config.chain_id`
    chain_id: U256,
    tokens: TokenConfigStore,
}

impl BridgeBase {
    /// Fails when the gateway has no API address or the chain ID is malformed
    pub fn new(chain_config: ChainConfig, gateway_config: GatewayConfig) -> RouterResult<Self> {
        if gateway_config.api_address.iter().all(|a| a.trim().is_empty()) {
            return Err(RouterError::Config(format!(
                "empty gateway 'api_address' for chain {}",
                chain_config.block_chain
            )));
        }
        let chain_id = parse_chain_id(&chain_config.chain_id).map_err(|e| {
            RouterError::Config(format!("chain {}: {}", chain_config.block_chain, e))
        })?;

        Ok(Self {
            chain_config,
            gateway_config,
            chain_id,
            tokens: TokenConfigStore::new(),
        })
    }

    pub fn chain_config(&self) -> &ChainConfig {
        &self.chain_config
    }

    pub fn gateway_config(&self) -> &GatewayConfig {
        &self.gateway_config
    }

    pub fn chain_id(&self) -> U256 {
        self.chain_id
    }

    pub fn set_token_config(&self, token: &str, config: TokenConfig) {
        self.tokens.set_token_config(token, config);
    }

    pub fn remove_token_config(&self, token: &str) {
        self.tokens.remove_token_config(token);
    }

    pub fn get_token_config(&self, token: &str) -> Option<Arc<TokenConfig>> {
        self.tokens.get_token_config(token)
    }

    pub fn get_router_contract(&self, token: &str) -> String {
        if !token.is_empty() {
            match self.get_token_config(token) {
                None => return String::new(),
                Some(cfg) if !cfg.router_contract.is_empty() => return cfg.router_contract.clone(),
                Some(_) => {}
            }
        }
        self.chain_config.router_contract.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_config() -> ChainConfig {
        ChainConfig {
            block_chain: "cosmoshub".to_string(),
            chain_id: "118".to_string(),
            confirmations: 10,
            initial_height: 0,
            router_contract: "cosmos1router".to_string(),
        }
    }

    fn token(router_contract: &str) -> TokenConfig {
        TokenConfig {
            token_id: "ATOM".to_string(),
            decimals: 6,
            contract_address: "uatom".to_string(),
            router_contract: router_contract.to_string(),
        }
    }

    #[test]
    fn test_empty_gateway_is_fatal() {
        let gateway = GatewayConfig {
            api_address: vec![],
        };
        assert!(matches!(
            BridgeBase::new(chain_config(), gateway),
            Err(RouterError::Config(_))
        ));

        let blank = GatewayConfig {
            api_address: vec!["  ".to_string()],
        };
        assert!(BridgeBase::new(chain_config(), blank).is_err());
    }

    #[test]
    fn test_malformed_chain_id_is_fatal() {
        let mut cfg = chain_config();
        cfg.chain_id = "cosmoshub-4".to_string();
        let gateway = GatewayConfig {
            api_address: vec!["http://localhost:1317".to_string()],
        };
        assert!(matches!(
            BridgeBase::new(cfg, gateway),
            Err(RouterError::Config(_))
        ));
    }

    #[test]
    fn test_router_contract_override() {
        let gateway = GatewayConfig {
            api_address: vec!["http://localhost:1317".to_string()],
        };
        let base = BridgeBase::new(chain_config(), gateway).unwrap();
        assert_eq!(base.chain_id(), U256::from(118u64));

        base.set_token_config("uatom", token(""));
        base.set_token_config("ustake", token("cosmos1stakerouter"));

        assert_eq!(base.get_router_contract(""), "cosmos1router");
        assert_eq!(base.get_router_contract("UATOM"), "cosmos1router");
        assert_eq!(base.get_router_contract("ustake"), "cosmos1stakerouter");
        assert_eq!(base.get_router_contract("unknown"), "");

        base.remove_token_config("ustake");
        assert_eq!(base.get_router_contract("ustake"), "");
    }
}
