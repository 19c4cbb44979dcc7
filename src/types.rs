//! Core data model shared by every chain adapter

use crate::error::{RouterError, RouterResult};

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Router operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapType {
    #[serde(rename = "erc20swap")]
    Erc20Swap,
    #[serde(rename = "nftswap")]
    NftSwap,
    #[serde(rename = "anycallswap")]
    AnyCallSwap,
}

impl SwapType {
    /// Whether fee and value rules apply in this mode
    pub fn is_value_sensitive(&self) -> bool {
        matches!(self, SwapType::Erc20Swap)
    }
}

impl FromStr for SwapType {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "erc20swap" => Ok(SwapType::Erc20Swap),
            "nftswap" => Ok(SwapType::NftSwap),
            "anycallswap" => Ok(SwapType::AnyCallSwap),
            other => Err(RouterError::Config(format!(
                "invalid router swap type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SwapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwapType::Erc20Swap => "ERC20SwapType",
            SwapType::NftSwap => "NFTSwapType",
            SwapType::AnyCallSwap => "AnyCallSwapType",
        };
        f.write_str(name)
    }
}

/// Per (chain, token) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token_id: String,
    pub decimals: u8,
    pub contract_address: String,
    #[serde(default)]
    pub router_contract: String,
}

/// Swap limits and fees for one (tokenID, destination chain) route.
///
/// Every amount is an 18-decimal fixed-point integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapConfig {
    pub maximum_swap: U256,
    pub minimum_swap: U256,
    pub big_value_threshold: U256,
    pub swap_fee_rate_per_million: u64,
    pub maximum_swap_fee: U256,
    pub minimum_swap_fee: U256,
}

impl SwapConfig {
    /// Reject routes whose limits contradict each other
    pub fn check(&self) -> RouterResult<()> {
        if self.minimum_swap > self.maximum_swap {
            return Err(RouterError::Config(format!(
                "minimum swap {} is greater than maximum swap {}",
                self.minimum_swap, self.maximum_swap
            )));
        }
        if self.minimum_swap_fee > self.maximum_swap_fee {
            return Err(RouterError::Config(format!(
                "minimum swap fee {} is greater than maximum swap fee {}",
                self.minimum_swap_fee, self.maximum_swap_fee
            )));
        }
        if self.swap_fee_rate_per_million >= 1_000_000 {
            return Err(RouterError::Config(format!(
                "swap fee rate {} per million is not below 100%",
                self.swap_fee_rate_per_million
            )));
        }
        if self.swap_fee_rate_per_million > 0 && self.minimum_swap <= self.minimum_swap_fee {
            return Err(RouterError::Config(format!(
                "minimum swap {} must be greater than minimum swap fee {}",
                self.minimum_swap, self.minimum_swap_fee
            )));
        }
        Ok(())
    }
}

/// Static per-chain identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub block_chain: String,
    pub chain_id: String,
    pub confirmations: u64,
    #[serde(default)]
    pub initial_height: u64,
    pub router_contract: String,
}

/// Ordered set of RPC endpoints for a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub api_address: Vec<String>,
}

/// Arguments of a verification request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyArgs {
    pub swap_type: SwapType,
    #[serde(default)]
    pub log_index: usize,
    #[serde(default)]
    pub allow_unstable: bool,
}

/// Chain-specific knobs for building an outbound transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllExtras {
    pub fee: Option<String>,
    pub gas: Option<u64>,
    pub sequence: Option<u64>,
    pub account_number: Option<u64>,
}

/// Canonical swap intent extracted from a source chain transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTxInfo {
    pub swap_type: SwapType,
    pub hash: String,
    pub log_index: usize,
    #[serde(with = "u256_dec")]
    pub from_chain_id: U256,
    #[serde(with = "u256_dec")]
    pub to_chain_id: U256,
    pub from: String,
    pub to: String,
    pub tx_to: String,
    pub bind: String,
    #[serde(with = "u256_dec")]
    pub value: U256,
    pub height: u64,
    pub timestamp: u64,
    pub token: String,
    pub token_id: String,
}

impl SwapTxInfo {
    /// Start a fresh intent for one verification attempt
    pub fn new(swap_type: SwapType, hash: &str, log_index: usize, from_chain_id: U256) -> Self {
        Self {
            swap_type,
            hash: hash.to_string(),
            log_index,
            from_chain_id,
            to_chain_id: U256::ZERO,
            from: String::new(),
            to: String::new(),
            tx_to: String::new(),
            bind: String::new(),
            value: U256::ZERO,
            height: 0,
            timestamp: 0,
            token: String::new(),
            token_id: String::new(),
        }
    }
}

/// Parse a canonical decimal chain ID
pub fn parse_chain_id(s: &str) -> RouterResult<U256> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RouterError::Decode(format!("invalid chain id '{}'", s)));
    }
    U256::from_str_radix(s, 10).map_err(|e| RouterError::Decode(format!("invalid chain id '{}': {}", s, e)))
}

/// Serialize big integers as decimal strings
pub(crate) mod u256_dec {
    use alloy_primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_chain_id(&s).map_err(de::Error::custom)
    }
}
