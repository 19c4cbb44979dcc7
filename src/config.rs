//! Configuration management for the cross-chain router
//!
//! Loads configuration from TOML files with environment variable substitution
//! and wires the registry, value engine and chain bridges from it.

use crate::bridge::{BridgeBase, RetryPolicy};
use crate::cosmos::{CosmosBridge, CosmosParams, CosmosRestClient};
use crate::registry::{BigValueWhitelist, ConfigRegistry, Router, SwapConfigTable};
use crate::types::{parse_chain_id, ChainConfig, GatewayConfig, SwapConfig, SwapType, TokenConfig};
use crate::value::{to_bits, ValueEngine, SWAP_CONFIG_DECIMALS};

use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

lazy_static! {
    static ref ENV_VAR_RE: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub router: RouterSettings,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub balance_check: BalanceCheckConfig,
    pub chains: HashMap<String, ChainSettings>,
    #[serde(default)]
    pub swap_configs: Vec<SwapConfigEntry>,
    #[serde(default)]
    pub multichain_tokens: Vec<MultichainTokenEntry>,
    /// tokenID -> addresses exempt from the maximum swap value
    #[serde(default)]
    pub big_value_whitelist: HashMap<String, Vec<String>>,
    /// Destination chain ID -> base fee adjustment percent
    #[serde(default)]
    pub base_fee_percent: HashMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterSettings {
    pub instance_id: String,
    pub swap_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceCheckConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for BalanceCheckConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Cosmos,
}

fn default_kind() -> ChainKind {
    ChainKind::Cosmos
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainSettings {
    pub chain_id: String,
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: ChainKind,
    pub confirmations: u64,
    #[serde(default)]
    pub initial_height: u64,
    pub router_contract: String,
    pub prefix: String,
    pub coin_symbol: String,
    pub network_id: String,
    pub api_address: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub tokens: Vec<TokenSettings>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenSettings {
    /// Token address or denomination on this chain
    pub address: String,
    pub token_id: String,
    pub decimals: u8,
    #[serde(default)]
    pub router_contract: String,
}

/// Swap limits of one route, amounts written as human decimal strings
#[derive(Debug, Clone, Deserialize)]
pub struct SwapConfigEntry {
    pub token_id: String,
    pub to_chain_id: String,
    pub maximum_swap: String,
    pub minimum_swap: String,
    pub big_value_threshold: String,
    pub swap_fee_rate_per_million: u64,
    pub maximum_swap_fee: String,
    pub minimum_swap_fee: String,
}

impl SwapConfigEntry {
    fn amount(&self, field: &str, value: &str) -> Result<alloy_primitives::U256> {
        to_bits(value, SWAP_CONFIG_DECIMALS).with_context(|| {
            format!(
                "Swap config {} -> {}: invalid {} '{}'",
                self.token_id, self.to_chain_id, field, value
            )
        })
    }

    /// Convert to an 18-decimal swap config and check its consistency
    pub fn to_swap_config(&self) -> Result<SwapConfig> {
        let cfg = SwapConfig {
            maximum_swap: self.amount("maximum_swap", &self.maximum_swap)?,
            minimum_swap: self.amount("minimum_swap", &self.minimum_swap)?,
            big_value_threshold: self.amount("big_value_threshold", &self.big_value_threshold)?,
            swap_fee_rate_per_million: self.swap_fee_rate_per_million,
            maximum_swap_fee: self.amount("maximum_swap_fee", &self.maximum_swap_fee)?,
            minimum_swap_fee: self.amount("minimum_swap_fee", &self.minimum_swap_fee)?,
        };
        cfg.check().with_context(|| {
            format!("Swap config {} -> {}", self.token_id, self.to_chain_id)
        })?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MultichainTokenEntry {
    pub token_id: String,
    pub chain_id: String,
    pub address: String,
}

fn canonical_chain_id(chain_id: &str) -> Result<String> {
    Ok(parse_chain_id(chain_id)
        .with_context(|| format!("Invalid chain id '{}'", chain_id))?
        .to_string())
}

impl Settings {
    /// Load settings from the file named by `ROUTER_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("ROUTER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        self.swap_type()?;

        if self.enabled_chains().is_empty() {
            bail!("At least one chain must be enabled");
        }

        for (name, chain) in self.enabled_chains() {
            if chain.api_address.iter().all(|a| a.trim().is_empty()) {
                bail!("Chain {} has empty gateway 'api_address'", name);
            }
            canonical_chain_id(&chain.chain_id).with_context(|| format!("Chain {}", name))?;
            if chain.router_contract.is_empty() {
                warn!("Chain {} has no router contract - swapouts cannot match", name);
            }
        }

        self.swap_config_table()?;
        Ok(())
    }

    pub fn swap_type(&self) -> Result<SwapType> {
        self.router
            .swap_type
            .parse::<SwapType>()
            .with_context(|| "Invalid [router] swap_type")
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainSettings)> {
        let mut chains: Vec<_> = self.chains.iter().filter(|(_, c)| c.enabled).collect();
        chains.sort_by(|a, b| a.0.cmp(b.0));
        chains
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.balance_check.max_attempts,
            delay: Duration::from_millis(self.balance_check.delay_ms),
        }
    }

    /// Swap configs keyed by tokenID then canonical destination chain ID
    pub fn swap_config_table(&self) -> Result<SwapConfigTable> {
        let mut table = SwapConfigTable::new();
        for entry in &self.swap_configs {
            let to_chain_id = canonical_chain_id(&entry.to_chain_id)?;
            let cfg = entry.to_swap_config()?;
            table
                .entry(entry.token_id.clone())
                .or_default()
                .insert(to_chain_id, Arc::new(cfg));
        }
        Ok(table)
    }

    /// Populate a registry with swap configs and router parameters
    pub fn build_registry(&self) -> Result<Arc<ConfigRegistry>> {
        let registry = ConfigRegistry::new();
        registry.set_swap_configs(self.swap_config_table()?);

        let whitelist: BigValueWhitelist = self
            .big_value_whitelist
            .iter()
            .map(|(token_id, addrs)| (token_id.clone(), addrs.iter().cloned().collect()))
            .collect();
        registry.set_big_value_whitelist(whitelist);

        let percents = self
            .base_fee_percent
            .iter()
            .map(|(chain_id, percent)| Ok((canonical_chain_id(chain_id)?, *percent)))
            .collect::<Result<HashMap<_, _>>>()?;
        registry.set_base_fee_percents(percents);

        for entry in &self.multichain_tokens {
            registry.set_multichain_token(
                &entry.token_id,
                &canonical_chain_id(&entry.chain_id)?,
                &entry.address,
            );
        }

        Ok(Arc::new(registry))
    }

    /// Build the router with one bridge per enabled chain
    pub fn build_router(&self) -> Result<Arc<Router>> {
        let registry = self.build_registry()?;
        let engine = Arc::new(ValueEngine::new(self.swap_type()?, registry.clone()));
        let retry_policy = self.retry_policy();
        let router = Router::new(registry);

        for (name, chain) in self.enabled_chains() {
            let base = BridgeBase::new(
                ChainConfig {
                    block_chain: chain.name.clone(),
                    chain_id: chain.chain_id.clone(),
                    confirmations: chain.confirmations,
                    initial_height: chain.initial_height,
                    router_contract: chain.router_contract.clone(),
                },
                GatewayConfig {
                    api_address: chain.api_address.clone(),
                },
            )
            .with_context(|| format!("Chain {}", name))?;

            for token in &chain.tokens {
                base.set_token_config(
                    &token.address,
                    TokenConfig {
                        token_id: token.token_id.clone(),
                        decimals: token.decimals,
                        contract_address: token.address.clone(),
                        router_contract: token.router_contract.clone(),
                    },
                );
            }

            match chain.kind {
                ChainKind::Cosmos => {
                    let client = CosmosRestClient::new(
                        &chain.chain_id,
                        &chain.api_address,
                        Duration::from_secs(chain.request_timeout_secs),
                    )
                    .with_context(|| format!("Chain {}", name))?;
                    let params = CosmosParams {
                        prefix: chain.prefix.clone(),
                        coin_symbol: chain.coin_symbol.clone(),
                        network_id: chain.network_id.clone(),
                    };
                    let bridge = CosmosBridge::new(base, params, Arc::new(client), engine.clone())
                        .with_retry_policy(retry_policy);
                    router.add_bridge(Arc::new(bridge))?;
                }
            }
            info!("Chain {} initialized with {} tokens", name, chain.tokens.len());
        }

        Ok(Arc::new(router))
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR_RE
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
