//! Configuration registry - in-memory, concurrency-safe config stores
//!
//! This module provides:
//! - Per-chain token config stores with fine-grained insert/delete
//! - The process-wide swap config table, replaced wholesale on reload
//! - Router parameters (big-value whitelist, base fee percents, multichain tokens)

pub mod router;

pub use router::{Router, RouterLookup};

use crate::types::{SwapConfig, TokenConfig};

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Swap configs keyed by tokenID, then by destination chain ID
pub type SwapConfigTable = HashMap<String, HashMap<String, Arc<SwapConfig>>>;

/// Big-value whitelist keyed by tokenID
pub type BigValueWhitelist = HashMap<String, HashSet<String>>;

/// Token configs of one chain, keyed by lowercased token address
#[derive(Debug, Default)]
pub struct TokenConfigStore {
    tokens: DashMap<String, Arc<TokenConfig>>,
}

impl TokenConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token_config(&self, token: &str, config: TokenConfig) {
        self.tokens.insert(token.to_lowercase(), Arc::new(config));
    }

    pub fn remove_token_config(&self, token: &str) {
        self.tokens.remove(&token.to_lowercase());
    }

    pub fn get_token_config(&self, token: &str) -> Option<Arc<TokenConfig>> {
        self.tokens
            .get(&token.to_lowercase())
            .map(|entry| entry.value().clone())
    }
}

/// Process-wide router configuration shared by every bridge and the value engine
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    /// Whole-table swap configs; readers clone the inner Arc
    swap_configs: RwLock<Arc<SwapConfigTable>>,
    /// tokenID -> lowercased whitelisted addresses
    big_value_whitelist: RwLock<Arc<BigValueWhitelist>>,
    /// Destination chain ID -> base fee percent
    base_fee_percents: RwLock<Arc<HashMap<String, i64>>>,
    /// (tokenID, chainID) -> token address on that chain
    multichain_tokens: DashMap<(String, String), String>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the swap config table in one pointer swap
    pub fn set_swap_configs(&self, table: SwapConfigTable) {
        let routes: usize = table.values().map(|m| m.len()).sum();
        let table = Arc::new(table);
        *self
            .swap_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner) = table;
        info!("Swap configs replaced ({} routes)", routes);
    }

    /// Snapshot of the current swap config table
    pub fn swap_configs(&self) -> Arc<SwapConfigTable> {
        self.swap_configs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_swap_config(&self, token_id: &str, to_chain_id: &str) -> Option<Arc<SwapConfig>> {
        self.swap_configs()
            .get(token_id)
            .and_then(|routes| routes.get(to_chain_id))
            .cloned()
    }

    /// Replace the big-value whitelist; addresses are matched case-insensitively
    pub fn set_big_value_whitelist(&self, whitelist: BigValueWhitelist) {
        let normalized: BigValueWhitelist = whitelist
            .into_iter()
            .map(|(token_id, addrs)| {
                let addrs = addrs.into_iter().map(|a| a.to_lowercase()).collect();
                (token_id, addrs)
            })
            .collect();
        *self
            .big_value_whitelist
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(normalized);
    }

    pub fn is_in_big_value_whitelist(&self, token_id: &str, address: &str) -> bool {
        if address.is_empty() {
            return false;
        }
        let whitelist = self
            .big_value_whitelist
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        whitelist
            .get(token_id)
            .map(|addrs| addrs.contains(&address.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn set_base_fee_percents(&self, percents: HashMap<String, i64>) {
        *self
            .base_fee_percents
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(percents);
    }

    pub fn get_base_fee_percent(&self, chain_id: &str) -> i64 {
        self.base_fee_percents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(chain_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn set_multichain_token(&self, token_id: &str, chain_id: &str, token: &str) {
        self.multichain_tokens
            .insert((token_id.to_string(), chain_id.to_string()), token.to_string());
    }

    /// Token address of `token_id` on `chain_id`, if known
    pub fn get_cached_multichain_token(&self, token_id: &str, chain_id: &str) -> Option<String> {
        self.multichain_tokens
            .get(&(token_id.to_string(), chain_id.to_string()))
            .map(|entry| entry.value().clone())
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn token(token_id: &str, decimals: u8) -> TokenConfig {
        TokenConfig {
            token_id: token_id.to_string(),
            decimals,
            contract_address: "uatom".to_string(),
            router_contract: String::new(),
        }
    }

    fn swap_config(minimum: u64) -> SwapConfig {
        SwapConfig {
            maximum_swap: U256::from(1_000_000u64),
            minimum_swap: U256::from(minimum),
            big_value_threshold: U256::from(500_000u64),
            swap_fee_rate_per_million: 1_000,
            maximum_swap_fee: U256::from(50u64),
            minimum_swap_fee: U256::from(10u64),
        }
    }

    fn table(entries: &[(&str, &str, u64)]) -> SwapConfigTable {
        let mut table = SwapConfigTable::new();
        for (token_id, chain_id, minimum) in entries {
            table
                .entry(token_id.to_string())
                .or_default()
                .insert(chain_id.to_string(), Arc::new(swap_config(*minimum)));
        }
        table
    }

    #[test]
    fn test_token_config_case_insensitive() {
        let store = TokenConfigStore::new();
        store.set_token_config("UAtom", token("ATOM", 6));

        assert_eq!(store.get_token_config("uatom").unwrap().decimals, 6);
        assert_eq!(store.get_token_config("UATOM").unwrap().token_id, "ATOM");

        store.remove_token_config("UATOM");
        assert!(store.get_token_config("uatom").is_none());
    }

    #[test]
    fn test_swap_configs_replaced_wholesale() {
        let registry = ConfigRegistry::new();
        registry.set_swap_configs(table(&[("ATOM", "137", 100), ("ATOM", "56", 200)]));
        assert!(registry.get_swap_config("ATOM", "137").is_some());
        assert!(registry.get_swap_config("ATOM", "1").is_none());
        assert!(registry.get_swap_config("USDC", "137").is_none());

        // Reload drops routes absent from the new table
        registry.set_swap_configs(table(&[("ATOM", "56", 300)]));
        assert!(registry.get_swap_config("ATOM", "137").is_none());
        assert_eq!(
            registry.get_swap_config("ATOM", "56").unwrap().minimum_swap,
            U256::from(300u64)
        );
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let registry = ConfigRegistry::new();
        registry.set_swap_configs(table(&[("ATOM", "137", 100)]));
        let snapshot = registry.swap_configs();

        registry.set_swap_configs(SwapConfigTable::new());
        assert!(snapshot.get("ATOM").is_some());
        assert!(registry.get_swap_config("ATOM", "137").is_none());
    }

    #[test]
    fn test_concurrent_readers_see_whole_tables() {
        let registry = Arc::new(ConfigRegistry::new());
        registry.set_swap_configs(table(&[("ATOM", "137", 100), ("ATOM", "56", 100)]));

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let snapshot = registry.swap_configs();
                        let routes = snapshot.get("ATOM").map(|r| r.len()).unwrap_or(0);
                        // Old table has two routes, new table has two routes with a new minimum
                        assert_eq!(routes, 2);
                        let minimums: HashSet<U256> = snapshot["ATOM"]
                            .values()
                            .map(|c| c.minimum_swap)
                            .collect();
                        assert_eq!(minimums.len(), 1);
                    }
                })
            })
            .collect();

        for i in 0..100u64 {
            registry.set_swap_configs(table(&[("ATOM", "137", 100 + i), ("ATOM", "56", 100 + i)]));
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn test_whitelist_and_base_fee() {
        let registry = ConfigRegistry::new();
        let mut whitelist = BigValueWhitelist::new();
        whitelist.insert(
            "ATOM".to_string(),
            ["Cosmos1Whale".to_string()].into_iter().collect(),
        );
        registry.set_big_value_whitelist(whitelist);

        assert!(registry.is_in_big_value_whitelist("ATOM", "cosmos1whale"));
        assert!(!registry.is_in_big_value_whitelist("USDC", "cosmos1whale"));
        assert!(!registry.is_in_big_value_whitelist("ATOM", ""));

        registry.set_base_fee_percents([("137".to_string(), 25)].into_iter().collect());
        assert_eq!(registry.get_base_fee_percent("137"), 25);
        assert_eq!(registry.get_base_fee_percent("56"), 0);
    }

    #[test]
    fn test_multichain_token_lookup() {
        let registry = ConfigRegistry::new();
        registry.set_multichain_token("ATOM", "137", "0xatom");
        registry.set_multichain_token("ATOM", "56", "");

        assert_eq!(
            registry.get_cached_multichain_token("ATOM", "137").as_deref(),
            Some("0xatom")
        );
        assert!(registry.get_cached_multichain_token("ATOM", "56").is_none());
        assert!(registry.get_cached_multichain_token("USDC", "137").is_none());
    }
}
