//! Router lookup - resolves bridges by chain ID and tokens across chains

use super::ConfigRegistry;
use crate::bridge::Bridge;
use crate::error::RouterResult;
use crate::types::parse_chain_id;

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Cross-chain lookups consumed by the verification path
pub trait RouterLookup: Send + Sync {
    /// Bridge handling `chain_id`, if one is registered
    fn get_bridge_by_chain_id(&self, chain_id: &str) -> Option<Arc<dyn Bridge>>;

    /// Address of the logical asset `token_id` on `chain_id`
    fn get_cached_multichain_token(&self, token_id: &str, chain_id: &str) -> Option<String>;

    fn is_in_big_value_whitelist(&self, token_id: &str, address: &str) -> bool;

    /// Base fee adjustment percent of the destination chain (0 when unset)
    fn get_base_fee_percent(&self, chain_id: &str) -> i64;
}

/// In-memory router backed by the config registry
pub struct Router {
    /// Bridges indexed by chain ID
    bridges: DashMap<String, Arc<dyn Bridge>>,
    /// Shared router configuration
    registry: Arc<ConfigRegistry>,
}

impl Router {
    pub fn new(registry: Arc<ConfigRegistry>) -> Self {
        Self {
            bridges: DashMap::new(),
            registry,
        }
    }

    /// Register the bridge under the canonical decimal form of its chain ID
    pub fn add_bridge(&self, bridge: Arc<dyn Bridge>) -> RouterResult<()> {
        let chain = bridge.chain_config();
        let chain_id = parse_chain_id(&chain.chain_id)?.to_string();
        info!(
            "Registered bridge for chain {} (ID: {})",
            chain.block_chain, chain_id
        );
        self.bridges.insert(chain_id, bridge);
        Ok(())
    }

    /// Get all registered chain IDs
    pub fn chain_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.bridges.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl RouterLookup for Router {
    fn get_bridge_by_chain_id(&self, chain_id: &str) -> Option<Arc<dyn Bridge>> {
        self.bridges.get(chain_id).map(|b| b.value().clone())
    }

    fn get_cached_multichain_token(&self, token_id: &str, chain_id: &str) -> Option<String> {
        self.registry.get_cached_multichain_token(token_id, chain_id)
    }

    fn is_in_big_value_whitelist(&self, token_id: &str, address: &str) -> bool {
        self.registry.is_in_big_value_whitelist(token_id, address)
    }

    fn get_base_fee_percent(&self, chain_id: &str) -> i64 {
        self.registry.get_base_fee_percent(chain_id)
    }
}
