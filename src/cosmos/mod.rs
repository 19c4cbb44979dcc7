//! Cosmos SDK chain adapter
//!
//! This module provides:
//! - Bech32 address validation and coin string parsing
//! - A REST gateway client implementing `ChainRpc`
//! - Swap intent extraction from bank transfers
//! - `CosmosBridge`, the `Bridge` implementation for Cosmos chains

pub mod address;
pub mod bridge;
pub mod client;
pub mod coins;
pub mod parser;
pub mod types;

pub use bridge::CosmosBridge;
pub use client::CosmosRestClient;
pub use parser::CosmosIntentParser;

use serde::{Deserialize, Serialize};

/// Chain-specific parameters of a Cosmos SDK chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosParams {
    /// Bech32 account prefix
    pub prefix: String,
    /// Native coin denomination swapouts are paid in
    pub coin_symbol: String,
    /// Chain-id string signed into transactions, e.g. `cosmoshub-4`
    pub network_id: String,
}
