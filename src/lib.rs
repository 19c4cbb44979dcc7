//! Cross-chain swap router core
//!
//! Verifies swapout transactions on a source chain, computes the amount to
//! release on the destination chain, and builds and broadcasts Cosmos
//! transfers.

pub mod api;
pub mod bridge;
pub mod config;
pub mod cosmos;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod tx;
pub mod types;
pub mod value;
pub mod verify;

pub use error::{RouterError, RouterResult};
