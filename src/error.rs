//! Error types for the cross-chain router core

use thiserror::Error;

/// Main error type for the router core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("tx not found")]
    TxNotFound,

    #[error("tx with wrong status")]
    TxWithWrongStatus,

    #[error("tx not stable")]
    TxNotStable,

    #[error("tx before initial block height")]
    TxBeforeInitialHeight,

    #[error("tx with wrong memo")]
    TxWithWrongMemo,

    #[error("tx with wrong value")]
    TxWithWrongValue,

    #[error("tx with wrong sender")]
    TxWithWrongSender,

    #[error("wrong bind address")]
    WrongBindAddress,

    #[error("miss token config")]
    MissTokenConfig,

    #[error("no bridge for chain id")]
    NoBridgeForChainID,

    #[error("swap type not supported in this chain")]
    SwapTypeNotSupported,

    #[error("not implemented")]
    NotImplemented,

    #[error("broadcast tx failed on all endpoints")]
    BroadcastTx,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("RPC error from {endpoint}: {message}")]
    Rpc { endpoint: String, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid transaction: {0}")]
    InvalidTx(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: String, need: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RouterError {
    /// Check if the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RouterError::TxNotFound
                | RouterError::TxNotStable
                | RouterError::Rpc { .. }
                | RouterError::BroadcastTx
        )
    }

    /// Stable label for metrics and API responses
    pub fn kind(&self) -> &'static str {
        match self {
            RouterError::TxNotFound => "tx_not_found",
            RouterError::TxWithWrongStatus => "tx_with_wrong_status",
            RouterError::TxNotStable => "tx_not_stable",
            RouterError::TxBeforeInitialHeight => "tx_before_initial_height",
            RouterError::TxWithWrongMemo => "tx_with_wrong_memo",
            RouterError::TxWithWrongValue => "tx_with_wrong_value",
            RouterError::TxWithWrongSender => "tx_with_wrong_sender",
            RouterError::WrongBindAddress => "wrong_bind_address",
            RouterError::MissTokenConfig => "miss_token_config",
            RouterError::NoBridgeForChainID => "no_bridge_for_chain_id",
            RouterError::SwapTypeNotSupported => "swap_type_not_supported",
            RouterError::NotImplemented => "not_implemented",
            RouterError::BroadcastTx => "broadcast_tx",
            RouterError::Config(_) => "config",
            RouterError::Rpc { .. } => "rpc",
            RouterError::Decode(_) => "decode",
            RouterError::InvalidTx(_) => "invalid_tx",
            RouterError::Signer(_) => "signer",
            RouterError::InsufficientBalance { .. } => "insufficient_balance",
            RouterError::Internal(_) => "internal",
        }
    }
}

/// Result type for router operations
pub type RouterResult<T> = Result<T, RouterError>;
