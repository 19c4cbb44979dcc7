//! Outbound transaction construction and signing boundary

mod builder;
mod proto;

pub use builder::{
    build_tx, SignedTx, TransferRequest, UnsignedTx, MAX_GAS_WANTED, MAX_MEMO_CHARS,
    MSG_SEND_TYPE_URL, SECP256K1_PUBKEY_TYPE_URL,
};

use crate::error::RouterResult;

use async_trait::async_trait;

/// External signer holding the MPC key
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TxSigner: Send + Sync {
    /// Sign `sign_bytes`, returning the 64-byte compact signature
    async fn sign(&self, sign_bytes: &[u8]) -> RouterResult<Vec<u8>>;
}
