//! Native coin transfer transactions: build, sign-bytes, assemble, hash

use super::proto::{encode_any, ProtoWriter};
use crate::cosmos::address::decode_bech32;
use crate::cosmos::coins::{is_valid_denom, parse_coins_normalized, Coin, Coins};
use crate::error::{RouterError, RouterResult};
use crate::types::{u256_dec, AllExtras};

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";
pub const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";
pub const MAX_MEMO_CHARS: usize = 256;
pub const MAX_GAS_WANTED: u64 = (1 << 63) - 1;

const SIGN_MODE_DIRECT: u64 = 1;
const COMPRESSED_PUBKEY_LEN: usize = 33;
const SIGNATURE_LEN: usize = 64;

/// Parameters of an outbound native coin transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub coin_symbol: String,
    #[serde(default)]
    pub memo: String,
    #[serde(with = "u256_dec")]
    pub amount: U256,
    #[serde(default)]
    pub extras: AllExtras,
    /// Hex-encoded compressed secp256k1 public key of `from`
    pub public_key: String,
}

/// Transfer transaction with an empty signature slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub from: String,
    pub to: String,
    pub amount: Coin,
    pub memo: String,
    pub fee: Coins,
    pub gas_limit: u64,
    pub public_key: Vec<u8>,
    pub sequence: u64,
}

/// Fully assembled transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub signature: Vec<u8>,
}

fn invalid(msg: impl Into<String>) -> RouterError {
    RouterError::InvalidTx(msg.into())
}

fn decode_public_key(public_key: &str) -> RouterResult<Vec<u8>> {
    let key = hex::decode(public_key.trim_start_matches("0x"))
        .map_err(|e| invalid(format!("public key is not hex: {}", e)))?;
    if key.len() != COMPRESSED_PUBKEY_LEN || !matches!(key[0], 0x02 | 0x03) {
        return Err(invalid(format!(
            "public key must be a {}-byte compressed secp256k1 key",
            COMPRESSED_PUBKEY_LEN
        )));
    }
    Ok(key)
}

fn encode_coin(coin: &Coin) -> Vec<u8> {
    ProtoWriter::new()
        .string(1, &coin.denom)
        .string(2, &coin.amount.to_string())
        .finish()
}

/// Build and structurally validate an unsigned transfer.
///
/// `extras` must carry the fee, gas limit and sequence.
pub fn build_tx(req: &TransferRequest) -> RouterResult<UnsignedTx> {
    let fee = req
        .extras
        .fee
        .as_deref()
        .ok_or_else(|| invalid("missing fee"))?;
    let fee = parse_coins_normalized(fee)?;
    let gas_limit = req.extras.gas.ok_or_else(|| invalid("missing gas limit"))?;
    let sequence = req.extras.sequence.ok_or_else(|| invalid("missing sequence"))?;
    let public_key = decode_public_key(&req.public_key)?;

    let tx = UnsignedTx {
        from: req.from.clone(),
        to: req.to.clone(),
        amount: Coin::new(&req.coin_symbol, req.amount),
        memo: req.memo.clone(),
        fee,
        gas_limit,
        public_key,
        sequence,
    };
    tx.validate_basic()?;
    Ok(tx)
}

impl UnsignedTx {
    pub fn validate_basic(&self) -> RouterResult<()> {
        decode_bech32(&self.from).map_err(|e| invalid(format!("invalid from address: {}", e)))?;
        decode_bech32(&self.to).map_err(|e| invalid(format!("invalid to address: {}", e)))?;
        if !is_valid_denom(&self.amount.denom) {
            return Err(invalid(format!("invalid denom '{}'", self.amount.denom)));
        }
        if self.amount.amount.is_zero() {
            return Err(invalid("send amount must be positive"));
        }
        if self.memo.chars().count() > MAX_MEMO_CHARS {
            return Err(invalid(format!(
                "memo longer than {} characters",
                MAX_MEMO_CHARS
            )));
        }
        if self.gas_limit > MAX_GAS_WANTED {
            return Err(invalid(format!("gas limit {} too large", self.gas_limit)));
        }
        if self.public_key.len() != COMPRESSED_PUBKEY_LEN {
            return Err(invalid("missing signer public key"));
        }
        Ok(())
    }

    /// `TxBody` with a single `MsgSend`
    pub fn body_bytes(&self) -> Vec<u8> {
        let msg = ProtoWriter::new()
            .string(1, &self.from)
            .string(2, &self.to)
            .message(3, &encode_coin(&self.amount))
            .finish();
        let any = encode_any(MSG_SEND_TYPE_URL, &msg);
        ProtoWriter::new().message(1, &any).string(2, &self.memo).finish()
    }

    /// `AuthInfo` with one direct-mode signer and the fee
    pub fn auth_info_bytes(&self) -> Vec<u8> {
        let pub_key = ProtoWriter::new().bytes(1, &self.public_key).finish();
        let pub_key = encode_any(SECP256K1_PUBKEY_TYPE_URL, &pub_key);
        let single = ProtoWriter::new().uint64(1, SIGN_MODE_DIRECT).finish();
        let mode_info = ProtoWriter::new().message(1, &single).finish();
        let signer_info = ProtoWriter::new()
            .message(1, &pub_key)
            .message(2, &mode_info)
            .uint64(3, self.sequence)
            .finish();

        let mut fee = ProtoWriter::new();
        for coin in self.fee.iter() {
            fee.message(1, &encode_coin(coin));
        }
        let fee = fee.uint64(2, self.gas_limit).finish();

        ProtoWriter::new()
            .message(1, &signer_info)
            .message(2, &fee)
            .finish()
    }

    /// Bytes the signer must sign (`SignDoc`)
    pub fn sign_bytes(&self, chain_id: &str, account_number: u64) -> Vec<u8> {
        ProtoWriter::new()
            .bytes(1, &self.body_bytes())
            .bytes(2, &self.auth_info_bytes())
            .string(3, chain_id)
            .uint64(4, account_number)
            .finish()
    }

    pub fn with_signature(self, signature: Vec<u8>) -> RouterResult<SignedTx> {
        if signature.len() != SIGNATURE_LEN {
            return Err(RouterError::Signer(format!(
                "expected {}-byte signature, got {}",
                SIGNATURE_LEN,
                signature.len()
            )));
        }
        Ok(SignedTx {
            body_bytes: self.body_bytes(),
            auth_info_bytes: self.auth_info_bytes(),
            signature,
        })
    }
}

impl SignedTx {
    /// `TxRaw` encoding submitted to the chain
    pub fn tx_bytes(&self) -> Vec<u8> {
        ProtoWriter::new()
            .bytes(1, &self.body_bytes)
            .bytes(2, &self.auth_info_bytes)
            .repeated_bytes(3, &self.signature)
            .finish()
    }

    /// Uppercase hex SHA-256 of the transaction bytes
    pub fn tx_hash(&self) -> String {
        hex::encode_upper(Sha256::digest(self.tx_bytes()))
    }
}
