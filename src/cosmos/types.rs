//! REST wire types of the Cosmos SDK gateway

use crate::bridge::{ChainTx, TxEvent, TxLog};
use crate::error::{RouterError, RouterResult};

use chrono::DateTime;
use serde::{de, Deserialize, Deserializer, Serialize};

pub const BROADCAST_MODE_SYNC: &str = "BROADCAST_MODE_SYNC";

/// Heights are JSON strings in gateway responses
fn u64_from_str_or_num<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Num(u64),
    }

    match StrOrNum::deserialize(deserializer)? {
        StrOrNum::Str(s) => s.parse().map_err(de::Error::custom),
        StrOrNum::Num(n) => Ok(n),
    }
}

/// Transaction body; only the memo is consumed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxBody {
    #[serde(default)]
    pub memo: String,
}

/// Polymorphic `tx` payload keyed by its type URL
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "@type")]
pub enum AnyTx {
    #[serde(rename = "/cosmos.tx.v1beta1.Tx")]
    Tx { body: TxBody },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxResponse {
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub height: u64,
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
    #[serde(default)]
    pub logs: Vec<TxLog>,
    /// Flat event list reported by gateways that leave `logs` empty
    #[serde(default)]
    pub events: Vec<TxEvent>,
    #[serde(default)]
    pub timestamp: String,
    pub tx: Option<AnyTx>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetTxResponse {
    pub tx_response: TxResponse,
}

impl GetTxResponse {
    /// Decode into the chain-agnostic transaction view
    pub fn into_chain_tx(self) -> RouterResult<ChainTx> {
        let resp = self.tx_response;
        let memo = match resp.tx {
            Some(AnyTx::Tx { body }) => body.memo,
            Some(AnyTx::Unsupported) => {
                return Err(RouterError::Decode(format!(
                    "tx {} has an unsupported tx type",
                    resp.txhash
                )))
            }
            None => return Err(RouterError::Decode(format!("tx {} has no body", resp.txhash))),
        };

        let timestamp = if resp.timestamp.is_empty() {
            0
        } else {
            DateTime::parse_from_rfc3339(&resp.timestamp)
                .map_err(|e| RouterError::Decode(format!("invalid tx timestamp: {}", e)))?
                .timestamp()
                .max(0) as u64
        };

        let logs = if resp.logs.is_empty() && !resp.events.is_empty() {
            vec![TxLog {
                msg_index: 0,
                events: resp.events,
            }]
        } else {
            resp.logs
        };

        Ok(ChainTx {
            hash: resp.txhash,
            height: resp.height,
            code: resp.code,
            timestamp,
            memo,
            logs,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub height: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestBlockResponse {
    pub block: Option<Block>,
    pub sdk_block: Option<Block>,
}

impl LatestBlockResponse {
    pub fn height(&self) -> RouterResult<u64> {
        self.sdk_block
            .as_ref()
            .or(self.block.as_ref())
            .map(|b| b.header.height)
            .ok_or_else(|| RouterError::Decode("latest block response has no block".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinAmount {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    pub balance: Option<CoinAmount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastTxRequest<'a> {
    pub tx_bytes: String,
    pub mode: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastTxResult {
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastTxResponse {
    pub tx_response: BroadcastTxResult,
}
