//! Swap intent extraction from Cosmos bank transfers
//!
//! A swapout is a bank transfer to the router's MPC account whose memo is
//! `<bind address>:<destination chain ID>`.

use super::coins::parse_coins_normalized;
use crate::bridge::ChainTx;
use crate::error::{RouterError, RouterResult};
use crate::registry::RouterLookup;
use crate::types::{parse_chain_id, SwapTxInfo, SwapType};
use crate::verify::IntentParser;

use alloy_primitives::U256;
use tracing::debug;

pub const TRANSFER_EVENT: &str = "transfer";

/// Parse the memo into bind address and destination chain ID.
///
/// The memo must have exactly two `:`-separated fields, the destination chain
/// must have a registered bridge, and that bridge must accept the bind address.
pub fn parse_memo(router: &dyn RouterLookup, info: &mut SwapTxInfo, memo: &str) -> RouterResult<()> {
    let fields: Vec<&str> = memo.split(':').collect();
    if let [bind, chain_id] = fields.as_slice() {
        let to_chain_id = parse_chain_id(chain_id).map_err(|_| RouterError::TxWithWrongMemo)?;
        if let Some(dst_bridge) = router.get_bridge_by_chain_id(&to_chain_id.to_string()) {
            if dst_bridge.is_valid_address(bind) {
                info.bind = bind.to_string();
                info.to = bind.to_string();
                info.to_chain_id = to_chain_id;
                return Ok(());
            }
        }
    }
    debug!(txid = %info.hash, memo, "Wrong swapout memo");
    Err(RouterError::TxWithWrongMemo)
}

/// Extracts intents from transfers to one MPC account in one coin
#[derive(Debug, Clone)]
pub struct CosmosIntentParser {
    /// MPC account receiving swapouts
    router_contract: String,
    coin_symbol: String,
}

impl CosmosIntentParser {
    pub fn new(router_contract: &str, coin_symbol: &str) -> Self {
        Self {
            router_contract: router_contract.to_string(),
            coin_symbol: coin_symbol.to_string(),
        }
    }

    /// Sum every transfer of the coin to the MPC account.
    ///
    /// Transfer attributes come in (recipient, sender, amount) triples; events
    /// whose attribute count is not a multiple of three are skipped. The sender
    /// of the first counted transfer becomes `info.from`.
    pub fn parse_amount_total(&self, tx: &ChainTx, info: &mut SwapTxInfo) -> RouterResult<()> {
        let mpc = self.router_contract.to_lowercase();
        let mut total = U256::ZERO;

        let transfers = tx
            .logs
            .iter()
            .flat_map(|log| log.events.iter())
            .filter(|event| event.kind == TRANSFER_EVENT && event.attributes.len() % 3 == 0);

        for event in transfers {
            for triple in event.attributes.chunks_exact(3) {
                let (recipient, sender, amount) = (&triple[0], &triple[1], &triple[2]);
                if recipient.key != "recipient" || sender.key != "sender" || amount.key != "amount" {
                    continue;
                }
                if recipient.value.to_lowercase() != mpc {
                    continue;
                }
                let Ok(coins) = parse_coins_normalized(&amount.value) else {
                    continue;
                };
                let received = coins.amount_of(&self.coin_symbol);
                if received.is_zero() {
                    continue;
                }
                if info.from.is_empty() {
                    info.from = sender.value.clone();
                }
                total = total.saturating_add(received);
            }
        }

        if total.is_zero() {
            return Err(RouterError::TxWithWrongValue);
        }
        info.value = total;
        Ok(())
    }
}

impl IntentParser for CosmosIntentParser {
    fn supports(&self, swap_type: SwapType) -> bool {
        swap_type == SwapType::Erc20Swap
    }

    fn parse_intent(
        &self,
        router: &dyn RouterLookup,
        tx: &ChainTx,
        info: &mut SwapTxInfo,
    ) -> RouterResult<()> {
        parse_memo(router, info, &tx.memo)?;
        self.parse_amount_total(tx, info)?;
        info.token = self.coin_symbol.clone();
        info.tx_to = self.router_contract.clone();
        Ok(())
    }
}
