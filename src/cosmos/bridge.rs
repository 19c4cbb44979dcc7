//! `Bridge` implementation for Cosmos SDK chains

use super::address;
use super::parser::CosmosIntentParser;
use super::CosmosParams;
use crate::bridge::{check_native_balance, Bridge, BridgeBase, ChainRpc, ChainTx, RetryPolicy};
use crate::error::{RouterError, RouterResult};
use crate::registry::RouterLookup;
use crate::tx::{build_tx, TransferRequest, TxSigner};
use crate::types::{ChainConfig, GatewayConfig, TokenConfig, VerifyArgs};
use crate::value::ValueEngine;
use crate::verify::{SwapVerifier, VerifyResult};

use alloy_primitives::U256;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Cosmos chain adapter
pub struct CosmosBridge {
    base: BridgeBase,
    params: CosmosParams,
    rpc: Arc<dyn ChainRpc>,
    engine: Arc<ValueEngine>,
    parser: CosmosIntentParser,
    /// Retry schedule of the pre-sign balance check
    retry_policy: RetryPolicy,
}

impl CosmosBridge {
    pub fn new(
        base: BridgeBase,
        params: CosmosParams,
        rpc: Arc<dyn ChainRpc>,
        engine: Arc<ValueEngine>,
    ) -> Self {
        let parser = CosmosIntentParser::new(&base.chain_config().router_contract, &params.coin_symbol);
        Self {
            base,
            params,
            rpc,
            engine,
            parser,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn base(&self) -> &BridgeBase {
        &self.base
    }

    /// Build, sign and broadcast a native coin transfer, returning the tx hash
    pub async fn build_and_broadcast(
        &self,
        req: &TransferRequest,
        signer: &dyn TxSigner,
    ) -> RouterResult<String> {
        let account_number = req
            .extras
            .account_number
            .ok_or_else(|| RouterError::InvalidTx("missing account number".to_string()))?;

        let unsigned = build_tx(req)?;

        // The signer must cover the fee and, for native transfers, the amount
        let native = self.params.coin_symbol.as_str();
        let mut need = unsigned.fee.amount_of(native);
        if unsigned.amount.denom == native {
            need = need.saturating_add(unsigned.amount.amount);
        }
        check_native_balance(self, &req.from, need, &self.retry_policy).await?;

        let sign_bytes = unsigned.sign_bytes(&self.params.network_id, account_number);
        let signature = signer.sign(&sign_bytes).await?;
        let signed = unsigned.with_signature(signature)?;

        let local_hash = signed.tx_hash();
        let txhash = self.rpc.broadcast_tx(&signed.tx_bytes()).await?;
        if !txhash.eq_ignore_ascii_case(&local_hash) {
            warn!(
                local = %local_hash,
                remote = %txhash,
                "Broadcast tx hash differs from local hash"
            );
        }

        info!(
            chain_id = %self.base.chain_config().chain_id,
            txhash = %txhash,
            to = %req.to,
            amount = %req.amount,
            "Broadcast transfer tx"
        );
        Ok(txhash)
    }
}

#[async_trait]
impl Bridge for CosmosBridge {
    async fn get_balance(&self, account: &str) -> RouterResult<U256> {
        self.rpc.get_balance(account, &self.params.coin_symbol).await
    }

    fn chain_config(&self) -> &ChainConfig {
        self.base.chain_config()
    }

    fn gateway_config(&self) -> &GatewayConfig {
        self.base.gateway_config()
    }

    fn get_token_config(&self, token: &str) -> Option<Arc<TokenConfig>> {
        self.base.get_token_config(token)
    }

    fn get_router_contract(&self, token: &str) -> String {
        self.base.get_router_contract(token)
    }

    fn is_valid_address(&self, address: &str) -> bool {
        address::is_valid_address(address, &self.params.prefix)
    }

    async fn get_transaction_by_hash(&self, tx_hash: &str) -> RouterResult<ChainTx> {
        self.rpc.get_transaction_by_hash(tx_hash).await
    }

    async fn get_latest_block_number(&self) -> RouterResult<u64> {
        self.rpc.get_latest_block_number().await
    }

    async fn verify_transaction(
        &self,
        router: &dyn RouterLookup,
        tx_hash: &str,
        args: &VerifyArgs,
    ) -> VerifyResult {
        SwapVerifier {
            base: &self.base,
            rpc: self.rpc.as_ref(),
            parser: &self.parser,
            engine: &self.engine,
            router,
        }
        .verify(tx_hash, args)
        .await
    }

    fn verify_msg_hash(&self, _raw_tx: &[u8], _msg_hashes: &[String]) -> RouterResult<()> {
        Err(RouterError::NotImplemented)
    }

    async fn send_transaction(&self, signed_tx: &[u8]) -> RouterResult<String> {
        self.rpc.broadcast_tx(signed_tx).await
    }
}
