//! Swap verification state machine
//!
//! A verification moves through four stages in order:
//! fetching, checking stability, parsing the intent, validating cross-chain.
//! The first failing stage ends the attempt with a typed `Rejection` carrying
//! the partially filled swap info for diagnostics.

use crate::bridge::{BridgeBase, ChainRpc, ChainTx};
use crate::error::{RouterError, RouterResult};
use crate::metrics;
use crate::registry::RouterLookup;
use crate::types::{SwapTxInfo, SwapType, VerifyArgs};
use crate::value::ValueEngine;

use serde::Serialize;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Stage at which a verification attempt stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStage {
    Fetching,
    CheckingStability,
    ParsingIntent,
    ValidatingCrossChain,
}

impl fmt::Display for VerifyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerifyStage::Fetching => "fetching",
            VerifyStage::CheckingStability => "checking_stability",
            VerifyStage::ParsingIntent => "parsing_intent",
            VerifyStage::ValidatingCrossChain => "validating_cross_chain",
        };
        f.write_str(name)
    }
}

/// Failed verification with the intent extracted so far
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("verify swap failed at {stage}: {error}")]
pub struct Rejection {
    pub stage: VerifyStage,
    pub error: RouterError,
    pub info: Box<SwapTxInfo>,
}

pub type VerifyResult = Result<SwapTxInfo, Rejection>;

/// Chain-specific extraction of the swap intent from a fetched transaction
pub trait IntentParser: Send + Sync {
    /// Swap modes this parser can extract
    fn supports(&self, swap_type: SwapType) -> bool;

    /// Fill destination, recipient, sender, value and token fields of `info`
    fn parse_intent(
        &self,
        router: &dyn RouterLookup,
        tx: &ChainTx,
        info: &mut SwapTxInfo,
    ) -> RouterResult<()>;
}

/// One verification attempt over a chain adapter's parts
pub struct SwapVerifier<'a> {
    pub base: &'a BridgeBase,
    pub rpc: &'a dyn ChainRpc,
    pub parser: &'a dyn IntentParser,
    pub engine: &'a ValueEngine,
    pub router: &'a dyn RouterLookup,
}

type StageResult<T> = Result<T, (VerifyStage, RouterError)>;

impl SwapVerifier<'_> {
    pub async fn verify(&self, tx_hash: &str, args: &VerifyArgs) -> VerifyResult {
        let start = Instant::now();
        let chain_id = self.base.chain_config().chain_id.as_str();
        let mut info = SwapTxInfo::new(args.swap_type, tx_hash, args.log_index, self.base.chain_id());

        let result = self.run(&mut info, args).await;
        let latency = start.elapsed().as_secs_f64();

        match result {
            Ok(()) => {
                metrics::record_verification(chain_id, "accepted", latency);
                if !args.allow_unstable {
                    info!(
                        identifier = %info.token_id,
                        from = %info.from,
                        bind = %info.bind,
                        value = %info.value,
                        txid = %info.hash,
                        height = info.height,
                        timestamp = info.timestamp,
                        from_chain_id = %info.from_chain_id,
                        to_chain_id = %info.to_chain_id,
                        "Swap tx verified and stable"
                    );
                }
                Ok(info)
            }
            Err((stage, error)) => {
                metrics::record_verification(chain_id, error.kind(), latency);
                debug!(txid = tx_hash, %stage, %error, "Swap tx rejected");
                Err(Rejection {
                    stage,
                    error,
                    info: Box::new(info),
                })
            }
        }
    }

    async fn run(&self, info: &mut SwapTxInfo, args: &VerifyArgs) -> StageResult<()> {
        if !self.parser.supports(args.swap_type) {
            return Err((VerifyStage::Fetching, RouterError::SwapTypeNotSupported));
        }

        let tx = self
            .rpc
            .get_transaction_by_hash(&info.hash)
            .await
            .map_err(|e| {
                debug!(txid = %info.hash, error = %e, "Failed to fetch swap tx");
                (VerifyStage::Fetching, RouterError::TxNotFound)
            })?;

        info.height = tx.height;
        info.timestamp = tx.timestamp;
        self.check_tx_status(&tx, args.allow_unstable)
            .await
            .map_err(|e| (VerifyStage::CheckingStability, e))?;

        self.parser
            .parse_intent(self.router, &tx, info)
            .map_err(|e| (VerifyStage::ParsingIntent, e))?;

        self.check_swapout_info(info)
            .map_err(|e| (VerifyStage::ValidatingCrossChain, e))
    }

    async fn check_tx_status(&self, tx: &ChainTx, allow_unstable: bool) -> RouterResult<()> {
        if tx.code != 0 {
            return Err(RouterError::TxWithWrongStatus);
        }
        if allow_unstable {
            return Ok(());
        }

        let chain = self.base.chain_config();
        let latest = self.rpc.get_latest_block_number().await?;
        metrics::record_block_height(&chain.chain_id, latest);

        if latest < tx.height.saturating_add(chain.confirmations) {
            return Err(RouterError::TxNotStable);
        }
        if tx.height < chain.initial_height {
            return Err(RouterError::TxBeforeInitialHeight);
        }
        Ok(())
    }

    fn check_swapout_info(&self, info: &mut SwapTxInfo) -> RouterResult<()> {
        if info.from.to_lowercase() == info.to.to_lowercase() {
            return Err(RouterError::TxWithWrongSender);
        }

        let from_token_cfg = self
            .base
            .get_token_config(&info.token)
            .filter(|cfg| !cfg.token_id.is_empty())
            .ok_or(RouterError::MissTokenConfig)?;
        info.token_id = from_token_cfg.token_id.clone();

        let to_chain_id = info.to_chain_id.to_string();
        let multichain_token = self
            .router
            .get_cached_multichain_token(&info.token_id, &to_chain_id)
            .ok_or_else(|| {
                warn!(
                    token_id = %info.token_id,
                    to_chain_id = %to_chain_id,
                    "Multichain token not found"
                );
                RouterError::MissTokenConfig
            })?;

        let to_bridge = self
            .router
            .get_bridge_by_chain_id(&to_chain_id)
            .ok_or(RouterError::NoBridgeForChainID)?;

        let to_token_cfg = to_bridge.get_token_config(&multichain_token).ok_or_else(|| {
            warn!(
                token = %multichain_token,
                to_chain_id = %to_chain_id,
                "Destination token config not found"
            );
            RouterError::MissTokenConfig
        })?;

        if !self
            .engine
            .check_token_swap_value(
                self.router,
                info,
                from_token_cfg.decimals,
                to_token_cfg.decimals,
            )
        {
            return Err(RouterError::TxWithWrongValue);
        }

        if !to_bridge.is_valid_address(&info.bind) {
            warn!(bind = %info.bind, to_chain_id = %to_chain_id, "Wrong bind address in swapin");
            return Err(RouterError::WrongBindAddress);
        }

        if self.engine.is_big_value_swap(info, from_token_cfg.decimals) {
            info!(
                txid = %info.hash,
                token_id = %info.token_id,
                value = %info.value,
                whitelisted = self.router.is_in_big_value_whitelist(&info.token_id, &info.from),
                "Big value swap"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Bridge, MockChainRpc};
    use crate::cosmos::{CosmosBridge, CosmosParams};
    use crate::registry::{ConfigRegistry, SwapConfigTable};
    use crate::types::{ChainConfig, GatewayConfig, SwapConfig, TokenConfig};

    use alloy_primitives::U256;
    use mockall::predicate::eq;
    use std::sync::Arc;

    const BIND: &str = "osmo1q5zs2pg9q5zs2pg9q5zs2pg9q5zs2pg9tunwhy";
    const DEST_TOKEN: &str = "ibc/atom";

    /// Parser stub that fills fixed fields
    struct FixedParser {
        result: RouterResult<()>,
        bind: &'static str,
    }

    impl IntentParser for FixedParser {
        fn supports(&self, swap_type: SwapType) -> bool {
            swap_type == SwapType::Erc20Swap
        }

        fn parse_intent(
            &self,
            _router: &dyn RouterLookup,
            _tx: &ChainTx,
            info: &mut SwapTxInfo,
        ) -> RouterResult<()> {
            info.from = "sender".to_string();
            info.to = self.bind.to_string();
            info.bind = self.bind.to_string();
            info.to_chain_id = U256::from(137u64);
            info.value = U256::from(1_000u64);
            info.token = "uatom".to_string();
            self.result.clone()
        }
    }

    struct EmptyRouter;

    impl RouterLookup for EmptyRouter {
        fn get_bridge_by_chain_id(&self, _chain_id: &str) -> Option<Arc<dyn Bridge>> {
            None
        }

        fn get_cached_multichain_token(&self, _token_id: &str, _chain_id: &str) -> Option<String> {
            None
        }

        fn is_in_big_value_whitelist(&self, _token_id: &str, _address: &str) -> bool {
            false
        }

        fn get_base_fee_percent(&self, _chain_id: &str) -> i64 {
            0
        }
    }

    /// Router stub resolving only chain 137
    struct StubRouter {
        bridge: Option<Arc<dyn Bridge>>,
        multichain_token: Option<String>,
    }

    impl RouterLookup for StubRouter {
        fn get_bridge_by_chain_id(&self, chain_id: &str) -> Option<Arc<dyn Bridge>> {
            if chain_id == "137" {
                self.bridge.clone()
            } else {
                None
            }
        }

        fn get_cached_multichain_token(&self, token_id: &str, chain_id: &str) -> Option<String> {
            if token_id == "ATOM" && chain_id == "137" {
                self.multichain_token.clone()
            } else {
                None
            }
        }

        fn is_in_big_value_whitelist(&self, _token_id: &str, _address: &str) -> bool {
            false
        }

        fn get_base_fee_percent(&self, _chain_id: &str) -> i64 {
            0
        }
    }

    fn chain_base(chain_id: &str, confirmations: u64, initial_height: u64) -> BridgeBase {
        BridgeBase::new(
            ChainConfig {
                block_chain: format!("chain-{}", chain_id),
                chain_id: chain_id.to_string(),
                confirmations,
                initial_height,
                router_contract: "router".to_string(),
            },
            GatewayConfig {
                api_address: vec!["http://localhost:1317".to_string()],
            },
        )
        .unwrap()
    }

    fn base(confirmations: u64, initial_height: u64) -> BridgeBase {
        chain_base("118", confirmations, initial_height)
    }

    fn token(token_id: &str) -> TokenConfig {
        TokenConfig {
            token_id: token_id.to_string(),
            decimals: 6,
            contract_address: String::new(),
            router_contract: String::new(),
        }
    }

    /// Registry with a fee-free ATOM route to chain 137
    fn route_registry() -> Arc<ConfigRegistry> {
        let registry = ConfigRegistry::new();
        let mut table = SwapConfigTable::new();
        table.entry("ATOM".to_string()).or_default().insert(
            "137".to_string(),
            Arc::new(SwapConfig {
                maximum_swap: U256::from(10u64).pow(U256::from(30u64)),
                minimum_swap: U256::from(10u64).pow(U256::from(12u64)),
                big_value_threshold: U256::from(10u64).pow(U256::from(30u64)),
                swap_fee_rate_per_million: 0,
                maximum_swap_fee: U256::ZERO,
                minimum_swap_fee: U256::ZERO,
            }),
        );
        registry.set_swap_configs(table);
        Arc::new(registry)
    }

    /// Osmosis-prefixed destination bridge for chain 137
    fn dest_bridge(with_token: bool) -> Arc<dyn Bridge> {
        let base = chain_base("137", 1, 0);
        if with_token {
            base.set_token_config(DEST_TOKEN, token("ATOM"));
        }
        let params = CosmosParams {
            prefix: "osmo".to_string(),
            coin_symbol: "uosmo".to_string(),
            network_id: "osmosis-1".to_string(),
        };
        let engine = Arc::new(ValueEngine::new(SwapType::Erc20Swap, route_registry()));
        Arc::new(CosmosBridge::new(base, params, Arc::new(MockChainRpc::new()), engine))
    }

    fn stub_router(bridge: bool, with_token: bool) -> StubRouter {
        StubRouter {
            bridge: bridge.then(|| dest_bridge(with_token)),
            multichain_token: Some(DEST_TOKEN.to_string()),
        }
    }

    fn tx(height: u64, code: u32) -> ChainTx {
        ChainTx {
            hash: "ABC".to_string(),
            height,
            code,
            ..Default::default()
        }
    }

    fn args(allow_unstable: bool) -> VerifyArgs {
        VerifyArgs {
            swap_type: SwapType::Erc20Swap,
            log_index: 0,
            allow_unstable,
        }
    }

    async fn verify(
        base: &BridgeBase,
        rpc: &MockChainRpc,
        parser: &FixedParser,
        args: &VerifyArgs,
    ) -> VerifyResult {
        verify_with(base, rpc, parser, &EmptyRouter, args).await
    }

    async fn verify_with(
        base: &BridgeBase,
        rpc: &MockChainRpc,
        parser: &FixedParser,
        router: &dyn RouterLookup,
        args: &VerifyArgs,
    ) -> VerifyResult {
        let engine = ValueEngine::new(SwapType::Erc20Swap, route_registry());
        SwapVerifier {
            base,
            rpc,
            parser,
            engine: &engine,
            router,
        }
        .verify("ABC", args)
        .await
    }

    fn ok_parser() -> FixedParser {
        FixedParser {
            result: Ok(()),
            bind: BIND,
        }
    }

    fn fetched_rpc() -> MockChainRpc {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_transaction_by_hash()
            .returning(|_| Ok(tx(100, 0)));
        rpc
    }

    /// Source chain with `uatom` mapped to `token_id`
    fn source_base(token_id: &str) -> BridgeBase {
        let base = base(10, 0);
        base.set_token_config("uatom", token(token_id));
        base
    }

    #[tokio::test]
    async fn test_unsupported_swap_type_skips_fetch() {
        let rpc = MockChainRpc::new();
        let mut args = args(false);
        args.swap_type = SwapType::NftSwap;

        let rejection = verify(&base(10, 0), &rpc, &ok_parser(), &args)
            .await
            .unwrap_err();
        assert_eq!(rejection.error, RouterError::SwapTypeNotSupported);
    }

    #[tokio::test]
    async fn test_fetch_failure_maps_to_not_found() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_transaction_by_hash()
            .with(eq("ABC"))
            .returning(|_| {
                Err(RouterError::Rpc {
                    endpoint: "http://localhost:1317".to_string(),
                    message: "status 404".to_string(),
                })
            });

        let rejection = verify(&base(10, 0), &rpc, &ok_parser(), &args(false))
            .await
            .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::Fetching);
        assert_eq!(rejection.error, RouterError::TxNotFound);
        assert_eq!(rejection.info.hash, "ABC");
    }

    #[tokio::test]
    async fn test_failed_status_rejected_even_when_unstable_allowed() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_transaction_by_hash()
            .returning(|_| Ok(tx(100, 5)));

        let rejection = verify(&base(10, 0), &rpc, &ok_parser(), &args(true))
            .await
            .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::CheckingStability);
        assert_eq!(rejection.error, RouterError::TxWithWrongStatus);
        assert_eq!(rejection.info.height, 100);
    }

    #[tokio::test]
    async fn test_stability_boundary() {
        // latest == height + confirmations is stable
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_transaction_by_hash()
            .returning(|_| Ok(tx(100, 0)));
        rpc.expect_get_latest_block_number().returning(|| Ok(110));
        let rejection = verify(&base(10, 0), &rpc, &ok_parser(), &args(false))
            .await
            .unwrap_err();
        // Passed stability; fails later on missing token config
        assert_eq!(rejection.stage, VerifyStage::ValidatingCrossChain);
        assert_eq!(rejection.error, RouterError::MissTokenConfig);

        let mut rpc = MockChainRpc::new();
        rpc.expect_get_transaction_by_hash()
            .returning(|_| Ok(tx(100, 0)));
        rpc.expect_get_latest_block_number().returning(|| Ok(109));
        let rejection = verify(&base(10, 0), &rpc, &ok_parser(), &args(false))
            .await
            .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::CheckingStability);
        assert_eq!(rejection.error, RouterError::TxNotStable);
    }

    #[tokio::test]
    async fn test_allow_unstable_skips_head_query() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_transaction_by_hash()
            .returning(|_| Ok(tx(100, 0)));
        rpc.expect_get_latest_block_number().never();

        let rejection = verify(&base(10, 500), &rpc, &ok_parser(), &args(true))
            .await
            .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::ValidatingCrossChain);
    }

    #[tokio::test]
    async fn test_before_initial_height() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_transaction_by_hash()
            .returning(|_| Ok(tx(100, 0)));
        rpc.expect_get_latest_block_number().returning(|| Ok(1_000));

        let rejection = verify(&base(10, 500), &rpc, &ok_parser(), &args(false))
            .await
            .unwrap_err();
        assert_eq!(rejection.error, RouterError::TxBeforeInitialHeight);
    }

    #[tokio::test]
    async fn test_head_query_failure_propagates() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_transaction_by_hash()
            .returning(|_| Ok(tx(100, 0)));
        rpc.expect_get_latest_block_number().returning(|| {
            Err(RouterError::Rpc {
                endpoint: "http://localhost:1317".to_string(),
                message: "timeout".to_string(),
            })
        });

        let rejection = verify(&base(10, 0), &rpc, &ok_parser(), &args(false))
            .await
            .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::CheckingStability);
        assert!(rejection.error.is_retryable());
    }

    #[tokio::test]
    async fn test_parse_error_keeps_partial_info() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_transaction_by_hash()
            .returning(|_| Ok(tx(100, 0)));
        let parser = FixedParser {
            result: Err(RouterError::TxWithWrongMemo),
            bind: BIND,
        };

        let rejection = verify(&base(10, 0), &rpc, &parser, &args(true))
            .await
            .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::ParsingIntent);
        assert_eq!(rejection.error, RouterError::TxWithWrongMemo);
        assert_eq!(rejection.info.from, "sender");
        assert_eq!(rejection.info.from_chain_id, U256::from(118u64));
    }

    #[tokio::test]
    async fn test_missing_source_token_config() {
        let router = stub_router(true, true);

        let rejection = verify_with(
            &base(10, 0),
            &fetched_rpc(),
            &ok_parser(),
            &router,
            &args(true),
        )
        .await
        .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::ValidatingCrossChain);
        assert_eq!(rejection.error, RouterError::MissTokenConfig);

        // a config without a token ID counts as missing
        let rejection = verify_with(
            &source_base(""),
            &fetched_rpc(),
            &ok_parser(),
            &router,
            &args(true),
        )
        .await
        .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::ValidatingCrossChain);
        assert_eq!(rejection.error, RouterError::MissTokenConfig);
        assert!(rejection.info.token_id.is_empty());
    }

    #[tokio::test]
    async fn test_missing_multichain_token() {
        let router = StubRouter {
            bridge: Some(dest_bridge(true)),
            multichain_token: None,
        };

        let rejection = verify_with(
            &source_base("ATOM"),
            &fetched_rpc(),
            &ok_parser(),
            &router,
            &args(true),
        )
        .await
        .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::ValidatingCrossChain);
        assert_eq!(rejection.error, RouterError::MissTokenConfig);
        assert_eq!(rejection.info.token_id, "ATOM");
    }

    #[tokio::test]
    async fn test_no_bridge_for_destination() {
        let router = stub_router(false, true);

        let rejection = verify_with(
            &source_base("ATOM"),
            &fetched_rpc(),
            &ok_parser(),
            &router,
            &args(true),
        )
        .await
        .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::ValidatingCrossChain);
        assert_eq!(rejection.error, RouterError::NoBridgeForChainID);
    }

    #[tokio::test]
    async fn test_missing_destination_token_config() {
        let router = stub_router(true, false);

        let rejection = verify_with(
            &source_base("ATOM"),
            &fetched_rpc(),
            &ok_parser(),
            &router,
            &args(true),
        )
        .await
        .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::ValidatingCrossChain);
        assert_eq!(rejection.error, RouterError::MissTokenConfig);
    }

    #[tokio::test]
    async fn test_bind_rejected_by_destination() {
        let router = stub_router(true, true);
        // valid bech32, wrong prefix for the destination chain
        let parser = FixedParser {
            result: Ok(()),
            bind: "cosmos1qgpqyqszqgpqyqszqgpqyqszqgpqyqszrh8mx2",
        };

        let rejection = verify_with(
            &source_base("ATOM"),
            &fetched_rpc(),
            &parser,
            &router,
            &args(true),
        )
        .await
        .unwrap_err();
        assert_eq!(rejection.stage, VerifyStage::ValidatingCrossChain);
        assert_eq!(rejection.error, RouterError::WrongBindAddress);
    }

    #[tokio::test]
    async fn test_cross_chain_checks_pass() {
        let router = stub_router(true, true);

        let info = verify_with(
            &source_base("ATOM"),
            &fetched_rpc(),
            &ok_parser(),
            &router,
            &args(true),
        )
        .await
        .unwrap();
        assert_eq!(info.token_id, "ATOM");
        assert_eq!(info.bind, BIND);
        assert_eq!(info.to_chain_id, U256::from(137u64));
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection {
            stage: VerifyStage::ParsingIntent,
            error: RouterError::TxWithWrongMemo,
            info: Box::new(SwapTxInfo::new(SwapType::Erc20Swap, "ABC", 0, U256::ZERO)),
        };
        assert_eq!(
            rejection.to_string(),
            "verify swap failed at parsing_intent: tx with wrong memo"
        );
    }
}
