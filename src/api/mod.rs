//! HTTP API for health checks, chain status, verification and broadcast

use crate::config::ApiConfig;
use crate::bridge::Bridge;
use crate::error::{RouterError, RouterResult};
use crate::registry::{Router as SwapRouter, RouterLookup};
use crate::types::{parse_chain_id, SwapTxInfo, SwapType, VerifyArgs};

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<SwapRouter>,
}

/// Build the API routes
pub fn create_app(router: Arc<SwapRouter>) -> Router {
    let state = AppState { router };

    Router::new()
        .route("/health", get(health_check))
        .route("/chains", get(get_chains))
        .route("/verify", post(verify_swap))
        .route("/broadcast", post(broadcast_tx))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(
    config: ApiConfig,
    router: Arc<SwapRouter>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> RouterResult<()> {
    let app = create_app(router);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RouterError::Config(format!("bind API server on {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| RouterError::Internal(format!("API server: {}", e)))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get registered chains
async fn get_chains(State(state): State<AppState>) -> impl IntoResponse {
    let chains = state
        .router
        .chain_ids()
        .into_iter()
        .filter_map(|chain_id| {
            let bridge = state.router.get_bridge_by_chain_id(&chain_id)?;
            let chain = bridge.chain_config();
            Some(ChainInfo {
                name: chain.block_chain.clone(),
                confirmations: chain.confirmations,
                initial_height: chain.initial_height,
                router_contract: chain.router_contract.clone(),
                base_fee_percent: state.router.get_base_fee_percent(&chain_id),
                chain_id,
            })
        })
        .collect();
    Json(ChainsResponse { chains })
}

fn error_response(status: StatusCode, error: &RouterError) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            kind: error.kind().to_string(),
            retryable: error.is_retryable(),
        }),
    )
}

/// Resolve the bridge for a request chain ID in any decimal spelling
fn lookup_bridge(state: &AppState, chain_id: &str) -> Result<Arc<dyn Bridge>, axum::response::Response> {
    let chain_id = parse_chain_id(chain_id)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &e).into_response())?
        .to_string();
    state.router.get_bridge_by_chain_id(&chain_id).ok_or_else(|| {
        error_response(StatusCode::NOT_FOUND, &RouterError::NoBridgeForChainID).into_response()
    })
}

/// Verify a swapout transaction on its source chain
async fn verify_swap(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> axum::response::Response {
    let bridge = match lookup_bridge(&state, &req.chain_id) {
        Ok(bridge) => bridge,
        Err(response) => return response,
    };

    let args = VerifyArgs {
        swap_type: req.swap_type,
        log_index: req.log_index,
        allow_unstable: req.allow_unstable,
    };

    match bridge
        .verify_transaction(state.router.as_ref(), &req.tx_hash, &args)
        .await
    {
        Ok(info) => (
            StatusCode::OK,
            Json(VerifyResponse {
                accepted: true,
                stage: None,
                error: None,
                kind: None,
                retryable: false,
                swap: info,
            }),
        )
            .into_response(),
        Err(rejection) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(VerifyResponse {
                accepted: false,
                stage: Some(rejection.stage.to_string()),
                error: Some(rejection.error.to_string()),
                kind: Some(rejection.error.kind().to_string()),
                retryable: rejection.error.is_retryable(),
                swap: *rejection.info,
            }),
        )
            .into_response(),
    }
}

/// Submit signed transaction bytes to a chain
async fn broadcast_tx(
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> axum::response::Response {
    let bridge = match lookup_bridge(&state, &req.chain_id) {
        Ok(bridge) => bridge,
        Err(response) => return response,
    };

    let tx_bytes = match STANDARD.decode(req.tx_bytes.as_bytes()) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        _ => {
            let err = RouterError::Decode("tx_bytes must be non-empty base64".to_string());
            return error_response(StatusCode::BAD_REQUEST, &err).into_response();
        }
    };

    match bridge.send_transaction(&tx_bytes).await {
        Ok(txhash) => (StatusCode::OK, Json(BroadcastResponse { txhash })).into_response(),
        Err(e) => {
            warn!(chain_id = %req.chain_id, error = %e, "Broadcast failed");
            error_response(StatusCode::BAD_GATEWAY, &e).into_response()
        }
    }
}

fn default_swap_type() -> SwapType {
    SwapType::Erc20Swap
}

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub chain_id: String,
    pub tx_hash: String,
    #[serde(default = "default_swap_type")]
    pub swap_type: SwapType,
    #[serde(default)]
    pub log_index: usize,
    #[serde(default)]
    pub allow_unstable: bool,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub chain_id: String,
    /// Base64-encoded signed transaction
    pub tx_bytes: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ChainInfo {
    chain_id: String,
    name: String,
    confirmations: u64,
    initial_height: u64,
    router_contract: String,
    base_fee_percent: i64,
}

#[derive(Serialize)]
struct ChainsResponse {
    chains: Vec<ChainInfo>,
}

#[derive(Serialize)]
struct VerifyResponse {
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    retryable: bool,
    swap: SwapTxInfo,
}

#[derive(Serialize)]
struct BroadcastResponse {
    txhash: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: String,
    retryable: bool,
}
