//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Verification outcomes and latency
//! - Source chain head heights
//! - RPC endpoint failures and broadcasts
//! - Native balance check failures

use crate::error::{RouterError, RouterResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};
use std::future::Future;
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Verification metrics
    pub static ref VERIFICATIONS: CounterVec = register_counter_vec!(
        "router_verifications_total",
        "Total swap verifications by outcome",
        &["chain_id", "outcome"]
    ).unwrap();

    pub static ref VERIFY_LATENCY: HistogramVec = register_histogram_vec!(
        "router_verify_latency_seconds",
        "Swap verification latency",
        &["chain_id"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // Chain metrics
    pub static ref CHAIN_BLOCK_HEIGHT: GaugeVec = register_gauge_vec!(
        "router_chain_block_height",
        "Latest observed block height per chain",
        &["chain_id"]
    ).unwrap();

    // RPC metrics
    pub static ref RPC_FAILURES: CounterVec = register_counter_vec!(
        "router_rpc_failures_total",
        "Total failed RPC calls by endpoint",
        &["endpoint"]
    ).unwrap();

    pub static ref BROADCASTS: CounterVec = register_counter_vec!(
        "router_broadcasts_total",
        "Total transaction broadcasts by result",
        &["chain_id", "result"]
    ).unwrap();

    // Balance metrics
    pub static ref BALANCE_CHECK_FAILURES: CounterVec = register_counter_vec!(
        "router_balance_check_failures_total",
        "Total native balance checks that could not complete",
        &["chain_id"]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self, shutdown: impl Future<Output = ()> + Send + 'static) -> RouterResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RouterError::Config(format!("bind metrics server on {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RouterError::Internal(format!("metrics server: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// Helper functions to record metrics

/// `outcome` is "accepted" or the rejection's error kind
pub fn record_verification(chain_id: &str, outcome: &str, latency_secs: f64) {
    VERIFICATIONS.with_label_values(&[chain_id, outcome]).inc();
    VERIFY_LATENCY
        .with_label_values(&[chain_id])
        .observe(latency_secs);
}

pub fn record_block_height(chain_id: &str, block_number: u64) {
    CHAIN_BLOCK_HEIGHT
        .with_label_values(&[chain_id])
        .set(block_number as f64);
}

pub fn record_rpc_failure(endpoint: &str) {
    RPC_FAILURES.with_label_values(&[endpoint]).inc();
}

pub fn record_broadcast(chain_id: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    BROADCASTS.with_label_values(&[chain_id, result]).inc();
}

pub fn record_balance_check_failure(chain_id: &str) {
    BALANCE_CHECK_FAILURES.with_label_values(&[chain_id]).inc();
}
