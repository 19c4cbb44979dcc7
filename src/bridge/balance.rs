//! Native balance checks with bounded retries

use super::Bridge;
use crate::error::{RouterError, RouterResult};
use crate::metrics;

use alloy_primitives::U256;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry schedule for balance queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Ensure `account` holds at least `need` of the chain's native coin.
///
/// Query failures are retried per `policy`; the last error is returned once
/// every attempt failed.
pub async fn check_native_balance(
    bridge: &dyn Bridge,
    account: &str,
    need: U256,
    policy: &RetryPolicy,
) -> RouterResult<()> {
    let chain_id = bridge.chain_config().chain_id.as_str();
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match bridge.get_balance(account).await {
            Ok(balance) => {
                if balance < need {
                    return Err(RouterError::InsufficientBalance {
                        have: balance.to_string(),
                        need: need.to_string(),
                    });
                }
                return Ok(());
            }
            Err(e) => {
                debug!(chain_id, account, attempt, error = %e, "Balance query failed");
                last_error = Some(e);
                if attempt < attempts && !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    let err = last_error
        .unwrap_or_else(|| RouterError::Internal("balance check made no attempts".to_string()));
    warn!(chain_id, account, error = %err, "Get native balance failed");
    metrics::record_balance_check_failure(chain_id);
    Err(err)
}
