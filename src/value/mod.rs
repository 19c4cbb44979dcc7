//! Value and fee engine shared by every chain adapter
//!
//! All monetary arithmetic is exact integer math on `U256`:
//! - Decimal conversion between token precisions (truncating on down-scale)
//! - Parsing human decimal strings into fixed-point values
//! - Swap fee computation and min/max/big-value threshold checks

use crate::registry::{ConfigRegistry, RouterLookup};
use crate::types::{SwapTxInfo, SwapType};

use alloy_primitives::U256;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::warn;

/// Precision of every amount stored in a swap config
pub const SWAP_CONFIG_DECIMALS: u8 = 18;

const FEE_RATE_DENOMINATOR: u64 = 1_000_000;

/// 10^exp, or None when it does not fit in 256 bits
fn pow10(exp: u32) -> Option<U256> {
    U256::from(10u64).checked_pow(U256::from(exp))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_digits(s: &str) -> Option<U256> {
    if !is_digits(s) {
        return None;
    }
    U256::from_str_radix(s, 10).ok()
}

/// Scale a fixed-point value between decimal precisions.
///
/// Down-scaling truncates toward zero; up-scaling saturates at `U256::MAX`.
pub fn convert_token_value(value: U256, from_decimals: u8, to_decimals: u8) -> U256 {
    match from_decimals.cmp(&to_decimals) {
        Ordering::Equal => value,
        Ordering::Greater => match pow10(u32::from(from_decimals - to_decimals)) {
            Some(divisor) => value / divisor,
            None => U256::ZERO,
        },
        Ordering::Less => match pow10(u32::from(to_decimals - from_decimals)) {
            Some(multiplier) => value.saturating_mul(multiplier),
            None if value.is_zero() => U256::ZERO,
            None => U256::MAX,
        },
    }
}

/// Parse a decimal string such as `"12.345"` into a fixed-point integer.
///
/// Digits beyond `decimals` in the fractional part are dropped, not rounded.
pub fn to_bits(value: &str, decimals: u8) -> Option<U256> {
    let mut parts = value.split('.');
    let int_part = parts.next()?;
    let frac_part = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let one_token = pow10(u32::from(decimals))?;
    let mut result = parse_digits(int_part)?.checked_mul(one_token)?;

    if let Some(frac) = frac_part {
        // truncated digits must still be digits
        if !is_digits(frac) {
            return None;
        }
        let keep = frac.len().min(usize::from(decimals));
        let kept = if keep == 0 {
            U256::ZERO
        } else {
            parse_digits(&frac[..keep])?
        };
        // keep <= decimals so this power always fits
        let scale = pow10(u32::from(decimals) - keep as u32)?;
        result = result.checked_add(kept.checked_mul(scale)?)?;
    }

    Some(result)
}

/// Computes swap fees and gates swap values against the route config.
///
/// Route limits come from the engine's registry. Whitelist membership and
/// base fee percents come from the router passed to each call.
pub struct ValueEngine {
    /// Router operating mode
    swap_type: SwapType,
    /// Swap configs
    registry: Arc<ConfigRegistry>,
}

impl ValueEngine {
    pub fn new(swap_type: SwapType, registry: Arc<ConfigRegistry>) -> Self {
        Self {
            swap_type,
            registry,
        }
    }

    /// Big-value threshold of the route in source decimals (zero without config)
    pub fn get_big_value_threshold(&self, token_id: &str, to_chain_id: &str, from_decimals: u8) -> U256 {
        match self.registry.get_swap_config(token_id, to_chain_id) {
            Some(cfg) => convert_token_value(cfg.big_value_threshold, SWAP_CONFIG_DECIMALS, from_decimals),
            None => U256::ZERO,
        }
    }

    /// Whether the swap exceeds the route's big-value threshold
    pub fn is_big_value_swap(&self, info: &SwapTxInfo, from_decimals: u8) -> bool {
        let threshold =
            self.get_big_value_threshold(&info.token_id, &info.to_chain_id.to_string(), from_decimals);
        info.value > threshold
    }

    /// Check the swap value is in the configured range and nets a positive amount
    pub fn check_token_swap_value(
        &self,
        router: &dyn RouterLookup,
        info: &SwapTxInfo,
        from_decimals: u8,
        to_decimals: u8,
    ) -> bool {
        if !self.swap_type.is_value_sensitive() {
            return true;
        }
        let value = info.value;
        if value.is_zero() {
            return false;
        }

        let token_id = info.token_id.as_str();
        let to_chain_id = info.to_chain_id.to_string();
        let swap_cfg = match self.registry.get_swap_config(token_id, &to_chain_id) {
            Some(cfg) => cfg,
            None => return false,
        };

        let min_swap_value = convert_token_value(swap_cfg.minimum_swap, SWAP_CONFIG_DECIMALS, from_decimals);
        if value < min_swap_value {
            return false;
        }

        let max_swap_value = convert_token_value(swap_cfg.maximum_swap, SWAP_CONFIG_DECIMALS, from_decimals);
        if value > max_swap_value
            && !router.is_in_big_value_whitelist(token_id, &info.from)
            && !router.is_in_big_value_whitelist(token_id, &info.tx_to)
        {
            return false;
        }

        !self
            .calc_swap_value(
                router,
                token_id,
                &to_chain_id,
                value,
                from_decimals,
                to_decimals,
                &info.from,
                &info.tx_to,
            )
            .is_zero()
    }

    /// Amount the recipient receives: value minus fee, in destination decimals.
    ///
    /// Returns zero when the route is not configured or the fee eats the value.
    #[allow(clippy::too_many_arguments)]
    pub fn calc_swap_value(
        &self,
        router: &dyn RouterLookup,
        token_id: &str,
        to_chain_id: &str,
        value: U256,
        from_decimals: u8,
        to_decimals: u8,
        origin_from: &str,
        origin_tx_to: &str,
    ) -> U256 {
        if !self.swap_type.is_value_sensitive() {
            return value;
        }
        let swap_cfg = match self.registry.get_swap_config(token_id, to_chain_id) {
            Some(cfg) => cfg,
            None => return U256::ZERO,
        };

        let mut value_left = value;
        if swap_cfg.swap_fee_rate_per_million > 0 {
            let min_swap_fee =
                convert_token_value(swap_cfg.minimum_swap_fee, SWAP_CONFIG_DECIMALS, from_decimals);
            let mut adjust_base_fee = None;

            let swap_fee = if router.is_in_big_value_whitelist(token_id, origin_from)
                || router.is_in_big_value_whitelist(token_id, origin_tx_to)
            {
                min_swap_fee
            } else {
                let rate_fee = value.saturating_mul(U256::from(swap_cfg.swap_fee_rate_per_million))
                    / U256::from(FEE_RATE_DENOMINATOR);
                let max_swap_fee =
                    convert_token_value(swap_cfg.maximum_swap_fee, SWAP_CONFIG_DECIMALS, from_decimals);
                let mut fee = if rate_fee < min_swap_fee {
                    min_swap_fee
                } else if rate_fee > max_swap_fee {
                    max_swap_fee
                } else {
                    rate_fee
                };

                // Added after clamping; the result is not re-clamped to the maximum fee
                let percent = router.get_base_fee_percent(to_chain_id);
                if percent != 0 && !min_swap_fee.is_zero() {
                    let scaled = min_swap_fee.saturating_mul(U256::from(percent.unsigned_abs()));
                    let hundred = U256::from(100u64);
                    if percent > 0 {
                        let adjust = scaled / hundred;
                        fee = fee.saturating_add(adjust);
                        adjust_base_fee = Some(adjust.to_string());
                    } else {
                        // floor division of a negative adjustment rounds away from zero
                        let mut adjust = scaled / hundred;
                        if !(scaled % hundred).is_zero() {
                            adjust += U256::from(1u64);
                        }
                        fee = fee.saturating_sub(adjust);
                        adjust_base_fee = Some(format!("-{}", adjust));
                    }
                }
                fee
            };

            if value <= swap_fee {
                warn!(
                    value = %value,
                    token_id,
                    to_chain_id,
                    min_swap_fee = %min_swap_fee,
                    adjust_base_fee = ?adjust_base_fee,
                    swap_fee = %swap_fee,
                    "Swap value does not cover the swap fee"
                );
                return U256::ZERO;
            }

            value_left = value - swap_fee;
        }

        convert_token_value(value_left, from_decimals, to_decimals)
    }
}
