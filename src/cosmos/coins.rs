//! Coin amount strings such as `"1000uatom,25.5stake"`

use crate::error::{RouterError, RouterResult};

use alloy_primitives::U256;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref DEC_COIN_RE: Regex =
        Regex::new(r"^([0-9]+(?:\.[0-9]+)?|\.[0-9]+)\s*([a-zA-Z][a-zA-Z0-9/:._-]{2,127})$")
            .unwrap();
    static ref DENOM_RE: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9/:._-]{2,127}$").unwrap();
}

/// Whether `denom` is a well-formed coin denomination
pub fn is_valid_denom(denom: &str) -> bool {
    DENOM_RE.is_match(denom)
}

/// Integer amount of one denomination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: U256,
}

impl Coin {
    pub fn new(denom: &str, amount: U256) -> Self {
        Self {
            denom: denom.to_string(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Positive coin amounts sorted by denomination, one entry per denomination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn amount_of(&self, denom: &str) -> U256 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or(U256::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", coin)?;
        }
        Ok(())
    }
}

fn parse_integer_part(amount: &str) -> RouterResult<U256> {
    let integer = amount.split('.').next().unwrap_or_default();
    if integer.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(integer, 10)
        .map_err(|e| RouterError::Decode(format!("invalid coin amount '{}': {}", amount, e)))
}

/// Parse a comma-separated list of decimal coins, truncating fractional amounts.
///
/// Zero amounts are dropped; a repeated denomination is an error.
pub fn parse_coins_normalized(s: &str) -> RouterResult<Coins> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Coins::default());
    }

    let mut coins: Vec<Coin> = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        let caps = DEC_COIN_RE
            .captures(part)
            .ok_or_else(|| RouterError::Decode(format!("invalid coin expression '{}'", part)))?;
        let denom = &caps[2];
        let amount = parse_integer_part(&caps[1])?;

        if coins.iter().any(|c| c.denom == denom) {
            return Err(RouterError::Decode(format!("duplicate denomination '{}'", denom)));
        }
        if !amount.is_zero() {
            coins.push(Coin::new(denom, amount));
        }
    }

    coins.sort_by(|a, b| a.denom.cmp(&b.denom));
    Ok(Coins(coins))
}
