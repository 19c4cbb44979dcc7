//! Bech32 account addresses

use crate::error::{RouterError, RouterResult};

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const GENERATOR: [u32; 5] = [
    0x3b6a_57b2,
    0x2650_8e6d,
    0x1ea1_19fa,
    0x3d42_33dd,
    0x2a14_62b3,
];
const CHECKSUM_LEN: usize = 6;
const MAX_LEN: usize = 90;

fn polymod(values: impl Iterator<Item = u8>) -> u32 {
    let mut chk: u32 = 1;
    for v in values {
        let top = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(v);
        for (i, g) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= g;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &[u8]) -> impl Iterator<Item = u8> + '_ {
    hrp.iter()
        .map(|b| b >> 5)
        .chain(std::iter::once(0))
        .chain(hrp.iter().map(|b| b & 0x1f))
}

/// Regroup 5-bit words into bytes, rejecting non-zero padding
fn from_words(words: &[u8]) -> RouterResult<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(words.len() * 5 / 8);
    for &w in words {
        acc = (acc << 5) | u32::from(w);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
        acc &= (1 << bits) - 1;
    }
    if bits >= 5 || acc != 0 {
        return Err(RouterError::Decode("invalid bech32 padding".to_string()));
    }
    Ok(out)
}

/// Decode a bech32 string into its human-readable prefix and payload
pub fn decode_bech32(addr: &str) -> RouterResult<(String, Vec<u8>)> {
    if addr.len() < 8 || addr.len() > MAX_LEN {
        return Err(RouterError::Decode(format!(
            "invalid bech32 length {}",
            addr.len()
        )));
    }
    let has_lower = addr.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = addr.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(RouterError::Decode("mixed case bech32 string".to_string()));
    }
    let addr = addr.to_ascii_lowercase();

    let sep = addr
        .rfind('1')
        .ok_or_else(|| RouterError::Decode("missing bech32 separator".to_string()))?;
    let (hrp, data) = (&addr[..sep], &addr[sep + 1..]);
    if hrp.is_empty() || data.len() < CHECKSUM_LEN {
        return Err(RouterError::Decode("bech32 prefix or data too short".to_string()));
    }
    if hrp.bytes().any(|b| !(33..=126).contains(&b)) {
        return Err(RouterError::Decode("invalid bech32 prefix character".to_string()));
    }

    let words = data
        .bytes()
        .map(|c| {
            CHARSET
                .iter()
                .position(|&x| x == c)
                .map(|p| p as u8)
                .ok_or_else(|| {
                    RouterError::Decode(format!("invalid bech32 character '{}'", c as char))
                })
        })
        .collect::<RouterResult<Vec<u8>>>()?;

    if polymod(hrp_expand(hrp.as_bytes()).chain(words.iter().copied())) != 1 {
        return Err(RouterError::Decode("invalid bech32 checksum".to_string()));
    }

    let payload = from_words(&words[..words.len() - CHECKSUM_LEN])?;
    Ok((hrp.to_string(), payload))
}

/// Whether `addr` is a well-formed account address under `prefix`
pub fn is_valid_address(addr: &str, prefix: &str) -> bool {
    match decode_bech32(addr) {
        Ok((hrp, payload)) => hrp == prefix && matches!(payload.len(), 20 | 32),
        Err(_) => false,
    }
}
