//! Command line value parsers

use anyhow::{anyhow, bail, Context, Result};
use swapvm::{Address, Hash, U256};

/// Hex with or without a `0x` prefix, whitespace ignored
pub fn bytes(s: &str) -> Result<Vec<u8>> {
    let s: String = s.split_whitespace().collect();
    let s = s.strip_prefix("0x").unwrap_or(&s);
    hex::decode(s).with_context(|| format!("invalid hex: {s}"))
}

fn fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    let raw = bytes(s)?;
    raw.as_slice()
        .try_into()
        .map_err(|_| anyhow!("expected {N} bytes, got {}", raw.len()))
}

pub fn address(s: &str) -> Result<Address> {
    fixed::<20>(s)
}

pub fn hash(s: &str) -> Result<Hash> {
    fixed::<32>(s)
}

/// Decimal, or hex with a `0x` prefix
pub fn amount(s: &str) -> Result<U256> {
    match s.strip_prefix("0x") {
        Some(h) => U256::from_str_radix(h, 16).map_err(|e| anyhow!("invalid hex amount {s}: {e:?}")),
        None => U256::from_dec_str(s).map_err(|e| anyhow!("invalid amount {s}: {e:?}")),
    }
}

/// `--fund TOKEN:HOLDER:AMOUNT`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Funding {
    pub token: Address,
    pub holder: Address,
    pub amount: U256,
}

pub fn funding(s: &str) -> Result<Funding> {
    let parts: Vec<&str> = s.split(':').collect();
    let [token, holder, value] = parts.as_slice() else {
        bail!("expected TOKEN:HOLDER:AMOUNT, got {s}");
    };
    Ok(Funding {
        token: address(token)?,
        holder: address(holder)?,
        amount: amount(value)?,
    })
}
