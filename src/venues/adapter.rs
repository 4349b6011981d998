// Venue adapter module
// This file defines the identifiers and the narrow chain-facing interfaces
// (token registry and liquidity pool) the routing engine consumes
//
// Numan Thabit 2025 Nov

use crate::errors::VenueError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stablecoin identifier (chain address). Only equality and hashing matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Holder of funds: an externally owned account or a contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positive rational number, kept in lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub num: u128,
    pub den: u128,
}

impl Ratio {
    /// Returns `None` unless both parts are non-zero.
    pub fn new(num: u128, den: u128) -> Option<Self> {
        if num == 0 || den == 0 {
            return None;
        }
        let g = gcd(num, den);
        Some(Self {
            num: num / g,
            den: den / g,
        })
    }

    pub fn one() -> Self {
        Self { num: 1, den: 1 }
    }

    /// `self / other`, or `None` on overflow.
    pub fn div(&self, other: &Ratio) -> Option<Ratio> {
        // cross-reduce first so that equal prices never overflow
        let g1 = gcd(self.num, other.num);
        let g2 = gcd(self.den, other.den);
        let num = (self.num / g1).checked_mul(other.den / g2)?;
        let den = (self.den / g2).checked_mul(other.num / g1)?;
        Ratio::new(num, den)
    }

    /// `floor(amount * self)`, or `None` on overflow.
    pub fn apply_floor(&self, amount: u128) -> Option<u128> {
        Some(amount.checked_mul(self.num)? / self.den)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Authoritative source of supported stablecoins and their thresholds.
///
/// Implementations must tolerate concurrent reads; route finding may run
/// from several tasks at once.
#[allow(async_fn_in_trait)]
pub trait Registry: Send + Sync {
    /// Supported tokens in a stable order. Graph adjacency follows this order.
    async fn supported_tokens(&self) -> Result<Vec<Token>, VenueError>;

    async fn min_liquidity(&self, token: &Token) -> Result<u128, VenueError>;

    async fn price(&self, token: &Token) -> Result<Ratio, VenueError>;
}

/// Liquidity pool that quotes, swaps and pays out.
///
/// `swap` and `transfer` block until the transaction is confirmed and return
/// its identifier.
#[allow(async_fn_in_trait)]
pub trait Pool: Send + Sync {
    /// Reserve the pool currently holds of `token`.
    async fn balance(&self, token: &Token) -> Result<u128, VenueError>;

    /// Global swap fee in basis points, uniform across pairs.
    async fn swap_fee_bps(&self) -> Result<u32, VenueError>;

    /// Swap `amount` of `from` into `to` on behalf of `holder`, failing with
    /// `SlippageExceeded` when the realized output is below `min_out`.
    async fn swap(
        &self,
        holder: &Account,
        from: &Token,
        to: &Token,
        amount: u128,
        min_out: u128,
    ) -> Result<TxId, VenueError>;

    /// Move `amount` of `token` from `holder` to `recipient`.
    async fn transfer(
        &self,
        holder: &Account,
        token: &Token,
        recipient: &Account,
        amount: u128,
    ) -> Result<TxId, VenueError>;

    /// Custody post-condition of `swap`: who holds the output once a swap
    /// submitted by `prior` confirms. Pools that keep swap output in their
    /// own custody return their own account here; pools that pay the caller
    /// back return `prior`.
    fn holder_after_swap(&self, prior: &Account) -> Account;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_reduces_and_divides() {
        let a = Ratio::new(200, 100).unwrap();
        assert_eq!(a, Ratio { num: 2, den: 1 });

        let b = Ratio::new(3, 4).unwrap();
        let q = a.div(&b).unwrap();
        assert_eq!(q, Ratio { num: 8, den: 3 });
        assert_eq!(q.apply_floor(10), Some(26));
    }

    #[test]
    fn ratio_rejects_zero_parts() {
        assert!(Ratio::new(0, 5).is_none());
        assert!(Ratio::new(5, 0).is_none());
    }

    #[test]
    fn equal_large_prices_divide_to_one() {
        let p = Ratio::new(u128::MAX - 1, 1).unwrap();
        assert_eq!(p.div(&p), Some(Ratio::one()));
    }
}
