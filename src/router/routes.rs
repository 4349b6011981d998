// Route types and hop arithmetic
// This file defines the Route value object, the fixed gas and slippage
// constants, and the deterministic per-hop fee/output computation
//
// Numan Thabit 2025 Nov

use crate::router::graph::LiquidityEdge;
use crate::venues::adapter::{Ratio, Token};
use serde::Serialize;

/// Gas of a plain token transfer; also the cost of a zero-hop route.
pub const BASE_TRANSFER_GAS: u64 = 21_000;

/// Approximate gas added per swap hop.
pub const HOP_SWAP_GAS: u64 = 100_000;

/// Accepted shortfall per hop is 1%: `min_out = expected * 99 / 100`.
pub const SLIPPAGE_NUMERATOR: u128 = 99;
pub const SLIPPAGE_DENOMINATOR: u128 = 100;

pub const BPS_DENOMINATOR: u128 = 10_000;

/// Conversion path chosen by the finder, consumed once by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Tokens visited in order; never empty.
    pub path: Vec<Token>,
    /// Amount entering each token of `path`; `amounts[0]` is the input.
    pub amounts: Vec<u128>,
    /// Sum of the fees charged at every hop.
    pub total_fee: u128,
    pub estimated_gas: u64,
}

impl Route {
    /// Zero-hop route: the source already is the target token.
    pub fn direct_transfer(token: Token, amount: u128) -> Self {
        Self {
            path: vec![token],
            amounts: vec![amount],
            total_fee: 0,
            estimated_gas: BASE_TRANSFER_GAS,
        }
    }

    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn is_direct_transfer(&self) -> bool {
        self.hops() == 0
    }

    /// Amount delivered to the recipient.
    pub fn output_amount(&self) -> u128 {
        self.amounts.last().copied().unwrap_or_default()
    }
}

pub fn estimated_gas(hops: usize) -> u64 {
    BASE_TRANSFER_GAS + HOP_SWAP_GAS * hops as u64
}

/// Minimum acceptable output for a hop expected to yield `expected`.
///
/// Split into quotient and remainder so the product never overflows.
pub fn min_out(expected: u128) -> u128 {
    expected / SLIPPAGE_DENOMINATOR * SLIPPAGE_NUMERATOR
        + expected % SLIPPAGE_DENOMINATOR * SLIPPAGE_NUMERATOR / SLIPPAGE_DENOMINATOR
}

/// Fee and output of a single hop: `fee = floor(amount * bps / 10000)`,
/// `out = floor((amount - fee) * weight)`. `None` on overflow or when the
/// fee exceeds 10000 bps.
pub fn hop_output(
    amount: u128,
    fee_bps: u32,
    weight: &Ratio,
) -> Option<(u128, u128)> {
    let fee_bps = u128::from(fee_bps);
    if fee_bps > BPS_DENOMINATOR {
        return None;
    }
    let fee = amount.checked_mul(fee_bps)? / BPS_DENOMINATOR;
    let out = weight.apply_floor(amount - fee)?;
    Some((fee, out))
}

/// Walks `edges` from `amount` and prices the resulting route.
///
/// `edges` must be contiguous (each edge starts where the previous one
/// ends). Returns `None` on arithmetic overflow or an empty edge list.
pub fn quote_path(edges: &[&LiquidityEdge], amount: u128) -> Option<Route> {
    let first = edges.first()?;
    let mut path = Vec::with_capacity(edges.len() + 1);
    let mut amounts = Vec::with_capacity(edges.len() + 1);
    path.push(first.from.clone());
    amounts.push(amount);

    let mut total_fee: u128 = 0;
    let mut current = amount;
    for edge in edges {
        let (fee, out) = hop_output(current, edge.fee_bps, &edge.weight)?;
        total_fee = total_fee.checked_add(fee)?;
        path.push(edge.to.clone());
        amounts.push(out);
        current = out;
    }

    Some(Route {
        path,
        amounts,
        total_fee,
        estimated_gas: estimated_gas(edges.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, fee_bps: u32, weight: Ratio) -> LiquidityEdge {
        LiquidityEdge {
            from: Token::new(from),
            to: Token::new(to),
            weight,
            fee_bps,
        }
    }

    #[test]
    fn two_hop_quote_truncates_each_hop() {
        let ab = edge("A", "B", 30, Ratio::one());
        let bc = edge("B", "C", 30, Ratio::one());
        let route = quote_path(&[&ab, &bc], 10_000).unwrap();

        assert_eq!(route.path, vec![Token::new("A"), Token::new("B"), Token::new("C")]);
        assert_eq!(route.amounts, vec![10_000, 9_970, 9_941]);
        assert_eq!(route.total_fee, 30 + 29);
        assert_eq!(route.estimated_gas, 21_000 + 2 * 100_000);
    }

    #[test]
    fn weight_is_applied_after_fee() {
        let e = edge("A", "B", 100, Ratio::new(3, 2).unwrap());
        // fee = 10, (1000 - 10) * 3 / 2 = 1485
        assert_eq!(hop_output(1_000, 100, &e.weight), Some((10, 1_485)));
        // floor, not round: 999 * 2 / 3 = 666
        let w = Ratio::new(2, 3).unwrap();
        assert_eq!(hop_output(999, 0, &w), Some((0, 666)));
    }

    #[test]
    fn min_out_keeps_ninety_nine_percent() {
        assert_eq!(min_out(9_941), 9_841);
        assert_eq!(min_out(100), 99);
        assert_eq!(min_out(0), 0);
    }

    #[test]
    fn min_out_holds_near_u128_max() {
        // floor(u128::MAX * 99 / 100), computed without the overflowing product
        assert_eq!(
            min_out(u128::MAX),
            336_879_543_251_729_078_828_740_861_357_450_529_340
        );
        // first amount whose `* 99` no longer fits
        assert_eq!(
            min_out(3_437_195_625_464_024_883_468_430_378_098_668_803),
            3_402_823_669_209_384_634_633_746_074_317_682_114
        );
    }

    #[test]
    fn fee_above_whole_amount_is_rejected() {
        assert_eq!(hop_output(1_000, 10_000, &Ratio::one()), Some((1_000, 0)));
        assert_eq!(hop_output(1_000, 10_001, &Ratio::one()), None);
        let e = edge("A", "B", 20_000, Ratio::one());
        assert!(quote_path(&[&e], 1_000).is_none());
    }

    #[test]
    fn direct_transfer_has_base_gas_only() {
        let route = Route::direct_transfer(Token::new("A"), 500);
        assert_eq!(route.hops(), 0);
        assert!(route.is_direct_transfer());
        assert_eq!(route.output_amount(), 500);
        assert_eq!(route.estimated_gas, BASE_TRANSFER_GAS);
    }

    #[test]
    fn overflow_discards_quote() {
        let e = edge("A", "B", 0, Ratio::new(u128::MAX, 1).unwrap());
        assert!(quote_path(&[&e], 2).is_none());
    }
}
