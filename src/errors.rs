// Error types and error handling module
// This file defines the failure taxonomy for graph building, route finding
// and route execution
//
// Numan Thabit 2025 Nov

use crate::venues::adapter::{Token, TxId};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single call against the registry or the pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VenueError {
    #[error("venue query unavailable: {0}")]
    Unavailable(String),
    #[error("unknown token {0}")]
    UnknownToken(Token),
    #[error("slippage exceeded: realized {realized} below minimum {min_out}")]
    SlippageExceeded { min_out: u128, realized: u128 },
    #[error("insufficient pool liquidity for {token}: need {needed}, reserve {available}")]
    InsufficientLiquidity {
        token: Token,
        needed: u128,
        available: u128,
    },
    #[error("insufficient balance of {token}: need {needed}, have {available}")]
    InsufficientBalance {
        token: Token,
        needed: u128,
        available: u128,
    },
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("swap fee of {fee_bps} bps exceeds the whole amount")]
    InvalidFee { fee_bps: u32 },
}

/// A token pair whose edge was left out of a graph snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("edge {from} -> {to} skipped: {cause}")]
pub struct EdgeQueryFailure {
    pub from: Token,
    pub to: Token,
    #[source]
    pub cause: VenueError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinderError {
    #[error("supported token set unavailable: {0}")]
    Registry(#[source] VenueError),
}

/// Why an execution stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HopFailure {
    #[error(transparent)]
    Venue(#[from] VenueError),
    #[error("call timed out after {0:?}")]
    TimedOut(Duration),
    #[error("malformed route: {0}")]
    MalformedRoute(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStage {
    Swap,
    Transfer,
}

impl ExecutionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStage::Swap => "swap",
            ExecutionStage::Transfer => "transfer",
        }
    }
}

/// Aborted route execution.
///
/// Transactions listed in `committed` are final on chain and are NOT rolled
/// back; the caller owns reconciliation of the partially executed route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "route execution failed at hop {hop} ({}) after {} committed transaction(s): {cause}",
    .stage.as_str(),
    .committed.len()
)]
pub struct RouteExecutionFailure {
    /// Index of the failing swap, or the hop count when the final transfer failed.
    pub hop: usize,
    pub stage: ExecutionStage,
    pub committed: Vec<TxId>,
    #[source]
    pub cause: HopFailure,
}

impl RouteExecutionFailure {
    /// True when at least one transaction already landed before the failure.
    pub fn is_partial(&self) -> bool {
        !self.committed.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Finder(#[from] FinderError),
    #[error("no route from {from} to {to} within {max_hops} hop(s)")]
    NoRoute {
        from: Token,
        to: Token,
        max_hops: usize,
    },
    #[error(transparent)]
    Execution(#[from] RouteExecutionFailure),
}
