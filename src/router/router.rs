// Payment router facade
// This file ties route finding and route execution together for callers
// that want a single quote or pay entry point
//
// Numan Thabit 2025 Nov

use super::{RouteExecutor, RouteFinder};
use crate::config::RouterConfig;
use crate::control::SenderSequencer;
use crate::errors::{FinderError, PaymentError};
use crate::router::execution::ExecutionStats;
use crate::router::routes::Route;
use crate::venues::adapter::{Account, Pool, Registry, Token, TxId};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Completed payment: the route that was used and its transactions.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub route: Route,
    pub transactions: Vec<TxId>,
}

/// High-level router that ties selection and execution together
pub struct PaymentRouter<R, P> {
    finder: RouteFinder<R, P>,
    executor: RouteExecutor<P>,
    sequencer: SenderSequencer,
    max_hops: usize,
}

impl<R, P> PaymentRouter<R, P>
where
    R: Registry,
    P: Pool,
{
    pub fn new(registry: Arc<R>, pool: Arc<P>, config: &RouterConfig) -> Self {
        Self {
            finder: RouteFinder::new(registry, pool.clone(), config),
            executor: RouteExecutor::new(pool).with_call_timeout(config.call_timeout()),
            sequencer: SenderSequencer::new(),
            max_hops: config.max_hops,
        }
    }

    pub fn executor(&self) -> &RouteExecutor<P> {
        &self.executor
    }

    pub fn stats(&self) -> ExecutionStats {
        self.executor.get_stats()
    }

    /// Select route without executing (for quote/preview)
    pub async fn quote(
        &self,
        from: &Token,
        to: &Token,
        amount: u128,
        max_hops: Option<usize>,
    ) -> Result<Option<Route>, FinderError> {
        self.finder
            .find_best_route(from, to, amount, max_hops.unwrap_or(self.max_hops))
            .await
    }

    /// Routes `amount` of `from` held by `sender` into `to` and pays it to
    /// `recipient`. Payments from one sender through the same router never
    /// interleave, and each one is quoted against the state left by the
    /// previous one.
    pub async fn pay(
        &self,
        from: &Token,
        to: &Token,
        amount: u128,
        sender: &Account,
        recipient: &Account,
    ) -> Result<PaymentReceipt, PaymentError> {
        let _permit = self.sequencer.acquire(sender).await;
        let route = self
            .quote(from, to, amount, None)
            .await?
            .ok_or_else(|| PaymentError::NoRoute {
                from: from.clone(),
                to: to.clone(),
                max_hops: self.max_hops,
            })?;

        let transactions = self.executor.execute_route(&route, sender, recipient).await?;
        info!(
            sender = %sender,
            recipient = %recipient,
            delivered = route.output_amount(),
            transactions = transactions.len(),
            "payment settled"
        );
        Ok(PaymentReceipt {
            route,
            transactions,
        })
    }
}
