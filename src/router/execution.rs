// Execution engine - drives a route through the pool hop by hop
// This file implements the sequential swap/transfer state machine and
// reports partial completion when a hop fails
//
// Numan Thabit 2025 Nov

use crate::errors::{ExecutionStage, HopFailure, RouteExecutionFailure, VenueError};
use crate::metrics::{CALL_LATENCY, EXECUTIONS, EXECUTION_FAILURES};
use crate::router::routes::{min_out, Route};
use crate::venues::adapter::{Account, Pool, TxId};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle of one route execution.
///
/// `Pending -> Swapping(0) -> .. -> Swapping(n-1) -> Transferring -> Completed`,
/// or `Failed` from any swapping/transferring state. `Completed` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Pending,
    Swapping { hop: usize },
    Transferring,
    Completed,
    Failed { hop: usize },
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Failed { .. })
    }

    /// Whether `self -> next` is a legal step for a route of `hops` swaps.
    pub fn can_advance_to(&self, next: &ExecutionState, hops: usize) -> bool {
        use ExecutionState::*;
        match (*self, *next) {
            (Pending, Swapping { hop: 0 }) => hops > 0,
            (Pending, Transferring) => hops == 0,
            (Swapping { hop }, Swapping { hop: n }) => n == hop + 1 && n < hops,
            (Swapping { hop }, Transferring) => hop + 1 == hops,
            (Swapping { hop }, Failed { hop: f }) => f == hop,
            (Transferring, Completed) => true,
            (Transferring, Failed { hop: f }) => f == hops,
            _ => false,
        }
    }
}

/// Tracks state and committed transactions of a single execution.
struct ExecutionTracker {
    state: ExecutionState,
    hops: usize,
    committed: Vec<TxId>,
}

impl ExecutionTracker {
    fn new(hops: usize) -> Self {
        Self {
            state: ExecutionState::Pending,
            hops,
            committed: Vec::with_capacity(hops + 1),
        }
    }

    fn advance(&mut self, next: ExecutionState) {
        debug_assert!(
            self.state.can_advance_to(&next, self.hops),
            "illegal execution transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "execution state transition");
        self.state = next;
    }

    fn fail(mut self, cause: HopFailure) -> RouteExecutionFailure {
        let (hop, stage) = match self.state {
            ExecutionState::Swapping { hop } => (hop, ExecutionStage::Swap),
            ExecutionState::Transferring => (self.hops, ExecutionStage::Transfer),
            // rejected before the first call
            _ => (0, ExecutionStage::Swap),
        };
        if !self.state.is_terminal() && self.state != ExecutionState::Pending {
            self.advance(ExecutionState::Failed { hop });
        }
        RouteExecutionFailure {
            hop,
            stage,
            committed: self.committed,
            cause,
        }
    }
}

/// Execution statistics for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionStats {
    pub total_executions: u64,
    pub completed_executions: u64,
    pub failed_executions: u64,
    /// Failures that left at least one committed transaction behind.
    pub partial_failures: u64,
    pub success_rate: f64,
}

/// Executes routes as a strictly sequential chain of blocking calls.
///
/// Each hop waits for confirmation of the previous one because its input
/// amount and custody depend on it. There is no compensation: swaps that
/// confirmed before a failure stay on chain and are reported back in
/// [`RouteExecutionFailure::committed`]. Callers must serialize executions
/// for the same sender themselves.
pub struct RouteExecutor<P> {
    pool: Arc<P>,
    call_timeout: Option<Duration>,
    total_executions: AtomicU64,
    completed_executions: AtomicU64,
    failed_executions: AtomicU64,
    partial_failures: AtomicU64,
}

impl<P: Pool> RouteExecutor<P> {
    pub fn new(pool: Arc<P>) -> Self {
        Self {
            pool,
            call_timeout: None,
            total_executions: AtomicU64::new(0),
            completed_executions: AtomicU64::new(0),
            failed_executions: AtomicU64::new(0),
            partial_failures: AtomicU64::new(0),
        }
    }

    /// Bound every blocking swap/transfer call. An expired call aborts the
    /// route like any other failure; its on-chain outcome is unknown.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn get_stats(&self) -> ExecutionStats {
        let total = self.total_executions.load(Ordering::Relaxed);
        let completed = self.completed_executions.load(Ordering::Relaxed);
        ExecutionStats {
            total_executions: total,
            completed_executions: completed,
            failed_executions: self.failed_executions.load(Ordering::Relaxed),
            partial_failures: self.partial_failures.load(Ordering::Relaxed),
            success_rate: if total > 0 {
                completed as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Swaps along `route.path` starting from `sender`'s funds, then pays
    /// `route.output_amount()` of the final token to `recipient`.
    ///
    /// Returns the transaction ids in submission order (one per hop plus the
    /// final transfer).
    #[tracing::instrument(skip_all, fields(hops = route.hops(), sender = %sender, recipient = %recipient))]
    pub async fn execute_route(
        &self,
        route: &Route,
        sender: &Account,
        recipient: &Account,
    ) -> Result<Vec<TxId>, RouteExecutionFailure> {
        self.total_executions.fetch_add(1, Ordering::Relaxed);
        match self.run(route, sender, recipient).await {
            Ok(tx_ids) => {
                self.completed_executions.fetch_add(1, Ordering::Relaxed);
                EXECUTIONS.with_label_values(&["completed"]).inc();
                info!(
                    transactions = tx_ids.len(),
                    delivered = route.output_amount(),
                    "route executed successfully"
                );
                Ok(tx_ids)
            }
            Err(failure) => {
                self.failed_executions.fetch_add(1, Ordering::Relaxed);
                EXECUTIONS.with_label_values(&["failed"]).inc();
                EXECUTION_FAILURES
                    .with_label_values(&[failure.stage.as_str()])
                    .inc();
                if failure.is_partial() {
                    self.partial_failures.fetch_add(1, Ordering::Relaxed);
                }
                warn!(
                    hop = failure.hop,
                    stage = failure.stage.as_str(),
                    committed = failure.committed.len(),
                    error = %failure.cause,
                    "route execution aborted; committed transactions are not rolled back"
                );
                Err(failure)
            }
        }
    }

    async fn run(
        &self,
        route: &Route,
        sender: &Account,
        recipient: &Account,
    ) -> Result<Vec<TxId>, RouteExecutionFailure> {
        let hops = route.hops();
        let mut tracker = ExecutionTracker::new(hops);

        if let Err(reason) = check_shape(route) {
            return Err(tracker.fail(HopFailure::MalformedRoute(reason)));
        }

        let mut holder = sender.clone();
        for (hop, pair) in route.path.windows(2).enumerate() {
            tracker.advance(ExecutionState::Swapping { hop });
            let (from, to) = (&pair[0], &pair[1]);
            let amount_in = route.amounts[hop];
            let minimum = min_out(route.amounts[hop + 1]);

            let swapped = self
                .call(
                    ExecutionStage::Swap,
                    self.pool.swap(&holder, from, to, amount_in, minimum),
                )
                .await;
            match swapped {
                Ok(tx) => {
                    debug!(hop, from = %from, to = %to, amount_in = amount_in, min_out = minimum, tx = %tx, "swap confirmed");
                    tracker.committed.push(tx);
                    holder = self.pool.holder_after_swap(&holder);
                }
                Err(cause) => return Err(tracker.fail(cause)),
            }
        }

        tracker.advance(ExecutionState::Transferring);
        let token = &route.path[hops];
        let amount = route.amounts[hops];
        let transferred = self
            .call(
                ExecutionStage::Transfer,
                self.pool.transfer(&holder, token, recipient, amount),
            )
            .await;
        match transferred {
            Ok(tx) => {
                debug!(token = %token, amount = amount, holder = %holder, tx = %tx, "transfer confirmed");
                tracker.committed.push(tx);
            }
            Err(cause) => return Err(tracker.fail(cause)),
        }

        tracker.advance(ExecutionState::Completed);
        Ok(tracker.committed)
    }

    async fn call<F>(&self, stage: ExecutionStage, fut: F) -> Result<TxId, HopFailure>
    where
        F: Future<Output = Result<TxId, VenueError>>,
    {
        let timer = CALL_LATENCY
            .with_label_values(&[stage.as_str()])
            .start_timer();
        let result = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(inner) => inner.map_err(HopFailure::from),
                Err(_) => Err(HopFailure::TimedOut(limit)),
            },
            None => fut.await.map_err(HopFailure::from),
        };
        timer.observe_duration();
        result
    }
}

fn check_shape(route: &Route) -> Result<(), String> {
    if route.path.is_empty() {
        return Err("route has an empty path".to_string());
    }
    if route.amounts.len() != route.path.len() {
        return Err(format!(
            "route has {} amounts for {} tokens",
            route.amounts.len(),
            route.path.len()
        ));
    }
    Ok(())
}
