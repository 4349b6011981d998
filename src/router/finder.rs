// Route finder - picks the fee-minimal conversion path
// This file rebuilds the liquidity graph for every query, enumerates bounded
// simple paths and selects the route with the lowest accumulated fee
//
// Numan Thabit 2025 Nov

use crate::config::RouterConfig;
use crate::errors::FinderError;
use crate::metrics::{CANDIDATE_PATHS, ROUTE_SEARCHES};
use crate::router::graph::{build_graph, GraphBuild};
use crate::router::routes::{quote_path, Route};
use crate::venues::adapter::{Pool, Registry, Token};
use backoff::{future::retry, ExponentialBackoff};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-only route search over a fresh graph snapshot per call.
///
/// Holds no mutable state, so independent searches may run concurrently.
pub struct RouteFinder<R, P> {
    registry: Arc<R>,
    pool: Arc<P>,
    registry_backoff: ExponentialBackoff,
}

impl<R, P> RouteFinder<R, P>
where
    R: Registry,
    P: Pool,
{
    pub fn new(registry: Arc<R>, pool: Arc<P>, config: &RouterConfig) -> Self {
        Self {
            registry,
            pool,
            registry_backoff: config.registry_backoff(),
        }
    }

    /// Cheapest route from `from` to `to` using at most `max_hops` swaps.
    ///
    /// `Ok(None)` when no path exists within the limit. Among equal-fee
    /// candidates the first one discovered by the depth-first enumeration
    /// wins, which is deterministic for a fixed registry order.
    #[tracing::instrument(skip_all, fields(from = %from, to = %to, amount = amount, max_hops = max_hops))]
    pub async fn find_best_route(
        &self,
        from: &Token,
        to: &Token,
        amount: u128,
        max_hops: usize,
    ) -> Result<Option<Route>, FinderError> {
        if from == to {
            ROUTE_SEARCHES.with_label_values(&["found"]).inc();
            return Ok(Some(Route::direct_transfer(from.clone(), amount)));
        }

        let candidates = match self.candidate_routes(from, to, amount, max_hops).await {
            Ok(candidates) => candidates,
            Err(err) => {
                ROUTE_SEARCHES.with_label_values(&["error"]).inc();
                return Err(err);
            }
        };
        let evaluated = candidates.len();

        match select_min_fee(candidates) {
            Some(best) => {
                ROUTE_SEARCHES.with_label_values(&["found"]).inc();
                info!(
                    hops = best.hops(),
                    total_fee = best.total_fee,
                    output = best.output_amount(),
                    estimated_gas = best.estimated_gas,
                    candidates = evaluated,
                    "selected best route"
                );
                Ok(Some(best))
            }
            None => {
                ROUTE_SEARCHES.with_label_values(&["none"]).inc();
                debug!("no route within hop limit");
                Ok(None)
            }
        }
    }

    /// Every priced simple path within `max_hops`, in enumeration order.
    pub async fn candidate_routes(
        &self,
        from: &Token,
        to: &Token,
        amount: u128,
        max_hops: usize,
    ) -> Result<Vec<Route>, FinderError> {
        let snapshot = self.graph_snapshot().await?;
        let paths = snapshot.graph.simple_paths(from, to, max_hops);
        CANDIDATE_PATHS.inc_by(paths.len() as u64);

        let mut routes = Vec::with_capacity(paths.len());
        for edges in &paths {
            match quote_path(edges, amount) {
                Some(route) => {
                    debug!(
                        hops = route.hops(),
                        total_fee = route.total_fee,
                        output = route.output_amount(),
                        "evaluated candidate path"
                    );
                    routes.push(route);
                }
                None => warn!(hops = edges.len(), "candidate path overflows amount arithmetic; discarded"),
            }
        }
        Ok(routes)
    }

    /// Builds a fresh graph from current registry and pool state.
    pub async fn graph_snapshot(&self) -> Result<GraphBuild, FinderError> {
        let tokens = self.supported_tokens().await?;
        Ok(build_graph(self.registry.as_ref(), self.pool.as_ref(), &tokens).await)
    }

    async fn supported_tokens(&self) -> Result<Vec<Token>, FinderError> {
        let registry = &self.registry;
        let listed = retry(self.registry_backoff.clone(), || async move {
            registry.supported_tokens().await.map_err(|err| {
                debug!(error = %err, "supported token query failed; retrying");
                backoff::Error::transient(err)
            })
        })
        .await
        .map_err(FinderError::Registry)?;

        // registry returns a set; keep first occurrence order
        let mut seen = HashSet::with_capacity(listed.len());
        Ok(listed
            .into_iter()
            .filter(|token| seen.insert(token.clone()))
            .collect())
    }
}

/// First route with the strictly lowest `total_fee`.
pub fn select_min_fee(candidates: impl IntoIterator<Item = Route>) -> Option<Route> {
    let mut best: Option<Route> = None;
    for route in candidates {
        let better = match &best {
            Some(current) => route.total_fee < current.total_fee,
            None => true,
        };
        if better {
            best = Some(route);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(tokens: &[&str], total_fee: u128) -> Route {
        Route {
            path: tokens.iter().map(|t| Token::new(*t)).collect(),
            amounts: vec![100; tokens.len()],
            total_fee,
            estimated_gas: 0,
        }
    }

    #[test]
    fn lowest_fee_wins() {
        let best = select_min_fee(vec![
            route(&["A", "C"], 100),
            route(&["A", "B", "C"], 59),
            route(&["A", "D", "C"], 70),
        ])
        .unwrap();
        assert_eq!(best.total_fee, 59);
    }

    #[test]
    fn ties_keep_first_discovered() {
        let best = select_min_fee(vec![
            route(&["A", "B", "C"], 10),
            route(&["A", "C"], 10),
        ])
        .unwrap();
        assert_eq!(best.path.len(), 3);
    }

    #[test]
    fn empty_candidates_select_nothing() {
        assert!(select_min_fee(Vec::new()).is_none());
    }
}
