// Liquidity graph builder
// This file builds a point-in-time directed graph of tradable stablecoin
// pairs from live registry and pool state, and enumerates bounded simple paths
//
// Numan Thabit 2025 Nov

use crate::errors::{EdgeQueryFailure, VenueError};
use crate::metrics::EDGES_SKIPPED;
use crate::router::routes::BPS_DENOMINATOR;
use crate::venues::adapter::{Pool, Ratio, Registry, Token};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Directed tradable pair in one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityEdge {
    pub from: Token,
    pub to: Token,
    /// price(from) / price(to)
    pub weight: Ratio,
    pub fee_bps: u32,
}

/// Adjacency snapshot. Built once per query and dropped afterwards.
#[derive(Debug, Clone, Default)]
pub struct LiquidityGraph {
    adjacency: HashMap<Token, Vec<LiquidityEdge>>,
}

/// Outcome of one graph build: the graph plus every pair that was left out.
#[derive(Debug, Clone, Default)]
pub struct GraphBuild {
    pub graph: LiquidityGraph,
    pub skipped: Vec<EdgeQueryFailure>,
}

/// Result of probing one ordered pair.
enum EdgeProbe {
    Edge(LiquidityEdge),
    /// Reserve below the configured minimum; not a failure.
    Thin,
    Failed(EdgeQueryFailure),
}

impl LiquidityGraph {
    /// Builds from a pre-computed edge list, preserving edge order per source.
    pub fn from_edges(edges: impl IntoIterator<Item = LiquidityEdge>) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            graph.insert(edge);
        }
        graph
    }

    fn insert(&mut self, edge: LiquidityEdge) {
        self.adjacency
            .entry(edge.from.clone())
            .or_default()
            .push(edge);
    }

    pub fn edges_from(&self, token: &Token) -> &[LiquidityEdge] {
        self.adjacency
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn edge(&self, from: &Token, to: &Token) -> Option<&LiquidityEdge> {
        self.edges_from(from).iter().find(|e| &e.to == to)
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Every simple path from `from` to `to` with at most `max_hops` edges,
    /// in depth-first discovery order (outgoing edges visited in insertion
    /// order). Each path is returned as its edge sequence.
    pub fn simple_paths<'a>(
        &'a self,
        from: &Token,
        to: &Token,
        max_hops: usize,
    ) -> Vec<Vec<&'a LiquidityEdge>> {
        let mut found = Vec::new();
        if max_hops == 0 || from == to {
            return found;
        }
        let mut visited: HashSet<&Token> = HashSet::new();
        let mut stack: Vec<&'a LiquidityEdge> = Vec::new();
        let Some((start, _)) = self.adjacency.get_key_value(from) else {
            return found;
        };
        visited.insert(start);
        self.walk(start, to, max_hops, &mut visited, &mut stack, &mut found);
        found
    }

    fn walk<'a>(
        &'a self,
        node: &'a Token,
        target: &Token,
        max_hops: usize,
        visited: &mut HashSet<&'a Token>,
        stack: &mut Vec<&'a LiquidityEdge>,
        found: &mut Vec<Vec<&'a LiquidityEdge>>,
    ) {
        for edge in self.edges_from(node) {
            if visited.contains(&edge.to) {
                continue;
            }
            if &edge.to == target {
                let mut path = stack.clone();
                path.push(edge);
                found.push(path);
                continue;
            }
            if stack.len() + 1 < max_hops {
                visited.insert(&edge.to);
                stack.push(edge);
                self.walk(&edge.to, target, max_hops, visited, stack, found);
                stack.pop();
                visited.remove(&edge.to);
            }
        }
    }
}

/// Queries every ordered pair of supported tokens and assembles a fresh
/// graph. A failing pair only drops its own edge and is reported in
/// [`GraphBuild::skipped`].
pub async fn build_graph<R, P>(
    registry: &R,
    pool: &P,
    tokens: &[Token],
) -> GraphBuild
where
    R: Registry,
    P: Pool,
{
    let pairs: Vec<(&Token, &Token)> = tokens
        .iter()
        .flat_map(|a| tokens.iter().filter(move |b| *b != a).map(move |b| (a, b)))
        .collect();

    // join_all keeps input order, so adjacency follows registry order
    let probes = join_all(
        pairs
            .iter()
            .map(|(from, to)| probe_edge(registry, pool, from, to)),
    )
    .await;

    let mut build = GraphBuild::default();
    let mut thin = 0usize;
    for probe in probes {
        match probe {
            EdgeProbe::Edge(edge) => build.graph.insert(edge),
            EdgeProbe::Thin => thin += 1,
            EdgeProbe::Failed(failure) => {
                warn!(
                    from = %failure.from,
                    to = %failure.to,
                    error = %failure.cause,
                    "skipping edge in liquidity graph"
                );
                EDGES_SKIPPED.inc();
                build.skipped.push(failure);
            }
        }
    }

    debug!(
        tokens = tokens.len(),
        edges = build.graph.edge_count(),
        below_min_liquidity = thin,
        skipped = build.skipped.len(),
        "built liquidity graph"
    );
    build
}

async fn probe_edge<R, P>(registry: &R, pool: &P, from: &Token, to: &Token) -> EdgeProbe
where
    R: Registry,
    P: Pool,
{
    match query_edge(registry, pool, from, to).await {
        Ok(Some(edge)) => EdgeProbe::Edge(edge),
        Ok(None) => EdgeProbe::Thin,
        Err(cause) => EdgeProbe::Failed(EdgeQueryFailure {
            from: from.clone(),
            to: to.clone(),
            cause,
        }),
    }
}

async fn query_edge<R, P>(
    registry: &R,
    pool: &P,
    from: &Token,
    to: &Token,
) -> Result<Option<LiquidityEdge>, VenueError>
where
    R: Registry,
    P: Pool,
{
    let balance = pool.balance(to).await?;
    let min_liquidity = registry.min_liquidity(to).await?;
    if balance < min_liquidity {
        return Ok(None);
    }

    let from_price = registry.price(from).await?;
    let to_price = registry.price(to).await?;
    let weight = from_price.div(&to_price).ok_or_else(|| {
        VenueError::Unavailable(format!("price ratio {from_price} / {to_price} overflows"))
    })?;
    let fee_bps = pool.swap_fee_bps().await?;
    if u128::from(fee_bps) > BPS_DENOMINATOR {
        return Err(VenueError::InvalidFee { fee_bps });
    }

    Ok(Some(LiquidityEdge {
        from: from.clone(),
        to: to.clone(),
        weight,
        fee_bps,
    }))
}
