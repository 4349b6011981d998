// Router module - routing and execution plane
// This file wires the liquidity graph, the route finder, the route executor
// and the payment facade together
//
// Numan Thabit 2025 Nov

pub mod execution;
pub mod finder;
pub mod graph;
pub mod routes;

#[allow(clippy::module_inception)]
pub mod router;

pub use execution::{ExecutionState, ExecutionStats, RouteExecutor};
pub use finder::RouteFinder;
pub use graph::{GraphBuild, LiquidityEdge, LiquidityGraph};
pub use router::{PaymentReceipt, PaymentRouter};
pub use routes::Route;
