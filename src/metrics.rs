// Metrics and observability module
// This file registers prometheus collectors for route searches, graph
// builds and route execution
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec,
    HistogramVec, IntCounter,
};

pub static ROUTE_SEARCHES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_route_searches_total",
        "route searches by outcome",
        &["outcome"]
    )
    .unwrap()
});

pub static CANDIDATE_PATHS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "router_candidate_paths_total",
        "simple paths evaluated by the route finder"
    )
    .unwrap()
});

pub static EDGES_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "router_graph_edges_skipped_total",
        "token pairs dropped from a graph snapshot after a failed query"
    )
    .unwrap()
});

pub static EXECUTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_executions_total",
        "route executions by outcome",
        &["outcome"]
    )
    .unwrap()
});

pub static EXECUTION_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_execution_failures_total",
        "aborted route executions by failing stage",
        &["stage"]
    )
    .unwrap()
});

pub static CALL_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "router_call_latency_seconds",
        "latency of blocking swap and transfer calls",
        &["stage"]
    )
    .unwrap()
});
