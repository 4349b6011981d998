// Library root module for stable-router
// This file defines the public API and module structure of the stablecoin
// payment routing engine
//
// Numan Thabit 2025 Nov

pub mod config;
pub mod control;
pub mod errors;
pub mod metrics;
pub mod router;
pub mod venues;
