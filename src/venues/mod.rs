// Venue module - chain-facing interfaces and the in-memory snapshot venue
//
// Numan Thabit 2025 Nov

pub mod adapter;
pub mod snapshot;

pub use adapter::{Account, Pool, Ratio, Registry, Token, TxId};
pub use snapshot::SnapshotVenue;
