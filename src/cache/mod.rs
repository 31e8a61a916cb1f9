//! Resource cache with TTL expiry.
//!
//! This module provides:
//! - A `CacheStore` that answers "is this payload still fresh"
//! - Storage backends: SQLite (survives between commands), no-op, and memory in tests
//! - An injectable `Clock` so expiry is deterministic in tests

mod layer;
mod storage;
mod traits;

pub use layer::CacheStore;
pub use storage::{CacheStorage, NoopStorage, SqliteStorage};
pub use traits::{Clock, Fetched, Source, SystemClock};

#[cfg(test)]
pub use storage::MemoryStorage;
#[cfg(test)]
pub use traits::ManualClock;
