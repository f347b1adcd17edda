//! Stockroom - a deterministic optimistic-concurrency demonstration
//!
//! Two writers race to update the same stock document in a versioned
//! document store. Their steps are interleaved through one-shot signals
//! so the second writer's first conditional write is always rejected
//! with a version conflict, which it resolves by re-reading and
//! retrying once.

pub mod config;
pub mod domain;
pub mod error;
pub mod race;
pub mod store;

pub use error::{Error, Result};
pub use race::{run, RaceReport};
