//! Query executor subsystem
//!
//! Runs compiled queries against an [`EntityStore`](crate::store::EntityStore)
//! and turns what comes back into records; allocates ids for inserts.
//!
//! # Invariants
//!
//! - Exactly one store round trip per execution
//! - Store errors surface unchanged, tagged as read or write failures
//! - No caching, no retries

mod allocator;
mod executor;
mod materializer;

pub use allocator::IdentityAllocator;
pub use executor::QueryExecutor;
pub use materializer::{Record, RecordCursor};
