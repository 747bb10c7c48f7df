//! # Store Client Errors
//!
//! Errors raised by an [`EntityStore`](super::EntityStore) implementation.
//! The query layer never translates these; it only tags them as read or
//! write failures.

use thiserror::Error;

/// Result type for store client operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("Store unavailable")]
    Unavailable,

    /// A query embedded literal values without allowing them
    #[error("Literal values are not allowed in this query")]
    LiteralsNotAllowed,

    /// The store rejected the query text
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A write was attempted with a key that has no id
    #[error("Incomplete key: {0}")]
    IncompleteKey(String),

    /// An insert collided with an existing entity
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}
