//! Query error types
//!
//! Error codes:
//! - KINDQL_UNSUPPORTED_OPERATOR (REJECT)
//! - KINDQL_MISSING_TARGET_KIND (REJECT)
//! - KINDQL_STORE_QUERY (ERROR)
//! - KINDQL_STORE_WRITE (ERROR)
//!
//! REJECT errors are raised locally before any store call is made.
//! ERROR codes wrap the store client's error unchanged.

use std::fmt;

use crate::store::StoreError;

/// Severity levels for query errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected before reaching the store
    Reject,
    /// The store reported a failure
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Query error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// Filter operator outside the allowed set
    UnsupportedOperator,
    /// No target kind set before compile or insert
    MissingTargetKind,
    /// Remote execution of a rendered query failed
    StoreQuery,
    /// Key allocation or entity insertion failed
    StoreWrite,
}

impl QueryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::UnsupportedOperator => "KINDQL_UNSUPPORTED_OPERATOR",
            QueryErrorCode::MissingTargetKind => "KINDQL_MISSING_TARGET_KIND",
            QueryErrorCode::StoreQuery => "KINDQL_STORE_QUERY",
            QueryErrorCode::StoreWrite => "KINDQL_STORE_WRITE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            QueryErrorCode::UnsupportedOperator | QueryErrorCode::MissingTargetKind => {
                Severity::Reject
            }
            QueryErrorCode::StoreQuery | QueryErrorCode::StoreWrite => Severity::Error,
        }
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error type with full context
#[derive(Debug, Clone)]
pub struct QueryError {
    /// Error code
    code: QueryErrorCode,
    /// Human-readable message
    message: String,
    /// Store error this was raised from, if any
    source: Option<StoreError>,
}

impl QueryError {
    /// Create an unsupported operator error
    pub fn unsupported_operator(operator: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::UnsupportedOperator,
            message: format!("Operator '{}' is not supported", operator.into()),
            source: None,
        }
    }

    /// Create a missing target kind error
    pub fn missing_target_kind() -> Self {
        Self {
            code: QueryErrorCode::MissingTargetKind,
            message: "No target kind set; call from(kind) first".into(),
            source: None,
        }
    }

    /// Wrap a store failure raised while running a query
    pub fn store_query(source: StoreError) -> Self {
        Self {
            code: QueryErrorCode::StoreQuery,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Wrap a store failure raised while allocating or inserting
    pub fn store_write(source: StoreError) -> Self {
        Self {
            code: QueryErrorCode::StoreWrite,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the underlying store error, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        self.source.as_ref()
    }

    /// Returns true if this error was raised before reaching the store
    pub fn is_rejected(&self) -> bool {
        self.severity() == Severity::Reject
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
