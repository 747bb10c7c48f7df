//! Comparison operators accepted in filters

use std::fmt;

use super::errors::{QueryError, QueryResult};

/// A validated comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
    /// `<>`
    NotEqual,
    /// `!=`
    Ne,
}

impl Operator {
    /// Normalize and validate raw operator text.
    ///
    /// One leading `$` is dropped, then the text is trimmed and lower-cased
    /// before matching against the allowed set.
    pub fn parse(raw: &str) -> QueryResult<Self> {
        let trimmed = raw.trim();
        let stripped = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let normalized = stripped.trim().to_lowercase();

        match normalized.as_str() {
            "=" => Ok(Operator::Eq),
            "<" => Ok(Operator::Lt),
            ">" => Ok(Operator::Gt),
            "<=" => Ok(Operator::Lte),
            ">=" => Ok(Operator::Gte),
            "<>" => Ok(Operator::NotEqual),
            "!=" => Ok(Operator::Ne),
            _ => Err(QueryError::unsupported_operator(raw)),
        }
    }

    /// Canonical text form
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::NotEqual => "<>",
            Operator::Ne => "!=",
        }
    }

    /// Returns true for the two inequality spellings
    pub fn is_not_equal(&self) -> bool {
        matches!(self, Operator::NotEqual | Operator::Ne)
    }

    /// Applies the operator to an ordering of `left` relative to `right`
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Operator::Eq => ordering == Equal,
            Operator::Lt => ordering == Less,
            Operator::Gt => ordering == Greater,
            Operator::Lte => ordering != Greater,
            Operator::Gte => ordering != Less,
            Operator::NotEqual | Operator::Ne => ordering != Equal,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
