//! Accumulated query state
//!
//! Everything a builder has been told so far. Rendering is a pure function
//! of this value once compiled.

use serde::{Deserialize, Serialize};

use super::clause::WhereClause;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// GQL keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Query state owned by one builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    /// Target kind
    pub kind: Option<String>,
    /// Partition to query
    pub namespace: Option<String>,
    /// Filter clauses in insertion order
    pub wheres: Vec<WhereClause>,
    /// Projected fields in insertion order, no duplicates
    pub projections: Vec<String>,
    /// Sort specifications in priority order
    pub orders: Vec<SortSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Fields excluded from indexing on insert
    pub exclude_from_indexes: Vec<String>,
    /// Execution timeout in seconds, passed through to the store
    pub timeout: Option<u64>,
}

impl QueryState {
    /// Creates an empty state targeting a kind
    pub fn for_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Default::default()
        }
    }

    /// Adds projected fields, skipping ones already present
    pub fn add_projections<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.projections.contains(&field) {
                self.projections.push(field);
            }
        }
    }

    /// Adds index-excluded fields, skipping ones already present
    pub fn add_index_exclusions<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.exclude_from_indexes.contains(&field) {
                self.exclude_from_indexes.push(field);
            }
        }
    }

    /// Returns true if the query selects every field
    pub fn selects_all(&self) -> bool {
        self.projections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projections_deduplicated_in_order() {
        let mut state = QueryState::for_kind("Widget");
        state.add_projections(["name", "price"]);
        state.add_projections(["name", "color"]);
        assert_eq!(state.projections, vec!["name", "price", "color"]);
    }

    #[test]
    fn test_index_exclusions_deduplicated() {
        let mut state = QueryState::default();
        state.add_index_exclusions(["bio", "bio", "notes"]);
        assert_eq!(state.exclude_from_indexes, vec!["bio", "notes"]);
    }

    #[test]
    fn test_selects_all_by_default() {
        assert!(QueryState::for_kind("Widget").selects_all());
    }

    #[test]
    fn test_sort_spec_constructors() {
        assert_eq!(SortSpec::asc("name").direction, SortDirection::Asc);
        assert_eq!(SortSpec::desc("name").direction.as_str(), "DESC");
    }
}
