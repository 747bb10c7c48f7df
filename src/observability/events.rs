//! Observable events
//!
//! Events are explicit and typed; each maps to one stable event name.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Connection configuration loaded and validated
    ConfigLoaded,
    /// Connection created over a store client
    ConnectionOpened,

    // Queries
    /// Where clauses compiled and GQL rendered
    QueryCompiled,
    /// Query rejected locally or by the store
    QueryFailed,

    // Writes
    /// Store allocated an id
    KeyAllocated,
    /// Entity persisted
    EntityInserted,
    /// Allocation or insert failed
    WriteFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ConnectionOpened => "CONNECTION_OPENED",
            Event::QueryCompiled => "QUERY_COMPILED",
            Event::QueryFailed => "QUERY_FAILED",
            Event::KeyAllocated => "KEY_ALLOCATED",
            Event::EntityInserted => "ENTITY_INSERTED",
            Event::WriteFailed => "WRITE_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryCompiled => Severity::Trace,
            Event::QueryFailed | Event::WriteFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
