//! Observability subsystem
//!
//! Structured JSON logging for the query pipeline:
//!
//! 1. Observability is read-only and never changes query results
//! 2. Logging is synchronous, no background threads
//! 3. Output is deterministic for the same inputs
//!
//! ```ignore
//! use kindql::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::KeyAllocated, &[("kind", "Widget"), ("id", "7")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

#[cfg(test)]
pub(crate) use logger::capture_events;

/// Log a typed event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a typed event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
