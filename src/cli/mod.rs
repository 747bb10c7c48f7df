//! CLI module for kindql
//!
//! Provides command-line interface for:
//! - render: Print the GQL for a query request
//! - query: Run a query request against a seeded in-memory store

mod args;
mod commands;
mod errors;
mod io;
mod request;

pub use args::{Cli, Command};
pub use commands::{
    execute_request, parse_request, query, render, render_request, run, run_command,
    seed_fixtures,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
pub use request::{FilterSpec, QueryRequest};
