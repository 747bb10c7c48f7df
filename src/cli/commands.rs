//! CLI command implementations
//!
//! Each command reads one request from stdin and writes one response to
//! stdout. Failures are written as error responses by [`run`].

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::connection::{Connection, ConnectionConfig};
use crate::query::QueryBuilder;
use crate::store::{MemoryStore, Properties};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};
use super::request::QueryRequest;

/// Main CLI entry point
///
/// Parses arguments, dispatches, and reports failures on stdout before
/// handing them back for the exit status.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Render => render(),
        Command::Query { config, fixtures } => query(&config, fixtures.as_deref()),
    }
}

/// Render a request from stdin as GQL
pub fn render() -> CliResult<()> {
    let request = parse_request(read_request()?)?;
    write_response(render_request(&request)?)
}

/// Run a request from stdin against a seeded in-memory store
pub fn query(config_path: &Path, fixtures: Option<&Path>) -> CliResult<()> {
    let config = ConnectionConfig::load(config_path)?;
    let connection = Connection::new(config, Arc::new(MemoryStore::new()))?;

    if let Some(path) = fixtures {
        seed_fixtures(&connection, path)?;
    }

    let request = parse_request(read_request()?)?;
    write_response(execute_request(&connection, &request)?)
}

pub fn parse_request(value: Value) -> CliResult<QueryRequest> {
    serde_json::from_value(value)
        .map_err(|e| CliError::invalid_request(format!("Invalid query request: {}", e)))
}

/// `{"gql": ...}` for a request, without touching any store
pub fn render_request(request: &QueryRequest) -> CliResult<Value> {
    let builder = request.apply(QueryBuilder::new(Arc::new(MemoryStore::new())));
    Ok(json!({ "gql": builder.to_gql()? }))
}

/// Runs a request; `find` yields one record or null, otherwise a list
pub fn execute_request(connection: &Connection, request: &QueryRequest) -> CliResult<Value> {
    let builder = request.apply(connection.query());

    if request.find.is_some() {
        let record = builder.first(&[])?;
        return Ok(record.map(|r| r.to_value()).unwrap_or(Value::Null));
    }

    let records = builder.get(&[])?;
    Ok(Value::Array(records.iter().map(|r| r.to_value()).collect()))
}

/// Inserts every entity of a `{"Kind": [{...}, ...]}` file.
///
/// Returns the number of entities inserted.
pub fn seed_fixtures(connection: &Connection, path: &Path) -> CliResult<usize> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read fixtures: {}", e)))?;
    let fixtures: Map<String, Value> = serde_json::from_str(&content)
        .map_err(|e| CliError::invalid_request(format!("Invalid fixtures JSON: {}", e)))?;

    let mut inserted = 0;
    for (kind, rows) in fixtures {
        let rows = rows.as_array().ok_or_else(|| {
            CliError::invalid_request(format!("Fixtures for '{}' must be an array", kind))
        })?;

        let mut entities: Vec<Properties> = Vec::with_capacity(rows.len());
        for row in rows {
            let properties = row.as_object().cloned().ok_or_else(|| {
                CliError::invalid_request(format!("Fixture rows for '{}' must be objects", kind))
            })?;
            entities.push(properties);
        }

        inserted += connection.table(kind).insert(entities)?.len();
    }

    Ok(inserted)
}
