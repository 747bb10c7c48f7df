//! CLI argument definitions using clap
//!
//! Commands:
//! - kindql render
//! - kindql query --config <path> [--fixtures <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kindql - fluent queries over a key/kind entity store
#[derive(Parser, Debug)]
#[command(name = "kindql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a query request from stdin as GQL without running it
    Render,

    /// Run a query request from stdin against an in-memory store
    Query {
        /// Path to connection configuration file
        #[arg(long, default_value = "./kindql.json")]
        config: PathBuf,

        /// JSON file of entities to seed, keyed by kind
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from(["kindql", "render"]).unwrap();
        assert!(matches!(cli.command, Command::Render));
    }

    #[test]
    fn test_parse_query_defaults() {
        let cli = Cli::try_parse_from(["kindql", "query"]).unwrap();
        match cli.command {
            Command::Query { config, fixtures } => {
                assert_eq!(config, PathBuf::from("./kindql.json"));
                assert!(fixtures.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_query_with_fixtures() {
        let cli = Cli::try_parse_from([
            "kindql", "query", "--config", "conn.json", "--fixtures", "seed.json",
        ])
        .unwrap();
        match cli.command {
            Command::Query { fixtures, .. } => {
                assert_eq!(fixtures, Some(PathBuf::from("seed.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
