//! kindql CLI entry point
//!
//! Parses arguments and dispatches via `cli::run`, which also writes the
//! error response. Exits non-zero on failure.

use kindql::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
