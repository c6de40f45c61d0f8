//! Command-line interface for htan-artist.
//!
//! One subcommand per pipeline stage: inventory, tidy, shortlist, launch,
//! annotate and walk.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
