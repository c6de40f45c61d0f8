//! Shared utility functions for htan-artist.
//!
//! Currently holds the subprocess wrapper used by the CLI-backed service
//! clients (`aws`, `bq`, `tw`).

pub mod process;

pub use process::{run_command, CommandOutput};
