//! htan-artist: stages of the HTAN imaging derivative workflow.
//!
//! Each stage is independent and exchanges files with the next one:
//! bucket inventory, asset tidying, shortlist/samplesheet generation,
//! pipeline launch and annotation write-back.

pub mod assets;
pub mod cli;
pub mod error;
pub mod launch;
pub mod repository;
pub mod shortlist;
pub mod storage;
pub mod utils;

// Re-export commonly used error types
pub use error::{PlatformError, QueryError, RepositoryError, StorageError, ValidationError};
