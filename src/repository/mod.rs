//! Data repository (Synapse) operations.
//!
//! - `annotate`: push key/value annotations from a results table
//! - `walk`: list files under a container whose names match a pattern

pub mod annotate;
pub mod synapse;
pub mod walk;

use async_trait::async_trait;

use crate::error::RepositoryError;

pub use annotate::{apply_updates, read_updates, AnnotationUpdate};
pub use synapse::{AnnotationValue, Annotations, EntityHeader, SynapseClient};
pub use walk::{walk_files, DEFAULT_FILE_PATTERN};

/// Operations needed from the data repository.
#[async_trait]
pub trait DataRepository: Send + Sync {
    async fn get_annotations(&self, synid: &str) -> Result<Annotations, RepositoryError>;

    async fn set_annotations(&self, annotations: &Annotations)
        -> Result<Annotations, RepositoryError>;

    /// Lists direct file and folder children of a container.
    async fn list_children(&self, parent_id: &str) -> Result<Vec<EntityHeader>, RepositoryError>;
}
