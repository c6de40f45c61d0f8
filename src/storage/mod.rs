//! Object storage access for bucket inventories and asset documents.
//!
//! Provides:
//! - URI parsing for `s3://` and `gs://` objects
//! - The headerless TSV inventory format
//! - An [`ObjectStore`] seam with an `aws` CLI backed implementation
//! - A plain HTTP fetcher for content-delivery URLs

pub mod aws_cli;
pub mod http;
pub mod inventory;
pub mod uri;

use async_trait::async_trait;

use crate::error::StorageError;

pub use aws_cli::{AwsCli, BucketType};
pub use http::HttpFetcher;
pub use inventory::{read_inventory, write_inventory, write_inventory_to, InventoryEntry};
pub use uri::{cloud_provider, parse_s3_uri, CloudProvider, ObjectUri};

/// Read access to a bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object in `bucket`.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<InventoryEntry>, StorageError>;

    /// Fetches an object body as text.
    async fn get_object(&self, uri: &ObjectUri) -> Result<String, StorageError>;
}
