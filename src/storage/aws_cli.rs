//! `aws` CLI backed object store.
//!
//! Listing goes through `aws s3api list-objects-v2` (the CLI follows
//! continuation tokens itself); object bodies are streamed with
//! `aws s3 cp <uri> -`. GCS buckets are reached through the S3
//! interoperability endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::utils::{run_command, CommandOutput};

use super::inventory::{parse_modified, InventoryEntry};
use super::uri::{CloudProvider, ObjectUri};
use super::ObjectStore;

const AWS_PROGRAM: &str = "aws";
const GCS_INTEROP_ENDPOINT: &str = "https://storage.googleapis.com";

/// Kind of bucket being addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BucketType {
    #[default]
    Aws,
    Gcs,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListObjectsResponse {
    #[serde(default)]
    contents: Vec<ListedObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    key: String,
    last_modified: String,
}

/// Object store that shells out to the `aws` CLI.
#[derive(Debug, Clone)]
pub struct AwsCli {
    profile: String,
    bucket_type: BucketType,
    program: String,
}

impl AwsCli {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            bucket_type: BucketType::Aws,
            program: AWS_PROGRAM.to_string(),
        }
    }

    pub fn with_bucket_type(mut self, bucket_type: BucketType) -> Self {
        self.bucket_type = bucket_type;
        self
    }

    /// Overrides the executable, e.g. a wrapper script.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    fn base_args(&self, gcs: bool) -> Vec<String> {
        let mut args = vec!["--profile".to_string(), self.profile.clone()];
        if gcs {
            args.push("--endpoint-url".to_string());
            args.push(GCS_INTEROP_ENDPOINT.to_string());
        }
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<CommandOutput, StorageError> {
        let output = run_command(&self.program, &args, &[])
            .await
            .map_err(|e| StorageError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;
        if !output.success() {
            return Err(StorageError::CommandFailed {
                command: output.command,
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

/// Converts `list-objects-v2` JSON output into inventory entries.
pub fn parse_listing(bucket: &str, json: &str) -> Result<Vec<InventoryEntry>, StorageError> {
    // An empty bucket produces no output at all.
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let response: ListObjectsResponse = serde_json::from_str(json)?;
    response
        .contents
        .into_iter()
        .map(|obj| {
            let modified = parse_modified(&obj.last_modified)?;
            Ok(InventoryEntry::new(bucket, obj.key, modified))
        })
        .collect()
}

#[async_trait]
impl ObjectStore for AwsCli {
    async fn list_objects(&self, bucket: &str) -> Result<Vec<InventoryEntry>, StorageError> {
        info!(bucket, profile = %self.profile, "Listing bucket objects");
        let mut args = vec![
            "s3api".to_string(),
            "list-objects-v2".to_string(),
            "--bucket".to_string(),
            bucket.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        args.extend(self.base_args(self.bucket_type == BucketType::Gcs));

        let output = self.run(args).await?;
        let entries = parse_listing(bucket, &output.stdout)?;
        info!(bucket, objects = entries.len(), "Listed bucket objects");
        Ok(entries)
    }

    async fn get_object(&self, uri: &ObjectUri) -> Result<String, StorageError> {
        debug!(uri = %uri, "Fetching object through aws CLI");
        let mut args = vec![
            "s3".to_string(),
            "cp".to_string(),
            format!("s3://{}/{}", uri.bucket, uri.key),
            "-".to_string(),
        ];
        args.extend(self.base_args(uri.provider == CloudProvider::Gs));

        let output = self.run(args).await?;
        Ok(output.stdout)
    }
}
