//! Error types for htan-artist operations.
//!
//! Defines error types for each external boundary the stages touch:
//! - Input validation (files, columns, URIs)
//! - Object storage listing and fetching
//! - Tabular query service
//! - Workflow execution platform
//! - Data repository annotations

use thiserror::Error;

/// Errors raised when local inputs are unusable.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File not found: {0}")]
    MissingFile(String),

    #[error("Missing required columns in '{file}': {columns:?}")]
    MissingColumns { file: String, columns: Vec<String> },

    #[error("Input is empty: {0}")]
    EmptyInput(String),

    #[error("Invalid S3 URI: {0}")]
    InvalidS3Uri(String),

    #[error("Invalid S3 URI format: {0}")]
    InvalidS3UriFormat(String),

    #[error("Invalid object URI '{0}': expected s3://bucket/key or gs://bucket/key")]
    InvalidObjectUri(String),

    #[error("Invalid row {row} in '{file}': {reason}")]
    InvalidRow {
        file: String,
        row: usize,
        reason: String,
    },

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while listing or fetching bucket objects.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("'{command}' exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP error ({status}) fetching '{url}'")]
    HttpStatus { status: u16, url: String },

    #[error("Unsupported asset source: {0}")]
    UnsupportedSource(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while querying the entity catalog.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("Query failed with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("Unexpected value for column '{column}': {value}")]
    UnexpectedValue { column: String, value: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while talking to the workflow execution platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("'{command}' exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Dataset ID not found in response: {0}")]
    DatasetIdNotFound(String),

    #[error("No URL found in text: {0}")]
    UrlNotFound(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during data repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Missing auth token: SYNAPSE_AUTH_TOKEN environment variable not set")]
    MissingToken,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({code}) for '{entity}': {message}")]
    ApiError {
        code: u16,
        entity: String,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::RequestFailed(err.to_string())
    }
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        RepositoryError::RequestFailed(err.to_string())
    }
}
