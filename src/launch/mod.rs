//! Launch driver for the artist pipeline.
//!
//! Uploads a samplesheet as a platform dataset, resolves its URL, writes a
//! parameter file and submits a run. Names are disambiguated with a short
//! random run id.

pub mod extract;
pub mod params;
pub mod platform;
pub mod run_id;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ValidationError;

pub use extract::{extract_dataset_id, extract_url};
pub use params::{output_path, ParamsFile, PipelineParams};
pub use platform::{LaunchRequest, TowerCli, WorkflowPlatform};
pub use run_id::{dataset_name, generate_run_id, run_name};

pub const DEFAULT_WORKSPACE: &str = "253119656982040";
pub const DEFAULT_COMPUTE_ENV: &str = "3k6bQPIqpII2nGlDMbc9Mv";
pub const DEFAULT_PIPELINE_URL: &str = "https://github.com/Sage-Bionetworks-Workflows/nf-artist";
pub const DEFAULT_SAMPLESHEET: &str = "samplesheet/artist-samplesheet-sample10.csv";
pub const DEFAULT_OUTPUT_BUCKET: &str = "s3://htan-project-tower-bucket/outputs";
pub const DEFAULT_REVISION: &str = "main";
pub const DEFAULT_PARAMS_DIR: &str = "params";
pub const DATASET_DESCRIPTION: &str = "Samplesheet for artist pipeline";

const REQUIRED_COLUMNS: &[&str] = &["id", "image"];

/// Checks the samplesheet exists, has `id` and `image` columns and at least one row.
///
/// Returns the number of data rows.
pub fn validate_samplesheet(path: &Path) -> Result<usize, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::MissingFile(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h.trim() == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns {
            file: path.display().to_string(),
            columns: missing,
        });
    }

    let mut rows = 0;
    for record in reader.records() {
        record?;
        rows += 1;
    }
    if rows == 0 {
        return Err(ValidationError::EmptyInput(format!(
            "Samplesheet is empty: {}",
            path.display()
        )));
    }

    info!(rows, path = %path.display(), "Validated samplesheet");
    Ok(rows)
}

/// Settings for one launch.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub samplesheet: PathBuf,
    pub workspace: String,
    pub compute_env: String,
    pub output_bucket: String,
    pub pipeline_url: String,
    pub revision: String,
    pub params_dir: PathBuf,
    pub keep_params: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            samplesheet: PathBuf::from(DEFAULT_SAMPLESHEET),
            workspace: DEFAULT_WORKSPACE.to_string(),
            compute_env: DEFAULT_COMPUTE_ENV.to_string(),
            output_bucket: DEFAULT_OUTPUT_BUCKET.to_string(),
            pipeline_url: DEFAULT_PIPELINE_URL.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            params_dir: PathBuf::from(DEFAULT_PARAMS_DIR),
            keep_params: false,
        }
    }
}

impl LaunchConfig {
    pub fn new(samplesheet: impl Into<PathBuf>) -> Self {
        Self {
            samplesheet: samplesheet.into(),
            ..Self::default()
        }
    }

    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn with_compute_env(mut self, compute_env: impl Into<String>) -> Self {
        self.compute_env = compute_env.into();
        self
    }

    pub fn with_output_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.output_bucket = bucket.into();
        self
    }

    pub fn with_pipeline(mut self, url: impl Into<String>, revision: impl Into<String>) -> Self {
        self.pipeline_url = url.into();
        self.revision = revision.into();
        self
    }

    pub fn with_params_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.params_dir = dir.into();
        self
    }

    pub fn keep_params(mut self, keep: bool) -> Self {
        self.keep_params = keep;
        self
    }
}

/// Identifiers of a submitted run. Not persisted beyond the parameter file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDescriptor {
    pub run_id: String,
    pub run_name: String,
    pub dataset_name: String,
    pub dataset_id: String,
    pub dataset_url: String,
    pub output_path: String,
    pub pipeline_revision: String,
}

/// Result of a successful launch.
#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    pub run: RunDescriptor,
    pub params_file: PathBuf,
    /// Whether the parameter file was left on disk.
    pub params_kept: bool,
    /// Raw platform response to the launch call.
    pub response: String,
}

/// Runs the launch stage end to end.
///
/// Any platform failure aborts the launch; the parameter file is removed
/// only after a successful submission and only when not asked to keep it.
pub async fn run_launch(
    config: &LaunchConfig,
    platform: &dyn WorkflowPlatform,
) -> anyhow::Result<LaunchOutcome> {
    validate_samplesheet(&config.samplesheet)?;

    let run_id = generate_run_id();
    let dataset = dataset_name(&run_id);
    let run = run_name(&run_id);
    info!(run_id = %run_id, "Starting pipeline launch");

    let response = platform
        .add_dataset(&config.samplesheet, &config.workspace, &dataset, DATASET_DESCRIPTION)
        .await?;
    let dataset_id = extract_dataset_id(&response)?;
    info!(dataset_id = %dataset_id, "Dataset uploaded");

    let response = platform.dataset_url(&dataset_id, &config.workspace).await?;
    let dataset_url = extract_url(&response)?;
    info!(url = %dataset_url, "Resolved dataset URL");

    let outdir = output_path(&config.output_bucket, &run);
    let params_file = ParamsFile::create(
        &config.params_dir,
        &run_id,
        &PipelineParams {
            input: dataset_url.clone(),
            outdir: outdir.clone(),
        },
    )?;

    let request = LaunchRequest {
        workspace: &config.workspace,
        compute_env: &config.compute_env,
        run_name: &run,
        revision: &config.revision,
        pipeline_url: &config.pipeline_url,
        params_file: params_file.path(),
    };
    let response = platform.launch(&request).await?;
    info!(run_name = %run, "Pipeline launched successfully");

    let params_kept = if config.keep_params {
        info!(path = %params_file.path().display(), "Keeping parameters file");
        true
    } else {
        !params_file.cleanup()
    };

    Ok(LaunchOutcome {
        run: RunDescriptor {
            run_id,
            run_name: run,
            dataset_name: dataset,
            dataset_id,
            dataset_url,
            output_path: outdir,
            pipeline_revision: config.revision.clone(),
        },
        params_file: params_file.path().to_path_buf(),
        params_kept,
        response: response.trim().to_string(),
    })
}
