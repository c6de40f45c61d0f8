//! Workflow execution platform access.
//!
//! [`TowerCli`] drives the Seqera Platform through the `tw` command-line
//! client. Credentials (`TOWER_ACCESS_TOKEN`) come from the environment.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::PlatformError;
use crate::utils::run_command;

const TW_PROGRAM: &str = "tw";

/// Prefix for every `tw` invocation: ask for JSON output.
const JSON_OUTPUT: [&str; 2] = ["-o", "json"];

fn tw_args(args: &[&str]) -> Vec<String> {
    JSON_OUTPUT
        .iter()
        .chain(args)
        .map(|a| a.to_string())
        .collect()
}

/// Everything needed to submit one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest<'a> {
    pub workspace: &'a str,
    pub compute_env: &'a str,
    pub run_name: &'a str,
    pub revision: &'a str,
    pub pipeline_url: &'a str,
    pub params_file: &'a Path,
}

/// Operations the launch driver needs from the platform.
///
/// Each call returns the platform's raw response; callers extract
/// identifiers from it.
#[async_trait]
pub trait WorkflowPlatform: Send + Sync {
    async fn add_dataset(
        &self,
        samplesheet: &Path,
        workspace: &str,
        name: &str,
        description: &str,
    ) -> Result<String, PlatformError>;

    async fn dataset_url(&self, dataset_id: &str, workspace: &str)
        -> Result<String, PlatformError>;

    async fn launch(&self, request: &LaunchRequest<'_>) -> Result<String, PlatformError>;
}

/// Platform client that shells out to `tw`.
#[derive(Debug, Clone)]
pub struct TowerCli {
    program: String,
    api_endpoint: Option<String>,
}

impl Default for TowerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl TowerCli {
    pub fn new() -> Self {
        Self {
            program: TW_PROGRAM.to_string(),
            api_endpoint: None,
        }
    }

    /// Points `tw` at a specific API endpoint via `TOWER_API_ENDPOINT`.
    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: Vec<String>) -> Result<String, PlatformError> {
        let envs: Vec<(String, String)> = self
            .api_endpoint
            .iter()
            .map(|e| ("TOWER_API_ENDPOINT".to_string(), e.clone()))
            .collect();
        let output = run_command(&self.program, &args, &envs)
            .await
            .map_err(|e| PlatformError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;
        if !output.success() {
            return Err(PlatformError::CommandFailed {
                command: output.command,
                code: output.code,
                stderr: output.stderr,
            });
        }
        debug!(response = %output.stdout.trim(), "tw response");
        Ok(output.stdout)
    }
}

pub(crate) fn add_dataset_args(
    samplesheet: &Path,
    workspace: &str,
    name: &str,
    description: &str,
) -> Vec<String> {
    let samplesheet = samplesheet.display().to_string();
    tw_args(&[
        "datasets",
        "add",
        &samplesheet,
        "--workspace",
        workspace,
        "--name",
        name,
        "--description",
        description,
        "--overwrite",
        "--header",
    ])
}

pub(crate) fn dataset_url_args(dataset_id: &str, workspace: &str) -> Vec<String> {
    tw_args(&["datasets", "url", "--id", dataset_id, "--workspace", workspace])
}

pub(crate) fn launch_args(request: &LaunchRequest<'_>) -> Vec<String> {
    let params_file = request.params_file.display().to_string();
    tw_args(&[
        "launch",
        "--workspace",
        request.workspace,
        "--compute-env",
        request.compute_env,
        "--name",
        request.run_name,
        "--revision",
        request.revision,
        "--wait",
        "SUBMITTED",
        request.pipeline_url,
        "--profile",
        "tower",
        "--params-file",
        &params_file,
    ])
}

#[async_trait]
impl WorkflowPlatform for TowerCli {
    async fn add_dataset(
        &self,
        samplesheet: &Path,
        workspace: &str,
        name: &str,
        description: &str,
    ) -> Result<String, PlatformError> {
        info!(dataset = name, path = %samplesheet.display(), "Uploading dataset");
        self.run(add_dataset_args(samplesheet, workspace, name, description))
            .await
    }

    async fn dataset_url(
        &self,
        dataset_id: &str,
        workspace: &str,
    ) -> Result<String, PlatformError> {
        info!(dataset_id, "Getting dataset URL");
        self.run(dataset_url_args(dataset_id, workspace)).await
    }

    async fn launch(&self, request: &LaunchRequest<'_>) -> Result<String, PlatformError> {
        info!(run_name = request.run_name, "Launching pipeline run");
        self.run(launch_args(request)).await
    }
}
