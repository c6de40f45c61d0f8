//! Pipeline parameter file written for each launch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PlatformError;

/// Parameters consumed by the artist pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub input: String,
    pub outdir: String,
}

/// A parameter file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamsFile {
    path: PathBuf,
}

impl ParamsFile {
    /// Writes `params_<run_id>.yaml` under `dir`, creating `dir` if needed.
    pub fn create(
        dir: &Path,
        run_id: &str,
        params: &PipelineParams,
    ) -> Result<Self, PlatformError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("params_{}.yaml", run_id));
        std::fs::write(&path, serde_yaml::to_string(params)?)?;
        info!(path = %path.display(), "Created parameters file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file. Failures are logged and otherwise ignored.
    ///
    /// Returns true when the file was removed.
    pub fn cleanup(&self) -> bool {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "Parameters file not found for cleanup");
            return false;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Removed parameters file");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove parameters file");
                false
            }
        }
    }
}

/// Output location for a run: `<output_bucket>/<run_name>`.
pub fn output_path(output_bucket: &str, run_name: &str) -> String {
    format!("{}/{}", output_bucket.trim_end_matches('/'), run_name)
}
