//! Shortlist generation: which released images still need derivatives.
//!
//! Steps, in order:
//! 1. Fetch the latest-assets document and index existing derivatives
//! 2. Query the catalog for every eligible entity
//! 3. Anti-join, optionally filter by cloud provider, sort
//! 4. Write the full samplesheet and a random sample sheet

pub mod catalog;
pub mod eligibility;
pub mod samplesheet;

use std::path::PathBuf;

use tracing::info;

use crate::assets::{fetch_latest_assets, ExistingAssets};
use crate::storage::{HttpFetcher, ObjectStore};

pub use catalog::{BigQueryCli, EligibleEntity, EntityCatalog, ELIGIBLE_ENTITIES_QUERY};
pub use eligibility::{
    compute_eligibility, filter_by_provider, CloudProviderFilter, EligibilityRecord,
    ShortlistStats,
};
pub use samplesheet::{
    create_rng, read_samplesheet, sample_rows, save_samplesheets, write_samplesheet,
    SamplesheetRow, SavedSamplesheets,
};

pub const DEFAULT_ASSETS_URI: &str = "s3://htan-assets/final-output/htan-imaging-assets-latest.json";
pub const DEFAULT_AWS_PROFILE: &str = "htan-dev";
pub const DEFAULT_BQ_PROJECT: &str = "htan-dcc";
pub const DEFAULT_OUTPUT_DIR: &str = "samplesheet";
pub const DEFAULT_SAMPLE_SIZE: usize = 10;
pub const SAVED_ASSETS_FILE: &str = "htan-imaging-assets-latest.json";

/// Settings for one shortlist run.
#[derive(Debug, Clone)]
pub struct ShortlistConfig {
    pub assets_uri: String,
    pub output_dir: PathBuf,
    pub sample_size: usize,
    pub cloud_provider: CloudProviderFilter,
    /// Where to keep a local copy of the assets document, if anywhere.
    pub save_assets: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Default for ShortlistConfig {
    fn default() -> Self {
        Self {
            assets_uri: DEFAULT_ASSETS_URI.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            sample_size: DEFAULT_SAMPLE_SIZE,
            cloud_provider: CloudProviderFilter::All,
            save_assets: None,
            seed: None,
        }
    }
}

impl ShortlistConfig {
    pub fn with_assets_uri(mut self, uri: impl Into<String>) -> Self {
        self.assets_uri = uri.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    pub fn with_cloud_provider(mut self, filter: CloudProviderFilter) -> Self {
        self.cloud_provider = filter;
        self
    }

    pub fn with_saved_assets(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_assets = Some(path.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Result of a shortlist run.
#[derive(Debug, Clone)]
pub struct ShortlistOutcome {
    pub records: Vec<EligibilityRecord>,
    /// `None` when nothing needed processing.
    pub stats: Option<ShortlistStats>,
    pub saved: Option<SavedSamplesheets>,
}

impl ShortlistOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Runs the shortlist stage end to end.
///
/// Fetch and query failures propagate; an empty shortlist is not an error and
/// writes no files.
pub async fn run_shortlist(
    config: &ShortlistConfig,
    store: &dyn ObjectStore,
    http: &HttpFetcher,
    catalog: &dyn EntityCatalog,
) -> anyhow::Result<ShortlistOutcome> {
    let assets =
        fetch_latest_assets(&config.assets_uri, store, http, config.save_assets.as_deref())
            .await?;
    let existing = ExistingAssets::from_entries(&assets);

    let entities = catalog.eligible_entities().await?;
    let records = compute_eligibility(entities, &existing);
    let records = filter_by_provider(records, config.cloud_provider);

    if records.is_empty() {
        info!("No files need processing");
        return Ok(ShortlistOutcome {
            records,
            stats: None,
            saved: None,
        });
    }

    let mut rng = create_rng(config.seed);
    let stats = ShortlistStats::from_records(&records, &mut rng);
    let rows: Vec<SamplesheetRow> = records.iter().map(SamplesheetRow::from).collect();
    let saved = save_samplesheets(&rows, &config.output_dir, config.sample_size, &mut rng)?;

    Ok(ShortlistOutcome {
        records,
        stats: Some(stats),
        saved,
    })
}
