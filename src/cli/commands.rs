//! CLI command definitions for htan-artist.
//!
//! Each subcommand runs one stage to completion and exits. Stages hand
//! results to each other only through files.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use crate::assets::{tidy_inventory, TidyConfig};
use crate::launch::{
    run_launch, LaunchConfig, TowerCli, DEFAULT_COMPUTE_ENV, DEFAULT_OUTPUT_BUCKET,
    DEFAULT_PARAMS_DIR, DEFAULT_PIPELINE_URL, DEFAULT_REVISION, DEFAULT_SAMPLESHEET,
    DEFAULT_WORKSPACE,
};
use crate::repository::{
    apply_updates, read_updates, walk_files, SynapseClient, DEFAULT_FILE_PATTERN,
};
use crate::shortlist::{
    run_shortlist, BigQueryCli, CloudProviderFilter, ShortlistConfig, DEFAULT_ASSETS_URI,
    DEFAULT_AWS_PROFILE, DEFAULT_BQ_PROJECT, DEFAULT_OUTPUT_DIR, DEFAULT_SAMPLE_SIZE,
    SAVED_ASSETS_FILE,
};
use crate::storage::{
    read_inventory, write_inventory, write_inventory_to, AwsCli, BucketType, HttpFetcher,
    ObjectStore,
};

const DEFAULT_TIDY_INPUT: &str = "assets/htan-assets-bucket.tsv";
const DEFAULT_TIDY_OUTPUT_DIR: &str = "assets";
const DEFAULT_ANNOTATIONS_TABLE: &str = "tmp/succeeded.csv";
const DEFAULT_WALK_ROOT: &str = "syn25892951";

/// HTAN imaging assets toolkit.
#[derive(Parser)]
#[command(name = "htan-artist")]
#[command(about = "Inventory, shortlist and launch HTAN imaging derivative generation")]
#[command(version)]
#[command(
    long_about = "htan-artist groups the stages of the HTAN artist workflow.\n\nStages run independently and exchange files:\n  inventory -> tidy -> shortlist -> launch -> annotate\n\nExample usage:\n  htan-artist shortlist --cloud-provider s3 --sample-size 10\n  htan-artist launch --samplesheet samplesheet/artist-samplesheet-sample10.csv"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable debug logging (same as --log-level debug).
    #[arg(long, global = true)]
    pub debug: bool,
}

impl Cli {
    /// Effective log filter, before any `RUST_LOG` override.
    pub fn log_filter(&self) -> String {
        if self.debug {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List every object in a bucket as bucket/key/modified triplets.
    #[command(alias = "ls")]
    Inventory(InventoryArgs),

    /// Parse a bucket inventory into asset records and the latest-assets lookup.
    Tidy(TidyArgs),

    /// Generate samplesheets for released images missing derivatives.
    Shortlist(ShortlistArgs),

    /// Upload a samplesheet and launch the artist pipeline.
    Launch(LaunchArgs),

    /// Push key/value annotations from a results table onto entities.
    Annotate(AnnotateArgs),

    /// List files under a container whose names match a pattern.
    Walk(WalkArgs),
}

/// Arguments for `htan-artist inventory`.
#[derive(Parser, Debug)]
pub struct InventoryArgs {
    /// Bucket name.
    #[arg(short = 'b', long)]
    pub bucket: String,

    /// Bucket type; gcs goes through the S3 interoperability endpoint.
    #[arg(short = 't', long, value_enum, default_value = "aws")]
    pub bucket_type: BucketType,

    /// AWS profile to use.
    #[arg(short = 'p', long, default_value = "default")]
    pub profile: String,

    /// Output TSV file (defaults to stdout).
    #[arg(short = 'o', long)]
    pub output_file: Option<PathBuf>,
}

/// Arguments for `htan-artist tidy`.
#[derive(Parser, Debug)]
pub struct TidyArgs {
    /// Inventory TSV produced by `inventory`.
    #[arg(short = 'i', long, default_value = DEFAULT_TIDY_INPUT)]
    pub input: PathBuf,

    /// Directory for the tidy CSV, latest CSV and lookup JSON.
    #[arg(short = 'o', long, default_value = DEFAULT_TIDY_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Public base URL serving the assets bucket.
    #[arg(long, default_value = crate::assets::tidy::DEFAULT_CDN_BASE)]
    pub cdn_base: String,

    /// Drop keys containing this token (repeatable). Replaces the default list.
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,
}

/// Arguments for `htan-artist shortlist`.
#[derive(Parser, Debug)]
pub struct ShortlistArgs {
    /// S3 URI, HTTP(S) URL or local path of the latest-assets JSON.
    #[arg(long, default_value = DEFAULT_ASSETS_URI)]
    pub assets_uri: String,

    /// AWS profile name for S3 access.
    #[arg(long, default_value = DEFAULT_AWS_PROFILE)]
    pub aws_profile: String,

    /// Google Cloud BigQuery project ID.
    #[arg(long, default_value = DEFAULT_BQ_PROJECT)]
    pub bigquery_project: String,

    /// Output directory for samplesheets.
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Number of records in the sample samplesheet (at least 1).
    #[arg(
        long,
        default_value_t = DEFAULT_SAMPLE_SIZE,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub sample_size: usize,

    /// Filter by cloud provider.
    #[arg(long, value_enum, default_value = "all")]
    pub cloud_provider: CloudProviderFilter,

    /// Save the fetched assets JSON locally.
    #[arg(long)]
    pub save_assets: bool,

    /// Seed for the random sample (omit for a fresh sample each run).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `htan-artist launch`.
#[derive(Parser, Debug)]
pub struct LaunchArgs {
    /// Path to the samplesheet CSV file.
    #[arg(long, default_value = DEFAULT_SAMPLESHEET)]
    pub samplesheet: PathBuf,

    /// Seqera Platform workspace ID.
    #[arg(long, default_value = DEFAULT_WORKSPACE)]
    pub workspace: String,

    /// Compute environment ID.
    #[arg(long, default_value = DEFAULT_COMPUTE_ENV)]
    pub compute_env: String,

    /// Bucket prefix for pipeline outputs.
    #[arg(long, default_value = DEFAULT_OUTPUT_BUCKET)]
    pub output_bucket: String,

    /// Git URL of the artist pipeline.
    #[arg(long, default_value = DEFAULT_PIPELINE_URL)]
    pub pipeline_url: String,

    /// Pipeline revision/branch to use.
    #[arg(long, default_value = DEFAULT_REVISION)]
    pub revision: String,

    /// Directory for the generated parameter file.
    #[arg(long, default_value = DEFAULT_PARAMS_DIR)]
    pub params_dir: PathBuf,

    /// Keep the parameter file after launch.
    #[arg(long)]
    pub keep_params: bool,

    /// Seqera Platform API endpoint (passed to `tw`).
    #[arg(long, env = "TOWER_API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `htan-artist annotate`.
#[derive(Parser, Debug)]
pub struct AnnotateArgs {
    /// CSV with synid, key and value in columns 1, 2 and 4.
    #[arg(short = 'i', long, default_value = DEFAULT_ANNOTATIONS_TABLE)]
    pub input: PathBuf,

    /// Synapse personal access token.
    #[arg(long, env = "SYNAPSE_AUTH_TOKEN", hide_env_values = true)]
    pub synapse_token: Option<String>,
}

/// Arguments for `htan-artist walk`.
#[derive(Parser, Debug)]
pub struct WalkArgs {
    /// Container (project or folder) synid to walk.
    #[arg(default_value = DEFAULT_WALK_ROOT)]
    pub root: String,

    /// Regex matched against file names from the start.
    #[arg(long, default_value = DEFAULT_FILE_PATTERN)]
    pub pattern: String,

    /// Synapse personal access token.
    #[arg(long, env = "SYNAPSE_AUTH_TOKEN", hide_env_values = true)]
    pub synapse_token: Option<String>,
}

/// Parses CLI arguments from the process environment.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parses arguments and runs the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = parse_cli();
    run_with_cli(cli).await
}

/// Runs an already-parsed CLI invocation.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let result = match cli.command {
        Commands::Inventory(args) => run_inventory_command(args).await,
        Commands::Tidy(args) => run_tidy_command(args),
        Commands::Shortlist(args) => run_shortlist_command(args).await,
        Commands::Launch(args) => run_launch_command(args).await,
        Commands::Annotate(args) => run_annotate_command(args).await,
        Commands::Walk(args) => run_walk_command(args).await,
    };
    if let Err(ref e) = result {
        error!(error = %e, "Command failed");
    }
    result
}

async fn run_inventory_command(args: InventoryArgs) -> anyhow::Result<()> {
    let store = AwsCli::new(&args.profile).with_bucket_type(args.bucket_type);
    let entries = store.list_objects(&args.bucket).await?;

    match args.output_file {
        Some(path) => {
            write_inventory(&path, &entries)?;
            info!(objects = entries.len(), path = %path.display(), "Wrote inventory");
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_inventory_to(&mut lock, &entries)?;
            lock.flush()?;
        }
    }
    Ok(())
}

fn run_tidy_command(args: TidyArgs) -> anyhow::Result<()> {
    let entries = read_inventory(&args.input)?;
    let mut config = TidyConfig::default().with_cdn_base(args.cdn_base);
    if !args.exclude.is_empty() {
        config = config.with_excluded_tokens(args.exclude);
    }

    let outputs = tidy_inventory(&entries, &config, &args.output_dir)?;
    println!("Tidied {} asset records", outputs.records);
    println!("  Latest records: {} -> {}", outputs.latest, outputs.latest_csv.display());
    println!("  Entities: {} -> {}", outputs.entities, outputs.assets_json.display());
    Ok(())
}

async fn run_shortlist_command(args: ShortlistArgs) -> anyhow::Result<()> {
    let mut config = ShortlistConfig::default()
        .with_assets_uri(args.assets_uri)
        .with_output_dir(args.output_dir.clone())
        .with_sample_size(args.sample_size)
        .with_cloud_provider(args.cloud_provider);
    if args.save_assets {
        config = config.with_saved_assets(SAVED_ASSETS_FILE);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let store = AwsCli::new(args.aws_profile);
    let catalog = BigQueryCli::new(args.bigquery_project);
    let outcome = run_shortlist(&config, &store, &HttpFetcher::new(), &catalog).await?;

    if args.json {
        let saved = outcome.saved.as_ref();
        let output = serde_json::json!({
            "status": if outcome.is_empty() { "empty" } else { "success" },
            "records": outcome.records.len(),
            "needs_thumbnail": outcome.stats.as_ref().map(|s| s.needs_thumbnail).unwrap_or(0),
            "needs_minerva": outcome.stats.as_ref().map(|s| s.needs_view).unwrap_or(0),
            "samplesheet": saved.map(|s| s.full.display().to_string()),
            "sample": saved.and_then(|s| s.sample.as_ref()).map(|p| p.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match outcome.stats {
        None => println!("No files need processing!"),
        Some(stats) => {
            println!("\n{}", stats);
            println!("Samplesheets saved to {}", args.output_dir.display());
        }
    }
    Ok(())
}

async fn run_launch_command(args: LaunchArgs) -> anyhow::Result<()> {
    let config = LaunchConfig::new(args.samplesheet)
        .with_workspace(args.workspace)
        .with_compute_env(args.compute_env)
        .with_output_bucket(args.output_bucket)
        .with_pipeline(args.pipeline_url, args.revision)
        .with_params_dir(args.params_dir)
        .keep_params(args.keep_params);

    let mut platform = TowerCli::new();
    if let Some(endpoint) = args.api_endpoint {
        platform = platform.with_api_endpoint(endpoint);
    }

    let outcome = run_launch(&config, &platform)
        .await
        .map_err(|e| e.context("Pipeline launch failed"))?;

    if args.json {
        let output = serde_json::json!({
            "status": "success",
            "run_id": outcome.run.run_id,
            "run_name": outcome.run.run_name,
            "dataset_id": outcome.run.dataset_id,
            "dataset_url": outcome.run.dataset_url,
            "outdir": outcome.run.output_path,
            "revision": outcome.run.pipeline_revision,
            "params_file": outcome.params_file.display().to_string(),
            "params_kept": outcome.params_kept,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Pipeline launched successfully!");
    println!("  Run name: {}", outcome.run.run_name);
    println!("  Dataset ID: {}", outcome.run.dataset_id);
    println!("  Parameters file: {}", outcome.params_file.display());
    println!("  Result: {}", outcome.response);
    Ok(())
}

fn synapse_client(token: Option<String>) -> anyhow::Result<SynapseClient> {
    let token = token.ok_or(crate::error::RepositoryError::MissingToken)?;
    Ok(SynapseClient::new(token)?)
}

async fn run_annotate_command(args: AnnotateArgs) -> anyhow::Result<()> {
    let updates = read_updates(&args.input)?;
    if updates.is_empty() {
        warn!(path = %args.input.display(), "No annotation updates found");
        return Ok(());
    }

    let client = synapse_client(args.synapse_token)?;
    let applied = apply_updates(&client, &updates).await?;
    println!("Updated {} annotations", applied);
    Ok(())
}

async fn run_walk_command(args: WalkArgs) -> anyhow::Result<()> {
    let client = synapse_client(args.synapse_token)?;
    let files = walk_files(&client, &args.root, &args.pattern).await?;
    for file in files {
        println!("{}", file.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_shortlist_command_defaults() {
        let cli = Cli::try_parse_from(["htan-artist", "shortlist"]).expect("should parse");
        match cli.command {
            Commands::Shortlist(args) => {
                assert_eq!(args.sample_size, DEFAULT_SAMPLE_SIZE);
                assert_eq!(args.assets_uri, DEFAULT_ASSETS_URI);
                assert!(args.seed.is_none());
                assert!(!args.json);
            }
            _ => panic!("Expected Shortlist command"),
        }
    }

    #[test]
    fn test_shortlist_rejects_zero_sample_size() {
        let result = Cli::try_parse_from(["htan-artist", "shortlist", "--sample-size", "0"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["htan-artist", "shortlist", "--sample-size", "1"])
            .expect("should parse");
        match cli.command {
            Commands::Shortlist(args) => assert_eq!(args.sample_size, 1),
            _ => panic!("Expected Shortlist command"),
        }
    }

    #[test]
    fn test_debug_flag_overrides_log_level() {
        let cli = Cli::try_parse_from(["htan-artist", "--log-level", "warn", "--debug", "tidy"])
            .expect("should parse");
        assert_eq!(cli.log_filter(), "debug");

        let cli = Cli::try_parse_from(["htan-artist", "tidy", "--log-level", "warn"])
            .expect("should parse");
        assert_eq!(cli.log_filter(), "warn");
    }
}
