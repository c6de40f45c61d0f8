//! Inventory tidying: object keys to typed asset records.
//!
//! Keys look like `synid/<synid>/<run>/thumbnail.png` or
//! `synid/<synid>/<run>/minerva/index.html`. Everything else in the bucket
//! is ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::ValidationError;
use crate::storage::InventoryEntry;

use super::{ArtifactType, LatestAssets};

/// Default public base URL serving the assets bucket.
pub const DEFAULT_CDN_BASE: &str = "https://d3p249wtgzkn5u.cloudfront.net/";

/// Run names whose outputs are known to be broken.
pub const DEFAULT_EXCLUDED_TOKENS: &[&str] = &["nasty_ekeblad"];

pub const TIDY_CSV: &str = "htan-assets-tidy.csv";
pub const LATEST_CSV: &str = "htan-assets-latest.csv";
pub const ASSETS_JSON: &str = "htan-imaging-assets.json";

fn candidate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"thumbnail\.png|jpg|index\.html$").expect("candidate pattern is valid")
    })
}

fn key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"synid/(syn\d{8})/(.+?)/((?:thumbnail(?:\.png|\.jpg)|minerva/index\.html)?)",
        )
        .expect("key pattern is valid")
    })
}

/// A derivative found in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRecord {
    pub bucket: String,
    pub key: String,
    pub modified: DateTime<Utc>,
    pub synid: String,
    pub version: String,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub s3_uri: String,
    #[serde(rename = "cloudfront_url")]
    pub cdn_url: String,
}

/// Settings for the tidy stage.
#[derive(Debug, Clone)]
pub struct TidyConfig {
    pub cdn_base: String,
    pub excluded_tokens: Vec<String>,
}

impl Default for TidyConfig {
    fn default() -> Self {
        Self {
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            excluded_tokens: DEFAULT_EXCLUDED_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl TidyConfig {
    pub fn with_cdn_base(mut self, base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        self.cdn_base = base;
        self
    }

    pub fn with_excluded_tokens(mut self, tokens: Vec<String>) -> Self {
        self.excluded_tokens = tokens;
        self
    }

    fn is_candidate(&self, key: &str) -> bool {
        key.contains("synid/syn")
            && candidate_regex().is_match(key)
            && !self.excluded_tokens.iter().any(|t| key.contains(t.as_str()))
    }
}

/// Extracts an asset record from one inventory entry, if it is a derivative.
pub fn extract_asset(entry: &InventoryEntry, config: &TidyConfig) -> Option<AssetRecord> {
    if !config.is_candidate(&entry.key) {
        return None;
    }
    let caps = key_regex().captures(&entry.key)?;
    let artifact_type = ArtifactType::from_key_suffix(caps.get(3)?.as_str())?;

    Some(AssetRecord {
        bucket: entry.bucket.clone(),
        key: entry.key.clone(),
        modified: entry.modified,
        synid: caps[1].to_string(),
        version: caps[2].to_string(),
        artifact_type,
        s3_uri: format!("s3://{}/{}", entry.bucket, entry.key),
        cdn_url: format!("{}{}", config.cdn_base, entry.key),
    })
}

/// Keeps the most recently modified record per (synid, artifact type).
///
/// Ties keep the record seen first. Output is ordered by synid, then type.
pub fn latest_per_key(records: &[AssetRecord]) -> Vec<AssetRecord> {
    let mut latest: BTreeMap<(&str, ArtifactType), &AssetRecord> = BTreeMap::new();
    for record in records {
        let slot = latest
            .entry((record.synid.as_str(), record.artifact_type))
            .or_insert(record);
        if record.modified > slot.modified {
            *slot = record;
        }
    }
    latest.into_values().cloned().collect()
}

/// Folds latest records into one lookup entry per synid.
pub fn pivot_latest(latest: &[AssetRecord]) -> Vec<LatestAssets> {
    let mut by_synid: BTreeMap<&str, LatestAssets> = BTreeMap::new();
    for record in latest {
        let entry = by_synid
            .entry(record.synid.as_str())
            .or_insert_with(|| LatestAssets::new(record.synid.clone()));
        let slot = match record.artifact_type {
            ArtifactType::Thumbnail => &mut entry.thumbnail,
            ArtifactType::Minerva => &mut entry.minerva,
        };
        if slot.is_none() {
            *slot = Some(record.cdn_url.clone());
        }
    }
    by_synid.into_values().collect()
}

/// Paths written by [`tidy_inventory`].
#[derive(Debug, Clone)]
pub struct TidyOutputs {
    pub tidy_csv: PathBuf,
    pub latest_csv: PathBuf,
    pub assets_json: PathBuf,
    pub records: usize,
    pub latest: usize,
    pub entities: usize,
}

fn write_records(path: &Path, records: &[AssetRecord]) -> Result<(), ValidationError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Runs the whole tidy stage over an inventory and writes its three outputs.
pub fn tidy_inventory(
    entries: &[InventoryEntry],
    config: &TidyConfig,
    output_dir: &Path,
) -> Result<TidyOutputs, ValidationError> {
    let records: Vec<AssetRecord> = entries
        .iter()
        .filter_map(|e| extract_asset(e, config))
        .collect();
    info!(
        inventory = entries.len(),
        assets = records.len(),
        "Extracted asset records from inventory"
    );

    let latest = latest_per_key(&records);
    let lookup = pivot_latest(&latest);

    std::fs::create_dir_all(output_dir)?;
    let outputs = TidyOutputs {
        tidy_csv: output_dir.join(TIDY_CSV),
        latest_csv: output_dir.join(LATEST_CSV),
        assets_json: output_dir.join(ASSETS_JSON),
        records: records.len(),
        latest: latest.len(),
        entities: lookup.len(),
    };

    write_records(&outputs.tidy_csv, &records)?;
    write_records(&outputs.latest_csv, &latest)?;
    let json = serde_json::to_string_pretty(&lookup)?;
    std::fs::write(&outputs.assets_json, json)?;

    info!(
        latest = outputs.latest,
        entities = outputs.entities,
        path = %outputs.assets_json.display(),
        "Wrote latest assets lookup"
    );
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn entry(key: &str, minute: u32) -> InventoryEntry {
        InventoryEntry::new(
            "htan-assets",
            key,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap(),
        )
    }

    #[test]
    fn extracts_thumbnail_and_minerva_records() {
        let config = TidyConfig::default();
        let thumb = extract_asset(&entry("synid/syn12345678/run_a/thumbnail.png", 0), &config)
            .expect("thumbnail key should match");
        assert_eq!(thumb.synid, "syn12345678");
        assert_eq!(thumb.version, "run_a");
        assert_eq!(thumb.artifact_type, ArtifactType::Thumbnail);
        assert_eq!(thumb.s3_uri, "s3://htan-assets/synid/syn12345678/run_a/thumbnail.png");
        assert_eq!(
            thumb.cdn_url,
            "https://d3p249wtgzkn5u.cloudfront.net/synid/syn12345678/run_a/thumbnail.png"
        );

        let story = extract_asset(
            &entry("synid/syn87654321/run_b/minerva/index.html", 0),
            &config,
        )
        .expect("minerva key should match");
        assert_eq!(story.artifact_type, ArtifactType::Minerva);
        assert_eq!(story.version, "run_b");
    }

    #[test]
    fn ignores_unrelated_and_excluded_keys() {
        let config = TidyConfig::default();
        for key in [
            "synid/syn12345678/run_a/minerva/story.json",
            "other/syn12345678/run_a/thumbnail.png",
            "synid/syn123/run_a/thumbnail.png",
            "synid/syn12345678/nasty_ekeblad/thumbnail.png",
            "synid/syn12345678/run_a/extra/image.jpg",
        ] {
            assert!(extract_asset(&entry(key, 0), &config).is_none(), "{key}");
        }
    }

    #[test]
    fn custom_cdn_base_gets_trailing_slash() {
        let config = TidyConfig::default().with_cdn_base("https://cdn.example.org");
        let rec = extract_asset(&entry("synid/syn12345678/r/thumbnail.jpg", 0), &config).unwrap();
        assert_eq!(rec.cdn_url, "https://cdn.example.org/synid/syn12345678/r/thumbnail.jpg");
    }

    #[test]
    fn latest_per_key_yields_one_record_per_key() {
        let config = TidyConfig::default();
        let entries = vec![
            entry("synid/syn00000001/v1/thumbnail.png", 1),
            entry("synid/syn00000001/v2/thumbnail.png", 5),
            entry("synid/syn00000001/v3/thumbnail.jpg", 3),
            entry("synid/syn00000001/v1/minerva/index.html", 2),
            entry("synid/syn00000002/v1/thumbnail.png", 4),
            entry("synid/syn00000002/v2/thumbnail.png", 4),
        ];
        let records: Vec<_> = entries.iter().filter_map(|e| extract_asset(e, &config)).collect();
        let latest = latest_per_key(&records);

        let keys: HashSet<_> = latest.iter().map(|r| (r.synid.clone(), r.artifact_type)).collect();
        assert_eq!(keys.len(), latest.len());
        assert_eq!(latest.len(), 3);

        for rec in &latest {
            let max = records
                .iter()
                .filter(|r| r.synid == rec.synid && r.artifact_type == rec.artifact_type)
                .map(|r| r.modified)
                .max()
                .unwrap();
            assert_eq!(rec.modified, max);
        }

        let thumb1 = latest
            .iter()
            .find(|r| r.synid == "syn00000001" && r.artifact_type == ArtifactType::Thumbnail)
            .unwrap();
        assert_eq!(thumb1.version, "v2");
        let thumb2 = latest.iter().find(|r| r.synid == "syn00000002").unwrap();
        assert_eq!(thumb2.version, "v1");
    }

    #[test]
    fn pivot_groups_by_synid() {
        let config = TidyConfig::default();
        let entries = vec![
            entry("synid/syn00000002/v1/thumbnail.png", 1),
            entry("synid/syn00000001/v1/thumbnail.png", 1),
            entry("synid/syn00000001/v1/minerva/index.html", 1),
        ];
        let records: Vec<_> = entries.iter().filter_map(|e| extract_asset(e, &config)).collect();
        let lookup = pivot_latest(&latest_per_key(&records));

        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup[0].synid, "syn00000001");
        assert!(lookup[0].thumbnail.is_some());
        assert!(lookup[0].minerva.is_some());
        assert_eq!(lookup[1].synid, "syn00000002");
        assert!(lookup[1].minerva.is_none());
    }

    #[test]
    fn tidy_inventory_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            entry("synid/syn00000001/v1/thumbnail.png", 1),
            entry("synid/syn00000001/v2/thumbnail.png", 2),
            entry("README.md", 3),
        ];
        let outputs = tidy_inventory(&entries, &TidyConfig::default(), dir.path()).unwrap();
        assert_eq!(outputs.records, 2);
        assert_eq!(outputs.latest, 1);
        assert_eq!(outputs.entities, 1);

        let tidy = std::fs::read_to_string(&outputs.tidy_csv).unwrap();
        assert!(tidy.starts_with("bucket,key,modified,synid,version,type,s3_uri,cloudfront_url\n"));
        assert_eq!(tidy.lines().count(), 3);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&outputs.assets_json).unwrap()).unwrap();
        let arr = json.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["synid"], "syn00000001");
        assert!(arr[0]["thumbnail"].as_str().unwrap().ends_with("/v2/thumbnail.png"));
        assert!(arr[0].get("minerva").is_none());
    }
}
