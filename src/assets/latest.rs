//! The latest-assets lookup document.
//!
//! A JSON array of `{synid, thumbnail?, minerva?}` objects, one per entity,
//! published to the assets bucket and behind the content-delivery URL.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StorageError;
use crate::storage::{parse_s3_uri, HttpFetcher, ObjectStore, ObjectUri};

/// Latest derivative URLs known for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestAssets {
    pub synid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minerva: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl LatestAssets {
    pub fn new(synid: impl Into<String>) -> Self {
        Self {
            synid: synid.into(),
            minerva: None,
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    pub fn with_minerva(mut self, url: impl Into<String>) -> Self {
        self.minerva = Some(url.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    synid: Option<String>,
    #[serde(default)]
    minerva: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
}

/// Parses the lookup document. Entries without a synid are skipped.
pub fn parse_latest_assets(json: &str) -> Result<Vec<LatestAssets>, StorageError> {
    let raw: Vec<RawEntry> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .filter_map(|entry| {
            let synid = entry.synid.filter(|s| !s.is_empty())?;
            Some(LatestAssets {
                synid,
                minerva: entry.minerva,
                thumbnail: entry.thumbnail,
            })
        })
        .collect())
}

/// Fetches the lookup document from a bucket URI, an HTTP(S) URL or a local file.
///
/// When `save_to` is set the fetched document is written there unchanged,
/// including entries and keys the parser ignores.
pub async fn fetch_latest_assets(
    source: &str,
    store: &dyn ObjectStore,
    http: &HttpFetcher,
    save_to: Option<&Path>,
) -> Result<Vec<LatestAssets>, StorageError> {
    info!(source, "Fetching assets data");

    let body = if source.starts_with("s3://") {
        let (bucket, key) = parse_s3_uri(source)?;
        store.get_object(&ObjectUri::s3(bucket, key)).await?
    } else if source.starts_with("gs://") {
        store.get_object(&ObjectUri::parse(source)?).await?
    } else if source.starts_with("https://") || source.starts_with("http://") {
        http.get_text(source).await?
    } else if Path::new(source).is_file() {
        std::fs::read_to_string(source)?
    } else {
        return Err(StorageError::UnsupportedSource(source.to_string()));
    };

    let entries = parse_latest_assets(&body)?;
    info!(records = entries.len(), "Fetched asset records");

    if let Some(path) = save_to {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &body)?;
        info!(path = %path.display(), "Saved assets data");
    }

    Ok(entries)
}

/// Synids that already have each derivative.
#[derive(Debug, Clone, Default)]
pub struct ExistingAssets {
    pub has_thumbnail: HashSet<String>,
    pub has_minerva: HashSet<String>,
}

impl ExistingAssets {
    pub fn from_entries(entries: &[LatestAssets]) -> Self {
        let mut existing = Self::default();
        for entry in entries {
            if entry.thumbnail.is_some() {
                existing.has_thumbnail.insert(entry.synid.clone());
            }
            if entry.minerva.is_some() {
                existing.has_minerva.insert(entry.synid.clone());
            }
        }
        info!(
            thumbnails = existing.has_thumbnail.len(),
            minerva = existing.has_minerva.len(),
            "Indexed existing assets"
        );
        existing
    }

    pub fn has_thumbnail(&self, synid: &str) -> bool {
        self.has_thumbnail.contains(synid)
    }

    pub fn has_minerva(&self, synid: &str) -> bool {
        self.has_minerva.contains(synid)
    }
}
