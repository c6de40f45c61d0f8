//! Derived imaging assets (thumbnails and Minerva stories).
//!
//! `tidy` turns a raw bucket inventory into typed asset records and the
//! per-entity lookup document; `latest` reads that document back for the
//! shortlist stage.

pub mod latest;
pub mod tidy;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use latest::{fetch_latest_assets, parse_latest_assets, ExistingAssets, LatestAssets};
pub use tidy::{
    extract_asset, latest_per_key, pivot_latest, tidy_inventory, AssetRecord, TidyConfig,
    TidyOutputs,
};

/// Kind of derivative generated from a source image.
///
/// Variant order follows the lexical order of the wire names, so sorted
/// collections keyed by type line up with the written files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// Interactive Minerva viewer page (`minerva/index.html`).
    Minerva,
    /// Static thumbnail image (`thumbnail.png` / `thumbnail.jpg`).
    Thumbnail,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Minerva => "minerva",
            ArtifactType::Thumbnail => "thumbnail",
        }
    }

    /// Maps the trailing path captured from an object key.
    pub fn from_key_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "minerva/index.html" => Some(ArtifactType::Minerva),
            "thumbnail.png" | "thumbnail.jpg" => Some(ArtifactType::Thumbnail),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
