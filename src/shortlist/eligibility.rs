//! Anti-join of eligible entities against existing derivatives.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use crate::assets::ExistingAssets;
use crate::storage::{cloud_provider, CloudProvider};

use super::catalog::EligibleEntity;

/// An entity annotated with the derivatives it is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityRecord {
    pub entity: EligibleEntity,
    /// No thumbnail ("miniature") exists yet.
    pub needs_thumbnail: bool,
    /// No Minerva view exists yet.
    pub needs_view: bool,
    pub cloud_provider: Option<CloudProvider>,
}

impl EligibilityRecord {
    pub fn id(&self) -> &str {
        &self.entity.id
    }
}

/// Restricts the shortlist to images hosted on one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CloudProviderFilter {
    S3,
    Gs,
    #[default]
    All,
}

impl CloudProviderFilter {
    pub fn accepts(&self, provider: Option<CloudProvider>) -> bool {
        match self {
            CloudProviderFilter::All => true,
            CloudProviderFilter::S3 => provider == Some(CloudProvider::S3),
            CloudProviderFilter::Gs => provider == Some(CloudProvider::Gs),
        }
    }
}

/// Flags each entity's missing derivatives and keeps those missing at least one.
///
/// Output is sorted by entity id, descending.
pub fn compute_eligibility(
    entities: Vec<EligibleEntity>,
    existing: &ExistingAssets,
) -> Vec<EligibilityRecord> {
    let total = entities.len();
    let mut records: Vec<EligibilityRecord> = entities
        .into_iter()
        .map(|entity| EligibilityRecord {
            needs_thumbnail: !existing.has_thumbnail(&entity.id),
            needs_view: !existing.has_minerva(&entity.id),
            cloud_provider: cloud_provider(&entity.image),
            entity,
        })
        .filter(|r| r.needs_thumbnail || r.needs_view)
        .collect();

    records.sort_by(|a, b| b.entity.id.cmp(&a.entity.id));

    info!(
        total,
        shortlisted = records.len(),
        thumbnails = records.iter().filter(|r| r.needs_thumbnail).count(),
        minerva = records.iter().filter(|r| r.needs_view).count(),
        "Filtered files needing processing"
    );
    records
}

pub fn filter_by_provider(
    records: Vec<EligibilityRecord>,
    filter: CloudProviderFilter,
) -> Vec<EligibilityRecord> {
    if filter == CloudProviderFilter::All {
        return records;
    }
    let before = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .filter(|r| filter.accepts(r.cloud_provider))
        .collect();
    info!(filter = ?filter, before, after = kept.len(), "Filtered by cloud provider");
    kept
}

/// Summary counts printed after shortlisting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortlistStats {
    pub total: usize,
    pub needs_thumbnail: usize,
    pub needs_view: usize,
    /// (assay type, count), most frequent first.
    pub by_type: Vec<(String, usize)>,
    /// (center, count), most frequent first.
    pub by_center: Vec<(String, usize)>,
    /// Up to five randomly chosen `(id, type, center)` examples.
    pub examples: Vec<(String, String, String)>,
}

const EXAMPLE_COUNT: usize = 5;

fn ranked_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

impl ShortlistStats {
    pub fn from_records(records: &[EligibilityRecord], rng: &mut ChaCha8Rng) -> Self {
        let mut picks: Vec<&EligibilityRecord> = records.iter().collect();
        picks.shuffle(rng);
        picks.truncate(EXAMPLE_COUNT);

        Self {
            total: records.len(),
            needs_thumbnail: records.iter().filter(|r| r.needs_thumbnail).count(),
            needs_view: records.iter().filter(|r| r.needs_view).count(),
            by_type: ranked_counts(records.iter().map(|r| r.entity.assay_type.as_str())),
            by_center: ranked_counts(records.iter().map(|r| r.entity.center.as_str())),
            examples: picks
                .into_iter()
                .map(|r| {
                    (
                        r.entity.id.clone(),
                        r.entity.assay_type.clone(),
                        r.entity.center.clone(),
                    )
                })
                .collect(),
        }
    }
}

impl fmt::Display for ShortlistStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        writeln!(out, "Dataset Statistics")?;
        writeln!(out, "{}", "=".repeat(50))?;
        writeln!(out, "Total files needing processing: {}", self.total)?;
        writeln!(out, "Files needing thumbnails: {}", self.needs_thumbnail)?;
        writeln!(out, "Files needing Minerva views: {}", self.needs_view)?;

        writeln!(out, "\nCounts by imaging type:")?;
        writeln!(out, "{}", "-".repeat(30))?;
        for (assay, count) in &self.by_type {
            writeln!(out, "  {}: {}", assay, count)?;
        }

        writeln!(out, "\nCounts by center:")?;
        writeln!(out, "{}", "-".repeat(20))?;
        for (center, count) in &self.by_center {
            writeln!(out, "  {}: {}", center, count)?;
        }

        writeln!(out, "\nSample records:")?;
        writeln!(out, "{}", "-".repeat(20))?;
        for (id, assay, center) in &self.examples {
            writeln!(out, "  {}: {} from {}", id, assay, center)?;
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LatestAssets;
    use rand::SeedableRng;

    fn entity(id: &str, image: &str, assay: &str, center: &str) -> EligibleEntity {
        EligibleEntity {
            id: id.to_string(),
            image: image.to_string(),
            he: assay == "H&E",
            convert: true,
            assay_type: assay.to_string(),
            center: center.to_string(),
        }
    }

    fn existing() -> ExistingAssets {
        ExistingAssets::from_entries(&[
            LatestAssets::new("syn00000001")
                .with_thumbnail("https://cdn/1.png")
                .with_minerva("https://cdn/1/index.html"),
            LatestAssets::new("syn00000002").with_thumbnail("https://cdn/2.png"),
            LatestAssets::new("syn00000003").with_minerva("https://cdn/3/index.html"),
        ])
    }

    fn catalog() -> Vec<EligibleEntity> {
        vec![
            entity("syn00000001", "s3://b/1.svs", "H&E", "HTAN OHSU"),
            entity("syn00000002", "gs://b/2.tif", "CyCIF", "HTAN HMS"),
            entity("syn00000003", "s3://b/3.tif", "CyCIF", "HTAN HMS"),
            entity("syn00000004", "s3://b/4.tif", "mIHC", "HTAN OHSU"),
        ]
    }

    #[test]
    fn every_record_needs_something() {
        let records = compute_eligibility(catalog(), &existing());
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.needs_thumbnail || r.needs_view));
        assert!(records.iter().all(|r| r.id() != "syn00000001"));
    }

    #[test]
    fn flags_follow_set_membership() {
        let records = compute_eligibility(catalog(), &existing());
        let by_id = |id: &str| records.iter().find(|r| r.id() == id).unwrap().clone();

        let two = by_id("syn00000002");
        assert!(!two.needs_thumbnail && two.needs_view);
        let three = by_id("syn00000003");
        assert!(three.needs_thumbnail && !three.needs_view);
        let four = by_id("syn00000004");
        assert!(four.needs_thumbnail && four.needs_view);
    }

    #[test]
    fn sorted_by_id_descending() {
        let ids: Vec<_> = compute_eligibility(catalog(), &existing())
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["syn00000004", "syn00000003", "syn00000002"]);
    }

    #[test]
    fn provider_filter_keeps_matching_images() {
        let records = compute_eligibility(catalog(), &existing());
        let gs = filter_by_provider(records.clone(), CloudProviderFilter::Gs);
        assert_eq!(gs.len(), 1);
        assert_eq!(gs[0].cloud_provider, Some(CloudProvider::Gs));
        assert_eq!(filter_by_provider(records.clone(), CloudProviderFilter::S3).len(), 2);
        assert_eq!(filter_by_provider(records, CloudProviderFilter::All).len(), 3);
    }

    #[test]
    fn empty_catalog_yields_nothing() {
        assert!(compute_eligibility(Vec::new(), &existing()).is_empty());
    }

    #[test]
    fn stats_rank_counts_and_limit_examples() {
        let records = compute_eligibility(catalog(), &ExistingAssets::default());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let stats = ShortlistStats::from_records(&records, &mut rng);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.needs_thumbnail, 4);
        assert_eq!(stats.by_type[0], ("CyCIF".to_string(), 2));
        assert_eq!(
            stats.by_center,
            vec![("HTAN HMS".to_string(), 2), ("HTAN OHSU".to_string(), 2)]
        );
        assert_eq!(stats.examples.len(), 4);

        let rendered = stats.to_string();
        assert!(rendered.contains("Total files needing processing: 4"));
        assert!(rendered.contains("  H&E: 1"));
    }
}
