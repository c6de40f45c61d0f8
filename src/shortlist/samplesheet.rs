//! Samplesheet CSV output for the artist pipeline.
//!
//! The pipeline treats the sheet as opaque rows; column order is
//! `id,image,he,convert,type,center,miniature,minerva,cloud_provider`.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ValidationError;
use crate::storage::CloudProvider;

use super::eligibility::EligibilityRecord;

pub const FULL_SAMPLESHEET: &str = "artist-samplesheet.csv";

pub const SAMPLESHEET_COLUMNS: [&str; 9] = [
    "id",
    "image",
    "he",
    "convert",
    "type",
    "center",
    "miniature",
    "minerva",
    "cloud_provider",
];

/// File name of the random subset sheet for `size` rows.
pub fn sample_samplesheet_name(size: usize) -> String {
    format!("artist-samplesheet-sample{}.csv", size)
}

/// One work item for the remote pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplesheetRow {
    pub id: String,
    pub image: String,
    pub he: bool,
    pub convert: bool,
    #[serde(rename = "type")]
    pub assay_type: String,
    pub center: String,
    /// Thumbnail still missing.
    pub miniature: bool,
    /// Minerva view still missing.
    pub minerva: bool,
    pub cloud_provider: Option<CloudProvider>,
}

impl From<&EligibilityRecord> for SamplesheetRow {
    fn from(record: &EligibilityRecord) -> Self {
        Self {
            id: record.entity.id.clone(),
            image: record.entity.image.clone(),
            he: record.entity.he,
            convert: record.entity.convert,
            assay_type: record.entity.assay_type.clone(),
            center: record.entity.center.clone(),
            miniature: record.needs_thumbnail,
            minerva: record.needs_view,
            cloud_provider: record.cloud_provider,
        }
    }
}

/// Seeded RNG when `seed` is set, otherwise seeded from the thread RNG.
pub fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

/// Uniformly samples `min(n, rows.len())` distinct rows.
pub fn sample_rows<T: Clone>(rows: &[T], n: usize, rng: &mut ChaCha8Rng) -> Vec<T> {
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    indices.shuffle(rng);
    indices.truncate(n);
    indices.into_iter().map(|i| rows[i].clone()).collect()
}

/// Writes a samplesheet. The header row is written even when `rows` is empty.
pub fn write_samplesheet(path: &Path, rows: &[SamplesheetRow]) -> Result<(), ValidationError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(SAMPLESHEET_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_samplesheet(path: &Path) -> Result<Vec<SamplesheetRow>, ValidationError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<SamplesheetRow>, _>>()?;
    Ok(rows)
}

/// Files written by [`save_samplesheets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSamplesheets {
    pub full: PathBuf,
    pub full_rows: usize,
    /// Present only when the full sheet is larger than the sample size.
    pub sample: Option<PathBuf>,
}

/// Writes the full samplesheet plus, when it exceeds `sample_size`, a random subset.
///
/// Writes nothing and returns `None` for an empty shortlist. A `sample_size`
/// of zero never produces a sample sheet.
pub fn save_samplesheets(
    rows: &[SamplesheetRow],
    output_dir: &Path,
    sample_size: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Option<SavedSamplesheets>, ValidationError> {
    if rows.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(output_dir)?;

    let full = output_dir.join(FULL_SAMPLESHEET);
    write_samplesheet(&full, rows)?;
    info!(records = rows.len(), path = %full.display(), "Saved full samplesheet");

    let sample = if sample_size > 0 && rows.len() > sample_size {
        let subset = sample_rows(rows, sample_size, rng);
        let path = output_dir.join(sample_samplesheet_name(sample_size));
        write_samplesheet(&path, &subset)?;
        info!(records = subset.len(), path = %path.display(), "Saved sample samplesheet");
        Some(path)
    } else {
        info!(records = rows.len(), "Dataset fits in one sample, no separate sample needed");
        None
    };

    Ok(Some(SavedSamplesheets {
        full,
        full_rows: rows.len(),
        sample,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn row(i: usize) -> SamplesheetRow {
        SamplesheetRow {
            id: format!("syn{:08}", i),
            image: format!("s3://bucket/{}.svs", i),
            he: i % 2 == 0,
            convert: true,
            assay_type: "H&E".to_string(),
            center: "HTAN OHSU".to_string(),
            miniature: true,
            minerva: i % 3 != 0,
            cloud_provider: Some(CloudProvider::S3),
        }
    }

    #[test]
    fn sampling_yields_exactly_n_distinct_input_rows() {
        let rows: Vec<_> = (0..25).map(row).collect();
        let mut rng = create_rng(Some(42));
        for n in [0, 1, 10, 25] {
            let picked = sample_rows(&rows, n, &mut rng);
            assert_eq!(picked.len(), n);
            let ids: HashSet<_> = picked.iter().map(|r| r.id.clone()).collect();
            assert_eq!(ids.len(), n);
            assert!(picked.iter().all(|p| rows.contains(p)));
        }
    }

    #[test]
    fn sampling_caps_at_population() {
        let rows: Vec<_> = (0..3).map(row).collect();
        assert_eq!(sample_rows(&rows, 10, &mut create_rng(Some(1))).len(), 3);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let rows: Vec<_> = (0..50).map(row).collect();
        let a = sample_rows(&rows, 5, &mut create_rng(Some(9)));
        let b = sample_rows(&rows, 5, &mut create_rng(Some(9)));
        assert_eq!(a, b);
    }

    #[test]
    fn writes_full_and_sample_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<_> = (0..12).map(row).collect();
        let saved = save_samplesheets(&rows, dir.path(), 10, &mut create_rng(Some(3)))
            .unwrap()
            .expect("non-empty shortlist writes files");

        assert_eq!(saved.full_rows, 12);
        let text = std::fs::read_to_string(&saved.full).unwrap();
        assert!(text.starts_with(
            "id,image,he,convert,type,center,miniature,minerva,cloud_provider\n"
        ));
        assert!(text.contains(
            "syn00000000,s3://bucket/0.svs,true,true,H&E,HTAN OHSU,true,false,s3"
        ));

        let sample = saved.sample.expect("12 > 10 needs a sample");
        assert_eq!(sample.file_name().unwrap(), "artist-samplesheet-sample10.csv");
        assert_eq!(read_samplesheet(&sample).unwrap().len(), 10);
        assert_eq!(read_samplesheet(&saved.full).unwrap(), rows);
    }

    #[test]
    fn small_shortlist_skips_sample_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<_> = (0..10).map(row).collect();
        let saved = save_samplesheets(&rows, dir.path(), 10, &mut create_rng(None))
            .unwrap()
            .unwrap();
        assert!(saved.sample.is_none());
        assert!(!dir.path().join(sample_samplesheet_name(10)).exists());
    }

    #[test]
    fn empty_shortlist_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("samplesheet");
        assert!(save_samplesheets(&[], &out, 10, &mut create_rng(None))
            .unwrap()
            .is_none());
        assert!(!out.exists());
    }

    #[test]
    fn zero_sample_size_writes_only_full_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let saved = save_samplesheets(&[row(1)], dir.path(), 0, &mut create_rng(Some(5)))
            .unwrap()
            .unwrap();
        assert!(saved.sample.is_none());
        assert!(!dir.path().join(sample_samplesheet_name(0)).exists());
        assert_eq!(read_samplesheet(&saved.full).unwrap(), vec![row(1)]);
    }

    #[test]
    fn header_written_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_samplesheet(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{}\n", SAMPLESHEET_COLUMNS.join(","))
        );
        assert!(read_samplesheet(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_provider_is_blank_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.csv");
        let mut r = row(1);
        r.cloud_provider = None;
        write_samplesheet(&path, &[r.clone()]).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().lines().nth(1).unwrap().ends_with(','));
        assert_eq!(read_samplesheet(&path).unwrap(), vec![r]);
    }
}
