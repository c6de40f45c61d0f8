//! Annotation updates from a small results table.
//!
//! The table has a header row; column 0 holds the synid, column 1 the
//! annotation key and column 3 the value. Column 2 is ignored.

use std::path::Path;

use tracing::info;

use crate::error::{RepositoryError, ValidationError};

use super::DataRepository;

const SYNID_COLUMN: usize = 0;
const KEY_COLUMN: usize = 1;
const VALUE_COLUMN: usize = 3;

/// One annotation to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationUpdate {
    pub synid: String,
    pub key: String,
    pub value: String,
}

pub fn read_updates(path: &Path) -> Result<Vec<AnnotationUpdate>, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::MissingFile(path.display().to_string()));
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let file = path.display().to_string();
    let mut updates = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(i).map(str::trim).unwrap_or_default();
        if record.len() <= VALUE_COLUMN
            || field(SYNID_COLUMN).is_empty()
            || field(KEY_COLUMN).is_empty()
        {
            return Err(ValidationError::InvalidRow {
                file,
                row: idx + 1,
                reason: "expected synid, key and value in columns 1, 2 and 4".to_string(),
            });
        }
        updates.push(AnnotationUpdate {
            synid: field(SYNID_COLUMN).to_string(),
            key: field(KEY_COLUMN).to_string(),
            value: field(VALUE_COLUMN).to_string(),
        });
    }
    Ok(updates)
}

/// Applies updates one entity at a time: fetch, overwrite the key, store.
///
/// Stops at the first failure; updates already applied stay applied.
pub async fn apply_updates(
    repo: &dyn DataRepository,
    updates: &[AnnotationUpdate],
) -> Result<usize, RepositoryError> {
    for (idx, update) in updates.iter().enumerate() {
        let mut annotations = repo.get_annotations(&update.synid).await?;
        annotations.set(update.key.clone(), update.value.clone());
        repo.set_annotations(&annotations).await?;
        info!(
            synid = %update.synid,
            key = %update.key,
            progress = format!("{}/{}", idx + 1, updates.len()),
            "Updated annotation"
        );
    }
    Ok(updates.len())
}
