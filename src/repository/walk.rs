//! Recursive listing of files under a Synapse container.

use regex::Regex;
use tracing::{debug, info};

use crate::error::RepositoryError;

use super::{DataRepository, EntityHeader};

/// Matches TIFF images (`.tiff` somewhere after the first character).
pub const DEFAULT_FILE_PATTERN: &str = r".+\.tiff";

/// Walks `root` depth-first and returns the files whose names match `pattern`
/// from the start of the name.
///
/// Files in a folder come before the contents of its subfolders. Only
/// `FileEntity` children are reported; tables, links and other non-folder
/// entity types are skipped.
pub async fn walk_files(
    repo: &dyn DataRepository,
    root: &str,
    pattern: &str,
) -> Result<Vec<EntityHeader>, RepositoryError> {
    let matcher = Regex::new(&format!("^(?:{})", pattern))?;
    let mut matched = Vec::new();
    let mut pending = vec![root.to_string()];

    while let Some(container) = pending.pop() {
        let children = repo.list_children(&container).await?;
        debug!(container = %container, children = children.len(), "Walked container");

        let mut folders = Vec::new();
        for child in children {
            if child.is_folder() {
                folders.push(child.id);
            } else if child.is_file() && matcher.is_match(&child.name) {
                matched.push(child);
            }
        }
        pending.extend(folders.into_iter().rev());
    }

    info!(root, files = matched.len(), "Finished walking container");
    Ok(matched)
}
