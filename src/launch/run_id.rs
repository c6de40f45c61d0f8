//! Short random identifiers for dataset and run names.

use rand::seq::IndexedRandom;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const RUN_ID_LEN: usize = 4;

/// Generates a 4-character alphanumeric run id.
///
/// Collisions are not checked; the id only disambiguates repeated launches.
pub fn generate_run_id() -> String {
    let mut rng = rand::rng();
    (0..RUN_ID_LEN)
        .filter_map(|_| ALPHABET.choose(&mut rng).map(|&b| b as char))
        .collect()
}

pub fn dataset_name(run_id: &str) -> String {
    format!("artist_samplesheet_{}", run_id)
}

pub fn run_name(run_id: &str) -> String {
    format!("artist_{}", run_id)
}
