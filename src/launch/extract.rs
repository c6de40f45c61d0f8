//! Pattern extraction from platform CLI responses.
//!
//! `tw -o json` answers with a JSON object; plain-text responses are still
//! accepted so the same extractors work on either output mode.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::PlatformError;

fn dataset_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"with id '(.+?)'").expect("dataset id pattern is valid"))
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("url pattern is valid"))
}

const DATASET_ID_KEYS: [&str; 2] = ["datasetId", "id"];

fn json_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| json_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| json_strings(v, out)),
        _ => {}
    }
}

/// Pulls the dataset id out of a response.
///
/// The first `with id '<id>'` match wins; otherwise a JSON body is searched
/// for a non-empty `datasetId` (or `id`) field.
pub fn extract_dataset_id(response: &str) -> Result<String, PlatformError> {
    let from_text = || {
        dataset_id_regex()
            .captures(response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };
    let from_json = || {
        let body: Value = serde_json::from_str(response.trim()).ok()?;
        DATASET_ID_KEYS.iter().find_map(|key| match body.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };
    from_text()
        .or_else(from_json)
        .ok_or_else(|| PlatformError::DatasetIdNotFound(response.to_string()))
}

/// Returns the first `http(s)://` URL in `text`.
///
/// For a JSON body the URL is searched inside string values, so quotes and
/// braces never end up in the result.
pub fn extract_url(text: &str) -> Result<String, PlatformError> {
    let candidates = match serde_json::from_str::<Value>(text.trim()) {
        Ok(body) => {
            let mut strings = Vec::new();
            json_strings(&body, &mut strings);
            strings
        }
        Err(_) => vec![text.to_string()],
    };
    candidates
        .iter()
        .find_map(|s| url_regex().find(s).map(|m| m.as_str().to_string()))
        .ok_or_else(|| PlatformError::UrlNotFound(text.to_string()))
}
