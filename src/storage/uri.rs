//! Object-storage URI parsing.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Cloud provider hosting an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    S3,
    Gs,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::S3 => "s3",
            CloudProvider::Gs => "gs",
        }
    }

    fn scheme_prefix(&self) -> &'static str {
        match self {
            CloudProvider::S3 => "s3://",
            CloudProvider::Gs => "gs://",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bucket object addressed as `<scheme>://<bucket>/<key>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    pub provider: CloudProvider,
    pub bucket: String,
    pub key: String,
}

impl ObjectUri {
    /// Parses an `s3://` or `gs://` URI.
    pub fn parse(uri: &str) -> Result<Self, ValidationError> {
        let (provider, rest) = if let Some(rest) = uri.strip_prefix("s3://") {
            (CloudProvider::S3, rest)
        } else if let Some(rest) = uri.strip_prefix("gs://") {
            (CloudProvider::Gs, rest)
        } else {
            return Err(ValidationError::InvalidObjectUri(uri.to_string()));
        };

        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self {
                provider,
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(ValidationError::InvalidObjectUri(uri.to_string())),
        }
    }

    pub fn s3(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            provider: CloudProvider::S3,
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}/{}",
            self.provider.scheme_prefix(),
            self.bucket,
            self.key
        )
    }
}

/// Splits an `s3://bucket/key` URI into its bucket and key.
///
/// A URI without the `s3://` scheme, or without a `/` between bucket and key,
/// is rejected rather than yielding empty parts.
pub fn parse_s3_uri(uri: &str) -> Result<(String, String), ValidationError> {
    let rest = uri
        .strip_prefix("s3://")
        .ok_or_else(|| ValidationError::InvalidS3Uri(uri.to_string()))?;

    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok((bucket.to_string(), key.to_string()))
        }
        _ => Err(ValidationError::InvalidS3UriFormat(uri.to_string())),
    }
}

fn provider_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(s3|gs)://").expect("provider pattern is valid"))
}

/// Detects the cloud provider from the first `s3://` or `gs://` in an image path.
pub fn cloud_provider(image: &str) -> Option<CloudProvider> {
    let caps = provider_regex().captures(image)?;
    match caps.get(1)?.as_str() {
        "s3" => Some(CloudProvider::S3),
        "gs" => Some(CloudProvider::Gs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_s3_uri_splits_bucket_and_key() {
        let (bucket, key) =
            parse_s3_uri("s3://htan-assets/final-output/htan-imaging-assets-latest.json").unwrap();
        assert_eq!(bucket, "htan-assets");
        assert_eq!(key, "final-output/htan-imaging-assets-latest.json");
    }

    #[test]
    fn parse_s3_uri_rejects_missing_separator() {
        let err = parse_s3_uri("s3://bucket-only").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidS3UriFormat(_)));
    }

    #[test]
    fn parse_s3_uri_rejects_other_schemes() {
        assert!(matches!(
            parse_s3_uri("gs://bucket/key"),
            Err(ValidationError::InvalidS3Uri(_))
        ));
        assert!(parse_s3_uri("bucket/key").is_err());
    }

    #[test]
    fn parse_s3_uri_rejects_empty_parts() {
        assert!(parse_s3_uri("s3:///key").is_err());
        assert!(parse_s3_uri("s3://bucket/").is_err());
    }

    #[test]
    fn object_uri_display_matches_input() {
        for raw in ["s3://a/b/c.json", "gs://bucket/dir/img.ome.tiff"] {
            assert_eq!(ObjectUri::parse(raw).unwrap().to_string(), raw);
        }
        assert!(ObjectUri::parse("https://example.org/x").is_err());
    }

    #[test]
    fn cloud_provider_from_image_path() {
        assert_eq!(cloud_provider("s3://bucket/a.tif"), Some(CloudProvider::S3));
        assert_eq!(cloud_provider("gs://bucket/a.tif"), Some(CloudProvider::Gs));
        assert_eq!(cloud_provider("/local/a.tif"), None);
        assert_eq!(cloud_provider(""), None);
    }
}
