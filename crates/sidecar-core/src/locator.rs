//! File locators and staging-key formatting.
//!
//! A granule `filename` is an opaque string; here it is classified by scheme
//! so the fetcher knows whether to read it in place, download it over HTTP,
//! or pull it from the object store.

use crate::granule::Collection;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default local name when a locator has no usable last segment.
const DEFAULT_FILENAME: &str = "download.bin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("invalid locator {0:?}: {1}")]
    Invalid(String, String),
    #[error("s3 locator {0:?} has no bucket")]
    MissingBucket(String),
    #[error("s3 locator {0:?} has no key")]
    MissingKey(String),
    #[error("unsupported scheme {scheme:?} in {locator:?}")]
    UnsupportedScheme { scheme: String, locator: String },
}

/// A parsed granule file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    S3 { bucket: String, key: String },
    Http(String),
    Local(PathBuf),
}

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, LocatorError> {
        if let Some(rest) = raw.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(LocatorError::MissingBucket(raw.to_string()));
            }
            if key.is_empty() {
                return Err(LocatorError::MissingKey(raw.to_string()));
            }
            return Ok(Locator::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        if !raw.contains("://") {
            return Ok(Locator::Local(PathBuf::from(raw)));
        }

        let url = url::Url::parse(raw)
            .map_err(|e| LocatorError::Invalid(raw.to_string(), e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(Locator::Http(raw.to_string())),
            "file" => url
                .to_file_path()
                .map(Locator::Local)
                .map_err(|_| LocatorError::Invalid(raw.to_string(), "not a file path".into())),
            other => Err(LocatorError::UnsupportedScheme {
                scheme: other.to_string(),
                locator: raw.to_string(),
            }),
        }
    }

    /// Parse a remote key; only `s3://bucket/key` is accepted.
    pub fn parse_s3(raw: &str) -> Result<(String, String), LocatorError> {
        match Self::parse(raw)? {
            Locator::S3 { bucket, key } => Ok((bucket, key)),
            _ => Err(LocatorError::UnsupportedScheme {
                scheme: raw.split_once("://").map(|(s, _)| s).unwrap_or("").to_string(),
                locator: raw.to_string(),
            }),
        }
    }

    /// True when the locator has to be downloaded before it can be read.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Locator::Local(_))
    }

    /// Name to use for a local copy: last path segment, sanitized.
    pub fn file_name(&self) -> String {
        let candidate = match self {
            Locator::S3 { key, .. } => last_segment(key),
            Locator::Http(u) => url::Url::parse(u)
                .ok()
                .and_then(|parsed| last_segment(parsed.path())),
            Locator::Local(p) => p.file_name().map(|n| n.to_string_lossy().into_owned()),
        };
        let sanitized = candidate
            .map(|c| sanitize_file_name(&c))
            .unwrap_or_default();
        if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
            DEFAULT_FILENAME.to_string()
        } else {
            sanitized
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::S3 { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
            Locator::Http(u) => write!(f, "{}", u),
            Locator::Local(p) => write!(f, "{}", p.display()),
        }
    }
}

fn last_segment(path: &str) -> Option<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

/// Replaces NUL, `/`, `\` and control characters with `_`, trims surrounding
/// spaces and trailing dots, and caps the name at 255 bytes. Leading dots are kept.
fn sanitize_file_name(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '\0' || c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced
        .trim_start_matches(' ')
        .trim_end_matches(|c| c == ' ' || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Remote key for a sidecar:
/// `s3://{bucket}/staging/{stack}/{name}__{version}/{file name of sidecar}`.
pub fn staging_key(bucket: &str, stack: &str, collection: &Collection, sidecar: &Path) -> String {
    let filename = sidecar
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "s3://{}/staging/{}/{}/{}",
        bucket,
        stack,
        collection.id(),
        filename
    )
}
