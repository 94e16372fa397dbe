//! Resolved configuration types
//!
//! These are what the rest of the crate consumes. They are built once by
//! [`ConfigLoader`](super::ConfigLoader) and passed in explicitly, so nothing
//! downstream reads the process environment on its own.

use crate::types::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub content: ContentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Bucket all operations run against
    pub bucket: String,

    /// Region of the bucket. `None` leaves it to the S3 client's own
    /// environment discovery (`AWS_REGION`, `AWS_DEFAULT_REGION`).
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible services (MinIO, R2, ...)
    pub endpoint: Option<String>,

    /// Permit plain HTTP endpoints
    pub allow_http: bool,

    /// Prefix for minted upload keys, including the trailing slash
    pub key_prefix: String,

    /// Which object store implementation to talk to
    pub backend: BackendKind,
}

impl StorageConfig {
    /// Config for a bucket with every other field at its default
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: None,
            endpoint: None,
            allow_http: false,
            key_prefix: super::defaults::DEFAULT_KEY_PREFIX.to_string(),
            backend: BackendKind::S3,
        }
    }

    /// Fully-qualified location of a key, e.g. `s3://bucket/user_uploads/x.txt`
    pub fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentConfig {
    /// Directory holding `resource.txt` and `prompt.txt`. `None` serves the
    /// copies compiled into the binary.
    pub content_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Amazon S3 or an S3-compatible endpoint
    #[default]
    S3,
    /// Process-local store, contents vanish on exit
    Memory,
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(BackendKind::S3),
            "memory" => Ok(BackendKind::Memory),
            other => Err(StorageError::ConfigError(format!(
                "Unknown storage backend '{}' (expected 's3' or 'memory')",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::S3 => write!(f, "s3"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}
