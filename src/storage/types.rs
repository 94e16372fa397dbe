//! Results returned by the storage tools

use serde::{Serialize, Serializer};

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    #[serde(rename = "file_key")]
    pub key: String,
    pub status: String,
    pub message: String,
    #[serde(rename = "s3_location")]
    pub location: String,
}

/// Metadata of an object that exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    /// ISO-8601 timestamp
    pub last_modified: Option<String>,
}

/// Answer to "what is stored under this key?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileInfo {
    Found(ObjectInfo),
    NotFound { key: String },
}

impl FileInfo {
    pub fn key(&self) -> &str {
        match self {
            FileInfo::Found(info) => &info.key,
            FileInfo::NotFound { key } => key,
        }
    }

    pub fn exists(&self) -> bool {
        matches!(self, FileInfo::Found(_))
    }
}

/// Flat wire shape shared by both variants
#[derive(Serialize)]
struct FileInfoRecord<'a> {
    file_key: &'a str,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl Serialize for FileInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = match self {
            FileInfo::Found(info) => FileInfoRecord {
                file_key: &info.key,
                exists: true,
                size_bytes: Some(info.size_bytes),
                content_type: info.content_type.as_deref(),
                last_modified: info.last_modified.as_deref(),
                error: None,
            },
            FileInfo::NotFound { key } => FileInfoRecord {
                file_key: key,
                exists: false,
                size_bytes: None,
                content_type: None,
                last_modified: None,
                error: Some("File not found"),
            },
        };
        record.serialize(serializer)
    }
}

/// Outcome of a successful download
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    #[serde(rename = "file_key")]
    pub key: String,
    pub destination_path: String,
    pub size_bytes: u64,
    pub status: String,
    pub message: String,
}
