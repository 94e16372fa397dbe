use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid object key '{0}': {1}")]
    InvalidKey(String, String),

    #[error("Object storage error: {0}")]
    RemoteFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        StorageError::RemoteFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
