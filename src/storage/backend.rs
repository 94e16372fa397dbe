//! Object backend capability
//!
//! The storage manager only needs three calls from a blob store. They are
//! expressed here as a narrow trait so the S3 client can be swapped for the
//! in-memory store (or a test double) without touching the manager.

use crate::config::{BackendKind, StorageConfig};
use crate::types::{Result, StorageError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, GetOptions, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use tracing::{debug, info};

/// Metadata returned by a head request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Outcome of a head request. A missing key is an answer, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadObject {
    Found(ObjectMetadata),
    NotFound,
}

#[async_trait::async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Store `body` under `key`, replacing anything already there
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;

    /// Fetch metadata without transferring the body
    async fn head_object(&self, key: &str) -> Result<HeadObject>;

    /// Fetch the full body. A missing key is a `RemoteFailure`.
    async fn get_object(&self, key: &str) -> Result<Bytes>;
}

/// [`ObjectBackend`] over any `object_store` implementation
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBackend {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Build the backend named by the configuration
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            BackendKind::S3 => Self::s3(config),
            BackendKind::Memory => Ok(Self::in_memory()),
        }
    }

    /// Amazon S3 (or S3-compatible) client.
    ///
    /// Credentials come from the usual AWS environment variables. Without a
    /// configured region the builder keeps whatever `AWS_REGION` or
    /// `AWS_DEFAULT_REGION` resolved to.
    pub fn s3(config: &StorageConfig) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_allow_http(config.allow_http);

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build S3 client: {}", e)))?;

        info!(
            "S3 backend ready for bucket {} in {}",
            config.bucket,
            config.region.as_deref().unwrap_or("the environment's default region")
        );

        Ok(Self::new(Arc::new(store)))
    }

    /// Process-local store
    pub fn in_memory() -> Self {
        info!("Using in-memory object backend");
        Self::new(Arc::new(InMemory::new()))
    }
}

/// Keys are taken literally; only empty segments, `.`/`..` and control
/// characters are rejected.
fn object_path(key: &str) -> Result<ObjectPath> {
    ObjectPath::parse(key).map_err(|e| StorageError::InvalidKey(key.to_string(), e.to_string()))
}

#[async_trait::async_trait]
impl ObjectBackend for ObjectStoreBackend {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let path = object_path(key)?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        debug!("PUT {} ({} bytes, {})", path, body.len(), content_type);
        self.store
            .put_opts(&path, PutPayload::from(body), options)
            .await?;

        Ok(())
    }

    async fn head_object(&self, key: &str) -> Result<HeadObject> {
        let path = object_path(key)?;
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        debug!("HEAD {}", path);
        match self.store.get_opts(&path, options).await {
            Ok(result) => {
                let content_type = result
                    .attributes
                    .get(&Attribute::ContentType)
                    .map(|value| value.to_string());

                Ok(HeadObject::Found(ObjectMetadata {
                    size_bytes: result.meta.size as u64,
                    content_type,
                    last_modified: Some(result.meta.last_modified),
                }))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(HeadObject::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_object(&self, key: &str) -> Result<Bytes> {
        let path = object_path(key)?;

        debug!("GET {}", path);
        let result = self.store.get(&path).await?;
        Ok(result.bytes().await?)
    }
}
