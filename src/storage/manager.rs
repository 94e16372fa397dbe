//! Storage manager
//!
//! Upload, metadata lookup and download against the one configured bucket.

use crate::config::StorageConfig;
use crate::storage::backend::{HeadObject, ObjectBackend, ObjectStoreBackend};
use crate::storage::types::{DownloadResult, FileInfo, ObjectInfo, UploadResult};
use crate::types::{Result, StorageError};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const OCTET_STREAM: &str = "application/octet-stream";

pub struct StorageManager {
    config: StorageConfig,
    backend: Arc<dyn ObjectBackend>,
}

impl StorageManager {
    pub fn new(config: StorageConfig, backend: Arc<dyn ObjectBackend>) -> Self {
        info!("Creating storage manager for bucket: {}", config.bucket);
        Self { config, backend }
    }

    /// Build a manager with the backend the configuration names
    pub fn from_config(config: StorageConfig) -> Result<Self> {
        let backend = ObjectStoreBackend::from_config(&config)?;
        Ok(Self::new(config, Arc::new(backend)))
    }

    /// Upload a local file under a freshly minted key.
    ///
    /// A missing source file is reported as [`StorageError::NotFound`] before
    /// anything is sent to the backend.
    pub async fn upload(&self, local_path: &Path) -> Result<UploadResult> {
        match tokio::fs::metadata(local_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(local_path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }

        let content_type = guess_content_type(local_path);
        let key = mint_key(&self.config.key_prefix, local_path);

        let body = tokio::fs::read(local_path).await?;
        debug!(
            "Uploading {} ({} bytes) as {}",
            local_path.display(),
            body.len(),
            key
        );

        self.backend
            .put_object(&key, Bytes::from(body), &content_type)
            .await?;

        info!("Uploaded {} to {}", local_path.display(), key);

        Ok(UploadResult {
            location: self.config.location(&key),
            key,
            status: "success".to_string(),
            message: format!("File uploaded successfully from {}", local_path.display()),
        })
    }

    /// Look up an object's metadata. A missing key is `FileInfo::NotFound`.
    pub async fn get_info(&self, key: &str) -> Result<FileInfo> {
        match self.backend.head_object(key).await? {
            HeadObject::Found(meta) => Ok(FileInfo::Found(ObjectInfo {
                key: key.to_string(),
                size_bytes: meta.size_bytes,
                content_type: meta.content_type,
                last_modified: meta.last_modified.map(|t| t.to_rfc3339()),
            })),
            HeadObject::NotFound => {
                debug!("No object stored under {}", key);
                Ok(FileInfo::NotFound {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Fetch an object and write it to `destination`, replacing any file there.
    ///
    /// The body goes to a temporary sibling first and is renamed into place,
    /// so a failed write never leaves a truncated destination behind.
    pub async fn download(&self, key: &str, destination: &Path) -> Result<DownloadResult> {
        let body = self.backend.get_object(key).await?;
        let staging = staging_path(destination)?;

        if let Err(e) = tokio::fs::write(&staging, &body).await {
            discard(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&staging, destination).await {
            discard(&staging).await;
            return Err(e.into());
        }

        info!("Downloaded {} to {}", key, destination.display());

        Ok(DownloadResult {
            key: key.to_string(),
            destination_path: destination.display().to_string(),
            size_bytes: body.len() as u64,
            status: "success".to_string(),
            message: format!("File downloaded successfully to {}", destination.display()),
        })
    }
}

/// Hidden temporary file next to `destination`, on the same filesystem so
/// the final rename is atomic
fn staging_path(destination: &Path) -> Result<PathBuf> {
    let name = destination.file_name().ok_or_else(|| {
        std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} does not name a file", destination.display()),
        )
    })?;

    Ok(destination.with_file_name(format!(
        ".{}.{}.part",
        name.to_string_lossy(),
        Uuid::new_v4()
    )))
}

async fn discard(staging: &Path) {
    if let Err(e) = tokio::fs::remove_file(staging).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", staging.display(), e);
        }
    }
}

/// Content type from the file name, falling back to octet-stream
fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// `<prefix><uuid v4><.ext>`; the extension is kept so consumers can still
/// infer a rough type from the key.
fn mint_key(prefix: &str, path: &Path) -> String {
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    format!("{}{}{}", prefix, Uuid::new_v4(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BUCKET: &str = "test-bucket";

    /// Counts calls and forwards them to an in-memory store
    struct RecordingBackend {
        inner: ObjectStoreBackend,
        calls: AtomicUsize,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                inner: ObjectStoreBackend::in_memory(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl ObjectBackend for RecordingBackend {
        async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.put_object(key, body, content_type).await
        }

        async fn head_object(&self, key: &str) -> Result<HeadObject> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.head_object(key).await
        }

        async fn get_object(&self, key: &str) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_object(key).await
        }
    }

    /// Every call fails as an unreachable service would
    struct FailingBackend;

    #[async_trait::async_trait]
    impl ObjectBackend for FailingBackend {
        async fn put_object(&self, _key: &str, _body: Bytes, _content_type: &str) -> Result<()> {
            Err(StorageError::RemoteFailure("connection refused".to_string()))
        }

        async fn head_object(&self, _key: &str) -> Result<HeadObject> {
            Err(StorageError::RemoteFailure("access denied".to_string()))
        }

        async fn get_object(&self, _key: &str) -> Result<Bytes> {
            Err(StorageError::RemoteFailure("connection refused".to_string()))
        }
    }

    fn manager() -> StorageManager {
        StorageManager::new(
            StorageConfig::new(BUCKET),
            Arc::new(ObjectStoreBackend::in_memory()),
        )
    }

    #[tokio::test]
    async fn test_upload_info_download_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        let content = b"Remember to rotate the access keys today.\n";
        assert_eq!(content.len(), 42);
        std::fs::write(&source, content).unwrap();

        let manager = manager();

        let upload = manager.upload(&source).await.unwrap();
        assert!(upload.key.starts_with("user_uploads/"));
        assert!(upload.key.ends_with(".txt"));
        let id = &upload.key["user_uploads/".len()..upload.key.len() - ".txt".len()];
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(upload.status, "success");
        assert_eq!(upload.location, format!("s3://{}/{}", BUCKET, upload.key));
        assert!(upload.message.contains("notes.txt"));

        match manager.get_info(&upload.key).await.unwrap() {
            FileInfo::Found(info) => {
                assert_eq!(info.key, upload.key);
                assert_eq!(info.size_bytes, 42);
                assert_eq!(info.content_type.as_deref(), Some("text/plain"));
                let stamp = info.last_modified.as_deref().unwrap();
                assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
            }
            FileInfo::NotFound { .. } => panic!("uploaded object should exist"),
        }

        let destination = dir.path().join("out.txt");
        let download = manager.download(&upload.key, &destination).await.unwrap();
        assert_eq!(download.size_bytes, 42);
        assert_eq!(std::fs::read(&destination).unwrap(), content);
    }

    #[tokio::test]
    async fn test_upload_missing_file_makes_no_remote_call() {
        let backend = Arc::new(RecordingBackend::new());
        let manager = StorageManager::new(StorageConfig::new(BUCKET), backend.clone());

        let result = manager.upload(Path::new("/definitely/not/here.txt")).await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_info_unknown_key() {
        let info = manager()
            .get_info("user_uploads/does-not-exist.bin")
            .await
            .unwrap();

        assert!(!info.exists());
        assert_eq!(info.key(), "user_uploads/does-not-exist.bin");
    }

    #[tokio::test]
    async fn test_unknown_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("blob.zzqx");
        std::fs::write(&source, [0u8, 1, 2, 3]).unwrap();

        let manager = manager();
        let upload = manager.upload(&source).await.unwrap();
        assert!(upload.key.ends_with(".zzqx"));

        match manager.get_info(&upload.key).await.unwrap() {
            FileInfo::Found(info) => {
                assert_eq!(info.content_type.as_deref(), Some(OCTET_STREAM))
            }
            FileInfo::NotFound { .. } => panic!("uploaded object should exist"),
        }
    }

    #[tokio::test]
    async fn test_binary_round_trip_overwrites_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("image.png");
        let content: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        std::fs::write(&source, &content).unwrap();

        let destination = dir.path().join("copy.png");
        std::fs::write(&destination, b"stale contents that are longer than nothing").unwrap();

        let manager = manager();
        let upload = manager.upload(&source).await.unwrap();
        manager.download(&upload.key, &destination).await.unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), content);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        std::fs::write(&source, b"fresh data").unwrap();

        let manager = manager();
        let upload = manager.upload(&source).await.unwrap();

        // A non-empty directory cannot be replaced by a file
        let destination = dir.path().join("occupied");
        std::fs::create_dir(&destination).unwrap();
        std::fs::write(destination.join("keep.txt"), b"existing").unwrap();

        let result = manager.download(&upload.key, &destination).await;
        assert!(matches!(result, Err(StorageError::Io(_))));

        assert_eq!(std::fs::read(destination.join("keep.txt")).unwrap(), b"existing");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_download_destination_without_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        std::fs::write(&source, b"data").unwrap();

        let manager = manager();
        let upload = manager.upload(&source).await.unwrap();

        match manager.download(&upload.key, Path::new("/")).await {
            Err(StorageError::Io(e)) => assert_eq!(e.kind(), ErrorKind::InvalidInput),
            other => panic!("expected an IO error, got {:?}", other.map(|r| r.size_bytes)),
        }
    }

    #[tokio::test]
    async fn test_download_missing_key_is_remote_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = manager()
            .download("user_uploads/nope.bin", &dir.path().join("nope.bin"))
            .await;

        assert!(matches!(result, Err(StorageError::RemoteFailure(_))));
        assert!(!dir.path().join("nope.bin").exists());
    }

    #[tokio::test]
    async fn test_download_to_unwritable_destination_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        std::fs::write(&source, b"data").unwrap();

        let manager = manager();
        let upload = manager.upload(&source).await.unwrap();

        let destination = dir.path().join("missing-dir").join("a.txt");
        let result = manager.download(&upload.key, &destination).await;
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[tokio::test]
    async fn test_remote_failures_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        std::fs::write(&source, b"data").unwrap();

        let manager = StorageManager::new(StorageConfig::new(BUCKET), Arc::new(FailingBackend));

        assert!(matches!(
            manager.upload(&source).await,
            Err(StorageError::RemoteFailure(_))
        ));
        assert!(matches!(
            manager.get_info("user_uploads/a.txt").await,
            Err(StorageError::RemoteFailure(_))
        ));
        assert!(matches!(
            manager.download("user_uploads/a.txt", &dir.path().join("b.txt")).await,
            Err(StorageError::RemoteFailure(_))
        ));
    }

    #[test]
    fn test_minted_keys_are_unique() {
        let path = Path::new("/tmp/report.pdf");
        let keys: HashSet<String> = (0..10_000)
            .map(|_| mint_key("user_uploads/", path))
            .collect();

        assert_eq!(keys.len(), 10_000);
        assert!(keys
            .iter()
            .all(|k| k.starts_with("user_uploads/") && k.ends_with(".pdf")));
    }

    #[test]
    fn test_key_without_extension() {
        let key = mint_key("user_uploads/", Path::new("Makefile"));
        assert_eq!(key.len(), "user_uploads/".len() + 36);

        let key = mint_key("user_uploads/", Path::new("archive.tar.gz"));
        assert!(key.ends_with(".gz"));
    }
}
