//! Object storage layer

pub mod backend;
pub mod manager;
pub mod types;

pub use backend::{HeadObject, ObjectBackend, ObjectMetadata, ObjectStoreBackend};
pub use manager::StorageManager;
pub use types::{DownloadResult, FileInfo, ObjectInfo, UploadResult};
