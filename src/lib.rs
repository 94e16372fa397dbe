//! s3mcp - Object storage tools for Model Context Protocol
//!
//! This crate exposes upload, metadata lookup and download against a single
//! S3 bucket as MCP tools, alongside a small company info resource and a
//! job description prompt, for CLI-based LLM hosts.

pub mod config;
pub mod content;
pub mod mcp;
pub mod storage;
pub mod types;

pub use config::{AppConfig, ConfigLoader, StorageConfig};
pub use content::ContentLibrary;
pub use mcp::McpServer;
pub use storage::{ObjectBackend, ObjectStoreBackend, StorageManager};
pub use types::StorageError;
