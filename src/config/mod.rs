//! Configuration system for s3mcp
//!
//! Provides a 4-tier configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (and `.env`)
//! 3. User config file
//! 4. Built-in defaults (lowest priority)

mod defaults;
mod loader;
mod settings;
mod user_config;

pub use loader::{ConfigLoader, ConfigOverrides};
pub use settings::{AppConfig, BackendKind, ContentConfig, StorageConfig};
pub use user_config::UserConfig;
