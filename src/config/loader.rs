//! Configuration loader with layered precedence
//!
//! Priority order (highest to lowest):
//! 1. CLI overrides
//! 2. Environment (`AWS_S3_BUCKET_NAME`, `AWS_S3_REGION`, ...)
//! 3. User config (./.s3mcp.toml, $S3MCP_CONFIG or ~/.config/s3mcp/config.toml)
//! 4. Built-in defaults

use crate::config::defaults::DEFAULT_KEY_PREFIX;
use crate::config::{AppConfig, BackendKind, ContentConfig, StorageConfig, UserConfig};
use crate::types::StorageError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ENV_BUCKET: &str = "AWS_S3_BUCKET_NAME";
pub const ENV_REGION: &str = "AWS_S3_REGION";
pub const ENV_ENDPOINT: &str = "AWS_ENDPOINT_URL";
pub const ENV_ALLOW_HTTP: &str = "S3MCP_ALLOW_HTTP";
pub const ENV_KEY_PREFIX: &str = "S3MCP_KEY_PREFIX";
pub const ENV_BACKEND: &str = "S3MCP_BACKEND";
pub const ENV_CONTENT_DIR: &str = "S3MCP_CONTENT_DIR";
pub const ENV_CONFIG: &str = "S3MCP_CONFIG";

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub backend: Option<BackendKind>,
    pub content_dir: Option<PathBuf>,
}

pub struct ConfigLoader {
    user_config: Option<UserConfig>,
}

impl ConfigLoader {
    /// Load the user config file, if any.
    ///
    /// An explicit path must exist; otherwise the usual locations are probed
    /// and a missing file is not an error.
    pub fn new(explicit: Option<&Path>) -> Result<Self, StorageError> {
        let user_config = match explicit {
            Some(path) => Some(Self::read_user_config(path)?),
            None => Self::load_user_config()?,
        };

        if user_config.is_some() {
            info!("Loaded user configuration");
        }

        Ok(Self { user_config })
    }

    /// Loader backed by an already-parsed config file
    pub fn with_user_config(user_config: Option<UserConfig>) -> Self {
        Self { user_config }
    }

    fn load_user_config() -> Result<Option<UserConfig>, StorageError> {
        let mut candidates = Vec::new();

        // Project-specific config
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(".s3mcp.toml"));
        }

        if let Ok(config_path) = std::env::var(ENV_CONFIG) {
            candidates.push(PathBuf::from(config_path));
        }

        // User-global config
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("s3mcp").join("config.toml"));
        }

        for path in &candidates {
            if path.exists() {
                return Self::read_user_config(path).map(Some);
            }
        }

        debug!("No user config file found");
        Ok(None)
    }

    fn read_user_config(path: &Path) -> Result<UserConfig, StorageError> {
        debug!("Loading user config from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorageError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            StorageError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Resolve the final configuration from the process environment
    pub fn resolve_from_env(&self, overrides: &ConfigOverrides) -> Result<AppConfig, StorageError> {
        self.resolve(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve the final configuration.
    ///
    /// `env` looks up an environment variable; empty values count as unset.
    pub fn resolve<F>(&self, overrides: &ConfigOverrides, env: F) -> Result<AppConfig, StorageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());
        let file = self.user_config.clone().unwrap_or_default();

        let bucket = overrides
            .bucket
            .clone()
            .or_else(|| env(ENV_BUCKET))
            .or(file.storage.bucket)
            .ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "No bucket configured. Set {} or pass --bucket",
                    ENV_BUCKET
                ))
            })?;

        let region = overrides
            .region
            .clone()
            .or_else(|| env(ENV_REGION))
            .or(file.storage.region);

        let endpoint = overrides
            .endpoint
            .clone()
            .or_else(|| env(ENV_ENDPOINT))
            .or(file.storage.endpoint);

        let allow_http = match env(ENV_ALLOW_HTTP) {
            Some(value) => parse_bool(ENV_ALLOW_HTTP, &value)?,
            None => file.storage.allow_http.unwrap_or(false),
        };

        let mut key_prefix = env(ENV_KEY_PREFIX)
            .or(file.storage.key_prefix)
            .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());
        if !key_prefix.is_empty() && !key_prefix.ends_with('/') {
            key_prefix.push('/');
        }

        let backend = match overrides.backend {
            Some(backend) => backend,
            None => match env(ENV_BACKEND) {
                Some(value) => value.parse()?,
                None => file.storage.backend.unwrap_or_default(),
            },
        };

        let content_dir = overrides
            .content_dir
            .clone()
            .or_else(|| env(ENV_CONTENT_DIR).map(PathBuf::from))
            .or(file.content.content_dir);

        debug!(
            "Resolved configuration: bucket={}, region={:?}, backend={}",
            bucket, region, backend
        );

        Ok(AppConfig {
            storage: StorageConfig {
                bucket,
                region,
                endpoint,
                allow_http,
                key_prefix,
                backend,
            },
            content: ContentConfig { content_dir },
        })
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, StorageError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(StorageError::ConfigError(format!(
            "Invalid boolean for {}: '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_resolve_from_environment() {
        let loader = ConfigLoader::with_user_config(None);
        let config = loader
            .resolve(
                &ConfigOverrides::default(),
                env_from(&[(ENV_BUCKET, "uploads"), (ENV_REGION, "eu-west-1")]),
            )
            .unwrap();

        assert_eq!(config.storage.bucket, "uploads");
        assert_eq!(config.storage.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.storage.key_prefix, "user_uploads/");
        assert_eq!(config.storage.backend, BackendKind::S3);
        assert_eq!(config.content.content_dir, None);
    }

    #[test]
    fn test_region_left_to_client_when_unset() {
        let loader = ConfigLoader::with_user_config(None);
        // AWS_REGION is read by the S3 client itself, not by the loader
        let config = loader
            .resolve(
                &ConfigOverrides::default(),
                env_from(&[(ENV_BUCKET, "uploads"), ("AWS_REGION", "eu-central-1")]),
            )
            .unwrap();

        assert_eq!(config.storage.region, None);
    }

    #[test]
    fn test_missing_bucket_is_config_error() {
        let loader = ConfigLoader::with_user_config(None);
        let result = loader.resolve(&ConfigOverrides::default(), env_from(&[]));
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[test]
    fn test_empty_env_value_counts_as_unset() {
        let loader = ConfigLoader::with_user_config(None);
        let result = loader.resolve(&ConfigOverrides::default(), env_from(&[(ENV_BUCKET, "  ")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let file: UserConfig = toml::from_str(
            r#"
            [storage]
            bucket = "from-file"
            region = "ap-south-1"
            key_prefix = "incoming"
            backend = "memory"

            [content]
            content_dir = "/srv/content"
            "#,
        )
        .unwrap();
        let loader = ConfigLoader::with_user_config(Some(file));

        let config = loader
            .resolve(&ConfigOverrides::default(), env_from(&[]))
            .unwrap();
        assert_eq!(config.storage.bucket, "from-file");
        assert_eq!(config.storage.region.as_deref(), Some("ap-south-1"));
        assert_eq!(config.storage.key_prefix, "incoming/");
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(
            config.content.content_dir,
            Some(PathBuf::from("/srv/content"))
        );

        let config = loader
            .resolve(&ConfigOverrides::default(), env_from(&[(ENV_BUCKET, "from-env")]))
            .unwrap();
        assert_eq!(config.storage.bucket, "from-env");

        let overrides = ConfigOverrides {
            bucket: Some("from-cli".to_string()),
            backend: Some(BackendKind::S3),
            ..Default::default()
        };
        let config = loader
            .resolve(&overrides, env_from(&[(ENV_BUCKET, "from-env")]))
            .unwrap();
        assert_eq!(config.storage.bucket, "from-cli");
        assert_eq!(config.storage.backend, BackendKind::S3);
    }

    #[test]
    fn test_invalid_backend_and_bool() {
        let loader = ConfigLoader::with_user_config(None);

        let result = loader.resolve(
            &ConfigOverrides::default(),
            env_from(&[(ENV_BUCKET, "b"), (ENV_BACKEND, "gcs")]),
        );
        assert!(matches!(result, Err(StorageError::ConfigError(_))));

        let result = loader.resolve(
            &ConfigOverrides::default(),
            env_from(&[(ENV_BUCKET, "b"), (ENV_ALLOW_HTTP, "maybe")]),
        );
        assert!(matches!(result, Err(StorageError::ConfigError(_))));

        let config = loader
            .resolve(
                &ConfigOverrides::default(),
                env_from(&[(ENV_BUCKET, "b"), (ENV_ALLOW_HTTP, "true")]),
            )
            .unwrap();
        assert!(config.storage.allow_http);
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3mcp.toml");
        std::fs::write(&path, "[storage]\nbucket = \"explicit\"\n").unwrap();

        let loader = ConfigLoader::new(Some(path.as_path())).unwrap();
        let config = loader
            .resolve(&ConfigOverrides::default(), env_from(&[]))
            .unwrap();
        assert_eq!(config.storage.bucket, "explicit");

        let missing = ConfigLoader::new(Some(dir.path().join("nope.toml").as_path()));
        assert!(missing.is_err());
    }
}
