//! Built-in defaults
//!
//! The lowest configuration tier. Anything not set elsewhere falls back here.
//! There is deliberately no default region or content directory: the S3
//! client resolves the region from its own environment, and the content
//! library falls back to the texts compiled into the binary.

/// Namespace every uploaded key is minted under
pub const DEFAULT_KEY_PREFIX: &str = "user_uploads/";
