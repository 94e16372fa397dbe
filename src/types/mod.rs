//! Shared types

mod errors;

pub use errors::{Result, StorageError};
