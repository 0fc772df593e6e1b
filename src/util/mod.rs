//! Shared helpers (config paths, error types).

pub mod config;
pub mod error;

pub use config::{config_base_dir, resolve_relative};
pub use error::{CheckedIoResult, DiskErrorConfigError, IoCheckError, OsError, StorageIoError};
