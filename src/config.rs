use crate::util::config::{config_base_dir, resolve_relative};
use crate::util::error::DiskErrorConfigError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Operator overrides for disk error handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiskErrorConfig {
    /// Codes treated as fatal on top of the fixed set.
    #[serde(default)]
    pub extra_fatal_codes: Vec<i32>,
    /// Codes never treated as fatal, even if part of the fixed set.
    #[serde(default)]
    pub non_fatal_codes: Vec<i32>,
    #[serde(default = "default_isolate_on_fatal")]
    pub isolate_on_fatal: bool,
}

fn default_isolate_on_fatal() -> bool {
    true
}

impl Default for DiskErrorConfig {
    fn default() -> Self {
        Self {
            extra_fatal_codes: Vec::new(),
            non_fatal_codes: Vec::new(),
            isolate_on_fatal: default_isolate_on_fatal(),
        }
    }
}

impl DiskErrorConfig {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, DiskErrorConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// JSON-backed config file, typically `<state>/disk_errors.json`.
#[derive(Debug, Clone)]
pub struct DiskErrorConfigStore {
    path: PathBuf,
}

impl DiskErrorConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves `path` against the directory of the node config file.
    pub fn relative_to(config_path: &Path, path: &Path) -> Self {
        Self::new(resolve_relative(&config_base_dir(config_path), path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_or_default(&self) -> Result<DiskErrorConfig, DiskErrorConfigError> {
        match fs::read(&self.path) {
            Ok(bytes) => DiskErrorConfig::from_json_slice(&bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(DiskErrorConfig::default()),
            Err(err) => Err(DiskErrorConfigError::Io(err)),
        }
    }

    pub fn persist(&self, config: &DiskErrorConfig) -> Result<(), DiskErrorConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        let payload = serde_json::to_vec_pretty(config)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = DiskErrorConfigStore::new(dir.path().join("disk_errors.json"));
        let config = store.load_or_default().unwrap();
        assert_eq!(config, DiskErrorConfig::default());
        assert!(config.isolate_on_fatal);
    }

    #[test]
    fn persist_then_load() {
        let dir = tempdir().unwrap();
        let store = DiskErrorConfigStore::new(dir.path().join("nested/disk_errors.json"));
        let config = DiskErrorConfig {
            extra_fatal_codes: vec![13],
            non_fatal_codes: vec![30],
            isolate_on_fatal: false,
        };
        store.persist(&config).unwrap();
        assert_eq!(store.load_or_default().unwrap(), config);
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let config = DiskErrorConfig::from_json_slice(br#"{"non_fatal_codes":[28]}"#).unwrap();
        assert_eq!(config.non_fatal_codes, vec![28]);
        assert!(config.extra_fatal_codes.is_empty());
        assert!(config.isolate_on_fatal);
    }

    #[test]
    fn malformed_document_is_a_serialization_error() {
        let err = DiskErrorConfig::from_json_slice(b"{not json").unwrap_err();
        assert!(matches!(err, DiskErrorConfigError::Serialization(_)));
    }

    #[test]
    fn relative_store_path_follows_config_file() {
        let store =
            DiskErrorConfigStore::relative_to(Path::new("/etc/node/node.toml"), Path::new("disk.json"));
        assert_eq!(store.path(), Path::new("/etc/node/disk.json"));
    }
}
