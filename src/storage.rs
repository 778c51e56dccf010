//! File-backed persistence for collections and environments
//!
//! Layout under the data directory:
//!
//! ```text
//! collections/<collection id>.yaml
//! environments.yaml
//! ```
//!
//! Writes replace whole files through a temporary sibling and a rename.
//! Loads are per unit: a corrupt unit is reported and skipped.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::constants::{COLLECTIONS_DIR, ENVIRONMENTS_FILE, UNIT_EXTENSION};
use crate::error::StoreError;
use crate::models::{Collection, Environment};

/// A unit that could not be loaded
#[derive(Debug)]
pub struct LoadFailure {
    /// Collection id (file stem) or environment position/id
    pub unit: String,
    pub error: StoreError,
}

/// Result of enumerating persisted units
#[derive(Debug)]
pub struct LoadOutcome<T> {
    pub loaded: Vec<T>,
    pub failed: Vec<LoadFailure>,
}

impl<T> LoadOutcome<T> {
    fn empty() -> Self {
        LoadOutcome {
            loaded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids of units that failed to load
    pub fn failed_units(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.unit.as_str()).collect()
    }
}

/// Manages file storage for collections and environments
#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Storage { root: root.into() }
    }

    /// Storage rooted at the configured data directory
    pub fn from_config(config: &crate::config::CoreConfig) -> Self {
        Self::new(&config.data_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collections_dir(&self) -> PathBuf {
        self.root.join(COLLECTIONS_DIR)
    }

    fn collection_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_unit_id(id)?;
        Ok(self
            .collections_dir()
            .join(format!("{}.{}", id, UNIT_EXTENSION)))
    }

    fn environments_path(&self) -> PathBuf {
        self.root.join(ENVIRONMENTS_FILE)
    }

    /// Save a collection to its own file
    pub fn save_collection(&self, collection: &Collection) -> Result<(), StoreError> {
        let path = self.collection_path(collection.id())?;
        let content = to_yaml(collection.id(), collection)?;
        write_atomic(&path, content.as_bytes())?;
        tracing::debug!(id = collection.id(), path = %path.display(), "Saved collection");
        Ok(())
    }

    /// Delete a persisted collection. Deleting a missing one is not an error.
    pub fn delete_collection(&self, id: &str) -> Result<(), StoreError> {
        let path = self.collection_path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Load every persisted collection. Only a failure to list the
    /// directory is an error; individual files fail independently.
    pub fn load_collections(&self) -> Result<LoadOutcome<Collection>, StoreError> {
        let dir = self.collections_dir();
        let mut outcome = LoadOutcome::empty();
        if !dir.exists() {
            return Ok(outcome);
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(UNIT_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let unit = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let loaded = read_collection(&path).and_then(|collection| {
                if collection.id() == unit {
                    Ok(collection)
                } else {
                    Err(StoreError::IdMismatch {
                        path: path.clone(),
                        id: collection.id().to_string(),
                    })
                }
            });
            match loaded {
                Ok(collection) => outcome.loaded.push(collection),
                Err(error) => {
                    tracing::warn!(unit = %unit, error = %error, "Skipping unreadable collection");
                    outcome.failed.push(LoadFailure { unit, error });
                }
            }
        }

        Ok(outcome)
    }

    /// Save the full list of environments
    pub fn save_environments(&self, environments: &[Environment]) -> Result<(), StoreError> {
        let path = self.environments_path();
        let content = to_yaml(ENVIRONMENTS_FILE, environments)?;
        write_atomic(&path, content.as_bytes())?;
        tracing::debug!(count = environments.len(), path = %path.display(), "Saved environments");
        Ok(())
    }

    /// Load environments; each list entry is decoded on its own
    pub fn load_environments(&self) -> Result<LoadOutcome<Environment>, StoreError> {
        let path = self.environments_path();
        let mut outcome = LoadOutcome::empty();
        if !path.exists() {
            return Ok(outcome);
        }

        let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        if content.trim().is_empty() {
            return Ok(outcome);
        }

        let entries = match serde_yaml::from_str::<Vec<serde_yaml::Value>>(&content) {
            Ok(entries) => entries,
            Err(source) => {
                let error = StoreError::Parse {
                    path: path.clone(),
                    source,
                };
                tracing::warn!(error = %error, "Skipping unreadable environments file");
                outcome.failed.push(LoadFailure {
                    unit: ENVIRONMENTS_FILE.to_string(),
                    error,
                });
                return Ok(outcome);
            }
        };

        for (index, entry) in entries.into_iter().enumerate() {
            let unit = entry
                .get("id")
                .and_then(|id| id.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index));
            match serde_yaml::from_value::<Environment>(entry) {
                Ok(environment) => outcome.loaded.push(environment),
                Err(source) => {
                    let error = StoreError::Parse {
                        path: path.clone(),
                        source,
                    };
                    tracing::warn!(unit = %unit, error = %error, "Skipping unreadable environment");
                    outcome.failed.push(LoadFailure { unit, error });
                }
            }
        }

        Ok(outcome)
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new(crate::config::default_data_dir())
    }
}

fn read_collection(path: &Path) -> Result<Collection, StoreError> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_yaml::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn to_yaml<T: Serialize + ?Sized>(unit: &str, value: &T) -> Result<String, StoreError> {
    serde_yaml::to_string(value).map_err(|source| StoreError::Serialize {
        unit: unit.to_string(),
        source,
    })
}

/// Ids become file names, so keep them to a safe alphabet
fn validate_unit_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

/// Write the complete content to a sibling temp file, then rename over the
/// target. Readers see either the old file or the new one.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unit");
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(path, e)
    })
}
