//! Dependency index persistence.
//!
//! The index is stored as a flat JSON object: component path → array of
//! document paths. It lives under the output directory and is optionally
//! mirrored to the project root so that `clean` does not lose it.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use super::index::{DependencyIndex, PathSet};
use crate::log;
use crate::utils::path::to_slash;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize dependency index: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Location(s) of the persisted dependency index.
#[derive(Debug, Clone)]
pub struct DependencyStore {
    primary: PathBuf,
    mirror: Option<PathBuf>,
}

impl DependencyStore {
    pub fn new(primary: PathBuf, mirror: Option<PathBuf>) -> Self {
        Self { primary, mirror }
    }

    /// Serialize the whole index, replacing previous file content.
    ///
    /// Failures are logged and swallowed: a missing index only costs
    /// incremental rebuild precision.
    pub fn save(&self, index: &DependencyIndex) {
        if let Err(e) = self.try_save(index) {
            log!("deps"; "{e}");
        }
    }

    pub fn try_save(&self, index: &DependencyIndex) -> Result<(), StoreError> {
        let content = to_json(index)?;
        write_if_changed(&self.primary, &content)?;
        if let Some(mirror) = &self.mirror {
            write_if_changed(mirror, &content)?;
        }
        Ok(())
    }

    /// Load the freshest readable copy: primary, then mirror, else empty.
    pub fn load(&self) -> DependencyIndex {
        let candidates = std::iter::once(&self.primary).chain(self.mirror.as_ref());
        for path in candidates {
            match read_index(path) {
                Ok(Some(index)) => return index,
                Ok(None) => {}
                Err(e) => log!("deps"; "ignoring {}: {e}", path.display()),
            }
        }
        DependencyIndex::new()
    }
}

/// Serialize with sorted keys and members so identical indexes give identical files.
///
/// Paths are written with forward slashes on every platform.
fn to_json(index: &DependencyIndex) -> Result<String, serde_json::Error> {
    let mut entries: Vec<_> = index.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut map = Map::with_capacity(entries.len());
    for (component, documents) in entries {
        let mut docs: Vec<_> = documents
            .iter()
            .map(|d| to_slash(d))
            .collect();
        docs.sort();
        map.insert(
            to_slash(component),
            Value::Array(docs.into_iter().map(Value::String).collect()),
        );
    }
    serde_json::to_string_pretty(&Value::Object(map))
}

/// Parse the flat map, skipping values that are not string arrays.
fn from_json(content: &str) -> Result<DependencyIndex, serde_json::Error> {
    let value: Value = serde_json::from_str(content)?;
    let mut index = DependencyIndex::new();

    let Value::Object(map) = value else {
        return Ok(index);
    };
    for (component, documents) in map {
        let Value::Array(items) = documents else {
            continue;
        };
        let set: PathSet = items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(PathBuf::from(s)),
                _ => None,
            })
            .collect();
        index.insert_entry(PathBuf::from(component), set);
    }
    Ok(index)
}

/// `Ok(None)` when the file does not exist.
fn read_index(path: &Path) -> Result<Option<DependencyIndex>, String> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    from_json(&content).map(Some).map_err(|e| e.to_string())
}

fn write_if_changed(path: &Path, content: &str) -> Result<(), StoreError> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(());
    }
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    };
    write().map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
