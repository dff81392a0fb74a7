//! Saved Query Store
//!
//! Named query descriptors the user can reload later. Names are free-form
//! (no uniqueness), ids are UUIDs.
//!
//! ## Storage
//!
//! When opened with a path, the store is loaded from and written through to a
//! JSON file after every mutation:
//!
//! ```json
//! { "version": 1, "queries": [ { "id": "...", "name": "...", "descriptor": {...}, "created_at": "..." } ] }
//! ```
//!
//! A missing file is an empty store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::descriptor::QueryDescriptor;
use crate::error::ValidationError;

const STORE_VERSION: u32 = 1;

/// Saved query store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported saved query file version {0}")]
    UnsupportedVersion(u32),

    #[error("No executed query to save")]
    NothingToSave,
}

/// A named, stored query descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: Uuid,
    pub name: String,
    pub descriptor: QueryDescriptor,
    pub created_at: DateTime<Utc>,
}

/// On-disk format
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    queries: Vec<SavedQuery>,
}

/// Saved queries, optionally backed by a JSON file
#[derive(Debug, Default)]
pub struct SavedQueryStore {
    queries: Vec<SavedQuery>,
    path: Option<PathBuf>,
}

impl SavedQueryStore {
    /// In-memory store
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed store, loading existing entries
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let queries = if path.exists() {
            load_file(&path)?
        } else {
            Vec::new()
        };
        tracing::debug!(path = %path.display(), count = queries.len(), "saved_queries_opened");
        Ok(SavedQueryStore {
            queries,
            path: Some(path),
        })
    }

    /// Save a descriptor under a name. Blank names are rejected before
    /// anything is stored.
    pub fn save(&mut self, name: &str, descriptor: QueryDescriptor) -> Result<SavedQuery, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptySaveName.into());
        }

        let saved = SavedQuery {
            id: Uuid::new_v4(),
            name: name.to_string(),
            descriptor,
            created_at: Utc::now(),
        };
        self.queries.push(saved.clone());
        if let Err(e) = self.persist() {
            self.queries.pop();
            return Err(e);
        }
        tracing::info!(id = %saved.id, name = %saved.name, "query_saved");
        Ok(saved)
    }

    /// Remove a saved query. Unknown ids are a no-op; returns whether
    /// anything was removed.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let Some(pos) = self.queries.iter().position(|q| q.id == id) else {
            return Ok(false);
        };
        let removed = self.queries.remove(pos);
        if let Err(e) = self.persist() {
            self.queries.insert(pos, removed);
            return Err(e);
        }
        tracing::info!(id = %id, "saved_query_deleted");
        Ok(true)
    }

    /// The stored descriptor, verbatim. Loading never executes anything.
    pub fn load(&self, saved: &SavedQuery) -> QueryDescriptor {
        saved.descriptor.clone()
    }

    pub fn get(&self, id: Uuid) -> Option<&SavedQuery> {
        self.queries.iter().find(|q| q.id == id)
    }

    /// All queries with this name (names are not unique)
    pub fn find_by_name(&self, name: &str) -> Vec<&SavedQuery> {
        self.queries.iter().filter(|q| q.name == name).collect()
    }

    /// Saved queries in creation order
    pub fn list(&self) -> &[SavedQuery] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = StoreFile {
            version: STORE_VERSION,
            queries: self.queries.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        // Write-then-rename
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<Vec<SavedQuery>, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: StoreFile = serde_json::from_str(&content)?;
    if file.version != STORE_VERSION {
        return Err(StoreError::UnsupportedVersion(file.version));
    }
    Ok(file.queries)
}
