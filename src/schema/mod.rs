//! # Schema
//!
//! Table and column metadata read from the data store's `information_schema`.
//!
//! ## Column loading lifecycle
//!
//! ```text
//! Unloaded ──load_columns──▶ Loading ──▶ Loaded(columns)
//!     ▲                          │
//!     │                          └──────▶ Errored(error)
//!     └──────── refresh_columns ─────────────┘
//! ```
//!
//! See [`catalog::SchemaCatalog`] for the cache itself.

pub mod catalog;

pub use catalog::{CatalogError, SchemaCatalog};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Metadata of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    #[serde(default)]
    pub default_expr: Option<String>,
}

impl ColumnMeta {
    /// Nullable column without a default
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        ColumnMeta {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default_expr: None,
        }
    }
}

/// A table known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        TableRef { name: name.into() }
    }
}

/// Observable column-loading state of one table
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnState {
    Unloaded,
    Loading,
    Loaded(Arc<Vec<ColumnMeta>>),
    Errored(CatalogError),
}

impl ColumnState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ColumnState::Loading)
    }

    pub fn columns(&self) -> Option<&[ColumnMeta]> {
        match self {
            ColumnState::Loaded(cols) => Some(cols),
            _ => None,
        }
    }
}
