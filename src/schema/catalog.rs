//! # Schema Catalog
//!
//! Lazily loaded table and column metadata.
//!
//! The table list is fetched once and cached until [`SchemaCatalog::refresh_tables`].
//! Columns are fetched per table on first use. Concurrent callers asking
//! for the same table share one in-flight fetch through a `watch` channel,
//! and the outcome (success or error) is cached until
//! [`SchemaCatalog::refresh_columns`]. An error for one table never touches
//! the others.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use super::{ColumnMeta, ColumnState, TableRef};
use crate::endpoint::SqlEndpoint;
use crate::filter::quote_literal;
use crate::gateway::response::{normalize_response, ExecutionResult, Failure, FailureKind};
use crate::value::{Row, RowValue, Rowset};

/// Error types for catalog operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The metadata query did not reach the engine
    #[error("{message}")]
    Transport { message: String, code: Option<String> },
    /// The engine rejected the metadata query
    #[error("{message}")]
    Engine { message: String, code: Option<String> },
    /// Metadata rows did not have the expected shape
    #[error("Malformed catalog response: {0}")]
    Malformed(String),
}

impl From<Failure> for CatalogError {
    fn from(failure: Failure) -> Self {
        match failure.kind {
            FailureKind::Engine => CatalogError::Engine {
                message: failure.message,
                code: failure.code,
            },
            _ => CatalogError::Transport {
                message: failure.message,
                code: failure.code,
            },
        }
    }
}

impl From<CatalogError> for Failure {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Engine { message, code } => Failure::new(FailureKind::Engine, message, code),
            CatalogError::Transport { message, code } => {
                Failure::new(FailureKind::Transport, message, code)
            }
            other => Failure::new(FailureKind::Transport, other.to_string(), None),
        }
    }
}

type ColumnLoad = Result<Arc<Vec<ColumnMeta>>, CatalogError>;

/// Cache slot for one table's columns
enum Slot {
    Loading {
        generation: u64,
        rx: watch::Receiver<Option<ColumnLoad>>,
    },
    Loaded(Arc<Vec<ColumnMeta>>),
    Errored(CatalogError),
}

enum Claim {
    Ready(ColumnLoad),
    Wait(watch::Receiver<Option<ColumnLoad>>),
    Fetch {
        generation: u64,
        tx: watch::Sender<Option<ColumnLoad>>,
    },
}

/// Table/column metadata cache over a [`SqlEndpoint`]
pub struct SchemaCatalog<E> {
    endpoint: Arc<E>,
    /// Database schema the catalog reads from (e.g. `public`)
    schema: String,
    tables: Mutex<Option<Vec<TableRef>>>,
    columns: Mutex<HashMap<String, Slot>>,
    next_generation: AtomicU64,
}

impl<E: SqlEndpoint> SchemaCatalog<E> {
    pub fn new(endpoint: Arc<E>, schema: impl Into<String>) -> Self {
        SchemaCatalog {
            endpoint,
            schema: schema.into(),
            tables: Mutex::new(None),
            columns: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// List tables, fetching them on first use
    pub async fn list_tables(&self) -> Result<Vec<TableRef>, CatalogError> {
        let cached = self.tables.lock().clone();
        if let Some(tables) = cached {
            return Ok(tables);
        }
        self.fetch_tables().await
    }

    /// Drop the cached table list and fetch it again
    pub async fn refresh_tables(&self) -> Result<Vec<TableRef>, CatalogError> {
        *self.tables.lock() = None;
        self.fetch_tables().await
    }

    /// Last successfully fetched table list; empty if the last fetch failed
    pub fn cached_tables(&self) -> Vec<TableRef> {
        self.tables.lock().clone().unwrap_or_default()
    }

    async fn fetch_tables(&self) -> Result<Vec<TableRef>, CatalogError> {
        let sql = format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = {} AND table_type = 'BASE TABLE' ORDER BY table_name",
            quote_literal(&self.schema)
        );

        let parsed = match normalize_response(self.endpoint.execute_sql(&sql).await) {
            ExecutionResult::Rows(rows) => parse_tables(&rows),
            ExecutionResult::Failure(failure) => Err(failure.into()),
        };

        match parsed {
            Ok(tables) => {
                tracing::info!(schema = %self.schema, count = tables.len(), "tables_loaded");
                *self.tables.lock() = Some(tables.clone());
                Ok(tables)
            }
            Err(e) => {
                // Fail closed: no stale list survives a failed fetch
                tracing::warn!(schema = %self.schema, error = %e, "table_list_failed");
                *self.tables.lock() = None;
                Err(e)
            }
        }
    }

    /// Load a table's columns.
    ///
    /// Returns the cached outcome if present. If a fetch for `table` is in
    /// flight, waits for it instead of issuing a second one.
    pub async fn load_columns(&self, table: &str) -> ColumnLoad {
        loop {
            match self.claim_columns(table) {
                Claim::Ready(result) => return result,
                Claim::Wait(rx) => {
                    tracing::debug!(table = %table, "column_load_joined");
                    match wait_for_load(rx).await {
                        Some(result) => return result,
                        // The fetcher was dropped; take over the load
                        None => tracing::debug!(table = %table, "column_load_abandoned"),
                    }
                }
                Claim::Fetch { generation, tx } => {
                    let result = self.fetch_columns(table).await;
                    {
                        let mut slots = self.columns.lock();
                        let still_current = matches!(
                            slots.get(table),
                            Some(Slot::Loading { generation: g, .. }) if *g == generation
                        );
                        if still_current {
                            let slot = match &result {
                                Ok(cols) => Slot::Loaded(Arc::clone(cols)),
                                Err(err) => Slot::Errored(err.clone()),
                            };
                            slots.insert(table.to_string(), slot);
                        }
                    }
                    tx.send_replace(Some(result.clone()));
                    return result;
                }
            }
        }
    }

    fn claim_columns(&self, table: &str) -> Claim {
        let mut slots = self.columns.lock();
        match slots.get(table) {
            Some(Slot::Loaded(cols)) => return Claim::Ready(Ok(Arc::clone(cols))),
            Some(Slot::Errored(err)) => return Claim::Ready(Err(err.clone())),
            // A closed channel means the fetching future was dropped
            Some(Slot::Loading { rx, .. }) if rx.has_changed().is_ok() => {
                return Claim::Wait(rx.clone())
            }
            _ => {}
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        slots.insert(table.to_string(), Slot::Loading { generation, rx });
        Claim::Fetch { generation, tx }
    }

    /// Invalidate a table's cached columns and fetch them again
    pub async fn refresh_columns(&self, table: &str) -> ColumnLoad {
        self.invalidate(table);
        self.load_columns(table).await
    }

    /// Forget a table's cached columns
    pub fn invalidate(&self, table: &str) {
        self.columns.lock().remove(table);
    }

    /// Forget everything: table list and all columns
    pub fn invalidate_all(&self) {
        *self.tables.lock() = None;
        self.columns.lock().clear();
    }

    /// Current loading state of a table's columns
    pub fn column_state(&self, table: &str) -> ColumnState {
        match self.columns.lock().get(table) {
            None => ColumnState::Unloaded,
            Some(Slot::Loading { rx, .. }) => {
                if rx.has_changed().is_ok() {
                    ColumnState::Loading
                } else {
                    ColumnState::Unloaded
                }
            }
            Some(Slot::Loaded(cols)) => ColumnState::Loaded(Arc::clone(cols)),
            Some(Slot::Errored(err)) => ColumnState::Errored(err.clone()),
        }
    }

    async fn fetch_columns(&self, table: &str) -> ColumnLoad {
        let sql = format!(
            "SELECT column_name, data_type, is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_schema = {} AND table_name = {} ORDER BY ordinal_position",
            quote_literal(&self.schema),
            quote_literal(table)
        );

        tracing::debug!(table = %table, "column_load_started");
        let parsed = match normalize_response(self.endpoint.execute_sql(&sql).await) {
            ExecutionResult::Rows(rows) => parse_columns(&rows),
            ExecutionResult::Failure(failure) => Err(failure.into()),
        };

        match &parsed {
            Ok(cols) => tracing::info!(table = %table, count = cols.len(), "columns_loaded"),
            Err(e) => tracing::warn!(table = %table, error = %e, "column_load_failed"),
        }
        parsed.map(Arc::new)
    }
}

/// `None` when the sender went away without publishing an outcome
async fn wait_for_load(mut rx: watch::Receiver<Option<ColumnLoad>>) -> Option<ColumnLoad> {
    let outcome = match rx.wait_for(Option::is_some).await {
        Ok(outcome) => (*outcome).clone(),
        Err(_) => None,
    };
    outcome
}

fn text_field(row: &Row, column: &str) -> Option<String> {
    match row.get(column) {
        Some(RowValue::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn parse_tables(rows: &Rowset) -> Result<Vec<TableRef>, CatalogError> {
    rows.iter()
        .map(|row| {
            text_field(row, "table_name")
                .map(TableRef::new)
                .ok_or_else(|| CatalogError::Malformed("missing table_name".to_string()))
        })
        .collect()
}

fn parse_columns(rows: &Rowset) -> Result<Vec<ColumnMeta>, CatalogError> {
    rows.iter()
        .map(|row| {
            let name = text_field(row, "column_name")
                .ok_or_else(|| CatalogError::Malformed("missing column_name".to_string()))?;
            let data_type = text_field(row, "data_type").unwrap_or_default();
            let is_nullable = match row.get("is_nullable") {
                Some(RowValue::Bool(b)) => *b,
                Some(RowValue::String(s)) => s.eq_ignore_ascii_case("yes"),
                _ => true,
            };
            Ok(ColumnMeta {
                name,
                data_type,
                is_nullable,
                default_expr: text_field(row, "column_default"),
            })
        })
        .collect()
}
