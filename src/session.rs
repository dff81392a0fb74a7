//! Query Session
//!
//! The context object a front end talks to. A session owns one catalog,
//! one gateway, the execution history, the saved-query store and the state
//! of the result table (last rowset plus the client-side view over it).
//!
//! ## Architecture
//!
//! ```text
//! QuerySession
//! ├── SchemaCatalog (tables + per-table columns)
//! ├── QueryGateway  (single-flight execution)
//! ├── QueryHistory  (dispatched attempts, newest first)
//! ├── SavedQueryStore
//! ├── ResultState   (NotExecuted | Rows | Failed)
//! └── ViewState     (column filters + sort)
//! ```
//!
//! ## Run semantics
//!
//! - Rows: history recorded, result replaced, view reset
//! - Transport/Engine failure: history recorded, displayed rows cleared
//! - Validation/Rejected: notified only; history and result untouched
//!
//! Sessions share nothing with each other.

use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::descriptor::{FilterQuery, QueryDescriptor};
use crate::endpoint::SqlEndpoint;
use crate::error::QueryBenchError;
use crate::filter::FilterSet;
use crate::gateway::{ExecutionResult, Failure, FailureKind, QueryGateway, GENERIC_TRANSPORT_MESSAGE};
use crate::history::{HistoryEntry, HistoryOutcome, QueryHistory};
use crate::notify::{NotifyLevel, Notifier};
use crate::saved::{SavedQuery, SavedQueryStore, StoreError};
use crate::schema::{CatalogError, ColumnMeta, ColumnState, SchemaCatalog, TableRef};
use crate::value::{Row, Rowset};
use crate::view::{apply_view, column_names, ColumnFilters, SortState};

/// What the result table currently shows
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResultState {
    /// Nothing has been run in this session
    #[default]
    NotExecuted,
    Rows(Rowset),
    Failed(Failure),
}

/// Why the result table has no visible rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    NothingExecuted,
    /// The last query succeeded with zero rows
    NoResults,
    /// Rows exist but the column filters hide all of them
    NoMatches,
}

#[derive(Debug, Clone, Default)]
struct ViewState {
    filters: ColumnFilters,
    sort: Option<SortState>,
}

/// Single-user query workspace over a [`SqlEndpoint`]
pub struct QuerySession<E> {
    config: Config,
    catalog: Arc<SchemaCatalog<E>>,
    gateway: QueryGateway<E>,
    history: Mutex<QueryHistory>,
    saved: Mutex<SavedQueryStore>,
    result: Mutex<ResultState>,
    view: Mutex<ViewState>,
    last_descriptor: Mutex<Option<QueryDescriptor>>,
    notifier: Arc<dyn Notifier>,
}

impl<E: SqlEndpoint> QuerySession<E> {
    /// Build a session. Opens the saved-query file when one is configured.
    pub fn new(config: Config, endpoint: Arc<E>, notifier: Arc<dyn Notifier>) -> Result<Self, QueryBenchError> {
        let saved = match &config.storage.saved_queries_path {
            Some(path) => SavedQueryStore::open(path)?,
            None => SavedQueryStore::in_memory(),
        };
        let catalog = Arc::new(SchemaCatalog::new(Arc::clone(&endpoint), config.catalog.schema.clone()));
        let gateway = QueryGateway::new(endpoint, Arc::clone(&catalog));

        tracing::debug!(
            schema = %config.catalog.schema,
            history_capacity = config.history.capacity,
            saved = saved.len(),
            "session_created"
        );

        Ok(QuerySession {
            history: Mutex::new(QueryHistory::new(config.history.capacity)),
            saved: Mutex::new(saved),
            result: Mutex::new(ResultState::NotExecuted),
            view: Mutex::new(ViewState::default()),
            last_descriptor: Mutex::new(None),
            config,
            catalog,
            gateway,
            notifier,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &SchemaCatalog<E> {
        &self.catalog
    }

    pub fn gateway(&self) -> &QueryGateway<E> {
        &self.gateway
    }

    // Catalog passthroughs

    pub async fn tables(&self) -> Result<Vec<TableRef>, CatalogError> {
        let result = self.catalog.list_tables().await;
        if let Err(e) = &result {
            self.notifier.notify(NotifyLevel::Error, &e.to_string());
        }
        result
    }

    pub async fn refresh_tables(&self) -> Result<Vec<TableRef>, CatalogError> {
        let result = self.catalog.refresh_tables().await;
        if let Err(e) = &result {
            self.notifier.notify(NotifyLevel::Error, &e.to_string());
        }
        result
    }

    pub async fn columns(&self, table: &str) -> Result<Arc<Vec<ColumnMeta>>, CatalogError> {
        self.catalog.load_columns(table).await
    }

    pub async fn refresh_columns(&self, table: &str) -> Result<Arc<Vec<ColumnMeta>>, CatalogError> {
        self.catalog.refresh_columns(table).await
    }

    pub fn column_state(&self, table: &str) -> ColumnState {
        self.catalog.column_state(table)
    }

    /// Filter query over `table` using the configured page defaults
    pub fn filter_query(&self, table: &str, filters: &FilterSet) -> FilterQuery {
        let mut query = FilterQuery::new(table)
            .limit(self.config.query.default_limit)
            .offset(self.config.query.default_offset);
        query.filters = filters.clauses().to_vec();
        query
    }

    /// Execute a descriptor and update history, result and view state
    pub async fn run(&self, descriptor: QueryDescriptor) -> ExecutionResult {
        let result = self.gateway.execute(&descriptor).await;

        match &result {
            ExecutionResult::Rows(rows) => {
                self.history
                    .lock()
                    .record(descriptor.clone(), HistoryOutcome::Success { row_count: rows.len() });
                *self.result.lock() = ResultState::Rows(rows.clone());
                *self.view.lock() = ViewState::default();
                *self.last_descriptor.lock() = Some(descriptor);
                let noun = if rows.len() == 1 { "row" } else { "rows" };
                self.notifier
                    .notify(NotifyLevel::Success, &format!("Query returned {} {noun}", rows.len()));
            }
            ExecutionResult::Failure(failure) if failure.was_dispatched() => {
                self.history.lock().record(descriptor.clone(), HistoryOutcome::from(&result));
                *self.result.lock() = ResultState::Failed(failure.clone());
                *self.last_descriptor.lock() = Some(descriptor);
                self.notifier.notify(NotifyLevel::Error, failure_message(failure));
            }
            ExecutionResult::Failure(failure) => {
                self.notifier.notify(NotifyLevel::Error, &failure.message);
            }
        }
        result
    }

    // Result state

    pub fn result_state(&self) -> ResultState {
        self.result.lock().clone()
    }

    /// Rows of the last successful execution, before the view is applied
    pub fn last_rows(&self) -> Option<Rowset> {
        match &*self.result.lock() {
            ResultState::Rows(rows) => Some(rows.clone()),
            _ => None,
        }
    }

    pub fn last_descriptor(&self) -> Option<QueryDescriptor> {
        self.last_descriptor.lock().clone()
    }

    /// Last rowset with the column filters and sort applied
    pub fn visible_rows(&self) -> Vec<Row> {
        let result = self.result.lock();
        let ResultState::Rows(rows) = &*result else {
            return Vec::new();
        };
        let view = self.view.lock();
        apply_view(rows, &view.filters, view.sort.as_ref())
    }

    /// Header columns of the last rowset
    pub fn result_columns(&self) -> Vec<String> {
        match &*self.result.lock() {
            ResultState::Rows(rows) => column_names(rows),
            _ => Vec::new(),
        }
    }

    /// Why nothing is displayed, or `None` when there are visible rows.
    ///
    /// A failed execution reports `None`; its failure is the display.
    pub fn empty_state(&self) -> Option<EmptyState> {
        let result = self.result.lock();
        match &*result {
            ResultState::NotExecuted => Some(EmptyState::NothingExecuted),
            ResultState::Failed(_) => None,
            ResultState::Rows(rows) if rows.is_empty() => Some(EmptyState::NoResults),
            ResultState::Rows(rows) => {
                let view = self.view.lock();
                apply_view(rows, &view.filters, None)
                    .is_empty()
                    .then_some(EmptyState::NoMatches)
            }
        }
    }

    // View controls

    /// Set (or clear, with blank text) one column's filter
    pub fn set_column_filter(&self, column: &str, text: &str) {
        let mut view = self.view.lock();
        if text.trim().is_empty() {
            view.filters.remove(column);
        } else {
            view.filters.insert(column.to_string(), text.to_string());
        }
    }

    pub fn clear_column_filters(&self) {
        self.view.lock().filters.clear();
    }

    pub fn column_filters(&self) -> ColumnFilters {
        self.view.lock().filters.clone()
    }

    /// Advance the sort cycle for a header click and return the new sort
    pub fn toggle_sort(&self, column: &str) -> SortState {
        let mut view = self.view.lock();
        let next = SortState::toggle(view.sort.as_ref(), column);
        view.sort = Some(next.clone());
        next
    }

    pub fn sort(&self) -> Option<SortState> {
        self.view.lock().sort.clone()
    }

    // Saved queries

    /// Save the last executed descriptor
    pub fn save_current(&self, name: &str) -> Result<SavedQuery, StoreError> {
        let Some(descriptor) = self.last_descriptor() else {
            let message = "Nothing has been executed yet";
            self.notifier.notify(NotifyLevel::Error, message);
            return Err(StoreError::NothingToSave);
        };
        self.save(name, descriptor)
    }

    pub fn save(&self, name: &str, descriptor: QueryDescriptor) -> Result<SavedQuery, StoreError> {
        let result = self.saved.lock().save(name, descriptor);
        match &result {
            Ok(saved) => self
                .notifier
                .notify(NotifyLevel::Success, &format!("Saved query '{}'", saved.name)),
            Err(e) => self.notifier.notify(NotifyLevel::Error, &e.to_string()),
        }
        result
    }

    /// Delete a saved query; unknown ids are a no-op
    pub fn delete_saved(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = self.saved.lock().delete(id);
        match &result {
            Ok(true) => self.notifier.notify(NotifyLevel::Info, "Saved query deleted"),
            Ok(false) => {}
            Err(e) => self.notifier.notify(NotifyLevel::Error, &e.to_string()),
        }
        result
    }

    /// The stored descriptor, without executing it
    pub fn load_saved(&self, id: Uuid) -> Option<QueryDescriptor> {
        let saved = self.saved.lock();
        saved.get(id).map(|q| saved.load(q))
    }

    pub fn saved_queries(&self) -> Vec<SavedQuery> {
        self.saved.lock().list().to_vec()
    }

    // History

    /// History entries, newest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().entries().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
        self.notifier.notify(NotifyLevel::Info, "History cleared");
    }
}

/// Engine-coded messages are shown verbatim; bare transport errors are not
fn failure_message(failure: &Failure) -> &str {
    match failure.kind {
        FailureKind::Transport if failure.code.is_none() => GENERIC_TRANSPORT_MESSAGE,
        _ => &failure.message,
    }
}
