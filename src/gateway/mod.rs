//! Query Execution Gateway
//!
//! The single chokepoint through which compiled or raw SQL reaches the
//! endpoint:
//! - Raw SQL is sent byte-for-byte (never rewritten, no implicit `LIMIT`)
//! - Filter queries are compiled against the table's catalog columns
//! - Every outcome is normalized into an [`ExecutionResult`]
//!
//! Only one execution runs at a time; a second request while one is running
//! is rejected, not queued.

pub mod response;

pub use response::{normalize_response, ExecutionResult, Failure, FailureKind, GENERIC_TRANSPORT_MESSAGE};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::descriptor::QueryDescriptor;
use crate::endpoint::SqlEndpoint;
use crate::error::ValidationError;
use crate::filter::SqlCompiler;
use crate::schema::SchemaCatalog;

/// Lifecycle of the most recent execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Releases the running flag even if the executing future is dropped
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
    state: &'a Mutex<GatewayState>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if *state == GatewayState::Running {
            *state = GatewayState::Idle;
        }
        self.flag.store(false, Ordering::Release);
    }
}

/// Dispatches query descriptors to the endpoint
pub struct QueryGateway<E> {
    endpoint: Arc<E>,
    catalog: Arc<SchemaCatalog<E>>,
    compiler: SqlCompiler,
    running: AtomicBool,
    state: Mutex<GatewayState>,
    dispatched: AtomicU64,
}

impl<E: SqlEndpoint> QueryGateway<E> {
    pub fn new(endpoint: Arc<E>, catalog: Arc<SchemaCatalog<E>>) -> Self {
        QueryGateway {
            endpoint,
            catalog,
            compiler: SqlCompiler::new(),
            running: AtomicBool::new(false),
            state: Mutex::new(GatewayState::Idle),
            dispatched: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> GatewayState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of statements sent to the endpoint so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Produce the SQL a descriptor would send, without sending it
    pub async fn render_sql(&self, descriptor: &QueryDescriptor) -> Result<String, Failure> {
        match descriptor {
            QueryDescriptor::Raw(query) => {
                if query.sql.trim().is_empty() {
                    Err(ValidationError::EmptySql.into())
                } else {
                    Ok(query.sql.clone())
                }
            }
            QueryDescriptor::Filter(query) => {
                if query.table.trim().is_empty() {
                    return Err(ValidationError::EmptyTable.into());
                }
                let columns = self
                    .catalog
                    .load_columns(&query.table)
                    .await
                    .map_err(Failure::from)?;
                self.compiler
                    .compile(query, &columns)
                    .map_err(Failure::from)
            }
        }
    }

    /// Execute a descriptor. Never fails outside the returned value.
    pub async fn execute(&self, descriptor: &QueryDescriptor) -> ExecutionResult {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("query_rejected_busy");
            return ExecutionResult::Failure(Failure::rejected());
        }
        let _guard = RunningGuard {
            flag: &self.running,
            state: &self.state,
        };
        *self.state.lock() = GatewayState::Running;

        let sql = match self.render_sql(descriptor).await {
            Ok(sql) => sql,
            Err(failure) => {
                tracing::debug!(error = %failure, "query_not_dispatched");
                *self.state.lock() = GatewayState::Failed;
                return ExecutionResult::Failure(failure);
            }
        };

        let kind = if descriptor.is_raw() { "raw" } else { "filter" };
        let start = Instant::now();
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let result = normalize_response(self.endpoint.execute_sql(&sql).await);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            ExecutionResult::Rows(rows) => {
                tracing::info!(kind, sql_len = sql.len(), elapsed_ms, rows = rows.len(), "query_succeeded");
                *self.state.lock() = GatewayState::Succeeded;
            }
            ExecutionResult::Failure(failure) => {
                tracing::warn!(
                    kind,
                    sql_len = sql.len(),
                    elapsed_ms,
                    code = failure.code.as_deref().unwrap_or(""),
                    error = %failure.message,
                    "query_failed"
                );
                *self.state.lock() = GatewayState::Failed;
            }
        }
        result
    }
}
