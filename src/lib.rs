//! # QueryBench
//!
//! Dynamic query builder and execution engine for a remote SQL endpoint.
//!
//! Users either assemble a query from structured filters over a table
//! (column / operator / value, AND-combined) or write raw SQL. Both paths
//! go through one execution gateway that talks to a single RPC function
//! returning JSON rows.
//!
//! ## Pipeline
//!
//! ```text
//! FilterSet ──► FilterQuery ─┐
//!                            ├─► QueryDescriptor ─► QueryGateway ─► SqlEndpoint
//! raw SQL ───► RawQuery ─────┘        │                  │
//!                                     │          normalize_response
//!                                     ▼                  ▼
//!                         SavedQueryStore          ExecutionResult
//!                                                        │
//!                                 QueryHistory ◄─────────┤
//!                                                        ▼
//!                                       apply_view (column filters + sort)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use querybench::{Config, HttpEndpoint, QuerySession, QueryDescriptor, TracingNotifier};
//!
//! let config = Config::load()?;
//! let endpoint = Arc::new(HttpEndpoint::new(&config.endpoint)?);
//! let session = QuerySession::new(config, endpoint, Arc::new(TracingNotifier))?;
//!
//! let result = session.run(QueryDescriptor::raw("SELECT now()")).await;
//! for row in session.visible_rows() {
//!     println!("{row:?}");
//! }
//! ```

pub mod config;
pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod history;
pub mod notify;
pub mod saved;
pub mod schema;
pub mod session;
pub mod value;
pub mod view;

pub use config::Config;
pub use descriptor::{FilterQuery, OrderDirection, QueryDescriptor, RawQuery};
pub use endpoint::{EndpointError, HttpEndpoint, SqlEndpoint};
pub use error::{QueryBenchError, ValidationError};
pub use filter::{FilterClause, FilterSet, Operator, SqlCompiler};
pub use gateway::{ExecutionResult, Failure, FailureKind, GatewayState, QueryGateway};
pub use history::{HistoryEntry, HistoryOutcome, QueryHistory};
pub use notify::{Notifier, NotifyLevel, TracingNotifier};
pub use saved::{SavedQuery, SavedQueryStore, StoreError};
pub use schema::{CatalogError, ColumnMeta, ColumnState, SchemaCatalog, TableRef};
pub use session::{EmptyState, QuerySession, ResultState};
pub use value::{Row, RowValue, Rowset};
pub use view::{apply_view, ColumnFilters, SortState};
