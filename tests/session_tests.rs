//! Session scenarios with a scripted endpoint: history accounting, empty
//! vs unexecuted results, failure handling, saved queries, and column
//! loading through the catalog.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use querybench::config::Config;
use querybench::descriptor::{FilterQuery, OrderDirection, QueryDescriptor};
use querybench::endpoint::{EndpointError, SqlEndpoint};
use querybench::error::ValidationError;
use querybench::filter::{FilterClause, FilterSet, Operator};
use querybench::gateway::{FailureKind, GENERIC_TRANSPORT_MESSAGE};
use querybench::history::HistoryOutcome;
use querybench::notify::{Notifier, NotifyLevel};
use querybench::saved::StoreError;
use querybench::schema::ColumnState;
use querybench::session::{EmptyState, QuerySession, ResultState};

/// Answers by exact SQL text; everything else returns two project rows
#[derive(Default)]
struct ScriptedEndpoint {
    sent: Mutex<Vec<String>>,
    column_fetches: AtomicUsize,
    delay: Duration,
}

impl SqlEndpoint for ScriptedEndpoint {
    async fn execute_sql(&self, sql: &str) -> Result<Value, EndpointError> {
        if sql.contains("information_schema.tables") {
            return Ok(json!([{"table_name": "people"}, {"table_name": "projects"}]));
        }
        if sql.contains("information_schema.columns") {
            self.column_fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if sql.contains("'locked'") {
                return Ok(json!({"error": "permission denied for table locked", "sqlstate": "42501"}));
            }
            return Ok(json!([
                {"column_name": "id", "data_type": "integer", "is_nullable": "NO", "column_default": null},
                {"column_name": "name", "data_type": "text", "is_nullable": "YES", "column_default": null},
                {"column_name": "status", "data_type": "text", "is_nullable": "YES", "column_default": null}
            ]));
        }

        self.sent.lock().push(sql.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match sql {
            "SELECT 1/0" => Ok(json!({"error": "division by zero", "sqlstate": "22012"})),
            "SELECT nothing" => Ok(json!([])),
            "SELECT offline" => Err(EndpointError::Request("connection refused".into())),
            _ => Ok(json!([
                {"id": 1, "name": "Apollo", "status": "active"},
                {"id": 2, "name": "gemini", "status": null}
            ])),
        }
    }
}

#[derive(Default)]
struct Recorded(Mutex<Vec<(NotifyLevel, String)>>);

impl Notifier for Recorded {
    fn notify(&self, level: NotifyLevel, message: &str) {
        self.0.lock().push((level, message.to_string()));
    }
}

fn session_with(endpoint: ScriptedEndpoint, config: Config) -> (QuerySession<ScriptedEndpoint>, Arc<ScriptedEndpoint>, Arc<Recorded>) {
    let endpoint = Arc::new(endpoint);
    let notes = Arc::new(Recorded::default());
    let session = QuerySession::new(config, Arc::clone(&endpoint), notes.clone()).unwrap();
    (session, endpoint, notes)
}

fn session() -> (QuerySession<ScriptedEndpoint>, Arc<ScriptedEndpoint>, Arc<Recorded>) {
    session_with(ScriptedEndpoint::default(), Config::default())
}

// History Accounting

#[tokio::test]
async fn test_history_grows_by_one_per_dispatched_run() {
    let (session, _endpoint, _notes) = session();
    let runs = [
        QueryDescriptor::raw("SELECT * FROM projects"),
        QueryDescriptor::raw("SELECT 1/0"),
        QueryDescriptor::raw("SELECT nothing"),
        QueryDescriptor::raw("SELECT offline"),
        QueryDescriptor::raw("SELECT * FROM projects"),
    ];
    for (i, descriptor) in runs.iter().enumerate() {
        session.run(descriptor.clone()).await;
        assert_eq!(session.history().len(), i + 1);
    }

    let history = session.history();
    assert_eq!(history[0].descriptor, runs[4]);
    assert!(matches!(history[1].outcome, HistoryOutcome::Failure { .. }));
    assert_eq!(history[2].outcome, HistoryOutcome::Success { row_count: 0 });
    assert_eq!(
        history[3].outcome,
        HistoryOutcome::Failure {
            message: "division by zero".into(),
            code: Some("22012".into())
        }
    );
}

#[tokio::test]
async fn test_history_capacity_from_config() {
    let mut config = Config::default();
    config.history.capacity = 2;
    let (session, _endpoint, _notes) = session_with(ScriptedEndpoint::default(), config);
    for _ in 0..5 {
        session.run(QueryDescriptor::raw("SELECT * FROM projects")).await;
    }
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn test_validation_not_recorded() {
    let (session, endpoint, notes) = session();
    let result = session.run(QueryDescriptor::raw("   ")).await;
    assert_eq!(result.failure().unwrap().kind, FailureKind::Validation);
    assert!(session.history().is_empty());
    assert!(endpoint.sent.lock().is_empty());
    assert_eq!(session.result_state(), ResultState::NotExecuted);
    assert_eq!(notes.0.lock()[0].0, NotifyLevel::Error);
}

// Empty vs Unexecuted

#[tokio::test]
async fn test_empty_result_distinct_from_unexecuted() {
    let (session, _endpoint, _notes) = session();
    assert_eq!(session.empty_state(), Some(EmptyState::NothingExecuted));

    session.run(QueryDescriptor::raw("SELECT nothing")).await;
    assert_eq!(session.empty_state(), Some(EmptyState::NoResults));
    assert_eq!(session.result_state(), ResultState::Rows(vec![]));
}

#[tokio::test]
async fn test_column_filter_hiding_everything_is_no_matches() {
    let (session, _endpoint, _notes) = session();
    session.run(QueryDescriptor::raw("SELECT * FROM projects")).await;

    session.set_column_filter("name", "zzz");
    assert_eq!(session.empty_state(), Some(EmptyState::NoMatches));
    assert!(session.visible_rows().is_empty());

    session.clear_column_filters();
    assert_eq!(session.empty_state(), None);
    assert_eq!(session.visible_rows().len(), 2);
}

// Failure Handling

#[tokio::test]
async fn test_division_by_zero_clears_previous_rows() {
    let (session, _endpoint, notes) = session();
    session.run(QueryDescriptor::raw("SELECT * FROM projects")).await;
    assert_eq!(session.visible_rows().len(), 2);

    let result = session.run(QueryDescriptor::raw("SELECT 1/0")).await;
    let failure = result.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Engine);
    assert_eq!(failure.message, "division by zero");
    assert_eq!(failure.code.as_deref(), Some("22012"));

    assert!(session.visible_rows().is_empty());
    assert!(session.last_rows().is_none());
    let last = notes.0.lock().last().cloned().unwrap();
    assert_eq!(last, (NotifyLevel::Error, "division by zero".to_string()));
}

#[tokio::test]
async fn test_transport_failure_notifies_generic_message() {
    let (session, _endpoint, notes) = session();
    let result = session.run(QueryDescriptor::raw("SELECT offline")).await;
    assert_eq!(result.failure().unwrap().kind, FailureKind::Transport);
    assert!(matches!(session.result_state(), ResultState::Failed(_)));
    assert_eq!(notes.0.lock()[0], (NotifyLevel::Error, GENERIC_TRANSPORT_MESSAGE.to_string()));
}

#[tokio::test]
async fn test_concurrent_run_rejected_without_side_effects() {
    let endpoint = ScriptedEndpoint {
        delay: Duration::from_millis(50),
        ..ScriptedEndpoint::default()
    };
    let (session, endpoint, _notes) = session_with(endpoint, Config::default());

    let (first, second) = tokio::join!(session.run(QueryDescriptor::raw("SELECT * FROM projects")), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.run(QueryDescriptor::raw("SELECT 1/0")).await
    });

    assert!(first.is_rows());
    assert_eq!(second.failure().unwrap().kind, FailureKind::Rejected);
    assert_eq!(session.history().len(), 1);
    assert_eq!(endpoint.sent.lock().len(), 1);
    assert_eq!(session.visible_rows().len(), 2);
}

// Filter Path

#[tokio::test]
async fn test_filter_query_compiled_with_config_defaults() {
    let mut config = Config::default();
    config.query.default_limit = 25;
    let (session, endpoint, _notes) = session_with(ScriptedEndpoint::default(), config);

    let mut filters = FilterSet::new();
    filters.add("status", Operator::Equals, Some("active".into()));
    filters.add("name", Operator::Contains, Some("50%_off".into()));
    let query = session.filter_query("projects", &filters).order_by("id", OrderDirection::Desc);
    session.run(query.into()).await;

    assert_eq!(
        endpoint.sent.lock().as_slice(),
        &[r#"SELECT * FROM "projects" WHERE "status" = 'active' AND "name" LIKE '%50\%\_off%' ORDER BY "id" DESC LIMIT 25 OFFSET 0"#.to_string()]
    );
}

#[tokio::test]
async fn test_unknown_column_rejected_before_dispatch() {
    let (session, endpoint, _notes) = session();
    let query = FilterQuery::new("projects").filter(FilterClause::with_value("budget", Operator::GreaterThan, "10"));
    let result = session.run(query.into()).await;
    let failure = result.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Validation);
    assert!(failure.message.contains("budget"));
    assert!(endpoint.sent.lock().is_empty());
}

#[tokio::test]
async fn test_column_error_scoped_to_table() {
    let (session, _endpoint, _notes) = session();
    assert!(session.columns("locked").await.is_err());
    assert_eq!(session.columns("projects").await.unwrap().len(), 3);
    assert!(matches!(session.column_state("locked"), ColumnState::Errored(_)));
    assert!(matches!(session.column_state("projects"), ColumnState::Loaded(_)));

    let query = FilterQuery::new("locked").filter(FilterClause::new("id", Operator::IsNull, None));
    let failure = session.run(query.into()).await.failure().cloned().unwrap();
    assert_eq!(failure.message, "permission denied for table locked");
}

#[tokio::test]
async fn test_concurrent_column_loads_fetch_once() {
    let endpoint = ScriptedEndpoint {
        delay: Duration::from_millis(30),
        ..ScriptedEndpoint::default()
    };
    let (session, endpoint, _notes) = session_with(endpoint, Config::default());
    let (a, b) = tokio::join!(session.columns("people"), session.columns("people"));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(endpoint.column_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_survives_abandoned_column_load() {
    let endpoint = ScriptedEndpoint {
        delay: Duration::from_millis(50),
        ..ScriptedEndpoint::default()
    };
    let (session, endpoint, _notes) = session_with(endpoint, Config::default());

    let (abandoned, result) = tokio::join!(
        tokio::time::timeout(Duration::from_millis(10), session.columns("projects")),
        session.run(FilterQuery::new("projects").into())
    );
    assert!(abandoned.is_err());
    assert_eq!(result.rows().map(Vec::len), Some(2));
    assert_eq!(endpoint.column_fetches.load(Ordering::SeqCst), 2);
    assert_eq!(endpoint.sent.lock().len(), 1);
    assert_eq!(session.history().len(), 1);
    assert!(matches!(session.column_state("projects"), ColumnState::Loaded(_)));
}

// Saved Queries

#[tokio::test]
async fn test_empty_save_name_leaves_store_unchanged() {
    let (session, _endpoint, _notes) = session();
    session.run(QueryDescriptor::raw("SELECT * FROM projects")).await;
    let err = session.save_current("   ").unwrap_err();
    assert!(matches!(err, StoreError::Validation(ValidationError::EmptySaveName)));
    assert!(session.saved_queries().is_empty());
}

#[tokio::test]
async fn test_load_saved_does_not_execute() {
    let (session, endpoint, _notes) = session();
    let descriptor = QueryDescriptor::raw("SELECT * FROM projects WHERE id = 1");
    let saved = session.save("one", descriptor.clone()).unwrap();

    assert_eq!(session.load_saved(saved.id), Some(descriptor));
    assert!(endpoint.sent.lock().is_empty());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_saved_queries_persist_across_sessions() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.saved_queries_path = Some(dir.path().join("saved.json"));

    let id = {
        let (session, _endpoint, _notes) = session_with(ScriptedEndpoint::default(), config.clone());
        session.run(QueryDescriptor::raw("SELECT * FROM projects")).await;
        session.save_current("projects").unwrap().id
    };

    let (session, _endpoint, _notes) = session_with(ScriptedEndpoint::default(), config);
    let saved = session.saved_queries();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, id);
    assert_eq!(session.load_saved(id), Some(QueryDescriptor::raw("SELECT * FROM projects")));

    assert!(session.delete_saved(id).unwrap());
    assert!(!session.delete_saved(id).unwrap());
}

#[test]
fn test_sessions_are_isolated() {
    let (a, _ea, _na) = session();
    let (b, _eb, _nb) = session();
    a.save("only in a", QueryDescriptor::raw("SELECT 1")).unwrap();
    a.toggle_sort("name");
    assert!(b.saved_queries().is_empty());
    assert!(b.sort().is_none());
}
