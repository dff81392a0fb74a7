//! Config loading, TOML parsing, and env var override tests.
//!
//! Some tests are `#[ignore]` (they chdir or set env vars and conflict in parallel).
//! Run them with: `cargo test --test config_tests -- --ignored --test-threads=1`

use querybench::Config;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// Default Configuration Tests
#[test]
fn test_config_default_endpoint() {
    let config = Config::default();
    assert_eq!(config.endpoint.url, "http://127.0.0.1:54321/rest/v1/rpc/exec_sql");
    assert_eq!(config.endpoint.sql_param, "query");
    assert_eq!(config.endpoint.timeout_ms, 30_000);
    assert!(config.endpoint.api_key.is_none());
}

#[test]
fn test_config_default_query_page() {
    let config = Config::default();
    assert_eq!(config.query.default_limit, 100);
    assert_eq!(config.query.default_offset, 0);
}

#[test]
fn test_config_default_catalog_and_history() {
    let config = Config::default();
    assert_eq!(config.catalog.schema, "public");
    assert_eq!(config.history.capacity, 200);
    assert!(config.storage.saved_queries_path.is_none());
}

// File Loading Tests
#[test]
fn test_from_file_overrides_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("querybench.toml");
    fs::write(
        &path,
        r#"
[endpoint]
url = "https://db.example.test/rest/v1/rpc/run_sql"
sql_param = "sql"
api_key = "anon"
timeout_ms = 5000

[catalog]
schema = "analytics"

[query]
default_limit = 20

[history]
capacity = 0

[storage]
saved_queries_path = "/tmp/qb/saved.json"

[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();

    let config = Config::from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.endpoint.url, "https://db.example.test/rest/v1/rpc/run_sql");
    assert_eq!(config.endpoint.sql_param, "sql");
    assert_eq!(config.endpoint.api_key.as_deref(), Some("anon"));
    assert_eq!(config.endpoint.timeout_ms, 5000);
    assert_eq!(config.catalog.schema, "analytics");
    assert_eq!(config.query.default_limit, 20);
    assert_eq!(config.query.default_offset, 0);
    assert_eq!(config.history.capacity, 0);
    assert_eq!(
        config.storage.saved_queries_path,
        Some(PathBuf::from("/tmp/qb/saved.json"))
    );
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_from_file_partial_keeps_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("partial.toml");
    fs::write(&path, "[query]\ndefault_offset = 40\n").unwrap();

    let config = Config::from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.query.default_offset, 40);
    assert_eq!(config.query.default_limit, 100);
    assert_eq!(config.endpoint.sql_param, "query");
}

#[test]
fn test_from_missing_file_is_defaults() {
    let config = Config::from_file("/nonexistent/querybench.toml").unwrap();
    assert_eq!(config.catalog.schema, "public");
}

#[test]
fn test_invalid_type_is_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.toml");
    fs::write(&path, "[query]\ndefault_limit = \"lots\"\n").unwrap();
    assert!(Config::from_file(path.to_str().unwrap()).is_err());
}

#[test]
#[ignore = "Requires --test-threads=1 due to directory change"]
fn test_load_merges_local_override() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        "[endpoint]\nurl = \"http://base.test/rpc\"\n\n[query]\ndefault_limit = 10\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("config.local.toml"),
        "[query]\ndefault_limit = 99\n",
    )
    .unwrap();

    let original_dir = env::current_dir().unwrap();
    env::set_current_dir(temp.path()).unwrap();
    let config = Config::load();
    env::set_current_dir(original_dir).unwrap();

    let config = config.unwrap();
    assert_eq!(config.endpoint.url, "http://base.test/rpc");
    assert_eq!(config.query.default_limit, 99);
}

#[test]
#[ignore = "Requires --test-threads=1 due to env var mutation"]
fn test_env_overrides_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    fs::write(&path, "[history]\ncapacity = 5\n").unwrap();

    env::set_var("QUERYBENCH_HISTORY__CAPACITY", "7");
    env::set_var("QUERYBENCH_ENDPOINT__API_KEY", "from-env");
    let config = Config::from_file(path.to_str().unwrap());
    env::remove_var("QUERYBENCH_HISTORY__CAPACITY");
    env::remove_var("QUERYBENCH_ENDPOINT__API_KEY");

    let config = config.unwrap();
    assert_eq!(config.history.capacity, 7);
    assert_eq!(config.endpoint.api_key.as_deref(), Some("from-env"));
}
