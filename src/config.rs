//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (QUERYBENCH_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [endpoint]
//! url = "https://project.example.co/rest/v1/rpc/exec_sql"
//! api_key = "..."
//!
//! [query]
//! default_limit = 50
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! QUERYBENCH_ENDPOINT__URL=http://localhost:54321/rest/v1/rpc/exec_sql
//! QUERYBENCH_HISTORY__CAPACITY=500
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::descriptor::{DEFAULT_LIMIT, DEFAULT_OFFSET};
use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQL execution endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Full URL of the RPC function
    #[serde(default = "default_endpoint_url")]
    pub url: String,

    /// Name of the JSON body field carrying the SQL text
    #[serde(default = "default_sql_param")]
    pub sql_param: String,

    /// Sent as `apikey` and `Authorization: Bearer` headers when set
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in milliseconds. 0 = no timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Catalog metadata source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Database schema whose tables are listed
    #[serde(default = "default_schema")]
    pub schema: String,
}

/// Defaults for filter-built queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default)]
    pub default_offset: u64,
}

/// Execution history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum entries kept (0 = unlimited)
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

/// Local persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Saved queries file. None = in-memory only.
    #[serde(default)]
    pub saved_queries_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_endpoint_url() -> String {
    "http://127.0.0.1:54321/rest/v1/rpc/exec_sql".to_string()
}
fn default_sql_param() -> String {
    "query".to_string()
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_schema() -> String {
    "public".to_string()
}
fn default_limit() -> u32 {
    DEFAULT_LIMIT
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. Built-in defaults
    /// 2. config.toml (base configuration)
    /// 3. config.local.toml (local overrides, git-ignored)
    /// 4. Environment variables (QUERYBENCH_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("QUERYBENCH_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("QUERYBENCH_").split("__"))
            .extract()
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            url: default_endpoint_url(),
            sql_param: default_sql_param(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            schema: default_schema(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            default_limit: DEFAULT_LIMIT,
            default_offset: DEFAULT_OFFSET,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            capacity: default_history_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
