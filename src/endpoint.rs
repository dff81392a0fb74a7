//! SQL Execution Endpoint
//!
//! The remote procedure every statement goes through. It accepts one SQL
//! string and answers with JSON: an array of row objects, or an error object.
//!
//! [`HttpEndpoint`] talks to a PostgREST-style RPC function
//! (`POST /rest/v1/rpc/exec_sql` with body `{"query": "..."}`).

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::EndpointConfig;

/// Transport-level failure: the RPC call itself did not complete normally
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The endpoint answered with an error object (non-2xx)
    #[error("{message}")]
    Rpc {
        status: Option<u16>,
        message: String,
        code: Option<String>,
    },

    /// Network or protocol failure
    #[error("Request failed: {0}")]
    Request(String),

    /// No response within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body was not valid JSON
    #[error("Invalid endpoint response: {0}")]
    Decode(String),

    /// Endpoint could not be constructed
    #[error("Invalid endpoint configuration: {0}")]
    Config(String),
}

impl EndpointError {
    /// Engine/RPC error code, if the endpoint supplied one
    pub fn code(&self) -> Option<&str> {
        match self {
            EndpointError::Rpc { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// The generic SQL execution endpoint
pub trait SqlEndpoint: Send + Sync {
    /// Execute one SQL statement and return the raw JSON payload
    fn execute_sql(
        &self,
        sql: &str,
    ) -> impl Future<Output = Result<serde_json::Value, EndpointError>> + Send;
}

/// PostgREST error body
#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// HTTP implementation of [`SqlEndpoint`]
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
    sql_param: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl HttpEndpoint {
    pub fn new(config: &EndpointConfig) -> Result<Self, EndpointError> {
        if config.url.trim().is_empty() {
            return Err(EndpointError::Config("endpoint url is empty".to_string()));
        }

        let timeout = (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms));
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| EndpointError::Config(e.to_string()))?;

        Ok(HttpEndpoint {
            client,
            url: config.url.clone(),
            sql_param: config.sql_param.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_error(&self, err: &reqwest::Error) -> EndpointError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => EndpointError::Timeout(timeout),
            _ => EndpointError::Request(err.to_string()),
        }
    }
}

/// Build an RPC error from a non-2xx response body
fn rpc_error(status: reqwest::StatusCode, body: &str) -> EndpointError {
    let parsed: Option<RpcErrorBody> = serde_json::from_str(body).ok();
    let (message, code) = match parsed {
        Some(err) => {
            let mut message = err.message.unwrap_or_default();
            if let Some(details) = err.details.filter(|d| !d.is_empty()) {
                message = format!("{message} ({details})");
            }
            if let Some(hint) = err.hint.filter(|h| !h.is_empty()) {
                message = format!("{message}. Hint: {hint}");
            }
            (message, err.code)
        }
        None => (body.trim().to_string(), None),
    };

    let message = if message.trim().is_empty() {
        format!("Endpoint returned HTTP {status}")
    } else {
        message
    };

    EndpointError::Rpc {
        status: Some(status.as_u16()),
        message,
        code,
    }
}

impl SqlEndpoint for HttpEndpoint {
    async fn execute_sql(&self, sql: &str) -> Result<serde_json::Value, EndpointError> {
        let mut body = serde_json::Map::new();
        body.insert(self.sql_param.clone(), serde_json::Value::String(sql.to_string()));

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.request_error(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.request_error(&e))?;

        if !status.is_success() {
            return Err(rpc_error(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| EndpointError::Decode(e.to_string()))
    }
}
