//! Response normalization
//!
//! The endpoint can fail in two ways: the RPC call itself errors, or it
//! "succeeds" with a payload carrying `{error, sqlstate}`. Both collapse into
//! [`ExecutionResult::Failure`] so callers have a single failure path.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::endpoint::EndpointError;
use crate::error::ValidationError;
use crate::value::{Row, Rowset};

/// Shown when the transport gave no usable message
pub const GENERIC_TRANSPORT_MESSAGE: &str = "Failed to reach the query endpoint";

/// Where a failure originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Input rejected before dispatch
    Validation,
    /// Another execution was already running
    Rejected,
    /// RPC/network level failure
    Transport,
    /// The engine executed the statement and reported an error
    Engine,
}

/// A normalized execution failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Engine-specific error code (SQLSTATE), when available
    pub code: Option<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>, code: Option<String>) -> Self {
        Failure {
            kind,
            message: message.into(),
            code,
        }
    }

    pub fn rejected() -> Self {
        Failure::new(FailureKind::Rejected, "A query is already running", None)
    }

    /// Whether the statement actually reached the endpoint
    pub fn was_dispatched(&self) -> bool {
        matches!(self.kind, FailureKind::Transport | FailureKind::Engine)
    }
}

impl From<ValidationError> for Failure {
    fn from(err: ValidationError) -> Self {
        Failure::new(FailureKind::Validation, err.to_string(), None)
    }
}

impl From<EndpointError> for Failure {
    fn from(err: EndpointError) -> Self {
        let code = err.code().map(str::to_string);
        let message = err.to_string();
        let message = if message.trim().is_empty() {
            GENERIC_TRANSPORT_MESSAGE.to_string()
        } else {
            message
        };
        Failure::new(FailureKind::Transport, message, code)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} [{code}]", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Outcome of one execution
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Rows(Rowset),
    Failure(Failure),
}

impl ExecutionResult {
    pub fn is_rows(&self) -> bool {
        matches!(self, ExecutionResult::Rows(_))
    }

    pub fn rows(&self) -> Option<&Rowset> {
        match self {
            ExecutionResult::Rows(rows) => Some(rows),
            ExecutionResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ExecutionResult::Failure(f) => Some(f),
            ExecutionResult::Rows(_) => None,
        }
    }
}

/// Normalize an endpoint response into an [`ExecutionResult`]
pub fn normalize_response(response: Result<serde_json::Value, EndpointError>) -> ExecutionResult {
    let payload = match response {
        Ok(payload) => payload,
        Err(err) => return ExecutionResult::Failure(err.into()),
    };

    match payload {
        serde_json::Value::Null => ExecutionResult::Rows(Vec::new()),
        serde_json::Value::Array(items) => {
            // A single-element array wrapping an error object is still an error
            if let [serde_json::Value::Object(obj)] = items.as_slice() {
                if let Some(failure) = embedded_error(obj) {
                    return ExecutionResult::Failure(failure);
                }
            }
            let mut rows = Vec::with_capacity(items.len());
            for item in items {
                match Row::from_json(item) {
                    Some(row) => rows.push(row),
                    None => {
                        return ExecutionResult::Failure(Failure::new(
                            FailureKind::Engine,
                            "Unexpected response: row is not an object",
                            None,
                        ))
                    }
                }
            }
            ExecutionResult::Rows(rows)
        }
        serde_json::Value::Object(obj) => match embedded_error(&obj) {
            Some(failure) => ExecutionResult::Failure(failure),
            None => ExecutionResult::Rows(vec![Row::from_json(serde_json::Value::Object(obj))
                .unwrap_or_default()]),
        },
        other => ExecutionResult::Failure(Failure::new(
            FailureKind::Engine,
            format!("Unexpected response: {other}"),
            None,
        )),
    }
}

/// Extract `{error, sqlstate}` from a success-shaped payload
fn embedded_error(obj: &serde_json::Map<String, serde_json::Value>) -> Option<Failure> {
    let message = match obj.get("error")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => s.clone(),
        serde_json::Value::Object(inner) => inner
            .get("message")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.trim().is_empty())?
            .to_string(),
        _ => return None,
    };
    let code = ["sqlstate", "code"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(serde_json::Value::as_str))
        .map(str::to_string);
    Some(Failure::new(FailureKind::Engine, message, code))
}
