//! Error Types
//!
//! Input validation errors shared by the compiler, the gateway and the
//! saved-query store, plus the crate-level error used at construction time.

use thiserror::Error;

use crate::filter::Operator;

/// Malformed input caught before anything is sent to the execution endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Saved query name is empty or whitespace
    #[error("Saved query name must not be empty")]
    EmptySaveName,

    /// Raw SQL submitted without any text
    #[error("SQL text must not be empty")]
    EmptySql,

    /// Filter query without a table
    #[error("No table selected")]
    EmptyTable,

    /// Column not present in the table's catalog metadata
    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Operator requires a value but none was given
    #[error("Filter on '{column}' with operator '{operator}' requires a value")]
    MissingValue { column: String, operator: Operator },

    /// Value cannot be embedded as a literal
    #[error("Invalid value for '{column}': {reason}")]
    InvalidValue { column: String, reason: String },
}

/// Top-level error for session construction and the CLI
#[derive(Error, Debug)]
pub enum QueryBenchError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Endpoint error: {0}")]
    Endpoint(#[from] crate::endpoint::EndpointError),

    #[error("Saved query store error: {0}")]
    Store(#[from] crate::saved::StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
