//! # Filter Model
//!
//! Structured filter criteria built in the UI: a list of
//! column / operator / value triples that the [`compiler`] turns into a
//! `WHERE` condition. Clauses are always `AND`-joined; there is no `OR`
//! and no grouping.

pub mod compiler;

pub use compiler::{escape_like, quote_ident, quote_literal, SqlCompiler};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a filter clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEquals,
    LessThanOrEquals,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::GreaterThanOrEquals,
        Operator::LessThanOrEquals,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    /// Whether the clause needs a value to compile
    pub fn takes_value(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterThanOrEquals => "greater_than_or_equals",
            Operator::LessThanOrEquals => "less_than_or_equals",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized operator name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown operator '{0}'")]
pub struct UnknownOperator(pub String);

impl FromStr for Operator {
    type Err = UnknownOperator;

    /// Accepts the snake_case names as well as the SQL-style symbols
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "equals" | "eq" | "=" | "==" => Operator::Equals,
            "not_equals" | "ne" | "!=" | "<>" => Operator::NotEquals,
            "greater_than" | "gt" | ">" => Operator::GreaterThan,
            "less_than" | "lt" | "<" => Operator::LessThan,
            "greater_than_or_equals" | "gte" | ">=" => Operator::GreaterThanOrEquals,
            "less_than_or_equals" | "lte" | "<=" => Operator::LessThanOrEquals,
            "contains" | "like" => Operator::Contains,
            "starts_with" => Operator::StartsWith,
            "ends_with" => Operator::EndsWith,
            "is_null" => Operator::IsNull,
            "is_not_null" => Operator::IsNotNull,
            _ => return Err(UnknownOperator(s.to_string())),
        };
        Ok(op)
    }
}

/// Identifier of a clause within one [`FilterSet`]. Used for UI diffing only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClauseId(pub u64);

/// One column / operator / value triple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterClause {
    #[serde(skip)]
    pub id: ClauseId,
    pub column: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<String>,
}

impl FilterClause {
    pub fn new(column: impl Into<String>, operator: Operator, value: Option<String>) -> Self {
        FilterClause {
            id: ClauseId::default(),
            column: column.into(),
            operator,
            value,
        }
    }

    /// Shorthand for a clause with a value
    pub fn with_value(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self::new(column, operator, Some(value.into()))
    }
}

// Structural equality: the id is a UI handle, not part of the query
impl PartialEq for FilterClause {
    fn eq(&self, other: &Self) -> bool {
        self.column == other.column && self.operator == other.operator && self.value == other.value
    }
}

impl Eq for FilterClause {}

/// Editable list of filter clauses with stable ids
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    clauses: Vec<FilterClause>,
    next_id: u64,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause and return its id
    pub fn push(&mut self, mut clause: FilterClause) -> ClauseId {
        let id = ClauseId(self.next_id);
        self.next_id += 1;
        clause.id = id;
        self.clauses.push(clause);
        id
    }

    pub fn add(&mut self, column: impl Into<String>, operator: Operator, value: Option<String>) -> ClauseId {
        self.push(FilterClause::new(column, operator, value))
    }

    /// Replace the contents of an existing clause, keeping its id.
    /// Returns false if the id is unknown.
    pub fn update(&mut self, id: ClauseId, column: impl Into<String>, operator: Operator, value: Option<String>) -> bool {
        match self.clauses.iter_mut().find(|c| c.id == id) {
            Some(clause) => {
                clause.column = column.into();
                clause.operator = operator;
                clause.value = value;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ClauseId) -> bool {
        let before = self.clauses.len();
        self.clauses.retain(|c| c.id != id);
        self.clauses.len() != before
    }

    pub fn get(&self, id: ClauseId) -> Option<&FilterClause> {
        self.clauses.iter().find(|c| c.id == id)
    }

    pub fn clear(&mut self) {
        self.clauses.clear();
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}
