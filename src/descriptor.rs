//! Query Descriptors
//!
//! A descriptor fully determines one execution: either a filter-built query
//! against a table, or raw SQL text sent verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter::FilterClause;

/// Default page size for filter-built queries
pub const DEFAULT_LIMIT: u32 = 100;

/// Default offset for filter-built queries
pub const DEFAULT_OFFSET: u64 = 0;

/// Sort direction for `ORDER BY`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for OrderDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            other => Err(format!("Unknown order direction '{other}'")),
        }
    }
}

/// Query assembled from structured filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub table: String,
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub order_direction: OrderDirection,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl FilterQuery {
    /// Unfiltered query with the default page
    pub fn new(table: impl Into<String>) -> Self {
        FilterQuery {
            table: table.into(),
            filters: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
            order_by: None,
            order_direction: OrderDirection::Asc,
        }
    }

    pub fn filter(mut self, clause: FilterClause) -> Self {
        self.filters.push(clause);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some(column.into());
        self.order_direction = direction;
        self
    }
}

/// User-authored SQL, sent byte-for-byte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuery {
    #[serde(default)]
    pub table: Option<String>,
    pub sql: String,
}

impl RawQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        RawQuery {
            table: None,
            sql: sql.into(),
        }
    }
}

/// Everything needed to run one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryDescriptor {
    Filter(FilterQuery),
    Raw(RawQuery),
}

impl QueryDescriptor {
    pub fn raw(sql: impl Into<String>) -> Self {
        QueryDescriptor::Raw(RawQuery::new(sql))
    }

    /// Table the query targets, if known
    pub fn table(&self) -> Option<&str> {
        match self {
            QueryDescriptor::Filter(q) => Some(&q.table),
            QueryDescriptor::Raw(q) => q.table.as_deref(),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, QueryDescriptor::Raw(_))
    }
}

impl From<FilterQuery> for QueryDescriptor {
    fn from(query: FilterQuery) -> Self {
        QueryDescriptor::Filter(query)
    }
}

impl From<RawQuery> for QueryDescriptor {
    fn from(query: RawQuery) -> Self {
        QueryDescriptor::Raw(query)
    }
}

/// One-line summary for history listings
impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryDescriptor::Raw(q) => write!(f, "{}", q.sql.split_whitespace().collect::<Vec<_>>().join(" ")),
            QueryDescriptor::Filter(q) => {
                write!(f, "{}", q.table)?;
                for (i, clause) in q.filters.iter().enumerate() {
                    let sep = if i == 0 { " where " } else { " and " };
                    write!(f, "{sep}{} {}", clause.column, clause.operator)?;
                    if let Some(value) = &clause.value {
                        if clause.operator.takes_value() {
                            write!(f, " {value:?}")?;
                        }
                    }
                }
                if let Some(col) = &q.order_by {
                    write!(f, " order by {col} {}", q.order_direction.as_sql().to_lowercase())?;
                }
                write!(f, " limit {} offset {}", q.limit, q.offset)
            }
        }
    }
}
