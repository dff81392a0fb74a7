//! # SQL Compiler
//!
//! Turns a [`FilterQuery`] into a single PostgreSQL `SELECT` statement.
//!
//! Identifiers are always double-quoted and values are always single-quoted
//! literals, so a user-supplied value can only change the literal content of
//! the statement, never its structure.
//!
//! ```text
//! SELECT * FROM "projects" WHERE "status" = 'active' LIMIT 50 OFFSET 0
//! ```

use crate::descriptor::FilterQuery;
use crate::error::ValidationError;
use crate::filter::{FilterClause, Operator};
use crate::schema::ColumnMeta;

/// Quote an identifier (`"name"`, embedded quotes doubled)
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal (`'value'`, embedded quotes doubled)
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Escape `LIKE` metacharacters so the value matches literally.
/// Uses backslash, PostgreSQL's default `LIKE` escape character.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Compiles filter queries against known column metadata
#[derive(Debug, Clone, Default)]
pub struct SqlCompiler;

impl SqlCompiler {
    pub fn new() -> Self {
        SqlCompiler
    }

    /// Compile a filter query.
    ///
    /// `columns` is the table's catalog metadata; filter columns and the
    /// `ORDER BY` column must be among them.
    pub fn compile(&self, query: &FilterQuery, columns: &[ColumnMeta]) -> Result<String, ValidationError> {
        if query.table.trim().is_empty() {
            return Err(ValidationError::EmptyTable);
        }

        let mut sql = format!("SELECT * FROM {}", quote_ident(&query.table));

        if !query.filters.is_empty() {
            let conditions = query
                .filters
                .iter()
                .map(|clause| {
                    check_column(&query.table, &clause.column, columns)?;
                    compile_clause(clause)
                })
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if let Some(order_by) = &query.order_by {
            check_column(&query.table, order_by, columns)?;
            sql.push_str(&format!(
                " ORDER BY {} {}",
                quote_ident(order_by),
                query.order_direction.as_sql()
            ));
        }

        sql.push_str(&format!(" LIMIT {} OFFSET {}", query.limit, query.offset));
        Ok(sql)
    }
}

fn check_column(table: &str, column: &str, columns: &[ColumnMeta]) -> Result<(), ValidationError> {
    if columns.iter().any(|c| c.name == column) {
        Ok(())
    } else {
        Err(ValidationError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

/// Compile one clause into a boolean SQL expression
pub(crate) fn compile_clause(clause: &FilterClause) -> Result<String, ValidationError> {
    let col = quote_ident(&clause.column);

    let value = if clause.operator.takes_value() {
        let value = clause.value.as_deref().ok_or_else(|| ValidationError::MissingValue {
            column: clause.column.clone(),
            operator: clause.operator,
        })?;
        if value.contains('\0') {
            return Err(ValidationError::InvalidValue {
                column: clause.column.clone(),
                reason: "NUL characters are not allowed".to_string(),
            });
        }
        value
    } else {
        ""
    };

    let expr = match clause.operator {
        Operator::Equals => format!("{col} = {}", quote_literal(value)),
        Operator::NotEquals => format!("{col} <> {}", quote_literal(value)),
        Operator::GreaterThan => format!("{col} > {}", quote_literal(value)),
        Operator::LessThan => format!("{col} < {}", quote_literal(value)),
        Operator::GreaterThanOrEquals => format!("{col} >= {}", quote_literal(value)),
        Operator::LessThanOrEquals => format!("{col} <= {}", quote_literal(value)),
        Operator::Contains => {
            format!("{col} LIKE {}", quote_literal(&format!("%{}%", escape_like(value))))
        }
        Operator::StartsWith => {
            format!("{col} LIKE {}", quote_literal(&format!("{}%", escape_like(value))))
        }
        Operator::EndsWith => {
            format!("{col} LIKE {}", quote_literal(&format!("%{}", escape_like(value))))
        }
        Operator::IsNull => format!("{col} IS NULL"),
        Operator::IsNotNull => format!("{col} IS NOT NULL"),
    };
    Ok(expr)
}
