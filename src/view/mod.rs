//! # Result View
//!
//! Client-side refinement of the last fetched rowset, without re-querying:
//! per-column substring filters plus a single-column sort.
//!
//! Everything here is synchronous and pure, cheap enough to re-run on every
//! keystroke in a filter box.
//!
//! ## Comparison rules
//!
//! 1. Nulls (and missing columns) sort after every non-null value, in both
//!    directions
//! 2. Two numbers compare numerically
//! 3. Two strings compare case-insensitively, ties broken by exact order
//! 4. Anything else compares by lowercased display text
//!
//! Rules 2 and 3 only hold within a column whose non-null cells share one
//! type. A column mixing types sorts every cell by rule 4, which keeps the
//! order total.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::descriptor::OrderDirection;
use crate::value::{Row, RowValue};

/// Per-column filter text, keyed by column name
pub type ColumnFilters = BTreeMap<String, String>;

/// Active sort of the result table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: String,
    pub direction: OrderDirection,
}

impl SortState {
    pub fn ascending(column: impl Into<String>) -> Self {
        SortState {
            column: column.into(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        SortState {
            column: column.into(),
            direction: OrderDirection::Desc,
        }
    }

    /// Header click: unsorted → asc → desc → asc → …
    ///
    /// A different column starts over at ascending. There is no way back to
    /// unsorted once a column has been chosen.
    pub fn toggle(current: Option<&SortState>, column: &str) -> SortState {
        match current {
            Some(sort) if sort.column == column => SortState {
                column: sort.column.clone(),
                direction: match sort.direction {
                    OrderDirection::Asc => OrderDirection::Desc,
                    OrderDirection::Desc => OrderDirection::Asc,
                },
            },
            _ => SortState::ascending(column),
        }
    }
}

/// Apply column filters and an optional sort to a rowset
pub fn apply_view(rows: &[Row], filters: &ColumnFilters, sort: Option<&SortState>) -> Vec<Row> {
    let active: Vec<(&str, String)> = filters
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(column, text)| (column.as_str(), text.to_lowercase()))
        .collect();

    let mut out: Vec<Row> = rows
        .iter()
        .filter(|row| row_matches(row, &active))
        .cloned()
        .collect();

    if let Some(sort) = sort {
        let column = sort.column.as_str();
        if is_mixed_column(&out, column) {
            out.sort_by(|a, b| {
                order_nulls_last(a.get(column), b.get(column), sort.direction, compare_as_text)
            });
        } else {
            out.sort_by(|a, b| compare_for_sort(a.get(column), b.get(column), sort.direction));
        }
    }
    out
}

/// Whether the column's non-null cells span more than one value type
fn is_mixed_column(rows: &[Row], column: &str) -> bool {
    let mut kinds = rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|v| !v.is_null())
        .map(std::mem::discriminant);
    match kinds.next() {
        Some(first) => kinds.any(|kind| kind != first),
        None => false,
    }
}

fn row_matches(row: &Row, active: &[(&str, String)]) -> bool {
    active.iter().all(|(column, needle)| {
        row.get(column)
            .and_then(RowValue::display_text)
            .is_some_and(|text| text.to_lowercase().contains(needle.as_str()))
    })
}

/// Compare two cells for display sorting; nulls always last
pub fn compare_for_sort(a: Option<&RowValue>, b: Option<&RowValue>, direction: OrderDirection) -> Ordering {
    order_nulls_last(a, b, direction, compare_values)
}

fn order_nulls_last(
    a: Option<&RowValue>,
    b: Option<&RowValue>,
    direction: OrderDirection,
    compare: fn(&RowValue, &RowValue) -> Ordering,
) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare(a, b);
            match direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Ascending comparison of two non-null values
pub fn compare_values(a: &RowValue, b: &RowValue) -> Ordering {
    match (a, b) {
        (RowValue::Number(_), RowValue::Number(_)) => {
            let x = a.as_f64().unwrap_or(f64::NAN);
            let y = b.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (RowValue::String(x), RowValue::String(y)) => compare_text(x, y),
        _ => compare_as_text(a, b),
    }
}

fn compare_as_text(a: &RowValue, b: &RowValue) -> Ordering {
    compare_text(
        &a.display_text().unwrap_or_default(),
        &b.display_text().unwrap_or_default(),
    )
}

/// Case-insensitive order, exact order as tie-break
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Union of column names across rows, in first-seen order
pub fn column_names(rows: &[Row]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        for column in row.columns() {
            if !names.iter().any(|n| n == column) {
                names.push(column.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        vec![
            Row::new().with("name", "beta").with("age", 30),
            Row::new().with("name", "Alpha").with("age", RowValue::Null),
            Row::new().with("name", "gamma").with("age", 5),
            Row::new().with("name", RowValue::Null).with("age", 12),
        ]
    }

    fn names(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r.get("name").unwrap().to_string()).collect()
    }

    fn filters(pairs: &[(&str, &str)]) -> ColumnFilters {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_no_filters_no_sort_is_identity() {
        let input = rows();
        assert_eq!(apply_view(&input, &ColumnFilters::new(), None), input);
    }

    #[test]
    fn test_substring_filter_case_insensitive() {
        let out = apply_view(&rows(), &filters(&[("name", "ALP")]), None);
        assert_eq!(names(&out), vec!["Alpha"]);
    }

    #[test]
    fn test_filter_on_number_uses_text() {
        let out = apply_view(&rows(), &filters(&[("age", "3")]), None);
        assert_eq!(names(&out), vec!["beta"]);
    }

    #[test]
    fn test_null_and_missing_excluded_by_active_filter() {
        let mut input = rows();
        input.push(Row::new().with("other", 1));
        let out = apply_view(&input, &filters(&[("name", "a")]), None);
        assert_eq!(names(&out), vec!["beta", "Alpha", "gamma"]);
    }

    #[test]
    fn test_blank_filter_ignored() {
        let out = apply_view(&rows(), &filters(&[("name", "   ")]), None);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_filters_are_anded() {
        let out = apply_view(&rows(), &filters(&[("name", "a"), ("age", "5")]), None);
        assert_eq!(names(&out), vec!["gamma"]);
    }

    #[test]
    fn test_numeric_sort_nulls_last_both_directions() {
        let asc = apply_view(&rows(), &ColumnFilters::new(), Some(&SortState::ascending("age")));
        assert_eq!(names(&asc), vec!["gamma", "NULL", "beta", "Alpha"]);

        let desc = apply_view(&rows(), &ColumnFilters::new(), Some(&SortState::descending("age")));
        assert_eq!(names(&desc), vec!["beta", "NULL", "gamma", "Alpha"]);
    }

    #[test]
    fn test_string_sort_case_insensitive_nulls_last() {
        let asc = apply_view(&rows(), &ColumnFilters::new(), Some(&SortState::ascending("name")));
        assert_eq!(names(&asc), vec!["Alpha", "beta", "gamma", "NULL"]);

        let desc = apply_view(&rows(), &ColumnFilters::new(), Some(&SortState::descending("name")));
        assert_eq!(names(&desc), vec!["gamma", "beta", "Alpha", "NULL"]);
    }

    #[test]
    fn test_mixed_types_compare_as_text() {
        let a = RowValue::from(json!(10));
        let b = RowValue::from("9");
        // "10" < "9" as text
        assert_eq!(compare_values(&a, &b), Ordering::Less);
        assert_eq!(
            compare_values(&RowValue::Bool(true), &RowValue::from("False")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_mixed_column_sorts_by_text() {
        let input = vec![
            Row::new().with("v", 9),
            Row::new().with("v", 10),
            Row::new().with("v", "5"),
            Row::new().with("v", RowValue::Null),
        ];
        let out = apply_view(&input, &ColumnFilters::new(), Some(&SortState::ascending("v")));
        let texts: Vec<Option<String>> = out.iter().map(|r| r.get("v").and_then(RowValue::display_text)).collect();
        assert_eq!(
            texts,
            vec![Some("10".into()), Some("5".into()), Some("9".into()), None]
        );
    }

    #[test]
    fn test_filter_text_is_not_trimmed() {
        let input = vec![
            Row::new().with("name", "alpha"),
            Row::new().with("name", "a b"),
        ];
        let out = apply_view(&input, &filters(&[("name", "a ")]), None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("name"), Some(&RowValue::from("a b")));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert_eq!(
            compare_values(&RowValue::from(json!(9)), &RowValue::from(json!(10.5))),
            Ordering::Less
        );
    }

    #[test]
    fn test_toggle_cycle() {
        let s1 = SortState::toggle(None, "age");
        assert_eq!(s1, SortState::ascending("age"));
        let s2 = SortState::toggle(Some(&s1), "age");
        assert_eq!(s2, SortState::descending("age"));
        let s3 = SortState::toggle(Some(&s2), "age");
        assert_eq!(s3, SortState::ascending("age"));
        let other = SortState::toggle(Some(&s2), "name");
        assert_eq!(other, SortState::ascending("name"));
    }

    #[test]
    fn test_column_names_first_seen_order() {
        let input = vec![
            Row::new().with("b", 1).with("a", 2),
            Row::new().with("a", 3).with("c", 4),
        ];
        assert_eq!(column_names(&input), vec!["b", "a", "c"]);
    }
}
