//! Semantic checks run on a parsed [`Query`] before any job is submitted.

use crate::error::{SqlmrError, SqlmrResult};
use crate::sql::ast::{Query, SelectItem};
use ahash::AHashSet;

/// Validate table references, GROUP BY completeness and sort positions.
///
/// `sql` is only used for error messages.
pub fn validate(query: &Query, sql: &str) -> SqlmrResult<()> {
    let tables: AHashSet<&str> = query.tables().collect();
    let check_table = |table: &str, what: &str| -> SqlmrResult<()> {
        if tables.contains(table) {
            Ok(())
        } else {
            Err(SqlmrError::validation(
                format!("{what} uses undefined table: {table}"),
                sql,
            ))
        }
    };

    for item in &query.select_items {
        if let Some(column) = item.column() {
            check_table(&column.table, &format!("select column {item}"))?;
        }
    }
    for join in &query.joins {
        for clause in &join.clauses {
            check_table(&clause.foreign.table, "join clause")?;
        }
    }
    if let Some(where_clause) = &query.where_clause {
        let mut result = Ok(());
        where_clause.for_each_column(&mut |column| {
            if result.is_ok() {
                result = check_table(&column.table, &format!("where column {column}"));
            }
        });
        result?;
    }
    for column in &query.group_by {
        check_table(&column.table, &format!("group by column {column}"))?;
    }

    // Every plain column must be grouped when aggregating
    if query.requires_grouping {
        for item in &query.select_items {
            if let SelectItem::Column(column) = item
                && !query.group_by.contains(column)
            {
                return Err(SqlmrError::validation(
                    format!("column {column} is not specified in GROUP BY"),
                    sql,
                ));
            }
        }
    }

    for sort in &query.sort_clauses {
        if sort.select_index >= query.select_items.len() {
            return Err(SqlmrError::validation(
                format!(
                    "invalid ORDER BY position {} (SELECT has {} items)",
                    sort.select_index + 1,
                    query.select_items.len()
                ),
                sql,
            ));
        }
    }

    Ok(())
}
