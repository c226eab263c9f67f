//! SortStage: second pass for ORDER BY
//!
//! The map side tags every non-blank line with one constant key, so a single
//! reduce call sees the whole first-pass output and sorts it in memory.

use crate::error::{SqlmrError, SqlmrResult};
use crate::record::Record;
use crate::sql::ast::{SortClause, SortOrder};
use std::cmp::Ordering;

/// Shuffle key shared by every row of the sort pass.
pub const SORT_KEY: u32 = 1;

/// Map side of the sort pass. Blank lines are skipped.
pub fn sort_key(line: &str) -> Option<u32> {
    if line.trim().is_empty() {
        None
    } else {
        Some(SORT_KEY)
    }
}

/// 정렬 단계 (단일 리듀서)
#[derive(Debug, Clone)]
pub struct SortStage {
    clauses: Vec<SortClause>,
    separator: String,
}

impl SortStage {
    pub fn new(clauses: Vec<SortClause>, separator: impl Into<String>) -> Self {
        Self {
            clauses,
            separator: separator.into(),
        }
    }

    /// Clause-by-clause comparison. The first non-equal field decides; DESC
    /// reverses it. Fields compare as strings.
    ///
    /// A clause whose field is missing from either row compares equal;
    /// [`SortStage::sort`] rejects such rows before sorting.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for clause in &self.clauses {
            let (Ok(left), Ok(right)) = (a.get(clause.select_index), b.get(clause.select_index))
            else {
                continue;
            };
            let ord = left.cmp(right);
            if ord != Ordering::Equal {
                return match clause.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                };
            }
        }
        Ordering::Equal
    }

    /// Stable sort of `rows`. Fails if a row is too short for a sort column.
    pub fn sort(&self, mut rows: Vec<Record>) -> SqlmrResult<Vec<Record>> {
        if let Some(width) = self.clauses.iter().map(|c| c.select_index + 1).max() {
            for row in &rows {
                if row.len() < width {
                    return Err(SqlmrError::ColumnIndexOutOfRange {
                        index: width - 1,
                        len: row.len(),
                        record: row.to_string(),
                    });
                }
            }
        }
        rows.sort_by(|a, b| self.compare(a, b));
        Ok(rows)
    }

    /// Parse, sort and re-render lines.
    pub fn sort_lines<I, S>(&self, lines: I) -> SqlmrResult<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = lines
            .into_iter()
            .filter(|line| sort_key(line.as_ref()).is_some())
            .map(|line| Record::parse_exact(line.as_ref(), &self.separator))
            .collect();
        Ok(self
            .sort(rows)?
            .iter()
            .map(|row| row.to_line(&self.separator))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::Query;
    use proptest::prelude::*;

    fn stage(sql: &str) -> SortStage {
        SortStage::new(Query::compile(sql, true).unwrap().sort_clauses, ",")
    }

    #[test]
    fn desc_then_asc() {
        let s = stage("SELECT t.1, t.2 FROM t ORDER BY 2 DESC, 1");
        let out = s.sort_lines(["5,b", "5,a", "9,c"]).unwrap();
        assert_eq!(out, vec!["9,c", "5,b", "5,a"]);
    }

    #[test]
    fn first_clause_dominates() {
        let s = stage("SELECT t.1, t.2 FROM t ORDER BY 1 DESC, 2");
        let out = s.sort_lines(["5,b", "5,a", "9,c"]).unwrap();
        assert_eq!(out, vec!["9,c", "5,a", "5,b"]);
    }

    #[test]
    fn numbers_sort_as_strings() {
        let s = stage("SELECT t.1 FROM t ORDER BY 1");
        let out = s.sort_lines(["9", "10", "100", "2"]).unwrap();
        assert_eq!(out, vec!["10", "100", "2", "9"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let s = stage("SELECT t.1, t.2 FROM t ORDER BY 1");
        let out = s.sort_lines(["a,3", "a,1", "a,2"]).unwrap();
        assert_eq!(out, vec!["a,3", "a,1", "a,2"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(sort_key("   "), None);
        assert_eq!(sort_key("a,b"), Some(SORT_KEY));
        let s = stage("SELECT t.1 FROM t ORDER BY 1");
        assert_eq!(s.sort_lines(["b", "", "a", " "]).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn short_row_is_fatal() {
        let s = stage("SELECT t.1, t.2 FROM t ORDER BY 2");
        assert!(matches!(
            s.sort_lines(["a,b", "c"]),
            Err(SqlmrError::ColumnIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn compare_skips_missing_fields() {
        let s = stage("SELECT t.1, t.2 FROM t ORDER BY 2, 1");
        let short = Record::parse("b", ",");
        let full = Record::parse("a,x", ",");
        // clause on column 2 is skipped, column 1 decides
        assert_eq!(s.compare(&short, &full), Ordering::Greater);
        assert_eq!(s.compare(&short, &short), Ordering::Equal);
    }

    #[test]
    fn empty_sort_field_sorts_first() {
        let s = stage("SELECT t.1, t.2 FROM t ORDER BY 2");
        let out = s.sort_lines(["a,b", "c,"]).unwrap();
        assert_eq!(out, vec!["c,", "a,b"]);
    }

    proptest! {
        #[test]
        fn sorting_is_idempotent(rows in prop::collection::vec(("[a-c]{1,2}", "[0-9]{1,2}"), 0..30)) {
            let s = stage("SELECT t.1, t.2 FROM t ORDER BY 2 DESC, 1");
            let lines: Vec<String> = rows.iter().map(|(a, b)| format!("{a},{b}")).collect();
            let once = s.sort_lines(&lines).unwrap();
            let twice = s.sort_lines(&once).unwrap();
            prop_assert_eq!(&once, &twice);
            for pair in once.windows(2) {
                let a = Record::parse(&pair[0], ",");
                let b = Record::parse(&pair[1], ",");
                prop_assert_ne!(s.compare(&a, &b), Ordering::Greater);
            }
        }
    }
}
