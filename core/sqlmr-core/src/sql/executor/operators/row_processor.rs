//! RowProcessor: map-stage join, WHERE filter and projection

use crate::error::{SqlmrError, SqlmrResult};
use crate::mapreduce::Emitter;
use crate::record::{Record, join_fields};
use crate::sql::ast::{Column, CompareOp, LogicalOp, Query, SelectItem, WhereClause};
use crate::sql::executor::operators::join_index::JoinTables;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;
use tracing::trace;

/// 컬럼 값을 제공하는 행 (조인 결과 포함)
pub trait RowSource {
    fn value(&self, column: &Column) -> SqlmrResult<&str>;
}

/// Main-table row plus the foreign rows it joined with, keyed by table name.
#[derive(Debug, Clone)]
pub struct JoinedRow<'r> {
    rows: SmallVec<[(&'r str, &'r Record); 4]>,
}

impl<'r> JoinedRow<'r> {
    pub fn new(main_table: &'r str, row: &'r Record) -> Self {
        Self {
            rows: smallvec![(main_table, row)],
        }
    }

    /// Attach `row` for `table`, replacing an earlier row of the same table.
    pub fn push(&mut self, table: &'r str, row: &'r Record) {
        match self.rows.iter_mut().find(|(name, _)| *name == table) {
            Some(slot) => slot.1 = row,
            None => self.rows.push((table, row)),
        }
    }

    pub fn row(&self, table: &str) -> SqlmrResult<&'r Record> {
        self.rows
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, row)| *row)
            .ok_or_else(|| SqlmrError::JoinTableMissing(table.to_string()))
    }
}

impl RowSource for JoinedRow<'_> {
    fn value(&self, column: &Column) -> SqlmrResult<&str> {
        self.row(&column.table)?.get(column.index)
    }
}

/// Evaluate a WHERE tree against one joined row.
///
/// AND skips its right side when the left side is false; OR always evaluates
/// both sides.
pub fn evaluate(clause: &WhereClause, row: &impl RowSource) -> SqlmrResult<bool> {
    match clause {
        WhereClause::Compound { left, op, right } => {
            let left = evaluate(left, row)?;
            if !left && *op == LogicalOp::And {
                return Ok(false);
            }
            let right = evaluate(right, row)?;
            Ok(match op {
                LogicalOp::And => left && right,
                LogicalOp::Or => left || right,
            })
        }
        WhereClause::Simple { column, op, value } => {
            Ok(compare(row.value(column)?, *op, value))
        }
    }
}

/// `=` and LIKE ignore the field's case (the literal is already lowercase);
/// the other operators compare strings as they are.
fn compare(field: &str, op: CompareOp, literal: &str) -> bool {
    match op {
        CompareOp::Eq => field.to_lowercase() == literal,
        CompareOp::NotEq => field != literal,
        CompareOp::Like => field.to_lowercase().contains(literal),
        CompareOp::Gt => field > literal,
        CompareOp::GtEq => field >= literal,
        CompareOp::Lt => field < literal,
        CompareOp::LtEq => field <= literal,
    }
}

/// 맵 단계 행 처리기: 조인 → 필터 → (key, value) 프로젝션
///
/// Holds the compiled query and the broadcast tables; both are read-only for
/// the lifetime of the task.
#[derive(Debug, Clone)]
pub struct RowProcessor {
    query: Arc<Query>,
    joins: JoinTables,
    separator: String,
}

impl RowProcessor {
    /// Fails with `JoinTableMissing` if a joined table has no index.
    pub fn new(
        query: Arc<Query>,
        joins: JoinTables,
        separator: impl Into<String>,
    ) -> SqlmrResult<Self> {
        for join in &query.joins {
            joins.get(&join.table)?;
        }
        Ok(Self {
            query,
            joins,
            separator: separator.into(),
        })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Process one main-table line.
    ///
    /// Returns `None` when a join misses or the WHERE tree is false.
    pub fn process(&self, line: &str) -> SqlmrResult<Option<(String, String)>> {
        let row = Record::parse(line, &self.separator);
        self.process_record(&row)
    }

    pub fn process_record(&self, row: &Record) -> SqlmrResult<Option<(String, String)>> {
        let query = &*self.query;
        let mut joined = JoinedRow::new(&query.main_table, row);

        // Inner joins: each ON clause is looked up on its own column, a miss
        // drops the row and the last clause's hit is the joined row
        for join in &query.joins {
            let index = self.joins.get(&join.table)?;
            for clause in &join.clauses {
                let local = row.get(clause.local_index)?;
                match index.lookup(clause.foreign.index, local)? {
                    Some(foreign) => joined.push(&join.table, foreign),
                    None => {
                        trace!(table = %join.table, value = local, "join miss, row dropped");
                        return Ok(None);
                    }
                }
            }
        }

        if let Some(where_clause) = &query.where_clause
            && !evaluate(where_clause, &joined)?
        {
            return Ok(None);
        }

        Ok(Some(self.project(&joined)?))
    }

    /// key = constants and columns, value = raw aggregate inputs.
    fn project(&self, joined: &JoinedRow<'_>) -> SqlmrResult<(String, String)> {
        let mut key: SmallVec<[&str; 8]> = SmallVec::new();
        let mut value: SmallVec<[&str; 4]> = SmallVec::new();
        for item in &self.query.select_items {
            match item {
                SelectItem::Constant(text) => key.push(text),
                SelectItem::Column(column) => key.push(joined.value(column)?),
                SelectItem::Aggregate { column, .. } => value.push(joined.value(column)?),
            }
        }
        Ok((
            join_fields(key, &self.separator),
            join_fields(value, &self.separator),
        ))
    }

    /// Process `line` and emit its shuffle pair. Returns whether a pair was emitted.
    pub fn map(&self, line: &str, out: &mut dyn Emitter<String, String>) -> SqlmrResult<bool> {
        match self.process(line)? {
            Some((key, value)) => {
                out.emit(key, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::executor::operators::join_index::JoinIndex;

    fn processor(sql: &str, tables: &[(&str, &[&str], &[usize])]) -> RowProcessor {
        let query = Arc::new(Query::compile(sql, true).unwrap());
        let joins = tables
            .iter()
            .map(|(name, lines, cols)| {
                let rows = lines.iter().map(|l| Record::parse(l, ",")).collect();
                JoinIndex::build(*name, rows, cols).unwrap()
            })
            .collect();
        RowProcessor::new(query, joins, ",").unwrap()
    }

    #[test]
    fn filter_and_project_single_table() {
        let p = processor("SELECT user.2 FROM user WHERE user.3 = 'US'", &[]);
        assert_eq!(
            p.process("0,Matt,US").unwrap(),
            Some(("Matt".to_string(), String::new()))
        );
        assert_eq!(p.process("1,Arnold,AU").unwrap(), None);
    }

    #[test]
    fn key_and_value_split_by_item_kind() {
        let p = processor(
            "SELECT 'k', user.3, SUM(user.1), user.2, MAX(user.1) FROM user GROUP BY user.3, user.2",
            &[],
        );
        let (key, value) = p.process("7,Matt,US").unwrap().unwrap();
        assert_eq!(key, "k,US,Matt");
        assert_eq!(value, "7,7");
    }

    #[test]
    fn join_attaches_foreign_row() {
        let p = processor(
            "SELECT sale.4, user.2 FROM sale JOIN user ON sale.1 = user.1",
            &[("user", &["0,Matt,US", "1,Arnold,AU"], &[0])],
        );
        assert_eq!(
            p.process("1,3,0,5").unwrap(),
            Some(("5,Arnold".to_string(), String::new()))
        );
    }

    #[test]
    fn join_miss_drops_row() {
        let p = processor(
            "SELECT sale.4, user.2, store.2 FROM sale JOIN user ON sale.1 = user.1 \
             JOIN store ON sale.3 = store.1",
            &[
                ("user", &["0,Matt,US"], &[0]),
                ("store", &["0,Boston"], &[0]),
            ],
        );
        assert!(p.process("0,1,0,2").unwrap().is_some());
        // user 9 does not exist
        assert!(p.process("9,1,0,2").unwrap().is_none());
        // store 4 does not exist
        assert!(p.process("0,1,4,2").unwrap().is_none());
    }

    #[test]
    fn multi_clause_join_takes_last_clause_row() {
        let p = processor(
            "SELECT sale.1, sale.2, price.3 FROM sale \
             JOIN price ON sale.1 = price.1 AND sale.2 = price.2",
            &[("price", &["1,a,10", "1,b,20", "2,a,30"], &[0, 1])],
        );
        // price.1 = 2 finds `2,a,30`, then price.2 = b finds `1,b,20`
        assert_eq!(
            p.process("2,b").unwrap(),
            Some(("2,b,20".to_string(), String::new()))
        );
        // price.2 = a finds `1,a,10` even though price.1 = 2 found `2,a,30`
        assert_eq!(
            p.process("2,a").unwrap(),
            Some(("2,a,10".to_string(), String::new()))
        );
        // price.2 = c misses
        assert!(p.process("1,c").unwrap().is_none());
    }

    #[test]
    fn where_on_joined_column() {
        let p = processor(
            "SELECT sale.1 FROM sale JOIN user ON sale.1 = user.1 WHERE user.3 LIKE 'us'",
            &[("user", &["0,Matt,US", "1,Arnold,AU"], &[0])],
        );
        assert!(p.process("0,x").unwrap().is_some());
        assert!(p.process("1,x").unwrap().is_none());
    }

    #[test]
    fn missing_join_table_rejected_at_setup() {
        let query = Arc::new(
            Query::compile("SELECT sale.1 FROM sale JOIN user ON sale.1 = user.1", true).unwrap(),
        );
        let err = RowProcessor::new(query, JoinTables::new(), ",").unwrap_err();
        assert!(matches!(err, SqlmrError::JoinTableMissing(_)));
    }

    #[test]
    fn literal_on_the_left_compares_field_first() {
        // field > 'b', as written
        let p = processor("SELECT t.1 FROM t WHERE 'b' > t.1", &[]);
        assert_eq!(
            p.process("c").unwrap(),
            Some(("c".to_string(), String::new()))
        );
        assert_eq!(p.process("a").unwrap(), None);
    }

    #[test]
    fn comparison_semantics() {
        // = and LIKE are case-insensitive on the field
        assert!(compare("United States", CompareOp::Eq, "united states"));
        assert!(compare("United States", CompareOp::Like, "states"));
        // != is case-sensitive
        assert!(compare("US", CompareOp::NotEq, "us"));
        assert!(!compare("us", CompareOp::NotEq, "us"));
        // ordering is lexicographic, not numeric
        assert!(compare("9", CompareOp::Gt, "10"));
        assert!(compare("10", CompareOp::Lt, "9"));
        assert!(compare("abc", CompareOp::GtEq, "abc"));
        assert!(compare("abc", CompareOp::LtEq, "abd"));
        // uppercase sorts before lowercase
        assert!(compare("Z", CompareOp::Lt, "a"));
    }

    #[test]
    fn and_short_circuits_right_side() {
        let row = Record::parse("a,b", ",");
        let joined = JoinedRow::new("t", &row);
        // t.99 would fail with ColumnIndexOutOfRange if it were evaluated
        let poisoned = WhereClause::simple(Column::new("t", 98), CompareOp::Eq, "x");
        let false_left = WhereClause::simple(Column::new("t", 0), CompareOp::Eq, "zzz");

        let and = WhereClause::compound(false_left.clone(), LogicalOp::And, poisoned.clone());
        assert!(!evaluate(&and, &joined).unwrap());

        let or = WhereClause::compound(false_left, LogicalOp::Or, poisoned);
        assert!(matches!(
            evaluate(&or, &joined),
            Err(SqlmrError::ColumnIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn or_evaluates_both_sides() {
        let row = Record::parse("a,b", ",");
        let joined = JoinedRow::new("t", &row);
        let true_left = WhereClause::simple(Column::new("t", 0), CompareOp::Eq, "a");
        let poisoned = WhereClause::simple(Column::new("t", 5), CompareOp::Eq, "x");
        let or = WhereClause::compound(true_left, LogicalOp::Or, poisoned);
        assert!(evaluate(&or, &joined).is_err());
    }

    #[test]
    fn short_record_is_fatal() {
        let p = processor("SELECT user.3 FROM user", &[]);
        assert!(matches!(
            p.process("0,Matt"),
            Err(SqlmrError::ColumnIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn map_emits_into_vec() {
        let p = processor("SELECT user.2 FROM user", &[]);
        let mut out: Vec<(String, String)> = Vec::new();
        assert!(p.map("0,Matt,US", &mut out).unwrap());
        assert_eq!(out, vec![("Matt".to_string(), String::new())]);
    }
}
