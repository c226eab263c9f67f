//! SQL AST 타입 정의
//!
//! Query, SelectItem, WhereClause 등 컴파일된 쿼리의 핵심 타입들을 정의합니다.
//! Every node renders back to SQL through `Display`; column and sort positions
//! are stored 0-based and printed 1-based.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 컬럼 참조: `table.n`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub table: String,
    /// 0-based field position
    pub index: usize,
}

impl Column {
    pub fn new(table: impl Into<String>, index: usize) -> Self {
        Self {
            table: table.into(),
            index,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.index + 1)
    }
}

/// 집계 함수
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Max,
    Min,
    Avg,
}

impl AggregateFunction {
    pub const ALL: [AggregateFunction; 5] = [
        AggregateFunction::Count,
        AggregateFunction::Sum,
        AggregateFunction::Max,
        AggregateFunction::Min,
        AggregateFunction::Avg,
    ];

    /// Lowercase SQL name (`count`, `sum`, ...)
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
            AggregateFunction::Avg => "avg",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_name().to_uppercase())
    }
}

/// SELECT 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectItem {
    /// 상수 (`'text'`)
    Constant(String),
    /// 컬럼 참조
    Column(Column),
    /// 집계 함수 호출
    Aggregate {
        function: AggregateFunction,
        column: Column,
    },
}

impl SelectItem {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, SelectItem::Aggregate { .. })
    }

    /// Column referenced by this item, if any
    pub fn column(&self) -> Option<&Column> {
        match self {
            SelectItem::Constant(_) => None,
            SelectItem::Column(column) | SelectItem::Aggregate { column, .. } => Some(column),
        }
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Constant(text) => write!(f, "'{text}'"),
            SelectItem::Column(column) => write!(f, "{column}"),
            SelectItem::Aggregate { function, column } => write!(f, "{function}({column})"),
        }
    }
}

/// JOIN 등식 하나: main 테이블 필드 = join 테이블 컬럼
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClause {
    /// 0-based field position in the main table
    pub local_index: usize,
    pub foreign: Column,
}

/// `JOIN table ON ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    pub clauses: Vec<JoinClause>,
}

/// WHERE 비교 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Like,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl CompareOp {
    /// Detection order used by the parser: two-character operators are tried
    /// before their one-character prefixes.
    pub(crate) const DETECTION_ORDER: [CompareOp; 7] = [
        CompareOp::NotEq,
        CompareOp::GtEq,
        CompareOp::LtEq,
        CompareOp::Eq,
        CompareOp::Like,
        CompareOp::Gt,
        CompareOp::Lt,
    ];

    /// Text the parser searches for in lowercased SQL
    pub(crate) fn pattern(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Like => " like ",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Like => f.write_str("LIKE"),
            other => f.write_str(other.pattern()),
        }
    }
}

/// AND / OR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    /// Surrounding-space pattern searched in lowercased SQL
    pub(crate) fn pattern(&self) -> &'static str {
        match self {
            LogicalOp::And => " and ",
            LogicalOp::Or => " or ",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => f.write_str("AND"),
            LogicalOp::Or => f.write_str("OR"),
        }
    }
}

/// WHERE 조건 트리
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhereClause {
    /// `column op 'literal'`
    Simple {
        column: Column,
        op: CompareOp,
        value: String,
    },
    /// `left AND|OR right`
    Compound {
        left: Box<WhereClause>,
        op: LogicalOp,
        right: Box<WhereClause>,
    },
}

impl WhereClause {
    pub fn simple(column: Column, op: CompareOp, value: impl Into<String>) -> Self {
        WhereClause::Simple {
            column,
            op,
            value: value.into(),
        }
    }

    pub fn compound(left: WhereClause, op: LogicalOp, right: WhereClause) -> Self {
        WhereClause::Compound {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Visit every column referenced by the tree, left to right.
    pub fn for_each_column<'a>(&'a self, f: &mut impl FnMut(&'a Column)) {
        match self {
            WhereClause::Simple { column, .. } => f(column),
            WhereClause::Compound { left, right, .. } => {
                left.for_each_column(f);
                right.for_each_column(f);
            }
        }
    }
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereClause::Simple { column, op, value } => write!(f, "{column} {op} '{value}'"),
            WhereClause::Compound { left, op, right } => write!(f, "({left} {op} {right})"),
        }
    }
}

/// 정렬 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("ASC"),
            SortOrder::Desc => f.write_str("DESC"),
        }
    }
}

/// ORDER BY 항목 (SELECT 목록 위치 기준)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    /// 0-based position in the SELECT list
    pub select_index: usize,
    pub order: SortOrder,
}

impl fmt::Display for SortClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.select_index + 1, self.order)
    }
}

/// 컴파일된 쿼리 (루트 AST)
///
/// Built once per execution and never mutated afterwards; every task holds its
/// own copy recompiled from the job configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub select_items: Vec<SelectItem>,
    /// Parsed only; rows are de-duplicated by the shuffle either way
    pub distinct: bool,
    pub main_table: String,
    pub joins: Vec<Join>,
    pub where_clause: Option<WhereClause>,
    pub group_by: Vec<Column>,
    pub sort_clauses: Vec<SortClause>,
    /// True when any SELECT item is an aggregate
    pub requires_grouping: bool,
}

impl Query {
    /// Whether a second, single-reducer sort pass is needed
    pub fn requires_sort(&self) -> bool {
        !self.sort_clauses.is_empty()
    }

    /// Aggregate items in SELECT order as `(function, column)`
    pub fn aggregates(&self) -> impl Iterator<Item = (AggregateFunction, &Column)> {
        self.select_items.iter().filter_map(|item| match item {
            SelectItem::Aggregate { function, column } => Some((*function, column)),
            _ => None,
        })
    }

    /// Number of non-aggregate items, i.e. the field count of a shuffle key
    pub fn key_width(&self) -> usize {
        self.select_items.iter().filter(|i| !i.is_aggregate()).count()
    }

    /// Tables listed in FROM, main table first
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.main_table.as_str()).chain(self.joins.iter().map(|j| j.table.as_str()))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        write_list(f, &self.select_items)?;
        write!(f, " FROM {}", self.main_table)?;
        for join in &self.joins {
            write!(f, " JOIN {} ON ", join.table)?;
            for (i, clause) in join.clauses.iter().enumerate() {
                if i > 0 {
                    f.write_str(" AND ")?;
                }
                write!(
                    f,
                    "{}.{} = {}",
                    self.main_table,
                    clause.local_index + 1,
                    clause.foreign
                )?;
            }
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {where_clause}")?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            write_list(f, &self.group_by)?;
        }
        if !self.sort_clauses.is_empty() {
            f.write_str(" ORDER BY ")?;
            write_list(f, &self.sort_clauses)?;
        }
        Ok(())
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
