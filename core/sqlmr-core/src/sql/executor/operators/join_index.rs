//! JoinIndex: broadcast reference table for map-side hash joins

use crate::error::{SqlmrError, SqlmrResult};
use crate::record::Record;
use ahash::AHashMap;
use smallvec::SmallVec;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// 조인 값 → 행 번호 목록 (파일 순서 유지)
type ColumnIndex = AHashMap<String, SmallVec<[usize; 1]>>;

/// Broadcast 조인 테이블: 워커마다 한 번 메모리에 올려 읽기 전용으로 사용
///
/// Rows keep their file order, and every hash bucket lists row numbers in
/// that order, so the first row of a bucket is the first row a linear scan
/// would have found.
#[derive(Debug, Clone)]
pub struct JoinIndex {
    table: String,
    rows: Vec<Record>,
    /// column position → value index
    indexes: AHashMap<usize, ColumnIndex>,
}

impl JoinIndex {
    /// Build an index over `rows` for the given join columns.
    ///
    /// Fails with `ColumnIndexOutOfRange` if a row is too short for one of
    /// the indexed columns.
    pub fn build(
        table: impl Into<String>,
        rows: Vec<Record>,
        columns: &[usize],
    ) -> SqlmrResult<Self> {
        let mut indexes: AHashMap<usize, ColumnIndex> = AHashMap::with_capacity(columns.len());
        for &column in columns {
            if indexes.contains_key(&column) {
                continue;
            }
            let mut index = ColumnIndex::with_capacity(rows.len());
            for (row_idx, row) in rows.iter().enumerate() {
                index
                    .entry(row.get(column)?.to_string())
                    .or_default()
                    .push(row_idx);
            }
            indexes.insert(column, index);
        }
        Ok(Self {
            table: table.into(),
            rows,
            indexes,
        })
    }

    /// Read a broadcast file (one record per line) and index `columns`.
    pub fn load(
        table: impl Into<String>,
        path: &Path,
        separator: &str,
        columns: &[usize],
    ) -> SqlmrResult<Self> {
        let table = table.into();
        let reader = BufReader::new(File::open(path)?);
        let mut rows = Vec::new();
        for line in reader.lines() {
            rows.push(Record::parse(&line?, separator));
        }
        debug!(table = %table, rows = rows.len(), path = %path.display(), "join table loaded");
        Self::build(table, rows, columns)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row whose field `column` equals `value` exactly.
    pub fn lookup(&self, column: usize, value: &str) -> SqlmrResult<Option<&Record>> {
        match self.indexes.get(&column) {
            Some(index) => Ok(index
                .get(value)
                .and_then(|bucket| bucket.first())
                .map(|&row_idx| &self.rows[row_idx])),
            // Not indexed: linear scan
            None => {
                for row in &self.rows {
                    if row.get(column)? == value {
                        return Ok(Some(row));
                    }
                }
                Ok(None)
            }
        }
    }
}

/// 조인 테이블 집합 (테이블 이름으로 조회)
#[derive(Debug, Clone, Default)]
pub struct JoinTables {
    tables: AHashMap<String, JoinIndex>,
}

impl JoinTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: JoinIndex) {
        self.tables.insert(index.table.clone(), index);
    }

    pub fn get(&self, table: &str) -> SqlmrResult<&JoinIndex> {
        self.tables
            .get(table)
            .ok_or_else(|| SqlmrError::JoinTableMissing(table.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<JoinIndex> for JoinTables {
    fn from_iter<T: IntoIterator<Item = JoinIndex>>(iter: T) -> Self {
        let mut tables = JoinTables::new();
        for index in iter {
            tables.insert(index);
        }
        tables
    }
}
