//! 실행 계획
//!
//! What the driver needs to submit a query: the compiled AST, where the main
//! table lives, one broadcast file per joined table and whether a sort pass
//! follows.

use crate::mapreduce::CacheFile;
use crate::sql::ast::Query;
use std::path::PathBuf;
use std::sync::Arc;

/// Compiled and resolved query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Original SQL text, shipped to every task
    pub sql: String,
    pub query: Arc<Query>,
    pub main_table_path: PathBuf,
    pub join_files: Vec<CacheFile>,
    pub requires_sort: bool,
}

impl Plan {
    /// Broadcast file of `table`, if it is joined.
    pub fn join_file(&self, table: &str) -> Option<&PathBuf> {
        self.join_files
            .iter()
            .find(|f| f.table == table)
            .map(|f| &f.path)
    }
}
