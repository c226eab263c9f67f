//! Engine and job configuration.
//!
//! [`EngineConfig`] describes where tables live and how the local runner is
//! sized. [`JobConf`] is the small, serializable piece every task receives.

use crate::error::{SqlmrError, SqlmrResult};
use crate::record::DEFAULT_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Filename fragment that marks reducer output files.
pub const REDUCER_FILE_PATTERN: &str = "part-r-";

/// 엔진 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root holding one directory per table
    pub input_path: PathBuf,
    /// Final query output
    pub output_path: PathBuf,
    /// Intermediate results and merged join tables
    pub tmp_path: PathBuf,
    pub column_separator: String,
    /// Worker threads for map and reduce tasks
    pub parallelism: usize,
    /// Reduce partitions of the first pass (the sort pass always uses one)
    pub reduce_tasks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("input"),
            output_path: PathBuf::from("output"),
            tmp_path: PathBuf::from("tmp"),
            column_separator: DEFAULT_SEPARATOR.to_string(),
            parallelism: num_cpus::get(),
            reduce_tasks: 1,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = path.into();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_tmp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tmp_path = path.into();
        self
    }

    pub fn with_column_separator(mut self, separator: impl Into<String>) -> Self {
        self.column_separator = separator.into();
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_reduce_tasks(mut self, reduce_tasks: usize) -> Self {
        self.reduce_tasks = reduce_tasks;
        self
    }

    /// Defaults overlaid with `SQLMR_*` environment variables.
    pub fn from_env() -> SqlmrResult<Self> {
        Self::default().overlay_env()
    }

    /// Overlay `SQLMR_INPUT`, `SQLMR_OUTPUT`, `SQLMR_TMP`, `SQLMR_SEPARATOR`,
    /// `SQLMR_PARALLELISM` and `SQLMR_REDUCE_TASKS` onto `self`.
    pub fn overlay_env(self) -> SqlmrResult<Self> {
        self.overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> SqlmrResult<Self> {
        if let Some(v) = lookup("SQLMR_INPUT") {
            self.input_path = v.into();
        }
        if let Some(v) = lookup("SQLMR_OUTPUT") {
            self.output_path = v.into();
        }
        if let Some(v) = lookup("SQLMR_TMP") {
            self.tmp_path = v.into();
        }
        if let Some(v) = lookup("SQLMR_SEPARATOR") {
            self.column_separator = v;
        }
        if let Some(v) = lookup("SQLMR_PARALLELISM") {
            self.parallelism = parse_env("SQLMR_PARALLELISM", &v)?;
        }
        if let Some(v) = lookup("SQLMR_REDUCE_TASKS") {
            self.reduce_tasks = parse_env("SQLMR_REDUCE_TASKS", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> SqlmrResult<Self> {
        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| SqlmrError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> SqlmrResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> SqlmrResult<()> {
        if self.column_separator.is_empty() {
            return Err(SqlmrError::Config("column separator must not be empty".into()));
        }
        if self.parallelism == 0 {
            return Err(SqlmrError::Config("parallelism must be at least 1".into()));
        }
        if self.reduce_tasks == 0 {
            return Err(SqlmrError::Config("reduce_tasks must be at least 1".into()));
        }
        Ok(())
    }

    /// Directory of one table under the input root.
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.input_path.join(table)
    }

    /// Merged broadcast file for a multi-file join table.
    pub fn merged_table_path(&self, table: &str) -> PathBuf {
        self.tmp_path.join(format!("{table}.tmp"))
    }

    /// First-pass output when a sort pass follows.
    pub fn intermediate_path(&self) -> PathBuf {
        self.tmp_path.join("mapreduce")
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> SqlmrResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SqlmrError::Config(format!("{key}: invalid value '{value}'")))
}

/// 태스크로 전달되는 잡 설정 (SQL 텍스트 + 구분자)
///
/// Tasks recompile `sql` in their setup rather than receiving an AST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConf {
    pub sql: String,
    pub column_separator: String,
}

impl JobConf {
    pub fn new(sql: impl Into<String>, column_separator: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            column_separator: column_separator.into(),
        }
    }
}
