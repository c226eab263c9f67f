//! Map/shuffle/reduce substrate boundary
//!
//! The SQL operators only see [`Mapper`], [`Reducer`] and [`Emitter`]; the
//! grouping of values by key is the substrate's job. [`LocalRunner`] is the
//! in-process substrate used by the engine and the tests.

mod local;

pub use local::{JobReport, LocalRunner};

use crate::config::{JobConf, REDUCER_FILE_PATTERN};
use crate::error::{SqlmrError, SqlmrResult};
use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// `emit(key, value)` 출력 경계
pub trait Emitter<K, V> {
    fn emit(&mut self, key: K, value: V) -> SqlmrResult<()>;
}

impl<K, V> Emitter<K, V> for Vec<(K, V)> {
    fn emit(&mut self, key: K, value: V) -> SqlmrResult<()> {
        self.push((key, value));
        Ok(())
    }
}

/// Shuffle key bound: hashed for partitioning, ordered within a partition.
pub trait ShuffleKey: Eq + Hash + Ord + Debug + Send + Sync + 'static {}

impl<T: Eq + Hash + Ord + Debug + Send + Sync + 'static> ShuffleKey for T {}

/// Per-record map function, built once per task by `setup`.
pub trait Mapper: Sized + Send {
    type Key: ShuffleKey;

    fn setup(ctx: &TaskContext) -> SqlmrResult<Self>;

    fn map(&mut self, line: &str, out: &mut dyn Emitter<Self::Key, String>) -> SqlmrResult<()>;
}

/// Per-key reduce function. `values` arrive in no particular order.
pub trait Reducer: Sized + Send {
    type Key: ShuffleKey;

    fn setup(ctx: &TaskContext) -> SqlmrResult<Self>;

    fn reduce(
        &mut self,
        key: &Self::Key,
        values: Vec<String>,
        out: &mut dyn Emitter<String, String>,
    ) -> SqlmrResult<()>;
}

/// Broadcast file registered for every task (one per joined table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFile {
    pub table: String,
    pub path: PathBuf,
}

/// 태스크 실행 컨텍스트
#[derive(Debug, Clone)]
pub struct TaskContext {
    task: String,
    conf: JobConf,
    cache_files: Vec<CacheFile>,
}

impl TaskContext {
    pub fn new(task: impl Into<String>, conf: JobConf, cache_files: Vec<CacheFile>) -> Self {
        Self {
            task: task.into(),
            conf,
            cache_files,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn conf(&self) -> &JobConf {
        &self.conf
    }

    pub fn cache_files(&self) -> &[CacheFile] {
        &self.cache_files
    }

    /// Broadcast file for `table`.
    pub fn cache_file(&self, table: &str) -> SqlmrResult<&Path> {
        self.cache_files
            .iter()
            .find(|f| f.table == table)
            .map(|f| f.path.as_path())
            .ok_or_else(|| SqlmrError::JoinTableMissing(table.to_string()))
    }
}

/// 잡 정의: 입력, 출력, 리듀스 파티션 수, 브로드캐스트 파일
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub conf: JobConf,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub reduce_tasks: usize,
    pub cache_files: Vec<CacheFile>,
}

impl Job {
    pub fn new(name: impl Into<String>, conf: JobConf, output: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            conf,
            inputs: Vec::new(),
            output: output.into(),
            reduce_tasks: 1,
            cache_files: Vec::new(),
        }
    }

    /// File or directory; directories contribute every visible file.
    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn with_reduce_tasks(mut self, reduce_tasks: usize) -> Self {
        self.reduce_tasks = reduce_tasks;
        self
    }

    pub fn with_cache_file(mut self, table: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.cache_files.push(CacheFile {
            table: table.into(),
            path: path.into(),
        });
        self
    }

    pub(crate) fn task_context(&self, task: String) -> TaskContext {
        TaskContext::new(task, self.conf.clone(), self.cache_files.clone())
    }
}

/// Reducer output file name for partition `partition`.
pub fn part_file_name(partition: usize) -> String {
    format!("{REDUCER_FILE_PATTERN}{partition:05}")
}

/// Reducer output files of `dir`, sorted by name.
pub fn reducer_files(dir: &Path) -> SqlmrResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && entry
                .file_name()
                .to_string_lossy()
                .contains(REDUCER_FILE_PATTERN)
        {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Visible files of a directory (names starting with `.` or `_` are skipped),
/// sorted by name. A plain file is returned as is.
pub fn input_files(path: &Path) -> SqlmrResult<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
