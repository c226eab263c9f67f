//! SqlEngine: compiles a query, plans it and runs its passes
//!
//! ```text
//! SQL → compile + validate → Plan ─→ map/reduce pass ─→ [sort pass] → part-r-*
//!                                ↑ join tables merged into tmp/<table>.tmp
//! ```

use crate::config::{EngineConfig, JobConf};
use crate::engine::jobs::{SortMapper, SortReducer, SqlMapper, SqlReducer};
use crate::engine::plan::Plan;
use crate::engine::results::{format_records, read_results, records_to_batch};
use crate::error::{SqlmrError, SqlmrResult};
use crate::mapreduce::{CacheFile, Job, LocalRunner, input_files, reducer_files};
use crate::record::Record;
use crate::sql::SqlCompiler;
use arrow::record_batch::RecordBatch;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// SQL 엔진 (드라이버)
#[derive(Debug, Clone)]
pub struct SqlEngine {
    config: EngineConfig,
    compiler: SqlCompiler,
    runner: LocalRunner,
}

impl SqlEngine {
    pub fn new(config: EngineConfig) -> SqlmrResult<Self> {
        config.validate()?;
        let runner = LocalRunner::new(config.parallelism)?;
        Ok(Self {
            config,
            compiler: SqlCompiler::new(),
            runner,
        })
    }

    /// Engine over the default configuration with `SQLMR_*` overrides.
    pub fn from_env() -> SqlmrResult<Self> {
        Self::new(EngineConfig::from_env()?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn job_conf(&self, plan: &Plan) -> JobConf {
        JobConf::new(plan.sql.clone(), self.config.column_separator.clone())
    }

    /// Compile and validate `sql`, then resolve table locations.
    ///
    /// Recreates the tmp directory. A joined table stored as several files is
    /// merged into `<tmp>/<table>.tmp` so each task loads a single file.
    #[instrument(skip(self, sql))]
    pub fn compile_and_plan(&self, sql: &str) -> SqlmrResult<Plan> {
        let query = Arc::new(self.compiler.compile(sql, true)?);

        let main_table_path = self.config.table_path(&query.main_table);
        if !main_table_path.exists() {
            return Err(SqlmrError::TableNotFound {
                table: query.main_table.clone(),
                reason: format!("{} does not exist", main_table_path.display()),
            });
        }

        recreate_dir(&self.config.tmp_path)?;

        let mut join_files: Vec<CacheFile> = Vec::with_capacity(query.joins.len());
        for join in &query.joins {
            if join_files.iter().any(|f| f.table == join.table) {
                continue;
            }
            let path = self.broadcast_file(&join.table)?;
            debug!(table = %join.table, path = %path.display(), "join table registered");
            join_files.push(CacheFile {
                table: join.table.clone(),
                path,
            });
        }

        let requires_sort = query.requires_sort();
        info!(
            main_table = %query.main_table,
            joins = join_files.len(),
            grouping = query.requires_grouping,
            requires_sort,
            "query planned"
        );
        Ok(Plan {
            sql: sql.to_string(),
            query,
            main_table_path,
            join_files,
            requires_sort,
        })
    }

    /// The single file a task loads for `table`.
    fn broadcast_file(&self, table: &str) -> SqlmrResult<PathBuf> {
        let dir = self.config.table_path(table);
        if !dir.exists() {
            return Err(SqlmrError::TableNotFound {
                table: table.to_string(),
                reason: format!("{} does not exist", dir.display()),
            });
        }
        let files = input_files(&dir)?;
        match files.as_slice() {
            [] => Err(SqlmrError::TableNotFound {
                table: table.to_string(),
                reason: format!("no file in {}", dir.display()),
            }),
            [single] => Ok(single.clone()),
            many => {
                let merged = self.config.merged_table_path(table);
                merge_files(many, &merged)?;
                debug!(table, files = many.len(), "join table merged");
                Ok(merged)
            }
        }
    }

    /// Run the join/filter/aggregate pass.
    ///
    /// Writes to the output directory, or to an intermediate directory under
    /// tmp when a sort pass follows. Returns that directory.
    #[instrument(skip(self, plan))]
    pub fn run_map_reduce_pass(&self, plan: &Plan) -> SqlmrResult<PathBuf> {
        let output = if plan.requires_sort {
            self.config.intermediate_path()
        } else {
            self.config.output_path.clone()
        };
        let mut job = Job::new("sqlmr-main", self.job_conf(plan), &output)
            .with_input(&plan.main_table_path)
            .with_reduce_tasks(self.config.reduce_tasks);
        for file in &plan.join_files {
            job = job.with_cache_file(file.table.clone(), file.path.clone());
        }
        let report = self.runner.run::<SqlMapper, SqlReducer>(&job)?;
        debug!(
            groups = report.reduce_groups,
            rows = report.output_records,
            "map/reduce pass done"
        );
        Ok(output)
    }

    /// Total sort of `input`'s reducer files with one reduce task.
    #[instrument(skip(self, plan))]
    pub fn run_sort_pass(&self, plan: &Plan, input: &Path) -> SqlmrResult<PathBuf> {
        let output = self.config.output_path.clone();
        let mut job = Job::new("sqlmr-sort", self.job_conf(plan), &output).with_reduce_tasks(1);
        for file in reducer_files(input)? {
            job = job.with_input(file);
        }
        let report = self.runner.run::<SortMapper, SortReducer>(&job)?;
        debug!(rows = report.output_records, "sort pass done");
        Ok(output)
    }

    /// Run `sql` end to end and return the final reducer files.
    #[instrument(skip(self, sql))]
    pub fn execute_query(&self, sql: &str) -> SqlmrResult<Vec<PathBuf>> {
        info!(
            input = %self.config.input_path.display(),
            output = %self.config.output_path.display(),
            separator = %self.config.column_separator,
            sql,
            "executing query"
        );
        let plan = self.compile_and_plan(sql)?;
        let mut output = self.run_map_reduce_pass(&plan)?;
        if plan.requires_sort {
            output = self.run_sort_pass(&plan, &output)?;
        }
        if self.config.tmp_path.exists() {
            fs::remove_dir_all(&self.config.tmp_path)?;
        }
        let files = reducer_files(&output)?;
        info!(files = files.len(), output = %output.display(), "query finished");
        Ok(files)
    }

    /// Every result row of the last query. Loads the whole output in memory.
    pub fn results(&self) -> SqlmrResult<Vec<Record>> {
        read_results(&self.config.output_path, &self.config.column_separator)
    }

    /// Results as one all-Utf8 Arrow batch with `column_1..n` headers.
    pub fn results_batch(&self) -> SqlmrResult<RecordBatch> {
        records_to_batch(&self.results()?)
    }

    /// Results as a printable table.
    pub fn display_results(&self) -> SqlmrResult<String> {
        format_records(&self.results()?)
    }
}

fn recreate_dir(dir: &Path) -> SqlmrResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Concatenate `files` line by line into `target`.
fn merge_files(files: &[PathBuf], target: &Path) -> SqlmrResult<()> {
    let mut out = BufWriter::new(File::create(target)?);
    for file in files {
        for line in BufReader::new(File::open(file)?).lines() {
            out.write_all(line?.as_bytes())?;
            out.write_all(b"\n")?;
        }
    }
    out.flush()?;
    Ok(())
}
