//! Mapper/Reducer bindings of the SQL operators
//!
//! Every task recompiles the SQL from its [`JobConf`](crate::config::JobConf)
//! without validation (the driver already validated it) and loads its
//! broadcast tables once in `setup`.

use crate::error::SqlmrResult;
use crate::mapreduce::{Emitter, Mapper, Reducer, TaskContext};
use crate::sql::SqlCompiler;
use crate::sql::ast::Query;
use crate::sql::executor::operators::{
    Aggregator, JoinIndex, JoinTables, RowProcessor, SortStage, sort_key,
};
use ahash::AHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

fn compile_task_query(ctx: &TaskContext) -> SqlmrResult<Arc<Query>> {
    Ok(Arc::new(SqlCompiler::new().compile(&ctx.conf().sql, false)?))
}

/// Load one index per joined table, covering every column it is joined on.
fn load_join_tables(ctx: &TaskContext, query: &Query) -> SqlmrResult<JoinTables> {
    let mut columns: AHashMap<&str, SmallVec<[usize; 2]>> = AHashMap::new();
    for join in &query.joins {
        let entry = columns.entry(join.table.as_str()).or_default();
        for clause in &join.clauses {
            if !entry.contains(&clause.foreign.index) {
                entry.push(clause.foreign.index);
            }
        }
    }

    let separator = &ctx.conf().column_separator;
    let mut tables = JoinTables::new();
    for (table, cols) in columns {
        let path = ctx.cache_file(table)?;
        tables.insert(JoinIndex::load(table, path, separator, &cols)?);
    }
    Ok(tables)
}

/// First pass map: join, filter, project.
#[derive(Debug)]
pub struct SqlMapper {
    processor: RowProcessor,
}

impl Mapper for SqlMapper {
    type Key = String;

    fn setup(ctx: &TaskContext) -> SqlmrResult<Self> {
        let query = compile_task_query(ctx)?;
        let joins = load_join_tables(ctx, &query)?;
        debug!(task = ctx.task(), join_tables = joins.len(), "mapper ready");
        let processor = RowProcessor::new(query, joins, ctx.conf().column_separator.clone())?;
        Ok(Self { processor })
    }

    fn map(&mut self, line: &str, out: &mut dyn Emitter<String, String>) -> SqlmrResult<()> {
        self.processor.map(line, out)?;
        Ok(())
    }
}

/// First pass reduce: aggregate or pass the key through.
#[derive(Debug)]
pub struct SqlReducer {
    aggregator: Aggregator,
}

impl Reducer for SqlReducer {
    type Key = String;

    fn setup(ctx: &TaskContext) -> SqlmrResult<Self> {
        let query = compile_task_query(ctx)?;
        Ok(Self {
            aggregator: Aggregator::new(query, ctx.conf().column_separator.clone()),
        })
    }

    fn reduce(
        &mut self,
        key: &String,
        values: Vec<String>,
        out: &mut dyn Emitter<String, String>,
    ) -> SqlmrResult<()> {
        out.emit(self.aggregator.reduce(key, values)?, String::new())
    }
}

/// Sort pass map: every non-blank line under one key.
#[derive(Debug)]
pub struct SortMapper;

impl Mapper for SortMapper {
    type Key = u32;

    fn setup(_ctx: &TaskContext) -> SqlmrResult<Self> {
        Ok(SortMapper)
    }

    fn map(&mut self, line: &str, out: &mut dyn Emitter<u32, String>) -> SqlmrResult<()> {
        match sort_key(line) {
            Some(key) => out.emit(key, line.to_string()),
            None => Ok(()),
        }
    }
}

/// Sort pass reduce: one call with every row.
#[derive(Debug)]
pub struct SortReducer {
    stage: SortStage,
}

impl Reducer for SortReducer {
    type Key = u32;

    fn setup(ctx: &TaskContext) -> SqlmrResult<Self> {
        let query = compile_task_query(ctx)?;
        Ok(Self {
            stage: SortStage::new(query.sort_clauses.clone(), ctx.conf().column_separator.clone()),
        })
    }

    fn reduce(
        &mut self,
        _key: &u32,
        values: Vec<String>,
        out: &mut dyn Emitter<String, String>,
    ) -> SqlmrResult<()> {
        for line in self.stage.sort_lines(values)? {
            out.emit(line, String::new())?;
        }
        Ok(())
    }
}
