//! LocalRunner: in-process map → shuffle → reduce on a rayon pool
//!
//! One map task per input file, one reduce task per partition. Map output is
//! routed to a partition by a fixed-seed hash of the key, so partition
//! contents do not change between runs. Each reduce task visits its keys in
//! sorted order and writes one `part-r-NNNNN` file.

use super::{Emitter, Job, Mapper, Reducer, input_files, part_file_name};
use crate::error::{SqlmrError, SqlmrResult};
use ahash::RandomState;
use dashmap::DashMap;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Marker written once every reduce task has finished.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

const PARTITION_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

type Partition<K> = DashMap<K, Vec<String>, RandomState>;

/// 잡 실행 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub output: PathBuf,
    pub part_files: Vec<PathBuf>,
    pub map_tasks: usize,
    pub input_records: u64,
    pub map_output_records: u64,
    pub reduce_groups: u64,
    pub output_records: u64,
}

/// 로컬 맵리듀스 실행기
#[derive(Debug, Clone)]
pub struct LocalRunner {
    pool: Arc<rayon::ThreadPool>,
    parallelism: usize,
}

impl LocalRunner {
    pub fn new(parallelism: usize) -> SqlmrResult<Self> {
        let parallelism = parallelism.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("sqlmr-worker-{i}"))
            .build()
            .map_err(|e| SqlmrError::Task {
                task: "runner".to_string(),
                message: format!("cannot build thread pool: {e}"),
            })?;
        Ok(Self {
            pool: Arc::new(pool),
            parallelism,
        })
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Run `job` to completion. The output directory is recreated.
    #[instrument(skip(self, job), fields(job = %job.name))]
    pub fn run<M, R>(&self, job: &Job) -> SqlmrResult<JobReport>
    where
        M: Mapper,
        R: Reducer<Key = M::Key>,
    {
        if job.reduce_tasks == 0 {
            return Err(SqlmrError::Config(format!(
                "job '{}' needs at least one reduce task",
                job.name
            )));
        }
        let started = Instant::now();

        let mut files = Vec::new();
        for input in &job.inputs {
            files.extend(input_files(input)?);
        }
        recreate_dir(&job.output)?;
        info!(
            map_tasks = files.len(),
            reduce_tasks = job.reduce_tasks,
            output = %job.output.display(),
            "job started"
        );

        let shuffle: Vec<Partition<M::Key>> = (0..job.reduce_tasks)
            .map(|_| DashMap::with_hasher(RandomState::new()))
            .collect();
        let input_records = AtomicU64::new(0);
        let map_output_records = AtomicU64::new(0);

        self.pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .try_for_each(|(task_id, file)| {
                    let task = format!("{}-m-{task_id:05}", job.name);
                    let (records, emitted) = map_task::<M>(job, &task, file, &shuffle)
                        .inspect_err(|e| warn!(task = %task, error = %e, "map task failed"))?;
                    input_records.fetch_add(records, Ordering::Relaxed);
                    map_output_records.fetch_add(emitted, Ordering::Relaxed);
                    Ok::<(), SqlmrError>(())
                })
        })?;

        let partitions: Vec<(usize, Partition<M::Key>)> = shuffle.into_iter().enumerate().collect();
        let reduced: Vec<(PathBuf, u64, u64)> = self.pool.install(|| {
            partitions
                .into_par_iter()
                .map(|(partition, groups)| {
                    let task = format!("{}-r-{partition:05}", job.name);
                    reduce_task::<R>(job, &task, partition, groups)
                        .inspect_err(|e| warn!(task = %task, error = %e, "reduce task failed"))
                })
                .collect::<SqlmrResult<Vec<_>>>()
        })?;

        File::create(job.output.join(SUCCESS_MARKER))?;

        let mut report = JobReport {
            output: job.output.clone(),
            map_tasks: files.len(),
            input_records: input_records.into_inner(),
            map_output_records: map_output_records.into_inner(),
            ..JobReport::default()
        };
        for (path, groups, records) in reduced {
            report.part_files.push(path);
            report.reduce_groups += groups;
            report.output_records += records;
        }
        info!(
            input_records = report.input_records,
            output_records = report.output_records,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "job finished"
        );
        Ok(report)
    }
}

/// Returns `(input records, emitted pairs)`.
fn map_task<M: Mapper>(
    job: &Job,
    task: &str,
    file: &Path,
    shuffle: &[Partition<M::Key>],
) -> SqlmrResult<(u64, u64)> {
    let ctx = job.task_context(task.to_string());
    let mut mapper = M::setup(&ctx)?;

    let reader = BufReader::new(File::open(file)?);
    let mut buffer: Vec<(M::Key, String)> = Vec::new();
    let mut records = 0u64;
    for line in reader.lines() {
        mapper.map(&line?, &mut buffer)?;
        records += 1;
    }

    let emitted = buffer.len() as u64;
    let partitioner = RandomState::with_seeds(
        PARTITION_SEEDS[0],
        PARTITION_SEEDS[1],
        PARTITION_SEEDS[2],
        PARTITION_SEEDS[3],
    );
    let partitions = shuffle.len() as u64;
    for (key, value) in buffer {
        let partition = (partitioner.hash_one(&key) % partitions) as usize;
        shuffle[partition].entry(key).or_default().push(value);
    }
    debug!(task, file = %file.display(), records, emitted, "map task done");
    Ok((records, emitted))
}

/// Returns `(part file, groups, output records)`.
fn reduce_task<R: Reducer>(
    job: &Job,
    task: &str,
    partition: usize,
    groups: Partition<R::Key>,
) -> SqlmrResult<(PathBuf, u64, u64)> {
    let ctx = job.task_context(task.to_string());
    let mut reducer = R::setup(&ctx)?;

    let mut groups: Vec<(R::Key, Vec<String>)> = groups.into_iter().collect();
    groups.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let path = job.output.join(part_file_name(partition));
    let mut out = TextOutput::create(&path)?;
    let group_count = groups.len() as u64;
    for (key, values) in groups {
        reducer.reduce(&key, values, &mut out)?;
    }
    let records = out.finish()?;
    debug!(task, groups = group_count, records, "reduce task done");
    Ok((path, group_count, records))
}

fn recreate_dir(dir: &Path) -> SqlmrResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Line-per-pair text output. An empty value writes the key alone.
struct TextOutput {
    writer: BufWriter<File>,
    records: u64,
}

impl TextOutput {
    fn create(path: &Path) -> SqlmrResult<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            records: 0,
        })
    }

    fn finish(mut self) -> SqlmrResult<u64> {
        self.writer.flush()?;
        Ok(self.records)
    }
}

impl Emitter<String, String> for TextOutput {
    fn emit(&mut self, key: String, value: String) -> SqlmrResult<()> {
        self.writer.write_all(key.as_bytes())?;
        if !value.is_empty() {
            self.writer.write_all(b"\t")?;
            self.writer.write_all(value.as_bytes())?;
        }
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }
}
