//! Job execution: the pipeline orchestrator and its backends.
//!
//! A [`Job`] bundles the input location, output path, and the
//! mapper/reducer/format values; a [`JobRunner`] drives that job on the
//! backend selected by [`BackendConfig`]:
//!
//! - [`BackendConfig::Local`]: one in-process pipeline with streaming
//!   batch reads, chunked parallel map, a single shuffle barrier, and
//!   parallel per-key reduce.
//! - [`BackendConfig::Partitioned`]: the cluster-style strategy run
//!   in-process: one map task per input split, emissions hash-bucketed
//!   across reduce tasks, per-partition shuffle and reduce after the map
//!   barrier.
//!
//! The backend is purely an execution strategy: the same `Job` value runs
//! unchanged on either, and both produce identical output files. Any stage
//! failure aborts the run; output lands via temp-file-and-rename so a
//! failed run never leaves a plausible-looking partial result at the
//! output path.

mod local;
mod observer;
mod partitioned;
mod semaphore;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{JobStage, PipelineError, PipelineResult};
use crate::input::{InputFormat, InputLocation};
use crate::mapreduce::{Mapper, Reducer};
use crate::output::OutputFormat;
use crate::types::{MarketAggregate, ResultTable};

pub use observer::{JobEvent, JobMetrics, JobMetricsSnapshot, JobObserver, StdErrJobObserver};

/// Options for the local in-process backend.
#[derive(Debug, Clone)]
pub struct LocalOptions {
    /// Number of worker threads; `None` uses the platform's available
    /// parallelism.
    pub num_threads: Option<usize>,
    /// Records requested from the reader per batch.
    pub batch_size: usize,
    /// Records per parallel map chunk.
    pub chunk_size: usize,
    /// Upper bound on concurrently executing map chunks, on top of
    /// `num_threads`.
    pub max_in_flight_chunks: usize,
}

impl Default for LocalOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            batch_size: 8_192,
            chunk_size: 1_024,
            max_in_flight_chunks: n.max(1),
        }
    }
}

impl LocalOptions {
    fn validate(&self) -> PipelineResult<()> {
        if self.batch_size == 0 {
            return config_err("batch_size must be > 0");
        }
        if self.chunk_size == 0 {
            return config_err("chunk_size must be > 0");
        }
        if self.max_in_flight_chunks == 0 {
            return config_err("max_in_flight_chunks must be > 0");
        }
        if self.num_threads == Some(0) {
            return config_err("num_threads must be > 0 when set");
        }
        Ok(())
    }
}

/// Options for the partitioned (cluster-style) backend.
#[derive(Debug, Clone)]
pub struct PartitionedOptions {
    /// Number of worker threads for map tasks; `None` uses the platform's
    /// available parallelism.
    pub num_threads: Option<usize>,
    /// Task-parallelism hint: number of reduce partitions. Every key hashes
    /// to exactly one partition.
    pub reduce_tasks: usize,
    /// Records requested from each split's reader per batch.
    pub batch_size: usize,
}

impl Default for PartitionedOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            reduce_tasks: n.max(1),
            batch_size: 8_192,
        }
    }
}

impl PartitionedOptions {
    fn validate(&self) -> PipelineResult<()> {
        if self.reduce_tasks == 0 {
            return config_err("reduce_tasks must be > 0");
        }
        if self.batch_size == 0 {
            return config_err("batch_size must be > 0");
        }
        if self.num_threads == Some(0) {
            return config_err("num_threads must be > 0 when set");
        }
        Ok(())
    }
}

fn config_err<T>(message: &str) -> PipelineResult<T> {
    Err(PipelineError::Config {
        message: message.to_string(),
    })
}

/// Which execution strategy runs the job.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Single in-process pipeline.
    Local(LocalOptions),
    /// Per-split map tasks with hash-partitioned reduce tasks.
    Partitioned(PartitionedOptions),
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Local(LocalOptions::default())
    }
}

/// Everything one run needs: where to read, where to write, and the
/// map/reduce/format capabilities to apply.
///
/// The executor never inspects these values beyond their traits, which is
/// what keeps the backend a pure execution strategy.
pub struct Job<'a> {
    /// Input file(s) to read.
    pub input: InputLocation,
    /// Path of the output file to produce.
    pub output: PathBuf,
    /// The map step.
    pub mapper: &'a dyn Mapper,
    /// The reduce step.
    pub reducer: &'a dyn Reducer,
    /// How input files parse into records.
    pub input_format: &'a dyn InputFormat,
    /// How aggregates serialize to the output file.
    pub output_format: &'a dyn OutputFormat,
}

/// Drives [`Job`]s on a configured backend.
pub struct JobRunner {
    config: BackendConfig,
    observer: Option<Arc<dyn JobObserver>>,
    metrics: Arc<JobMetrics>,
}

impl JobRunner {
    /// Create a runner for the given backend.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            observer: None,
            metrics: Arc::new(JobMetrics::new()),
        }
    }

    /// Attach an observer for job events (logging/monitoring).
    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time run metrics.
    pub fn metrics(&self) -> Arc<JobMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the job to completion.
    ///
    /// Fails fast: the first stage failure aborts the run and the returned
    /// error names the stage. On success the output file is complete and
    /// in place.
    pub fn run(&self, job: &Job<'_>) -> PipelineResult<JobHandle> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(JobEvent::RunStarted);

        match &self.config {
            BackendConfig::Local(opts) => {
                opts.validate()?;
                local::run(self, job, opts)?;
            }
            BackendConfig::Partitioned(opts) => {
                opts.validate()?;
                partitioned::run(self, job, opts)?;
            }
        }

        self.metrics.end_run(start.elapsed());
        self.emit(JobEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });

        Ok(JobHandle {
            output: job.output.clone(),
            metrics: self.metrics.snapshot(),
        })
    }

    pub(crate) fn emit(&self, event: JobEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }

    pub(crate) fn metrics_ref(&self) -> &JobMetrics {
        &self.metrics
    }
}

/// Completed-run handle: where the output landed plus run statistics.
#[derive(Debug, Clone)]
pub struct JobHandle {
    output: PathBuf,
    metrics: JobMetricsSnapshot,
}

impl JobHandle {
    /// Path of the completed output file.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Metrics snapshot taken at run completion.
    pub fn metrics(&self) -> &JobMetricsSnapshot {
        &self.metrics
    }

    /// Load the run's output into an in-memory table for inspection.
    pub fn materialize(&self, format: &dyn OutputFormat) -> PipelineResult<ResultTable> {
        format.read(&self.output)
    }
}

/// Build the rayon pool backing a run's map/reduce work.
fn build_pool(num_threads: Option<usize>) -> PipelineResult<ThreadPool> {
    let n = num_threads
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
        .max(1);

    ThreadPoolBuilder::new()
        .num_threads(n)
        .build()
        .map_err(|e| {
            PipelineError::at_stage(
                JobStage::Map,
                PipelineError::Config {
                    message: format!("failed to build worker pool: {e}"),
                },
            )
        })
}

/// Write aggregates to the job's output path via temp file + rename.
///
/// The rename happens only after a fully successful write, so the output
/// path either holds a complete previous/current result or nothing.
fn write_output(
    runner: &JobRunner,
    job: &Job<'_>,
    aggregates: &[MarketAggregate],
) -> PipelineResult<()> {
    let mut tmp_name = job
        .output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = job.output.with_file_name(tmp_name);

    job.output_format
        .write(&tmp, aggregates)
        .map_err(|e| PipelineError::at_stage(JobStage::Output, e))?;
    std::fs::rename(&tmp, &job.output)
        .map_err(|e| PipelineError::at_stage(JobStage::Output, e.into()))?;

    runner.metrics_ref().on_rows_written(aggregates.len());
    runner.emit(JobEvent::OutputWritten {
        rows: aggregates.len(),
        path: job.output.clone(),
    });
    Ok(())
}

fn chunk_ranges(len: usize, chunk_size: usize) -> Vec<std::ops::Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(len.div_ceil(chunk_size));
    let mut start = 0usize;
    while start < len {
        let end = (start + chunk_size).min(len);
        out.push(start..end);
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{BackendConfig, Job, JobEvent, JobObserver, JobRunner, LocalOptions};
    use crate::error::{JobStage, PipelineError};
    use crate::input::{CsvInputFormat, InputLocation};
    use crate::mapreduce::{FlightTimeMapper, FlightTimeReducer, Mapper};
    use crate::output::CsvOutputFormat;
    use crate::types::{FlightRecord, FlightTimes, MarketKey};

    fn tmp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "flight-market-stats-exec-{}-{name}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_flights_csv(path: &PathBuf, rows: usize) {
        let mut content = String::new();
        for i in 0..rows {
            let origin = if i % 2 == 0 { "JFK" } else { "LAX" };
            let dest = if i % 2 == 0 { "LAX" } else { "JFK" };
            content.push_str(&format!(
                "2004,1,{},{},623,630,901,915,UA,462,N805UA,345,330,300,-14,-7,{origin},{dest},2475,4,11,0,,0,0,0,0,0,0\n",
                i % 28 + 1,
                i % 7 + 1,
            ));
        }
        fs::write(path, content).unwrap();
    }

    fn run_local(dir: &PathBuf, opts: LocalOptions, mapper: &dyn Mapper) -> super::JobHandle {
        let input = dir.join("in.csv");
        write_flights_csv(&input, 40);

        let input_format = CsvInputFormat::default();
        let output_format = CsvOutputFormat::default();
        let job = Job {
            input: InputLocation::File(input),
            output: dir.join("out.csv"),
            mapper,
            reducer: &FlightTimeReducer,
            input_format: &input_format,
            output_format: &output_format,
        };

        JobRunner::new(BackendConfig::Local(opts)).run(&job).unwrap()
    }

    /// Wraps the real mapper with a delay so chunks overlap when allowed to.
    struct SlowMapper;

    impl Mapper for SlowMapper {
        fn map(&self, record: &FlightRecord) -> Option<(MarketKey, FlightTimes)> {
            std::thread::sleep(Duration::from_millis(1));
            FlightTimeMapper.map(record)
        }
    }

    struct ConcurrencyObserver {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl ConcurrencyObserver {
        fn new() -> Self {
            Self {
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }

        fn max(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }
    }

    impl JobObserver for ConcurrencyObserver {
        fn on_event(&self, event: &JobEvent) {
            match event {
                JobEvent::MapChunkStarted { .. } => {
                    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                    loop {
                        let cur = self.max_active.load(Ordering::SeqCst);
                        if now <= cur {
                            break;
                        }
                        if self
                            .max_active
                            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
                            .is_ok()
                        {
                            break;
                        }
                    }
                }
                JobEvent::MapChunkFinished { .. } => {
                    let _ = self.active.fetch_sub(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn max_in_flight_chunks_throttles_map_concurrency() {
        let dir = tmp_dir("throttle");
        let input = dir.join("in.csv");
        write_flights_csv(&input, 40);

        let observer = Arc::new(ConcurrencyObserver::new());
        let runner = JobRunner::new(BackendConfig::Local(LocalOptions {
            num_threads: Some(4),
            batch_size: 40,
            chunk_size: 1,
            max_in_flight_chunks: 1,
        }))
        .with_observer(observer.clone());

        let input_format = CsvInputFormat::default();
        let output_format = CsvOutputFormat::default();
        let job = Job {
            input: InputLocation::File(input),
            output: dir.join("out.csv"),
            mapper: &SlowMapper,
            reducer: &FlightTimeReducer,
            input_format: &input_format,
            output_format: &output_format,
        };

        runner.run(&job).unwrap();
        assert_eq!(observer.max(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn metrics_reflect_the_run() {
        let dir = tmp_dir("metrics");
        let handle = run_local(
            &dir,
            LocalOptions {
                num_threads: Some(2),
                batch_size: 16,
                chunk_size: 4,
                max_in_flight_chunks: 2,
            },
            &FlightTimeMapper,
        );

        let snap = handle.metrics();
        assert_eq!(snap.splits, 1);
        assert_eq!(snap.records_read, 40);
        assert_eq!(snap.emissions, 40);
        assert_eq!(snap.records_filtered, 0);
        assert_eq!(snap.groups, 1);
        assert_eq!(snap.rows_written, 1);
        assert!(snap.chunks_started >= 10);
        assert_eq!(snap.chunks_started, snap.chunks_finished);
        assert!(snap.elapsed.is_some());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn zero_chunk_size_is_a_config_error() {
        let runner = JobRunner::new(BackendConfig::Local(LocalOptions {
            chunk_size: 0,
            ..LocalOptions::default()
        }));

        let input_format = CsvInputFormat::default();
        let output_format = CsvOutputFormat::default();
        let job = Job {
            input: InputLocation::File(PathBuf::from("unused.csv")),
            output: PathBuf::from("unused-out.csv"),
            mapper: &FlightTimeMapper,
            reducer: &FlightTimeReducer,
            input_format: &input_format,
            output_format: &output_format,
        };

        match runner.run(&job) {
            Err(PipelineError::Config { message }) => assert!(message.contains("chunk_size")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn failed_run_exposes_no_output() {
        let dir = tmp_dir("failfast");
        let output = dir.join("out.csv");

        let input_format = CsvInputFormat::default();
        let output_format = CsvOutputFormat::default();
        let job = Job {
            input: InputLocation::File(dir.join("missing.csv")),
            output: output.clone(),
            mapper: &FlightTimeMapper,
            reducer: &FlightTimeReducer,
            input_format: &input_format,
            output_format: &output_format,
        };

        let err = JobRunner::new(BackendConfig::default()).run(&job).unwrap_err();
        assert_eq!(err.stage(), Some(JobStage::Input));
        assert!(!output.exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
