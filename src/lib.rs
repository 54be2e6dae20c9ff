//! `flight-market-stats` is a small map/shuffle/reduce engine that computes
//! aggregate flight-time statistics, grouped by year and unordered
//! airport-pair ("market"), from large delimited flight-record datasets.
//!
//! The same [`mapreduce::Mapper`]/[`mapreduce::Reducer`] pair runs
//! unchanged on either execution backend; the backend is an execution
//! strategy, never a behavioral variant:
//!
//! - [`execution::BackendConfig::Local`]: one in-process pipeline with
//!   chunked parallel mapping and parallel per-key reduction.
//! - [`execution::BackendConfig::Partitioned`]: the cluster-style
//!   strategy run in-process: independent map tasks per input split,
//!   reduce tasks fed by hash partitioning, with a configurable
//!   task-parallelism hint.
//!
//! ## Pipeline shape
//!
//! Input lines parse into [`types::FlightRecord`]s (streaming, batch at a
//! time); the mapper emits zero or one `(year, market)`-keyed timing
//! triple per record (header rows and cancelled/diverted flights emit
//! nothing); the shuffle groups every emission by key before any
//! reduction starts; the reducer folds each group into counts and means
//! (missing measurements are excluded from means, and an all-missing
//! field keeps an explicitly undefined mean); the output formatter writes
//! one `year, market, flights, scheduled, actual, in_air` row per market.
//!
//! ## Quick example: run a job
//!
//! ```no_run
//! use flight_market_stats::execution::{BackendConfig, Job, JobRunner};
//! use flight_market_stats::input::{CsvInputFormat, InputLocation};
//! use flight_market_stats::mapreduce::{FlightTimeMapper, FlightTimeReducer};
//! use flight_market_stats::output::CsvOutputFormat;
//!
//! # fn main() -> Result<(), flight_market_stats::PipelineError> {
//! let input_format = CsvInputFormat::default();
//! let output_format = CsvOutputFormat::default();
//! let job = Job {
//!     input: InputLocation::File("flights-2004.csv".into()),
//!     output: "market-times.csv".into(),
//!     mapper: &FlightTimeMapper,
//!     reducer: &FlightTimeReducer,
//!     input_format: &input_format,
//!     output_format: &output_format,
//! };
//!
//! let handle = JobRunner::new(BackendConfig::default()).run(&job)?;
//! println!("{}", handle.metrics());
//!
//! // Load the output back for inspection.
//! let table = handle.materialize(&output_format)?;
//! println!("markets={}", table.row_count());
//! # Ok(())
//! # }
//! ```
//!
//! Switching backends changes only the configuration value:
//!
//! ```no_run
//! use flight_market_stats::execution::{BackendConfig, PartitionedOptions};
//!
//! // Multi-file inputs become independent map tasks; eight reduce tasks.
//! let config = BackendConfig::Partitioned(PartitionedOptions {
//!     reduce_tasks: 8,
//!     ..Default::default()
//! });
//! # let _ = config;
//! ```
//!
//! ## Modules
//!
//! - [`input`]: pluggable input formats and input-location resolution
//! - [`mapreduce`]: mapper/reducer traits, their flight-time
//!   implementations, and the shuffle barrier
//! - [`output`]: output serialization and result materialization
//! - [`execution`]: the job runner, backend configurations, observer
//!   hooks, and metrics
//! - [`types`]: record/key/value/aggregate and result-table types
//! - [`error`]: error types used across the pipeline
//!
//! ## Error model
//!
//! Per-record noise is tolerated by design: unparseable lines are skipped,
//! filtered flights emit nothing, and non-numeric measurements count as
//! missing. Only pipeline-level failures (I/O, configuration) abort a run,
//! and those surface with the stage that failed. A failed run never leaves
//! partial output at the output path.

pub mod error;
pub mod execution;
pub mod input;
pub mod mapreduce;
pub mod output;
pub mod types;

pub use error::{PipelineError, PipelineResult};
