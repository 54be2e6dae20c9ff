//! The local in-process backend.

use std::time::Duration;

use rayon::prelude::*;

use crate::error::{JobStage, PipelineError, PipelineResult};
use crate::mapreduce::{Mapper, Shuffle};
use crate::types::{FlightRecord, FlightTimes, MarketAggregate, MarketKey};

use super::semaphore::Semaphore;
use super::{build_pool, chunk_ranges, write_output, Job, JobEvent, JobRunner, LocalOptions};

/// One pipeline, one shuffle table: stream batches from every input file,
/// map them in bounded parallel chunks, then reduce the grouped emissions
/// in parallel once the full input has been observed.
pub(crate) fn run(runner: &JobRunner, job: &Job<'_>, opts: &LocalOptions) -> PipelineResult<()> {
    let pool = build_pool(opts.num_threads)?;
    let paths = job.input.resolve().map_err(input_err)?;

    let sem = Semaphore::new(opts.max_in_flight_chunks);
    let mut shuffle = Shuffle::new();

    for path in &paths {
        runner.metrics_ref().on_split_opened();
        runner.emit(JobEvent::SplitOpened { path: path.clone() });

        let mut reader = job.input_format.open(path).map_err(input_err)?;
        loop {
            let batch = reader.read_batch(opts.batch_size).map_err(input_err)?;
            if batch.is_empty() {
                break;
            }
            runner.metrics_ref().on_records_read(batch.len());

            let emissions =
                pool.install(|| map_batch(runner, job.mapper, &batch, opts.chunk_size, &sem));
            shuffle.extend(emissions);
        }
    }

    runner.metrics_ref().on_shuffle_finished(shuffle.group_count());
    runner.emit(JobEvent::ShuffleFinished {
        groups: shuffle.group_count(),
        emissions: shuffle.emission_count(),
    });

    // Keys are disjoint, so per-group reduction parallelizes freely;
    // par_iter keeps the key-ordered group order in the collected output.
    let groups = shuffle.into_groups();
    let aggregates: Vec<MarketAggregate> = pool.install(|| {
        groups
            .par_iter()
            .map(|(key, values)| job.reducer.reduce(key, values))
            .collect()
    });
    runner.emit(JobEvent::ReduceFinished {
        groups: aggregates.len(),
    });

    write_output(runner, job, &aggregates)
}

fn input_err(e: PipelineError) -> PipelineError {
    PipelineError::at_stage(JobStage::Input, e)
}

fn map_batch(
    runner: &JobRunner,
    mapper: &dyn Mapper,
    batch: &[FlightRecord],
    chunk_size: usize,
    sem: &Semaphore,
) -> Vec<(MarketKey, FlightTimes)> {
    let per_chunk: Vec<Vec<(MarketKey, FlightTimes)>> = chunk_ranges(batch.len(), chunk_size)
        .into_par_iter()
        .map(|range| {
            let permit = sem.acquire();
            if permit.waited() > Duration::ZERO {
                runner.metrics_ref().on_throttle_wait(permit.waited());
                runner.emit(JobEvent::ThrottleWaited {
                    duration: permit.waited(),
                });
            }

            let len = range.end - range.start;
            runner.metrics_ref().on_chunk_start();
            runner.emit(JobEvent::MapChunkStarted { records: len });

            let records = &batch[range];
            let mut out = Vec::with_capacity(records.len());
            for record in records {
                if let Some(emission) = mapper.map(record) {
                    out.push(emission);
                }
            }

            let filtered = records.len() - out.len();
            runner.metrics_ref().on_chunk_end(out.len(), filtered);
            runner.emit(JobEvent::MapChunkFinished {
                emitted: out.len(),
                filtered,
            });
            out
        })
        .collect();

    per_chunk.into_iter().flatten().collect()
}
