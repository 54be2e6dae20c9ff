//! The partitioned (cluster-style) backend.
//!
//! Runs the execution strategy a distributed deployment would use, in one
//! process: every input split is an independent map task, each map task
//! buckets its emissions by `hash(key) % reduce_tasks`, and after the map
//! barrier each reduce partition shuffles and reduces on its own. A key
//! always hashes to exactly one partition, so no two reduce tasks ever
//! see overlapping value lists.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;

use rayon::prelude::*;

use crate::error::{JobStage, PipelineError, PipelineResult};
use crate::mapreduce::Shuffle;
use crate::types::{MarketAggregate, MarketKey};

use super::{build_pool, write_output, Job, JobEvent, JobRunner, PartitionedOptions};

pub(crate) fn run(
    runner: &JobRunner,
    job: &Job<'_>,
    opts: &PartitionedOptions,
) -> PipelineResult<()> {
    let pool = build_pool(opts.num_threads)?;
    let paths = job.input.resolve().map_err(input_err)?;

    // Map phase: one task per split, parallel across splits.
    let per_task: Vec<Vec<Shuffle>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| map_task(runner, job, opts, path))
            .collect::<PipelineResult<Vec<_>>>()
    })?;

    // The barrier: every map task has finished before any bucket merges.
    let mut partitions: Vec<Shuffle> = (0..opts.reduce_tasks).map(|_| Shuffle::new()).collect();
    for task_buckets in per_task {
        for (idx, bucket) in task_buckets.into_iter().enumerate() {
            partitions[idx].merge(bucket);
        }
    }

    let groups: usize = partitions.iter().map(Shuffle::group_count).sum();
    let emissions: usize = partitions.iter().map(Shuffle::emission_count).sum();
    runner.metrics_ref().on_shuffle_finished(groups);
    runner.emit(JobEvent::ShuffleFinished { groups, emissions });

    // Reduce phase: partitions hold disjoint key sets and reduce
    // independently.
    let mut aggregates: Vec<MarketAggregate> = pool.install(|| {
        partitions
            .into_par_iter()
            .flat_map_iter(|partition| {
                partition
                    .into_groups()
                    .into_iter()
                    .map(|(key, values)| job.reducer.reduce(&key, &values))
                    .collect::<Vec<_>>()
            })
            .collect()
    });

    // Partition interleaving follows hash order; restore key order so both
    // backends write identical files for the same input.
    aggregates.sort_by(|a, b| (a.year, a.market.as_str()).cmp(&(b.year, b.market.as_str())));

    runner.emit(JobEvent::ReduceFinished {
        groups: aggregates.len(),
    });

    write_output(runner, job, &aggregates)
}

fn map_task(
    runner: &JobRunner,
    job: &Job<'_>,
    opts: &PartitionedOptions,
    path: &Path,
) -> PipelineResult<Vec<Shuffle>> {
    runner.metrics_ref().on_split_opened();
    runner.emit(JobEvent::SplitOpened {
        path: path.to_path_buf(),
    });

    let mut buckets: Vec<Shuffle> = (0..opts.reduce_tasks).map(|_| Shuffle::new()).collect();
    let mut reader = job.input_format.open(path).map_err(input_err)?;

    loop {
        let batch = reader.read_batch(opts.batch_size).map_err(input_err)?;
        if batch.is_empty() {
            break;
        }
        runner.metrics_ref().on_records_read(batch.len());
        runner.metrics_ref().on_chunk_start();
        runner.emit(JobEvent::MapChunkStarted {
            records: batch.len(),
        });

        let mut emitted = 0usize;
        for record in &batch {
            if let Some((key, value)) = job.mapper.map(record) {
                let idx = partition_for(&key, opts.reduce_tasks);
                buckets[idx].insert(key, value);
                emitted += 1;
            }
        }

        let filtered = batch.len() - emitted;
        runner.metrics_ref().on_chunk_end(emitted, filtered);
        runner.emit(JobEvent::MapChunkFinished { emitted, filtered });
    }

    Ok(buckets)
}

fn input_err(e: PipelineError) -> PipelineError {
    PipelineError::at_stage(JobStage::Input, e)
}

/// Bucket a key into one of `n` reduce partitions.
fn partition_for(key: &MarketKey, n: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % n as u64) as usize
}
