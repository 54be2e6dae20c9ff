use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Lifecycle events emitted while a job runs.
#[derive(Debug, Clone)]
pub enum JobEvent {
    RunStarted,
    SplitOpened { path: PathBuf },
    ThrottleWaited { duration: Duration },
    MapChunkStarted { records: usize },
    MapChunkFinished { emitted: usize, filtered: usize },
    ShuffleFinished { groups: usize, emissions: usize },
    ReduceFinished { groups: usize },
    OutputWritten { rows: usize, path: PathBuf },
    RunFinished {
        elapsed: Duration,
        metrics: JobMetricsSnapshot,
    },
}

/// Observer hook for job events.
pub trait JobObserver: Send + Sync {
    fn on_event(&self, event: &JobEvent);
}

/// A simple stderr logger for job events.
#[derive(Default)]
pub struct StdErrJobObserver;

impl JobObserver for StdErrJobObserver {
    fn on_event(&self, event: &JobEvent) {
        eprintln!("{event:?}");
    }
}

/// Real-time counters for a job run.
///
/// The executor updates these while the run is in flight; callers can
/// snapshot them at any time through [`crate::execution::JobRunner::metrics`].
pub struct JobMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    splits: AtomicU64,
    records_read: AtomicU64,
    records_filtered: AtomicU64,
    emissions: AtomicU64,
    chunks_started: AtomicU64,
    chunks_finished: AtomicU64,
    throttle_wait_ns: AtomicU64,
    groups: AtomicU64,
    rows_written: AtomicU64,

    active_chunks: AtomicUsize,
    max_active_chunks: AtomicUsize,
}

impl JobMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            splits: AtomicU64::new(0),
            records_read: AtomicU64::new(0),
            records_filtered: AtomicU64::new(0),
            emissions: AtomicU64::new(0),
            chunks_started: AtomicU64::new(0),
            chunks_finished: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            groups: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            active_chunks: AtomicUsize::new(0),
            max_active_chunks: AtomicUsize::new(0),
        }
    }

    pub(crate) fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.splits.store(0, Ordering::SeqCst);
        self.records_read.store(0, Ordering::SeqCst);
        self.records_filtered.store(0, Ordering::SeqCst);
        self.emissions.store(0, Ordering::SeqCst);
        self.chunks_started.store(0, Ordering::SeqCst);
        self.chunks_finished.store(0, Ordering::SeqCst);
        self.throttle_wait_ns.store(0, Ordering::SeqCst);
        self.groups.store(0, Ordering::SeqCst);
        self.rows_written.store(0, Ordering::SeqCst);
        self.active_chunks.store(0, Ordering::SeqCst);
        self.max_active_chunks.store(0, Ordering::SeqCst);
    }

    pub(crate) fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_split_opened(&self) {
        let _ = self.splits.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn on_records_read(&self, n: usize) {
        let _ = self.records_read.fetch_add(n as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_chunk_start(&self) {
        let _ = self.chunks_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_chunks.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_chunks, now);
    }

    pub(crate) fn on_chunk_end(&self, emitted: usize, filtered: usize) {
        let _ = self.emissions.fetch_add(emitted as u64, Ordering::SeqCst);
        let _ = self
            .records_filtered
            .fetch_add(filtered as u64, Ordering::SeqCst);
        let _ = self.chunks_finished.fetch_add(1, Ordering::SeqCst);
        let _ = self.active_chunks.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn on_throttle_wait(&self, d: Duration) {
        let add = d.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self.throttle_wait_ns.fetch_add(add, Ordering::SeqCst);
    }

    pub(crate) fn on_shuffle_finished(&self, groups: usize) {
        self.groups.store(groups as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_rows_written(&self, rows: usize) {
        self.rows_written.store(rows as u64, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> JobMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        JobMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            splits: self.splits.load(Ordering::SeqCst),
            records_read: self.records_read.load(Ordering::SeqCst),
            records_filtered: self.records_filtered.load(Ordering::SeqCst),
            emissions: self.emissions.load(Ordering::SeqCst),
            chunks_started: self.chunks_started.load(Ordering::SeqCst),
            chunks_finished: self.chunks_finished.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            groups: self.groups.load(Ordering::SeqCst),
            rows_written: self.rows_written.load(Ordering::SeqCst),
            max_active_chunks: self.max_active_chunks.load(Ordering::SeqCst),
        }
    }
}

impl Default for JobMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`JobMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub splits: u64,
    pub records_read: u64,
    /// Records the mapper intentionally dropped (header/cancelled/diverted
    /// rows and unkeyable records). Parser-level skips never surface.
    pub records_filtered: u64,
    pub emissions: u64,
    pub chunks_started: u64,
    pub chunks_finished: u64,
    pub throttle_wait: Duration,
    pub groups: u64,
    pub rows_written: u64,
    pub max_active_chunks: usize,
}

impl fmt::Display for JobMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, splits={}, records_read={}, filtered={}, emissions={}, groups={}, rows_written={}, chunks={}/{}, max_active_chunks={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.splits,
            self.records_read,
            self.records_filtered,
            self.emissions,
            self.groups,
            self.rows_written,
            self.chunks_finished,
            self.chunks_started,
            self.max_active_chunks,
            self.throttle_wait,
            self.elapsed
        )
    }
}
