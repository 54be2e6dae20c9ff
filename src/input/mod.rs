//! Pluggable input-record formats.
//!
//! An [`InputFormat`] opens one input file into a streaming
//! [`RecordReader`]; the executor pulls records in batches via
//! [`RecordReader::read_batch`], so the whole dataset is never resident in
//! memory. [`InputLocation`] resolves the caller's input (single file,
//! directory, or glob pattern) into the concrete list of files; each file
//! is one input split for the partitioned backend.
//!
//! Currently implemented:
//!
//! - [`CsvInputFormat`]: delimiter-split lines bound positionally to the
//!   29-field flight-record layout

pub mod csv;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{PipelineError, PipelineResult};
use crate::types::FlightRecord;

pub use csv::CsvInputFormat;

/// Where a job reads its records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLocation {
    /// One delimited-text file.
    File(PathBuf),
    /// Every regular file under a directory (recursive).
    Directory(PathBuf),
    /// Files matching a glob pattern.
    Glob(String),
}

impl InputLocation {
    /// Resolve the location to a sorted list of input files.
    ///
    /// Resolving to zero files is a configuration error: a run over no
    /// input is almost certainly a mistyped path, and failing fast beats
    /// silently producing an empty output.
    pub fn resolve(&self) -> PipelineResult<Vec<PathBuf>> {
        let mut paths = match self {
            InputLocation::File(path) => vec![path.clone()],
            InputLocation::Directory(dir) => {
                let mut out = Vec::new();
                for entry in WalkDir::new(dir) {
                    let entry = entry.map_err(|e| {
                        PipelineError::Io(e.into_io_error().unwrap_or_else(|| {
                            std::io::Error::other("directory walk failed")
                        }))
                    })?;
                    if entry.file_type().is_file() {
                        out.push(entry.into_path());
                    }
                }
                out
            }
            InputLocation::Glob(pattern) => {
                let mut out = Vec::new();
                for entry in glob::glob(pattern)? {
                    let path = entry?;
                    if path.is_file() {
                        out.push(path);
                    }
                }
                out
            }
        };

        paths.sort();
        if paths.is_empty() {
            return Err(PipelineError::Config {
                message: format!("input location {self:?} resolved to no files"),
            });
        }
        Ok(paths)
    }
}

/// Factory for per-file record readers.
///
/// Implementations are stateless and shared across map tasks, so the same
/// format value can open many splits concurrently.
pub trait InputFormat: Send + Sync {
    /// Open one input file for streaming reads.
    fn open(&self, path: &Path) -> PipelineResult<Box<dyn RecordReader>>;
}

/// A lazy, finite record stream over one input file.
pub trait RecordReader: Send {
    /// Read up to `max_records` records, continuing from where the
    /// previous call left off.
    ///
    /// End-of-stream yields an empty `Vec`, never an error; lines with no
    /// parseable values are skipped without surfacing anything.
    fn read_batch(&mut self, max_records: usize) -> PipelineResult<Vec<FlightRecord>>;
}
