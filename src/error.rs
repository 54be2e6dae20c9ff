use std::fmt;

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// The pipeline stage a fatal error is attributed to.
///
/// Per-record anomalies (unparseable lines, filtered flights, missing
/// numeric fields) are handled in place and never reach this type; only
/// run-aborting failures carry a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Resolving and reading input files.
    Input,
    /// Running the map transform.
    Map,
    /// Grouping emissions by key.
    Shuffle,
    /// Reducing groups into aggregates.
    Reduce,
    /// Writing the output file.
    Output,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Input => "input",
            JobStage::Map => "map",
            JobStage::Shuffle => "shuffle",
            JobStage::Reduce => "reduce",
            JobStage::Output => "output",
        };
        f.write_str(name)
    }
}

/// Error type returned by input resolution, job execution, and result
/// materialization.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text reader/writer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The input glob pattern does not parse.
    #[error("invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A path matched by the input glob could not be read.
    #[error("unreadable glob match: {0}")]
    Glob(#[from] glob::GlobError),

    /// The caller-supplied configuration cannot drive a run (empty input
    /// location, zero reduce tasks, ...).
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A materialized output file does not carry the expected columns.
    #[error("output schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A materialized output cell could not be parsed into the output
    /// schema's type.
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// A pipeline stage failed; the whole run is aborted.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: JobStage,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Attribute an error to a pipeline stage.
    ///
    /// Errors that already carry a stage are passed through unchanged so
    /// the innermost attribution wins.
    pub fn at_stage(stage: JobStage, source: PipelineError) -> Self {
        match source {
            staged @ PipelineError::Stage { .. } => staged,
            other => PipelineError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<JobStage> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
