//! Delimited-text input format.

use std::path::Path;

use crate::error::PipelineResult;
use crate::input::{InputFormat, RecordReader};
use crate::types::FlightRecord;

/// Reads delimiter-split lines as positional [`FlightRecord`]s.
///
/// Rules:
///
/// - No header handling: every line, including a header row, binds to the
///   positional field layout. Filtering header rows is the map phase's
///   responsibility (it recognizes the literal `Year` label).
/// - Short or long lines bind positionally; missing trailing positions are
///   empty.
/// - Lines with no parseable values (blank, or structurally unreadable,
///   e.g. invalid UTF-8) are skipped silently; I/O failures are fatal.
#[derive(Debug, Clone)]
pub struct CsvInputFormat {
    /// Field delimiter byte.
    pub delimiter: u8,
}

impl Default for CsvInputFormat {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvInputFormat {
    fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter);
        builder
    }

    /// Open a reader over in-memory or otherwise non-path input.
    pub fn open_reader<R>(&self, rdr: R) -> Box<dyn RecordReader>
    where
        R: std::io::Read + Send + 'static,
    {
        Box::new(CsvRecordReader {
            records: self.reader_builder().from_reader(rdr).into_records(),
        })
    }
}

impl InputFormat for CsvInputFormat {
    fn open(&self, path: &Path) -> PipelineResult<Box<dyn RecordReader>> {
        let reader = self.reader_builder().from_path(path)?;
        Ok(Box::new(CsvRecordReader {
            records: reader.into_records(),
        }))
    }
}

struct CsvRecordReader<R: std::io::Read> {
    records: csv::StringRecordsIntoIter<R>,
}

impl<R: std::io::Read + Send> RecordReader for CsvRecordReader<R> {
    fn read_batch(&mut self, max_records: usize) -> PipelineResult<Vec<FlightRecord>> {
        let mut out = Vec::with_capacity(max_records.min(1024));
        while out.len() < max_records {
            match self.records.next() {
                None => break,
                Some(Ok(line)) => {
                    let fields: Vec<&str> = line.iter().collect();
                    if let Some(record) = FlightRecord::from_positional(&fields) {
                        out.push(record);
                    }
                }
                Some(Err(err)) => {
                    // Broken pipes and disappearing files abort the run;
                    // a single undecodable line does not.
                    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                        return Err(err.into());
                    }
                }
            }
        }
        Ok(out)
    }
}
