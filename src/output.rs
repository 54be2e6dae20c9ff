//! Output serialization and result materialization.
//!
//! [`CsvOutputFormat`] writes aggregates as delimited rows with the fixed
//! column order `year, market, flights, scheduled, actual, in_air`, and
//! reads a written file back into a typed [`ResultTable`] for inspection.

use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{
    DataType, Field, MarketAggregate, ResultTable, Schema, Value, UNDEFINED_MEAN,
};

/// Column names of the output file, in order.
pub const RESULT_COLUMNS: [&str; 6] =
    ["year", "market", "flights", "scheduled", "actual", "in_air"];

/// The typed schema of the output file.
pub fn result_schema() -> Schema {
    Schema::new(vec![
        Field::new("year", DataType::Int64),
        Field::new("market", DataType::Utf8),
        Field::new("flights", DataType::Int64),
        Field::new("scheduled", DataType::Float64),
        Field::new("actual", DataType::Float64),
        Field::new("in_air", DataType::Float64),
    ])
}

/// Serializer for the aggregate rows a run produces.
///
/// `write` must emit a header row even for an empty result set, and must
/// represent undefined means with an explicit marker (never `0`). `read`
/// is the materialization half of the same format.
pub trait OutputFormat: Send + Sync {
    /// Serialize aggregates to `path`, replacing any existing file.
    fn write(&self, path: &Path, aggregates: &[MarketAggregate]) -> PipelineResult<()>;

    /// Load a previously written output file into an in-memory table.
    fn read(&self, path: &Path) -> PipelineResult<ResultTable>;
}

/// Delimited-text output.
///
/// Means use the shortest round-trip decimal encoding (`340.0`, not
/// `340`); undefined means serialize as the literal `NA`. Reading maps
/// both `NA` and empty cells to [`Value::Null`].
#[derive(Debug, Clone)]
pub struct CsvOutputFormat {
    /// Field delimiter byte.
    pub delimiter: u8,
}

impl Default for CsvOutputFormat {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl OutputFormat for CsvOutputFormat {
    fn write(&self, path: &Path, aggregates: &[MarketAggregate]) -> PipelineResult<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;

        if aggregates.is_empty() {
            // serialize() would have emitted the header from the first row.
            wtr.write_record(RESULT_COLUMNS)?;
        }
        for aggregate in aggregates {
            wtr.serialize(aggregate)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn read(&self, path: &Path) -> PipelineResult<ResultTable> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_path(path)?;

        let schema = result_schema();
        let headers = rdr.headers()?.clone();

        // Map schema fields -> column indexes (tolerates re-ordered columns).
        let mut col_idxs = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            match headers.iter().position(|h| h == field.name) {
                Some(idx) => col_idxs.push(idx),
                None => {
                    return Err(PipelineError::SchemaMismatch {
                        message: format!(
                            "missing required column '{field}'. headers={:?}",
                            headers.iter().collect::<Vec<_>>(),
                            field = field.name
                        ),
                    });
                }
            }
        }

        let mut rows: Vec<Vec<Value>> = Vec::new();
        for (row_idx0, result) in rdr.records().enumerate() {
            // 1-based for users; +1 again because the header is row 1.
            let user_row = row_idx0 + 2;
            let record = result?;

            let mut row = Vec::with_capacity(schema.fields.len());
            for (field, &col_idx) in schema.fields.iter().zip(col_idxs.iter()) {
                let raw = record.get(col_idx).unwrap_or("");
                row.push(parse_typed_value(user_row, &field.name, &field.data_type, raw)?);
            }
            rows.push(row);
        }

        Ok(ResultTable::new(schema, rows))
    }
}

/// Read an output file written with the default (comma) format.
pub fn read_results(path: impl AsRef<Path>) -> PipelineResult<ResultTable> {
    CsvOutputFormat::default().read(path.as_ref())
}

fn parse_typed_value(
    row: usize,
    column: &str,
    data_type: &DataType,
    raw: &str,
) -> PipelineResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == UNDEFINED_MEAN {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed.parse::<i64>().map(Value::Int64).map_err(|e| {
            PipelineError::ParseError {
                row,
                column: column.to_owned(),
                raw: raw.to_owned(),
                message: e.to_string(),
            }
        }),
        DataType::Float64 => trimmed.parse::<f64>().map(Value::Float64).map_err(|e| {
            PipelineError::ParseError {
                row,
                column: column.to_owned(),
                raw: raw.to_owned(),
                message: e.to_string(),
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{read_results, CsvOutputFormat, OutputFormat, RESULT_COLUMNS};
    use crate::types::{MarketAggregate, Value};

    fn tmp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("flight-market-stats-{}-{name}", std::process::id()))
    }

    fn sample() -> Vec<MarketAggregate> {
        vec![
            MarketAggregate {
                year: 2004,
                market: "JFK-LAX".to_string(),
                flights: 2,
                scheduled: Some(330.0),
                actual: Some(340.0),
                in_air: Some(295.0),
            },
            MarketAggregate {
                year: 2004,
                market: "JFK-SFO".to_string(),
                flights: 1,
                scheduled: Some(360.0),
                actual: None,
                in_air: None,
            },
        ]
    }

    #[test]
    fn writes_header_and_stable_decimals() {
        let path = tmp_path("write.csv");
        CsvOutputFormat::default().write(&path, &sample()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("year,market,flights,scheduled,actual,in_air"));
        assert_eq!(lines.next(), Some("2004,JFK-LAX,2,330.0,340.0,295.0"));
        assert_eq!(lines.next(), Some("2004,JFK-SFO,1,360.0,NA,NA"));
        assert_eq!(lines.next(), None);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn empty_result_set_still_writes_the_header() {
        let path = tmp_path("empty.csv");
        CsvOutputFormat::default().write(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), RESULT_COLUMNS.join(","));

        let table = read_results(&path).unwrap();
        assert_eq!(table.row_count(), 0);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn round_trips_undefined_means_as_null() {
        let path = tmp_path("roundtrip.csv");
        CsvOutputFormat::default().write(&path, &sample()).unwrap();

        let table = read_results(&path).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, "year"), Some(&Value::Int64(2004)));
        assert_eq!(table.cell(0, "actual"), Some(&Value::Float64(340.0)));
        assert_eq!(table.cell(1, "flights"), Some(&Value::Int64(1)));
        assert_eq!(table.cell(1, "actual"), Some(&Value::Null));
        assert_eq!(table.cell(1, "in_air"), Some(&Value::Null));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn read_rejects_missing_columns() {
        let path = tmp_path("bad-header.csv");
        fs::write(&path, "year,market\n2004,JFK-LAX\n").unwrap();

        let err = read_results(&path).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("schema mismatch"));
        assert!(msg.contains("missing required column 'flights'"));

        fs::remove_file(&path).unwrap();
    }
}
