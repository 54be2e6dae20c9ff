//! Core data model types for the flight-time pipeline.
//!
//! Input lines parse into fixed-shape [`FlightRecord`]s; the map phase turns
//! records into ([`MarketKey`], [`FlightTimes`]) emissions; the reduce phase
//! folds each group into a [`MarketAggregate`]. Materialized results load
//! into an in-memory [`ResultTable`] described by a [`Schema`].

use serde::{Serialize, Serializer};

/// Number of positional fields in a flight record line.
pub const FLIGHT_RECORD_FIELDS: usize = 29;

/// Separator joining the two airport codes of a market string.
pub const MARKET_SEPARATOR: char = '-';

/// One parsed flight-record line.
///
/// Fields are bound positionally from the input line and kept as raw
/// strings; numeric interpretation happens in the map phase, where a value
/// that fails to parse is treated as missing rather than zero. The struct
/// is immutable once built (no mutators are exposed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightRecord {
    pub year: String,
    pub month: String,
    pub day_of_month: String,
    pub day_of_week: String,
    pub dep_time: String,
    pub crs_dep_time: String,
    pub arr_time: String,
    pub crs_arr_time: String,
    pub unique_carrier: String,
    pub flight_num: String,
    pub tail_num: String,
    pub actual_elapsed_time: String,
    pub crs_elapsed_time: String,
    pub air_time: String,
    pub arr_delay: String,
    pub dep_delay: String,
    pub origin: String,
    pub dest: String,
    pub distance: String,
    pub taxi_in: String,
    pub taxi_out: String,
    pub cancelled: String,
    pub cancellation_code: String,
    pub diverted: String,
    pub carrier_delay: String,
    pub weather_delay: String,
    pub nas_delay: String,
    pub security_delay: String,
    pub late_aircraft_delay: String,
}

impl FlightRecord {
    /// Bind positional values to the fixed field layout.
    ///
    /// Positions beyond the supplied slice bind to the empty string, so a
    /// short (truncated) line still produces a record as long as it carries
    /// at least one non-empty value. A line with no parseable values yields
    /// `None`: skip, not fail.
    pub fn from_positional(fields: &[&str]) -> Option<Self> {
        if fields.iter().all(|f| f.trim().is_empty()) {
            return None;
        }

        let at = |i: usize| fields.get(i).map_or(String::new(), |f| f.trim().to_owned());

        Some(Self {
            year: at(0),
            month: at(1),
            day_of_month: at(2),
            day_of_week: at(3),
            dep_time: at(4),
            crs_dep_time: at(5),
            arr_time: at(6),
            crs_arr_time: at(7),
            unique_carrier: at(8),
            flight_num: at(9),
            tail_num: at(10),
            actual_elapsed_time: at(11),
            crs_elapsed_time: at(12),
            air_time: at(13),
            arr_delay: at(14),
            dep_delay: at(15),
            origin: at(16),
            dest: at(17),
            distance: at(18),
            taxi_in: at(19),
            taxi_out: at(20),
            cancelled: at(21),
            cancellation_code: at(22),
            diverted: at(23),
            carrier_delay: at(24),
            weather_delay: at(25),
            nas_delay: at(26),
            security_delay: at(27),
            late_aircraft_delay: at(28),
        })
    }
}

/// Grouping key for the shuffle phase: year + canonical market.
///
/// `market` is the unordered airport pair joined by [`MARKET_SEPARATOR`]
/// with the two codes in lexicographic order, so A→B and B→A flights land
/// under the same key. `Ord` makes grouped iteration (and therefore output
/// row order) deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarketKey {
    pub year: i32,
    pub market: String,
}

impl MarketKey {
    /// Build the canonical key for an unordered airport pair.
    pub fn from_airports(year: i32, a: &str, b: &str) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            year,
            market: format!("{lo}{MARKET_SEPARATOR}{hi}"),
        }
    }
}

/// Per-flight numeric measurements emitted by the map phase.
///
/// `None` means the source field did not parse as a number; missing is
/// distinct from zero and is excluded from mean computation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlightTimes {
    /// Scheduled (CRS) elapsed time, minutes.
    pub scheduled: Option<f64>,
    /// Actual elapsed time, minutes.
    pub actual: Option<f64>,
    /// Time in the air, minutes.
    pub air: Option<f64>,
}

/// Final per-key output row.
///
/// Serializes (via `csv::Writer::serialize`) in the fixed output column
/// order `year, market, flights, scheduled, actual, in_air`. Undefined
/// means (`None`) serialize as the literal `NA` marker, never as `0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketAggregate {
    pub year: i32,
    pub market: String,
    pub flights: u64,
    #[serde(serialize_with = "serialize_mean")]
    pub scheduled: Option<f64>,
    #[serde(serialize_with = "serialize_mean")]
    pub actual: Option<f64>,
    #[serde(serialize_with = "serialize_mean")]
    pub in_air: Option<f64>,
}

/// Marker written for a mean with zero present values.
pub const UNDEFINED_MEAN: &str = "NA";

fn serialize_mean<S: Serializer>(mean: &Option<f64>, ser: S) -> Result<S::Ok, S::Error> {
    match mean {
        Some(v) => ser.serialize_f64(*v),
        None => ser.serialize_str(UNDEFINED_MEAN),
    }
}

/// Logical data type for a result-table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// UTF-8 string.
    Utf8,
}

/// A single named, typed column in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing a [`ResultTable`]'s columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed cell in a [`ResultTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/undefined value (an `NA` or empty output cell).
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell, if it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

/// In-memory tabular view of a materialized job output.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the
/// [`Schema`] fields; the pipeline itself never operates on this type, it
/// exists for post-run inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major cell storage.
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    /// Create a table from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Look up a cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// All cells of one named column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(name)?;
        Some(self.rows.iter().filter_map(|row| row.get(idx)).collect())
    }
}
