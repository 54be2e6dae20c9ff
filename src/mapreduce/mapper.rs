//! The flight-time map transform.

use crate::mapreduce::Mapper;
use crate::types::{FlightRecord, FlightTimes, MarketKey};

/// Label the header row carries in its year column.
const HEADER_YEAR_LABEL: &str = "Year";

/// Maps one flight record to its `(year, market)` key and timing triple.
///
/// Emits nothing for:
///
/// - header rows (year column holds the literal `Year` label)
/// - cancelled flights (non-zero `Cancelled` flag)
/// - diverted flights (non-zero `Diverted` flag)
/// - records whose year does not parse or whose airport codes are empty
///
/// The header and flag filters are independent conditions; a record must
/// pass all of them to emit. Timing fields that fail to parse become
/// missing values, not zeros.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlightTimeMapper;

impl Mapper for FlightTimeMapper {
    fn map(&self, record: &FlightRecord) -> Option<(MarketKey, FlightTimes)> {
        if record.year.eq_ignore_ascii_case(HEADER_YEAR_LABEL) {
            return None;
        }
        if flag_is_set(&record.cancelled) || flag_is_set(&record.diverted) {
            return None;
        }

        let year = record.year.parse::<i32>().ok()?;
        if record.origin.is_empty() || record.dest.is_empty() {
            return None;
        }

        let key = MarketKey::from_airports(year, &record.origin, &record.dest);
        let times = FlightTimes {
            scheduled: parse_minutes(&record.crs_elapsed_time),
            actual: parse_minutes(&record.actual_elapsed_time),
            air: parse_minutes(&record.air_time),
        };
        Some((key, times))
    }
}

/// Zero/non-zero flag columns: `0` (or `0.0`) means unset; anything that
/// does not parse as a number is treated as unset.
fn flag_is_set(raw: &str) -> bool {
    raw.parse::<f64>().map(|v| v != 0.0).unwrap_or(false)
}

fn parse_minutes(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok()
}
