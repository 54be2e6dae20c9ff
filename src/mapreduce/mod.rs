//! Map/shuffle/reduce building blocks.
//!
//! The map and reduce steps are capability traits with one operation each,
//! so any job can supply its own implementations through the same executor;
//! [`Shuffle`] is the grouping table between them and the pipeline's one
//! synchronization barrier.
//!
//! Currently implemented:
//!
//! - [`FlightTimeMapper`]: record → optional `(key, value)` emission
//! - [`Shuffle`]: key-grouped accumulation of emissions
//! - [`FlightTimeReducer`]: group → per-market aggregate
//!
//! ## Example: map → shuffle → reduce
//!
//! ```rust
//! use flight_market_stats::mapreduce::{
//!     FlightTimeMapper, FlightTimeReducer, Mapper, Reducer, Shuffle,
//! };
//! use flight_market_stats::types::FlightRecord;
//!
//! // year .. ActualElapsedTime, CRSElapsedTime, AirTime .. Origin, Dest .. Cancelled .. Diverted
//! let out = FlightRecord::from_positional(&[
//!     "2004", "1", "12", "1", "623", "630", "901", "915", "UA", "462", "N805UA",
//!     "345", "330", "300", "-14", "-7", "JFK", "LAX", "2475", "4", "11", "0", "",
//!     "0", "0", "0", "0", "0", "0",
//! ])
//! .unwrap();
//! let back = FlightRecord::from_positional(&[
//!     "2004", "1", "13", "2", "1410", "1400", "1720", "1710", "UA", "463", "N806UA",
//!     "335", "330", "290", "10", "10", "LAX", "JFK", "2475", "6", "9", "0", "",
//!     "0", "0", "0", "0", "0", "0",
//! ])
//! .unwrap();
//!
//! let mapper = FlightTimeMapper;
//! let shuffle: Shuffle = [&out, &back]
//!     .into_iter()
//!     .filter_map(|r| mapper.map(r))
//!     .collect();
//! assert_eq!(shuffle.group_count(), 1);
//!
//! let reducer = FlightTimeReducer;
//! let (key, values) = shuffle.into_groups().pop().unwrap();
//! let agg = reducer.reduce(&key, &values);
//! assert_eq!(agg.market, "JFK-LAX");
//! assert_eq!(agg.flights, 2);
//! assert_eq!(agg.actual, Some(340.0));
//! ```

pub mod mapper;
pub mod reducer;
pub mod shuffle;

use crate::types::{FlightRecord, FlightTimes, MarketAggregate, MarketKey};

pub use mapper::FlightTimeMapper;
pub use reducer::FlightTimeReducer;
pub use shuffle::Shuffle;

/// The map step: one record in, zero or one emission out.
///
/// `None` is the explicit "this record contributes nothing" result used for
/// header rows, cancelled/diverted flights, and records too malformed to
/// key. Implementations must be pure: no side effects, output depending
/// only on the record.
pub trait Mapper: Send + Sync {
    fn map(&self, record: &FlightRecord) -> Option<(MarketKey, FlightTimes)>;
}

/// The reduce step: one complete group in, one aggregate out.
///
/// Called only after the shuffle barrier, so `values` is every emission
/// observed for `key`. Implementations must be pure.
pub trait Reducer: Send + Sync {
    fn reduce(&self, key: &MarketKey, values: &[FlightTimes]) -> MarketAggregate;
}
