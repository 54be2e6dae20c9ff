//! The flight-time reduce aggregation.

use crate::mapreduce::Reducer;
use crate::types::{FlightTimes, MarketAggregate, MarketKey};

/// Folds one market's complete value list into count and means.
///
/// `flights` counts every value in the group; each mean is computed over
/// only the present measurements for that field. A field with zero present
/// measurements keeps an undefined (`None`) mean, never coerced to zero
/// and never an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlightTimeReducer;

impl Reducer for FlightTimeReducer {
    fn reduce(&self, key: &MarketKey, values: &[FlightTimes]) -> MarketAggregate {
        MarketAggregate {
            year: key.year,
            market: key.market.clone(),
            flights: values.len() as u64,
            scheduled: mean(values.iter().map(|v| v.scheduled)),
            actual: mean(values.iter().map(|v| v.actual)),
            in_air: mean(values.iter().map(|v| v.air)),
        }
    }
}

/// Floating-point mean of the present values; `None` when none are present.
fn mean<I>(values: I) -> Option<f64>
where
    I: Iterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut count = 0u64;
    for v in values.flatten() {
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::FlightTimeReducer;
    use crate::mapreduce::Reducer;
    use crate::types::{FlightTimes, MarketKey};

    fn key() -> MarketKey {
        MarketKey::from_airports(2004, "JFK", "LAX")
    }

    #[test]
    fn means_ignore_missing_values_without_shrinking_the_count() {
        let values = vec![
            FlightTimes {
                scheduled: Some(330.0),
                actual: Some(10.0),
                air: Some(300.0),
            },
            FlightTimes {
                scheduled: Some(330.0),
                actual: None,
                air: Some(290.0),
            },
            FlightTimes {
                scheduled: None,
                actual: Some(20.0),
                air: Some(280.0),
            },
        ];

        let agg = FlightTimeReducer.reduce(&key(), &values);
        assert_eq!(agg.flights, 3);
        assert_eq!(agg.scheduled, Some(330.0));
        assert_eq!(agg.actual, Some(15.0));
        assert_eq!(agg.in_air, Some(290.0));
    }

    #[test]
    fn all_missing_field_keeps_an_undefined_mean() {
        let values = vec![
            FlightTimes {
                scheduled: Some(330.0),
                actual: None,
                air: None,
            },
            FlightTimes {
                scheduled: Some(340.0),
                actual: None,
                air: None,
            },
        ];

        let agg = FlightTimeReducer.reduce(&key(), &values);
        assert_eq!(agg.flights, 2);
        assert_eq!(agg.scheduled, Some(335.0));
        assert_eq!(agg.actual, None);
        assert_eq!(agg.in_air, None);
    }

    #[test]
    fn carries_the_key_through() {
        let agg = FlightTimeReducer.reduce(&key(), &[FlightTimes::default()]);
        assert_eq!(agg.year, 2004);
        assert_eq!(agg.market, "JFK-LAX");
        assert_eq!(agg.flights, 1);
        assert_eq!(agg.scheduled, None);
    }
}
