//! Key-grouped accumulation of map emissions.

use std::collections::BTreeMap;

use crate::types::{FlightTimes, MarketKey};

/// The grouping table between the map and reduce phases.
///
/// Emissions accumulate under structural key equality; values keep their
/// arrival order within a group (the order carries no meaning, but keeping
/// it makes runs reproducible). The table releases its groups only as a
/// whole via [`Shuffle::into_groups`]: there is no way to read a group
/// while emissions may still arrive, which is what makes this the
/// pipeline's synchronization barrier.
#[derive(Debug, Default)]
pub struct Shuffle {
    groups: BTreeMap<MarketKey, Vec<FlightTimes>>,
    emissions: usize,
}

impl Shuffle {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one emission to its key's group.
    pub fn insert(&mut self, key: MarketKey, value: FlightTimes) {
        self.groups.entry(key).or_default().push(value);
        self.emissions += 1;
    }

    /// Absorb a stream of emissions.
    pub fn extend<I>(&mut self, emissions: I)
    where
        I: IntoIterator<Item = (MarketKey, FlightTimes)>,
    {
        for (key, value) in emissions {
            self.insert(key, value);
        }
    }

    /// Absorb another table, combining groups that share a key.
    ///
    /// Used by backends that let map tasks accumulate independently and
    /// join their tables at the barrier.
    pub fn merge(&mut self, other: Shuffle) {
        for (key, mut values) in other.groups {
            self.groups.entry(key).or_default().append(&mut values);
        }
        self.emissions += other.emissions;
    }

    /// Number of distinct keys observed.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of emissions absorbed.
    pub fn emission_count(&self) -> usize {
        self.emissions
    }

    /// True when no emissions have been absorbed.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Release every group, in key order.
    pub fn into_groups(self) -> Vec<(MarketKey, Vec<FlightTimes>)> {
        self.groups.into_iter().collect()
    }
}

impl FromIterator<(MarketKey, FlightTimes)> for Shuffle {
    fn from_iter<I: IntoIterator<Item = (MarketKey, FlightTimes)>>(iter: I) -> Self {
        let mut shuffle = Shuffle::new();
        shuffle.extend(iter);
        shuffle
    }
}

#[cfg(test)]
mod tests {
    use super::Shuffle;
    use crate::types::{FlightTimes, MarketKey};

    fn times(actual: f64) -> FlightTimes {
        FlightTimes {
            scheduled: None,
            actual: Some(actual),
            air: None,
        }
    }

    #[test]
    fn groups_by_structural_key_equality() {
        let mut shuffle = Shuffle::new();
        shuffle.insert(MarketKey::from_airports(2004, "JFK", "LAX"), times(1.0));
        shuffle.insert(MarketKey::from_airports(2004, "LAX", "JFK"), times(2.0));
        shuffle.insert(MarketKey::from_airports(2005, "JFK", "LAX"), times(3.0));

        assert_eq!(shuffle.group_count(), 2);
        assert_eq!(shuffle.emission_count(), 3);

        let groups = shuffle.into_groups();
        assert_eq!(groups[0].0.year, 2004);
        // Arrival order within the group survives.
        assert_eq!(groups[0].1, vec![times(1.0), times(2.0)]);
        assert_eq!(groups[1].1, vec![times(3.0)]);
    }

    #[test]
    fn groups_release_in_key_order() {
        let shuffle: Shuffle = [
            (MarketKey::from_airports(2005, "ORD", "SEA"), times(1.0)),
            (MarketKey::from_airports(2004, "ORD", "SEA"), times(2.0)),
            (MarketKey::from_airports(2004, "ATL", "BOS"), times(3.0)),
        ]
        .into_iter()
        .collect();

        let keys: Vec<_> = shuffle
            .into_groups()
            .into_iter()
            .map(|(k, _)| (k.year, k.market))
            .collect();
        assert_eq!(
            keys,
            vec![
                (2004, "ATL-BOS".to_string()),
                (2004, "ORD-SEA".to_string()),
                (2005, "ORD-SEA".to_string()),
            ]
        );
    }

    #[test]
    fn merge_combines_shared_keys() {
        let key = MarketKey::from_airports(2004, "JFK", "LAX");
        let mut left = Shuffle::new();
        left.insert(key.clone(), times(1.0));
        let mut right = Shuffle::new();
        right.insert(key.clone(), times(2.0));
        right.insert(MarketKey::from_airports(2004, "JFK", "SFO"), times(3.0));

        left.merge(right);
        assert_eq!(left.group_count(), 2);
        assert_eq!(left.emission_count(), 3);

        let groups = left.into_groups();
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn empty_table() {
        let shuffle = Shuffle::new();
        assert!(shuffle.is_empty());
        assert_eq!(shuffle.group_count(), 0);
        assert!(shuffle.into_groups().is_empty());
    }
}
