//! Interval index.
//!
//! Entries are ordered by start time, then by end time. Adding an interval
//! whose `(from, to)` pair is already present appends the payload to the
//! existing entry.
//!
//! # Containment queries
//!
//! [`IntervalIndex::search`] walks backwards from the last interval starting
//! at or before the query time and stops at the first interval that ends
//! before it. That early stop assumes intervals further left do not reach
//! past one that has already ended, which holds for layered data such as
//! non-overlapping or uniformly sized spans. A long interval hidden behind a
//! shorter one that ended earlier is not reported.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::IndexConfig;
use crate::distance::Timestamp;
use crate::error::{BoxError, IndexError, IndexResult};
use crate::search::lower_bound;

/// A closed `[from, to]` span and the payloads attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>, P: Deserialize<'de>"))]
pub struct IntervalEntry<T, P> {
    /// Start of the span.
    pub from: T,
    /// End of the span. Always after `from`.
    pub to: T,
    /// Payloads in the order they were added.
    #[serde(default)]
    pub items: Vec<P>,
}

impl<T: Ord, P> IntervalEntry<T, P> {
    /// Returns true if `time` lies within `[from, to]`.
    pub fn contains(&self, time: &T) -> bool {
        self.from <= *time && *time <= self.to
    }

    fn cmp_key(&self, from: &T, to: &T) -> Ordering {
        self.from.cmp(from).then_with(|| self.to.cmp(to))
    }
}

/// Where an interval lives, or would live, in an [`IntervalIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertLocation {
    /// An entry with the same `(from, to)` already exists at this position.
    Found(usize),
    /// No such entry; inserting at this position keeps the index ordered.
    Insert(usize),
}

/// An ordered collection of [`IntervalEntry`] keyed by `(from, to)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalIndex<T, P> {
    entries: Vec<IntervalEntry<T, P>>,
}

impl<T, P> Default for IntervalIndex<T, P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T, P> IntervalIndex<T, P> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Creates an empty index sized from `config`.
    pub fn with_config(config: &IndexConfig) -> Self {
        Self::with_capacity(config.initial_capacity)
    }

    /// Number of distinct `(from, to)` spans stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries ordered by start, then end.
    pub fn entries(&self) -> &[IntervalEntry<T, P>] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IntervalEntry<T, P>> {
        self.entries.iter()
    }
}

impl<T: Timestamp, P> IntervalIndex<T, P> {
    /// Finds where the interval `(from, to)` is or should be stored.
    pub fn locate(&self, from: &T, to: &T) -> InsertLocation {
        let position = lower_bound(self.entries.len(), |i| {
            self.entries[i].cmp_key(from, to) != Ordering::Less
        });

        match self.entries.get(position) {
            Some(entry) if entry.cmp_key(from, to) == Ordering::Equal => {
                InsertLocation::Found(position)
            }
            _ => InsertLocation::Insert(position),
        }
    }

    /// Returns the entry for exactly `(from, to)`.
    pub fn get(&self, from: &T, to: &T) -> Option<&IntervalEntry<T, P>> {
        match self.locate(from, to) {
            InsertLocation::Found(position) => self.entries.get(position),
            InsertLocation::Insert(_) => None,
        }
    }

    /// Adds the interval `[from, to]` and returns the position of its entry.
    ///
    /// Fails with [`IndexError::InvalidInterval`] unless `from < to`. An
    /// existing `(from, to)` pair receives the payload instead of a new entry.
    pub fn add(&mut self, from: T, to: T, item: Option<P>) -> IndexResult<usize> {
        if from >= to {
            return Err(IndexError::InvalidInterval);
        }

        match self.locate(&from, &to) {
            InsertLocation::Found(position) => {
                self.entries[position].items.extend(item);
                tracing::trace!(position, merged = true, "added interval entry");
                Ok(position)
            }
            InsertLocation::Insert(position) => {
                self.entries.insert(
                    position,
                    IntervalEntry {
                        from,
                        to,
                        items: item.into_iter().collect(),
                    },
                );
                tracing::trace!(position, merged = false, "added interval entry");
                Ok(position)
            }
        }
    }

    /// Visits every interval containing `time`, latest start first.
    ///
    /// Both ends are inclusive. Intervals sharing a start are visited from
    /// the longest to the shortest. See the module docs for when the scan
    /// stops early. A visitor error stops the scan and is returned as
    /// [`IndexError::CallbackAborted`].
    pub fn search<'a, F, E>(&'a self, time: &T, mut visit: F) -> IndexResult<()>
    where
        F: FnMut(&'a IntervalEntry<T, P>) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let len = self.entries.len();

        // First interval starting at or after `time`, then past any run that
        // starts exactly at `time`.
        let mut end = lower_bound(len, |i| self.entries[i].from >= *time);
        while end < len && self.entries[end].from == *time {
            end += 1;
        }

        let mut matches = 0_usize;
        for entry in self.entries[..end].iter().rev() {
            if entry.to < *time {
                break;
            }
            visit(entry).map_err(IndexError::aborted)?;
            matches += 1;
        }

        tracing::trace!(matches, "interval search complete");
        Ok(())
    }

    /// Collects the intervals [`search`](Self::search) would visit, in index
    /// order.
    pub fn containing(&self, time: &T) -> Vec<&IntervalEntry<T, P>> {
        let mut found = Vec::new();
        let result = self.search(time, |entry| {
            found.push(entry);
            Ok::<_, std::convert::Infallible>(())
        });
        debug_assert!(result.is_ok(), "infallible visitor cannot abort");
        found.reverse();
        found
    }
}

impl<T: Timestamp, P> TryFrom<Vec<IntervalEntry<T, P>>> for IntervalIndex<T, P> {
    type Error = IndexError;

    /// Builds an index from entries in any order, merging repeated spans.
    fn try_from(entries: Vec<IntervalEntry<T, P>>) -> Result<Self, Self::Error> {
        let mut index = Self::with_capacity(entries.len());
        for IntervalEntry { from, to, items } in entries {
            let position = index.add(from, to, None)?;
            index.entries[position].items.extend(items);
        }
        Ok(index)
    }
}

impl<'a, T, P> IntoIterator for &'a IntervalIndex<T, P> {
    type Item = &'a IntervalEntry<T, P>;
    type IntoIter = std::slice::Iter<'a, IntervalEntry<T, P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T: Serialize, P: Serialize> Serialize for IntervalIndex<T, P> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.entries.serialize(serializer)
    }
}

impl<'de, T, P> Deserialize<'de> for IntervalIndex<T, P>
where
    T: Timestamp + Deserialize<'de>,
    P: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<IntervalEntry<T, P>>::deserialize(deserializer)?;
        Self::try_from(entries).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn spans<P>(index: &IntervalIndex<i64, P>) -> Vec<(i64, i64)> {
        index.iter().map(|entry| (entry.from, entry.to)).collect()
    }

    #[test]
    fn test_add_rejects_empty_and_inverted_spans() {
        let mut index: IntervalIndex<i64, ()> = IntervalIndex::new();

        assert!(matches!(index.add(5, 5, None), Err(IndexError::InvalidInterval)));
        assert!(matches!(index.add(6, 5, None), Err(IndexError::InvalidInterval)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_add_duplicate_collapses() {
        let from = ts("2016-12-03T07:23:50Z");
        let to = ts("2016-12-04T07:23:50Z");

        let mut index = IntervalIndex::new();
        assert_eq!(index.add(from, to, Some("a")).unwrap(), 0);
        assert_eq!(index.add(from, to, Some("b")).unwrap(), 0);

        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].items, vec!["a", "b"]);
    }

    #[test]
    fn test_locate_reports_found_and_insert_positions() {
        let mut index: IntervalIndex<i64, ()> = IntervalIndex::new();
        index.add(10, 20, None).unwrap();
        index.add(10, 40, None).unwrap();
        index.add(30, 35, None).unwrap();

        assert_eq!(index.locate(&10, &20), InsertLocation::Found(0));
        assert_eq!(index.locate(&10, &40), InsertLocation::Found(1));
        assert_eq!(index.locate(&10, &30), InsertLocation::Insert(1));
        assert_eq!(index.locate(&5, &50), InsertLocation::Insert(0));
        assert_eq!(index.locate(&10, &50), InsertLocation::Insert(2));
        assert_eq!(index.locate(&40, &41), InsertLocation::Insert(3));
    }

    #[test]
    fn test_same_start_orders_by_end() {
        let mut index: IntervalIndex<i64, ()> = IntervalIndex::new();
        for (from, to) in [(0, 30), (0, 10), (0, 20)] {
            index.add(from, to, None).unwrap();
        }

        assert_eq!(spans(&index), vec![(0, 10), (0, 20), (0, 30)]);
    }

    #[test]
    fn test_get_exact_pair() {
        let mut index: IntervalIndex<i64, &str> = IntervalIndex::new();
        index.add(0, 10, Some("x")).unwrap();

        assert_eq!(index.get(&0, &10).unwrap().items, vec!["x"]);
        assert!(index.get(&0, &11).is_none());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let entry: IntervalEntry<i64, ()> = IntervalEntry {
            from: 10,
            to: 20,
            items: Vec::new(),
        };

        assert!(entry.contains(&10));
        assert!(entry.contains(&20));
        assert!(!entry.contains(&9));
        assert!(!entry.contains(&21));
    }

    #[test]
    fn test_search_empty_index_visits_nothing() {
        let index: IntervalIndex<i64, ()> = IntervalIndex::new();
        let mut calls = 0;
        index
            .search(&5, |_| {
                calls += 1;
                Ok::<_, BoxError>(())
            })
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_search_visits_latest_start_first() {
        let mut index: IntervalIndex<i64, ()> = IntervalIndex::new();
        index.add(0, 100, None).unwrap();
        index.add(10, 100, None).unwrap();
        index.add(20, 100, None).unwrap();
        index.add(60, 100, None).unwrap();

        let mut order = Vec::new();
        index
            .search(&50, |entry| {
                order.push(entry.from);
                Ok::<_, BoxError>(())
            })
            .unwrap();
        assert_eq!(order, vec![20, 10, 0]);
    }

    #[test]
    fn test_search_stops_at_first_ended_interval() {
        let mut index: IntervalIndex<i64, ()> = IntervalIndex::new();
        index.add(0, 100, None).unwrap();
        index.add(10, 20, None).unwrap();
        index.add(30, 60, None).unwrap();

        // [0, 100] contains 50 but sits behind [10, 20], which ended first.
        let found: Vec<(i64, i64)> = index
            .containing(&50)
            .iter()
            .map(|entry| (entry.from, entry.to))
            .collect();
        assert_eq!(found, vec![(30, 60)]);
    }

    #[test]
    fn test_search_visitor_error_aborts() {
        let mut index: IntervalIndex<i64, ()> = IntervalIndex::new();
        index.add(0, 10, None).unwrap();
        index.add(1, 10, None).unwrap();
        index.add(2, 10, None).unwrap();

        let mut calls = 0;
        let err = index
            .search(&5, |_| {
                calls += 1;
                Err(std::io::Error::other("stop"))
            })
            .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, IndexError::CallbackAborted(_)));
    }

    #[test]
    fn test_visitor_can_keep_entry_references() {
        let mut index: IntervalIndex<i64, &str> = IntervalIndex::new();
        index.add(0, 10, Some("outer")).unwrap();
        index.add(4, 8, Some("inner")).unwrap();

        let mut kept: Vec<&IntervalEntry<i64, &str>> = Vec::new();
        index
            .search(&6, |entry| {
                kept.push(entry);
                Ok::<_, BoxError>(())
            })
            .unwrap();

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].items, vec!["inner"]);
        assert_eq!(kept[1].items, vec!["outer"]);
    }

    #[test]
    fn test_containing_returns_index_order() {
        let mut index: IntervalIndex<i64, ()> = IntervalIndex::new();
        index.add(0, 10, None).unwrap();
        index.add(4, 8, None).unwrap();

        let found: Vec<(i64, i64)> = index
            .containing(&6)
            .iter()
            .map(|entry| (entry.from, entry.to))
            .collect();
        assert_eq!(found, vec![(0, 10), (4, 8)]);
    }

    /// Payload type without a `Default` impl.
    #[derive(Debug, PartialEq, Eq, Deserialize)]
    struct Label(String);

    #[test]
    fn test_deserialize_payload_without_default() {
        let json = r#"[{"from": 3, "to": 9, "items": ["shift"]}, {"from": 0, "to": 2}]"#;
        let index: IntervalIndex<i64, Label> = serde_json::from_str(json).unwrap();

        assert_eq!(spans(&index), vec![(0, 2), (3, 9)]);
        assert_eq!(index.entries()[1].items, vec![Label("shift".to_string())]);
    }

    #[test]
    fn test_try_from_rejects_invalid_entry() {
        let result = IntervalIndex::<i64, ()>::try_from(vec![
            IntervalEntry { from: 0, to: 5, items: Vec::new() },
            IntervalEntry { from: 7, to: 7, items: Vec::new() },
        ]);
        assert!(matches!(result, Err(IndexError::InvalidInterval)));
    }

    #[test]
    fn test_serialize_as_entry_list() {
        let mut index: IntervalIndex<i64, &str> = IntervalIndex::new();
        index.add(10, 20, Some("b")).unwrap();
        index.add(0, 5, None).unwrap();

        let json = serde_json::to_string(&index).unwrap();
        insta::assert_snapshot!(
            json,
            @r#"[{"from":0,"to":5,"items":[]},{"from":10,"to":20,"items":["b"]}]"#
        );
    }

    #[test]
    fn test_deserialize_rejects_invalid_interval() {
        let json = r#"[{"from": 10, "to": 5}]"#;
        let err = serde_json::from_str::<IntervalIndex<i64, ()>>(json).unwrap_err();
        assert!(err.to_string().contains("interval is invalid"));
    }

    #[test]
    fn test_deserialize_sorts_and_merges() {
        let json = r#"[
            {"from": 10, "to": 20, "items": ["b"]},
            {"from": 0, "to": 5},
            {"from": 10, "to": 20, "items": ["c"]}
        ]"#;
        let index: IntervalIndex<i64, String> = serde_json::from_str(json).unwrap();

        assert_eq!(spans(&index), vec![(0, 5), (10, 20)]);
        assert_eq!(index.entries()[1].items, vec!["b", "c"]);
    }
}
