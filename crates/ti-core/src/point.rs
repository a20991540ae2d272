//! Point-time index.
//!
//! Entries are kept strictly ascending by timestamp with no duplicates.
//! Adding an existing timestamp appends the payload to that entry instead of
//! creating a second one.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::IndexConfig;
use crate::distance::{Timestamp, absolute_distance};
use crate::error::{BoxError, IndexError, IndexResult};
use crate::search::lower_bound;

/// A timestamp and the payloads attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>, P: Deserialize<'de>"))]
pub struct PointEntry<T, P> {
    /// When the entry occurred.
    pub time: T,
    /// Payloads in the order they were added.
    #[serde(default)]
    pub items: Vec<P>,
}

/// An ordered collection of [`PointEntry`] keyed by timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointIndex<T, P> {
    entries: Vec<PointEntry<T, P>>,
    /// Tolerance used by [`nearest_default`](Self::nearest_default).
    nearest_tolerance_ms: u32,
}

impl<T, P> Default for PointIndex<T, P> {
    fn default() -> Self {
        Self::with_config(&IndexConfig::default())
    }
}

impl<T, P> PointIndex<T, P> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(&IndexConfig {
            initial_capacity: capacity,
            ..IndexConfig::default()
        })
    }

    /// Creates an empty index sized from `config`, keeping its nearest-query
    /// tolerance for [`nearest_default`](Self::nearest_default).
    pub fn with_config(config: &IndexConfig) -> Self {
        Self {
            entries: Vec::with_capacity(config.initial_capacity),
            nearest_tolerance_ms: config.nearest_tolerance_ms,
        }
    }

    /// Number of distinct timestamps stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in ascending time order.
    pub fn entries(&self) -> &[PointEntry<T, P>] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointEntry<T, P>> {
        self.entries.iter()
    }
}

impl<T: Timestamp, P> PointIndex<T, P> {
    /// Returns the position of the first entry at or after `time`.
    ///
    /// Returns [`len`](Self::len) when every stored time is earlier.
    pub fn search(&self, time: &T) -> usize {
        lower_bound(self.entries.len(), |i| self.entries[i].time >= *time)
    }

    /// Returns the entry stored at exactly `time`.
    pub fn get(&self, time: &T) -> Option<&PointEntry<T, P>> {
        self.entries
            .get(self.search(time))
            .filter(|entry| entry.time == *time)
    }

    /// Adds `time` to the index and returns the position of its entry.
    ///
    /// If `time` is already present the payload is appended to the existing
    /// entry. A `None` payload still creates the entry when it is new.
    pub fn add(&mut self, time: T, item: Option<P>) -> usize {
        let position = self.search(&time);
        if let Some(entry) = self
            .entries
            .get_mut(position)
            .filter(|entry| entry.time == time)
        {
            entry.items.extend(item);
            tracing::trace!(position, merged = true, "added point entry");
            return position;
        }

        self.entries.insert(
            position,
            PointEntry {
                time,
                items: item.into_iter().collect(),
            },
        );
        tracing::trace!(position, merged = false, "added point entry");
        position
    }

    /// Visits every entry within `tolerance` of `time`, in ascending order.
    ///
    /// Matches form one contiguous run around the first entry at or after
    /// `time`. Distances equal to `tolerance` count as matches. Finding no
    /// match is not an error, but an empty index is [`IndexError::NotFound`].
    /// A visitor error stops the scan and is returned as
    /// [`IndexError::CallbackAborted`].
    pub fn search_nearest<'a, F, E>(
        &'a self,
        time: &T,
        tolerance: &T::Distance,
        mut visit: F,
    ) -> IndexResult<()>
    where
        F: FnMut(&'a PointEntry<T, P>) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let Some(last) = self.entries.len().checked_sub(1) else {
            return Err(IndexError::NotFound);
        };

        let within = |i: usize| absolute_distance(&self.entries[i].time, time) <= *tolerance;

        let mut start = self.search(time).min(last);
        if !within(start) {
            // Everything left of the anchor is earlier than `time`, so only
            // the immediate neighbour can still be close enough.
            match start.checked_sub(1) {
                Some(left) if within(left) => start = left,
                _ => {
                    tracing::trace!(matches = 0, "nearest search found nothing in tolerance");
                    return Ok(());
                }
            }
        }

        while start > 0 && within(start - 1) {
            start -= 1;
        }

        let mut matches = 0_usize;
        for entry in self.entries[start..]
            .iter()
            .take_while(|entry| absolute_distance(&entry.time, time) <= *tolerance)
        {
            visit(entry).map_err(IndexError::aborted)?;
            matches += 1;
        }

        tracing::trace!(matches, "nearest search complete");
        Ok(())
    }

    /// Collects the entries [`search_nearest`](Self::search_nearest) would visit.
    pub fn nearest(
        &self,
        time: &T,
        tolerance: &T::Distance,
    ) -> IndexResult<Vec<&PointEntry<T, P>>> {
        let mut found = Vec::new();
        self.search_nearest(time, tolerance, |entry| {
            found.push(entry);
            Ok::<_, std::convert::Infallible>(())
        })?;
        Ok(found)
    }

    /// Like [`nearest`](Self::nearest), using the tolerance from the
    /// [`IndexConfig`] the index was created with.
    pub fn nearest_default(&self, time: &T) -> IndexResult<Vec<&PointEntry<T, P>>> {
        self.nearest(time, &T::tolerance_from_millis(self.nearest_tolerance_ms))
    }
}

impl<T: Timestamp, P> FromIterator<(T, P)> for PointIndex<T, P> {
    fn from_iter<I: IntoIterator<Item = (T, P)>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl<T: Timestamp, P> Extend<(T, P)> for PointIndex<T, P> {
    fn extend<I: IntoIterator<Item = (T, P)>>(&mut self, iter: I) {
        for (time, item) in iter {
            self.add(time, Some(item));
        }
    }
}

impl<T: Timestamp, P> From<Vec<PointEntry<T, P>>> for PointIndex<T, P> {
    /// Builds an index from entries in any order, merging repeated times.
    fn from(entries: Vec<PointEntry<T, P>>) -> Self {
        let mut index = Self::with_capacity(entries.len());
        for PointEntry { time, items } in entries {
            let position = index.add(time, None);
            index.entries[position].items.extend(items);
        }
        index
    }
}

impl<'a, T, P> IntoIterator for &'a PointIndex<T, P> {
    type Item = &'a PointEntry<T, P>;
    type IntoIter = std::slice::Iter<'a, PointEntry<T, P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T: Serialize, P: Serialize> Serialize for PointIndex<T, P> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.entries.serialize(serializer)
    }
}

impl<'de, T, P> Deserialize<'de> for PointIndex<T, P>
where
    T: Timestamp + Deserialize<'de>,
    P: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<PointEntry<T, P>>::deserialize(deserializer)?;
        // Re-insert so that unsorted or repeated input still yields a valid index.
        Ok(Self::from(entries))
    }
}
