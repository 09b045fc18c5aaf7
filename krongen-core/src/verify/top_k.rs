//! Bounded tracker of the highest-degree vertices.

use std::collections::BTreeSet;

use serde::Serialize;

/// Default number of vertices retained by [`TopKTracker`].
pub const DEFAULT_TOP_K: usize = 256;

/// One retained vertex.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct DegreeEntry {
    /// Vertex id.
    pub vertex_id: u64,
    /// Degree of the vertex.
    pub degree: u64,
}

/// Keeps the `capacity` largest `(degree, vertex)` pairs in ascending order.
///
/// Ties on degree are broken by vertex id, so the retained set is a pure
/// function of the inserted pairs and merging is order-independent.
///
/// # Examples
/// ```
/// use krongen_core::TopKTracker;
///
/// let mut tracker = TopKTracker::new(3);
/// for (vertex, degree) in [5, 1, 9, 3, 7].into_iter().enumerate() {
///     tracker.insert(vertex as u64, degree);
/// }
/// let degrees: Vec<u64> = tracker.iter().map(|entry| entry.degree).collect();
/// assert_eq!(degrees, [5, 7, 9]);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TopKTracker {
    capacity: usize,
    entries: BTreeSet<(u64, u64)>,
}

impl Default for TopKTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl TopKTracker {
    /// Creates an empty tracker retaining at most `capacity` entries.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: BTreeSet::new(),
        }
    }

    /// Returns the maximum number of retained entries.
    #[must_use]
    #[rustfmt::skip]
    pub const fn capacity(&self) -> usize { self.capacity }

    /// Returns the number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offers `vertex` with `degree`; evicts the smallest entry on overflow.
    pub fn insert(&mut self, vertex: u64, degree: u64) {
        let candidate = (degree, vertex);
        if self.entries.len() < self.capacity {
            self.entries.insert(candidate);
            return;
        }
        match self.entries.first() {
            Some(&smallest) if candidate > smallest => {
                self.entries.insert(candidate);
                self.entries.pop_first();
            }
            _ => {}
        }
    }

    /// Folds every entry of `other` into `self`.
    pub fn merge(&mut self, other: Self) {
        for (degree, vertex) in other.entries {
            self.insert(vertex, degree);
        }
    }

    /// Iterates over retained entries in ascending `(degree, vertex)` order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = DegreeEntry> + '_ {
        self.entries
            .iter()
            .map(|&(degree, vertex_id)| DegreeEntry { vertex_id, degree })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use rstest::rstest;

    use crate::test_utils::suite_proptest_config;

    fn degrees(tracker: &TopKTracker) -> Vec<u64> {
        tracker.iter().map(|entry| entry.degree).collect()
    }

    #[test]
    fn keeps_the_three_largest_in_ascending_order() {
        let mut tracker = TopKTracker::new(3);
        for (vertex, degree) in [5, 1, 9, 3, 7].into_iter().enumerate() {
            tracker.insert(vertex as u64, degree);
        }
        assert_eq!(degrees(&tracker), vec![5, 7, 9]);
        let vertices: Vec<u64> = tracker.iter().map(|entry| entry.vertex_id).collect();
        assert_eq!(vertices, vec![0, 4, 2]);
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut tracker = TopKTracker::new(0);
        tracker.insert(1, 100);
        assert!(tracker.is_empty());
    }

    #[rstest]
    #[case::equal_degree_larger_id(7, 10, true)]
    #[case::equal_degree_smaller_id(1, 10, false)]
    #[case::smaller_degree(9, 3, false)]
    fn eviction_uses_degree_then_vertex(
        #[case] vertex: u64,
        #[case] degree: u64,
        #[case] admitted: bool,
    ) {
        let mut tracker = TopKTracker::new(2);
        tracker.insert(5, 10);
        tracker.insert(6, 20);
        tracker.insert(vertex, degree);
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.iter().any(|entry| entry.vertex_id == vertex), admitted);
    }

    #[test]
    fn default_capacity_is_256() {
        assert_eq!(TopKTracker::default().capacity(), DEFAULT_TOP_K);
    }

    proptest! {
        #![proptest_config(suite_proptest_config(64))]

        #[test]
        fn merging_partitions_matches_a_single_tracker(
            degree_list in proptest::collection::vec(0_u64..50, 0..200),
            split in 0_usize..200,
            capacity in 0_usize..20,
        ) {
            let split = split.min(degree_list.len());
            let mut whole = TopKTracker::new(capacity);
            let mut left = TopKTracker::new(capacity);
            let mut right = TopKTracker::new(capacity);
            for (vertex, &degree) in degree_list.iter().enumerate() {
                whole.insert(vertex as u64, degree);
                if vertex < split {
                    left.insert(vertex as u64, degree);
                } else {
                    right.insert(vertex as u64, degree);
                }
            }
            right.merge(left);
            prop_assert_eq!(right, whole);
        }
    }
}
