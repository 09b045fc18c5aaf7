//! Degree histograms and their parallel reduction.

use rayon::prelude::*;

use super::{error::ValidationError, top_k::TopKTracker};

/// Number of exact-degree bins; degrees `0..=32` are counted individually.
pub const EXACT_BINS: usize = 33;

/// Number of power-of-two bins. Bin 0 counts degree 0 and bin `k` counts
/// degrees in `[2^(k-1), 2^k)`; the last bin also absorbs larger degrees.
pub const BINNED_BINS: usize = 41;

/// Vertices folded per rayon work item during reduction.
pub const REDUCTION_BLOCK: usize = 4096;

/// Binned bins whose degree range lies inside the exact histogram.
const CHECKED_BINS: usize = 6;

/// Returns the power-of-two bin holding `degree`.
#[must_use]
pub fn binned_bin(degree: u64) -> usize {
    let bits = (u64::BITS - degree.leading_zeros()) as usize;
    bits.min(BINNED_BINS - 1)
}

/// Partial or final degree statistics for a range of vertices.
///
/// Merging is elementwise sum for the histograms, max for the maximum degree,
/// and top-K insertion for the tracker, so any partition of the vertex range
/// merged in any order yields the same summary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DegreeSummary {
    exact: [u64; EXACT_BINS],
    binned: [u64; BINNED_BINS],
    max_degree: u64,
    top: TopKTracker,
}

impl DegreeSummary {
    /// Creates an empty summary whose tracker keeps `top_k` vertices.
    #[must_use]
    pub const fn new(top_k: usize) -> Self {
        Self {
            exact: [0; EXACT_BINS],
            binned: [0; BINNED_BINS],
            max_degree: 0,
            top: TopKTracker::new(top_k),
        }
    }

    /// Returns the exact-degree histogram.
    #[must_use]
    #[rustfmt::skip]
    pub const fn exact(&self) -> &[u64; EXACT_BINS] { &self.exact }

    /// Returns the power-of-two histogram.
    #[must_use]
    #[rustfmt::skip]
    pub const fn binned(&self) -> &[u64; BINNED_BINS] { &self.binned }

    /// Returns the maximum degree seen.
    #[must_use]
    #[rustfmt::skip]
    pub const fn max_degree(&self) -> u64 { self.max_degree }

    /// Returns the top-K tracker.
    #[must_use]
    #[rustfmt::skip]
    pub const fn top(&self) -> &TopKTracker { &self.top }

    /// Counts one vertex.
    pub fn record(&mut self, vertex: u64, degree: u64) {
        self.max_degree = self.max_degree.max(degree);
        if let Some(slot) = usize::try_from(degree)
            .ok()
            .and_then(|index| self.exact.get_mut(index))
        {
            *slot += 1;
        }
        if let Some(slot) = self.binned.get_mut(binned_bin(degree)) {
            *slot += 1;
        }
        self.top.insert(vertex, degree);
    }

    /// Combines two partial summaries.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        for (total, part) in self.exact.iter_mut().zip(other.exact) {
            *total += part;
        }
        for (total, part) in self.binned.iter_mut().zip(other.binned) {
            *total += part;
        }
        self.max_degree = self.max_degree.max(other.max_degree);
        self.top.merge(other.top);
        self
    }

    /// Checks that every binned bin fully covered by the exact histogram
    /// agrees with it.
    ///
    /// # Errors
    /// Returns [`ValidationError::InconsistentHistogram`] naming the first
    /// disagreeing bin.
    pub fn check_consistency(&self) -> Result<(), ValidationError> {
        for (bin, &binned) in self.binned.iter().enumerate().take(CHECKED_BINS) {
            let range = if bin == 0 {
                0..1
            } else {
                (1 << (bin - 1))..(1 << bin)
            };
            let exact = self.exact.get(range).map_or(0, |bins| bins.iter().sum());
            if binned != exact {
                return Err(ValidationError::InconsistentHistogram { bin, binned, exact });
            }
        }
        Ok(())
    }
}

/// Reduces a degree array in parallel: each rayon worker folds disjoint
/// blocks of [`REDUCTION_BLOCK`] vertices into an owned partial summary and the
/// partials are merged pairwise.
///
/// # Examples
/// ```
/// use krongen_core::summarize_degrees;
///
/// let summary = summarize_degrees(&[0, 1, 2, 2, 40], 2);
/// assert_eq!(summary.exact()[2], 2);
/// assert_eq!(summary.binned()[6], 1);
/// assert_eq!(summary.max_degree(), 40);
/// ```
#[must_use]
pub fn summarize_degrees(degrees: &[u64], top_k: usize) -> DegreeSummary {
    degrees
        .par_chunks(REDUCTION_BLOCK)
        .enumerate()
        .fold(
            || DegreeSummary::new(top_k),
            |mut partial, (block, chunk)| {
                let first = (block * REDUCTION_BLOCK) as u64;
                for (offset, &degree) in chunk.iter().enumerate() {
                    partial.record(first + offset as u64, degree);
                }
                partial
            },
        )
        .reduce(|| DegreeSummary::new(top_k), DegreeSummary::merge)
}
