//! Per-vertex degree counters.

use rayon::prelude::*;

use super::{
    error::{ValidationError, VerifyError},
    histogram::{DegreeSummary, summarize_degrees},
};
use crate::kronecker::Edge;

/// Smallest slice of edges worth a private partial array.
const MIN_WORKER_EDGES: usize = 1 << 12;

/// Out-degree counter for every vertex of one graph. Only the source endpoint
/// of each edge is counted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DegreeArray {
    degrees: Vec<u64>,
}

impl DegreeArray {
    /// Allocates zeroed counters for `num_vertices` vertices.
    ///
    /// # Errors
    /// Returns [`VerifyError::Allocation`] if the counters do not fit in
    /// memory.
    pub fn zeroed(num_vertices: u64) -> Result<Self, VerifyError> {
        let failed = || VerifyError::Allocation { num_vertices };
        let len = usize::try_from(num_vertices).map_err(|_| failed())?;
        let mut degrees = Vec::new();
        degrees.try_reserve_exact(len).map_err(|_| failed())?;
        degrees.resize(len, 0);
        Ok(Self { degrees })
    }

    /// Counts every edge of `edges` in parallel. The edges are split into at
    /// most one slice per rayon worker; each slice accumulates a private
    /// partial array and partials are merged by elementwise sum.
    ///
    /// # Errors
    /// Returns [`VerifyError::Allocation`] if counters cannot be allocated and
    /// [`ValidationError::VertexOutOfRange`] for the first offending edge
    /// found.
    ///
    /// # Examples
    /// ```
    /// use krongen_core::{DegreeArray, Edge};
    ///
    /// let edges = [Edge { src: 0, dst: 1, weight: 1 }, Edge { src: 0, dst: 2, weight: 1 }];
    /// let degrees = DegreeArray::from_edges(3, &edges).expect("in range");
    /// assert_eq!(degrees.as_slice(), &[2, 0, 0]);
    /// ```
    pub fn from_edges(num_vertices: u64, edges: &[Edge]) -> Result<Self, VerifyError> {
        let block = worker_block_len(edges.len(), rayon::current_num_threads());
        edges
            .par_chunks(block)
            .enumerate()
            .map(|(index, chunk)| {
                let mut partial = Self::zeroed(num_vertices)?;
                let first = (index * block) as u64;
                for (offset, edge) in chunk.iter().enumerate() {
                    partial.count(first + offset as u64, edge.src, edge.dst)?;
                }
                Ok::<Self, VerifyError>(partial)
            })
            .try_reduce_with(|left, right| Ok(left.merge(&right)))
            .unwrap_or_else(|| Self::zeroed(num_vertices))
    }

    /// Counts edge `edge` from `src` to `dst`.
    ///
    /// # Errors
    /// Returns [`ValidationError::VertexOutOfRange`] if either endpoint is not
    /// below the vertex count.
    pub fn count(&mut self, edge: u64, src: u64, dst: u64) -> Result<(), ValidationError> {
        let num_vertices = self.degrees.len() as u64;
        let out_of_range = ValidationError::VertexOutOfRange {
            edge,
            src,
            dst,
            num_vertices,
        };
        if dst >= num_vertices {
            return Err(out_of_range);
        }
        let slot = usize::try_from(src)
            .ok()
            .and_then(|index| self.degrees.get_mut(index))
            .ok_or(out_of_range)?;
        *slot += 1;
        Ok(())
    }

    fn merge(mut self, other: &Self) -> Self {
        for (total, part) in self.degrees.iter_mut().zip(&other.degrees) {
            *total += part;
        }
        self
    }

    /// Returns the vertex count.
    #[must_use]
    pub fn num_vertices(&self) -> u64 {
        self.degrees.len() as u64
    }

    /// Returns the counters indexed by vertex id.
    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.degrees
    }

    /// Returns the total number of counted edges.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.degrees.par_iter().sum()
    }

    /// Reduces the counters into histograms, maximum, and top-K.
    #[must_use]
    pub fn summarize(&self, top_k: usize) -> DegreeSummary {
        summarize_degrees(&self.degrees, top_k)
    }
}

/// Length of the edge slices handed to each worker so that at most `workers`
/// partial arrays exist at once.
fn worker_block_len(edges: usize, workers: usize) -> usize {
    edges.div_ceil(workers.max(1)).max(MIN_WORKER_EDGES)
}
