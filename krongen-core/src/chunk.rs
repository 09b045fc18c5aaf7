//! Chunked streaming of generated edges.
//!
//! The producer walks the edge index space in contiguous chunks, fills one
//! reusable buffer per chunk in parallel, and hands each chunk to an
//! [`EdgeSink`] strictly in index order. Peak memory is bounded by the chunk
//! size regardless of the total edge count.

use std::{io, ops::Range};

use rayon::prelude::*;
use tracing::{Span, debug, field, info, instrument};

use crate::{
    error::{ConfigError, GenerateError},
    kronecker::{Edge, EdgeGenerator},
};

/// Default number of edges materialized per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Consumer of generated chunks.
pub trait EdgeSink {
    /// Accepts the edges of one chunk; `first_index` is the index of
    /// `edges[0]`. Chunks arrive in increasing index order without gaps.
    ///
    /// # Errors
    /// Returns an I/O error if the chunk cannot be stored; production stops.
    fn write_chunk(&mut self, first_index: u64, edges: &[Edge]) -> io::Result<()>;

    /// Called once after the last chunk.
    ///
    /// # Errors
    /// Returns an I/O error if buffered output cannot be flushed.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl EdgeSink for Vec<Edge> {
    fn write_chunk(&mut self, _first_index: u64, edges: &[Edge]) -> io::Result<()> {
        self.extend_from_slice(edges);
        Ok(())
    }
}

/// Totals reported once production finishes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProductionSummary {
    edges: u64,
    chunks: u64,
}

impl ProductionSummary {
    /// Returns the number of edges handed to the sink.
    #[must_use]
    #[rustfmt::skip]
    pub const fn edges(&self) -> u64 { self.edges }

    /// Returns the number of chunks handed to the sink.
    #[must_use]
    #[rustfmt::skip]
    pub const fn chunks(&self) -> u64 { self.chunks }
}

/// Reusable fixed-capacity buffer holding one chunk.
#[derive(Debug)]
pub struct EdgeChunk {
    edges: Vec<Edge>,
}

impl EdgeChunk {
    /// Allocates room for `capacity` edges up front.
    ///
    /// # Errors
    /// Returns [`GenerateError::Allocation`] if the allocation fails.
    pub fn with_capacity(capacity: usize) -> Result<Self, GenerateError> {
        let mut edges = Vec::new();
        edges
            .try_reserve_exact(capacity)
            .map_err(|_| GenerateError::Allocation { capacity })?;
        Ok(Self { edges })
    }

    /// Returns the number of edges the buffer holds without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.edges.capacity()
    }

    /// Returns the edges of the most recent fill.
    #[must_use]
    pub fn as_slice(&self) -> &[Edge] {
        &self.edges
    }

    /// Regenerates the buffer contents for `range`, in parallel.
    ///
    /// # Errors
    /// Returns [`GenerateError::Allocation`] if `range` exceeds the capacity,
    /// or the first sampling failure.
    pub fn fill(&mut self, generator: &EdgeGenerator, range: Range<u64>) -> Result<(), GenerateError> {
        let len = usize::try_from(range.end - range.start)
            .ok()
            .filter(|&len| len <= self.edges.capacity())
            .ok_or(GenerateError::Allocation {
                capacity: self.edges.capacity(),
            })?;
        self.edges.clear();
        self.edges.resize(len, Edge::default());
        let first = range.start;
        self.edges
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(offset, slot)| {
                *slot = generator.edge(first + offset as u64)?;
                Ok::<(), GenerateError>(())
            })
    }
}

/// Drives an [`EdgeGenerator`] over the full index range in bounded chunks.
///
/// # Examples
/// ```
/// use krongen_core::{ChunkProducer, Edge, EdgeGenerator, GraphParametersBuilder, Key};
///
/// let params = GraphParametersBuilder::new().with_scale(6).build().expect("valid");
/// let generator = EdgeGenerator::new(params, Key::default()).expect("generator");
/// let producer = ChunkProducer::new(&generator, 100).expect("non-zero chunk");
/// assert_eq!(producer.chunk_count(), 11);
///
/// let mut edges: Vec<Edge> = Vec::new();
/// let summary = producer.produce(&mut edges).expect("in-memory sink");
/// assert_eq!(summary.edges(), 1024);
/// assert_eq!(edges, generator.edges(0..1024).expect("edges"));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ChunkProducer<'g> {
    generator: &'g EdgeGenerator,
    chunk_size: u64,
}

impl<'g> ChunkProducer<'g> {
    /// Creates a producer emitting at most `chunk_size` edges per chunk.
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroChunkSize`] when `chunk_size` is zero.
    pub fn new(generator: &'g EdgeGenerator, chunk_size: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(Self {
            generator,
            chunk_size: chunk_size as u64,
        })
    }

    /// Returns `ceil(num_edges / chunk_size)`.
    #[must_use]
    pub const fn chunk_count(&self) -> u64 {
        self.generator.num_edges().div_ceil(self.chunk_size)
    }

    /// Returns the index range `[k * C, min((k + 1) * C, NE))` of chunk `chunk`.
    /// Chunks past the end are empty.
    #[must_use]
    pub fn chunk_range(&self, chunk: u64) -> Range<u64> {
        let total = self.generator.num_edges();
        let start = chunk.saturating_mul(self.chunk_size).min(total);
        let end = start.saturating_add(self.chunk_size).min(total);
        start..end
    }

    /// Generates every chunk in order and hands it to `sink`, then calls
    /// [`EdgeSink::finish`].
    ///
    /// # Errors
    /// Returns [`GenerateError::Allocation`] if the chunk buffer cannot be
    /// allocated, [`GenerateError::Sampling`] if generation fails, and
    /// [`GenerateError::Sink`] if the sink rejects a chunk.
    #[instrument(
        name = "generate.produce",
        err,
        skip(self, sink),
        fields(
            num_edges = self.generator.num_edges(),
            chunk_size = self.chunk_size,
            chunks = field::Empty,
        ),
    )]
    pub fn produce<S>(&self, sink: &mut S) -> Result<ProductionSummary, GenerateError>
    where
        S: EdgeSink + ?Sized,
    {
        let chunks = self.chunk_count();
        Span::current().record("chunks", chunks);

        let capacity = self.chunk_size.min(self.generator.num_edges());
        let capacity = usize::try_from(capacity).map_err(|_| GenerateError::Allocation {
            capacity: usize::MAX,
        })?;
        let mut buffer = EdgeChunk::with_capacity(capacity)?;

        let mut summary = ProductionSummary::default();
        for chunk in 0..chunks {
            let range = self.chunk_range(chunk);
            buffer.fill(self.generator, range.clone())?;
            sink.write_chunk(range.start, buffer.as_slice())?;
            summary.edges += range.end - range.start;
            summary.chunks += 1;
            debug!(chunk, start = range.start, end = range.end, "chunk written");
        }
        sink.finish()?;

        info!(edges = summary.edges, chunks = summary.chunks, "generation complete");
        Ok(summary)
    }
}
