//! In-memory graphs shared by the benchmarks.

use std::io;

use krongen_core::{
    ChunkProducer, DEFAULT_CHUNK_SIZE, Edge, EdgeFormat, EdgeGenerator, EdgeListHeader, EdgeSink,
    EdgeWriter, GraphParametersBuilder, Key,
};

use crate::error::BenchSetupError;

/// Sink that only counts edges, isolating generation cost from output cost.
#[derive(Clone, Copy, Debug, Default)]
pub struct CountingSink {
    edges: u64,
    checksum: u64,
}

impl CountingSink {
    /// Returns the number of edges received.
    #[must_use]
    pub const fn edges(&self) -> u64 {
        self.edges
    }

    /// Returns a running XOR of every endpoint, so the work is observable.
    #[must_use]
    pub const fn checksum(&self) -> u64 {
        self.checksum
    }
}

impl EdgeSink for CountingSink {
    fn write_chunk(&mut self, _first_index: u64, edges: &[Edge]) -> io::Result<()> {
        self.edges += edges.len() as u64;
        self.checksum = edges
            .iter()
            .fold(self.checksum, |acc, edge| acc ^ edge.src ^ edge.dst.rotate_left(32));
        Ok(())
    }
}

/// Builds the default-parameter generator for `scale` under the default key.
///
/// # Errors
/// Returns [`BenchSetupError::Config`] if `scale` is out of range.
pub fn generator(scale: u32) -> Result<EdgeGenerator, BenchSetupError> {
    let params = GraphParametersBuilder::new().with_scale(scale).build()?;
    Ok(EdgeGenerator::new(params, Key::default())?)
}

/// Renders the default-parameter graph for `scale` as an in-memory el64 file.
///
/// # Errors
/// Returns [`BenchSetupError`] if parameters are rejected or generation fails.
pub fn el64_graph(scale: u32) -> Result<Vec<u8>, BenchSetupError> {
    let generator = generator(scale)?;
    let params = generator.params();
    let header =
        EdgeListHeader::new(params.num_vertices(), params.num_edges()).with_key(&generator.key());
    let mut writer = EdgeWriter::new(Vec::new(), EdgeFormat::Binary, &header)?;
    ChunkProducer::new(&generator, DEFAULT_CHUNK_SIZE)?.produce(&mut writer)?;
    Ok(writer.into_inner())
}
