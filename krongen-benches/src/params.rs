//! Benchmark parameter types.

use std::fmt;

/// Parameters for a chunked generation benchmark run.
#[derive(Clone, Copy, Debug)]
pub struct GenerationBenchParams {
    /// Base-2 logarithm of the vertex count.
    pub scale: u32,
    /// Edges materialised per chunk.
    pub chunk_size: usize,
}

impl fmt::Display for GenerationBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scale={},chunk={}", self.scale, self.chunk_size)
    }
}

/// Parameters for a verification or reduction benchmark run.
#[derive(Clone, Copy, Debug)]
pub struct VerificationBenchParams {
    /// Base-2 logarithm of the vertex count.
    pub scale: u32,
}

impl fmt::Display for VerificationBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scale={}", self.scale)
    }
}
