//! Benchmark setup error type.
//!
//! Aggregates the core errors that may arise while preparing benchmark inputs
//! so setup functions can propagate failures with `?`.

use krongen_core::{ConfigError, GenerateError, SamplingError, VerifyError};

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Graph parameters were rejected.
    #[error("invalid graph parameters: {0}")]
    Config(#[from] ConfigError),
    /// A sampling primitive failed.
    #[error("edge sampling failed: {0}")]
    Sampling(#[from] SamplingError),
    /// Edge generation failed.
    #[error("edge generation failed: {0}")]
    Generate(#[from] GenerateError),
    /// A prepared edge list failed verification.
    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),
    /// The el64 header could not be written.
    #[error("failed to write the edge list header: {0}")]
    Header(#[from] std::io::Error),
}
