//! Errors raised while verifying an edge list.

use std::{fmt, io};

use thiserror::Error;

use super::VerificationPhase;
use crate::{error::define_error_codes, format::FormatError};

/// Structural defect in an otherwise well-formed edge list.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ValidationError {
    /// An endpoint is not below the declared vertex count.
    #[error("edge {edge} ({src}, {dst}) references a vertex outside [0, {num_vertices})")]
    VertexOutOfRange {
        /// Zero-based position of the offending edge.
        edge: u64,
        /// Source vertex.
        src: u64,
        /// Destination vertex.
        dst: u64,
        /// Declared vertex count.
        num_vertices: u64,
    },
    /// The number of complete records differs from the declared count.
    #[error("read {read} edges but the header declares {declared}")]
    EdgeCountMismatch {
        /// Declared edge count.
        declared: u64,
        /// Records actually read.
        read: u64,
    },
    /// The input ended partway through a record.
    #[error("input ends with {trailing_bytes} bytes of a partial record after {edges_read} edges")]
    TruncatedRecord {
        /// Complete records read before the partial one.
        edges_read: u64,
        /// Length of the partial record.
        trailing_bytes: usize,
    },
    /// A binned histogram bin disagrees with the exact histogram.
    #[error("binned histogram bin {bin} holds {binned} vertices but the exact histogram sums to {exact}")]
    InconsistentHistogram {
        /// Offending bin.
        bin: usize,
        /// Count in the binned histogram.
        binned: u64,
        /// Sum of the matching exact bins.
        exact: u64,
    },
}

define_error_codes! {
    /// Stable codes describing [`ValidationError`] variants.
    enum ValidationErrorCode for ValidationError {
        /// Vertex id out of range.
        VertexOutOfRange => VertexOutOfRange { .. } => "VALIDATION_VERTEX_OUT_OF_RANGE",
        /// Edge count mismatch.
        EdgeCountMismatch => EdgeCountMismatch { .. } => "VALIDATION_EDGE_COUNT_MISMATCH",
        /// Trailing partial record.
        TruncatedRecord => TruncatedRecord { .. } => "VALIDATION_TRUNCATED_RECORD",
        /// Histograms disagree.
        InconsistentHistogram => InconsistentHistogram { .. } => "VALIDATION_INCONSISTENT_HISTOGRAM",
    }
}

/// Error raised by the verification engine. Every variant is fatal.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The header was missing, malformed, or unsupported.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// The edge list violated a structural invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Reading the input failed.
    #[error("failed to read edge list: {0}")]
    Io(#[from] io::Error),
    /// The degree array could not be allocated.
    #[error("failed to allocate degree counters for {num_vertices} vertices")]
    Allocation {
        /// Declared vertex count.
        num_vertices: u64,
    },
    /// A step was invoked out of order.
    #[error("verifier is in phase {actual}, expected {expected}")]
    UnexpectedPhase {
        /// Phase the step requires.
        expected: VerificationPhase,
        /// Phase the verifier was in.
        actual: VerificationPhase,
    },
}

define_error_codes! {
    /// Stable codes describing [`VerifyError`] variants.
    enum VerifyErrorCode for VerifyError {
        /// Header problem.
        Format => Format { .. } => "VERIFY_FORMAT",
        /// Structural problem.
        Validation => Validation { .. } => "VERIFY_VALIDATION",
        /// I/O failure.
        Io => Io { .. } => "VERIFY_IO",
        /// Allocation failure.
        Allocation => Allocation { .. } => "VERIFY_ALLOCATION",
        /// Step out of order.
        UnexpectedPhase => UnexpectedPhase { .. } => "VERIFY_UNEXPECTED_PHASE",
    }
}

impl VerifyError {
    /// Returns the most specific code available, as a string.
    #[must_use]
    pub const fn detailed_code(&self) -> &'static str {
        match self {
            Self::Format(error) => error.code().as_str(),
            Self::Validation(error) => error.code().as_str(),
            other => other.code().as_str(),
        }
    }
}
