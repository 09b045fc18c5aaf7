//! Reproducible Kronecker (R-MAT) graph generation and degree verification.
//!
//! Every edge is a pure function of its index, the [`GraphParameters`], and a
//! [`Key`], so graphs can be generated in parallel, in chunks, or in pieces on
//! different machines and still be bit-identical. [`Verifier`] checks an el64
//! edge list against its header and reduces its degree distribution.
//!
//! # Examples
//! ```
//! use krongen_core::{
//!     ChunkProducer, EdgeFormat, EdgeGenerator, EdgeListHeader, EdgeWriter,
//!     GraphParametersBuilder, Key, Verifier,
//! };
//!
//! let params = GraphParametersBuilder::new().with_scale(8).build().expect("valid");
//! let key = Key::default();
//! let generator = EdgeGenerator::new(params, key).expect("generator");
//!
//! let header = EdgeListHeader::new(params.num_vertices(), params.num_edges()).with_key(&key);
//! let mut writer = EdgeWriter::new(Vec::new(), EdgeFormat::Binary, &header).expect("in memory");
//! ChunkProducer::new(&generator, 1_000)
//!     .expect("non-zero chunk")
//!     .produce(&mut writer)
//!     .expect("in-memory sink");
//!
//! let bytes = writer.into_inner();
//! let report = Verifier::new(bytes.as_slice()).run().expect("generated graphs verify");
//! assert_eq!(report.num_edges(), params.num_edges());
//! ```

mod chunk;
mod error;
mod format;
mod kronecker;
mod params;
mod prng;
mod sampling;
#[cfg(test)]
mod test_utils;
mod verify;

pub use crate::{
    chunk::{ChunkProducer, DEFAULT_CHUNK_SIZE, EdgeChunk, EdgeSink, ProductionSummary},
    error::{
        ConfigError, ConfigErrorCode, GenerateError, GenerateErrorCode, SamplingError,
        SamplingErrorCode, SeedError, SeedErrorCode,
    },
    format::{
        CSV_HEADER, EL64_FORMAT, EL64_RECORD_LEN, EdgeFormat, EdgeListHeader, EdgeWriter,
        FormatError, FormatErrorCode, MAX_HEADER_LEN, UnknownEdgeFormat,
    },
    kronecker::{Edge, EdgeGenerator, generate_edge},
    params::{
        DEFAULT_A, DEFAULT_B, DEFAULT_EDGEFACTOR, DEFAULT_NOISE_FACTOR, DEFAULT_SCALE,
        GraphParameters, GraphParametersBuilder, MAX_EDGES, MAX_SCALE, Quadrant,
        QuadrantProbabilities, TreeMode,
    },
    prng::{DEFAULT_KEY_WORDS, Key, SEED_ENV_VARS, draw, uniform_closed_open_f64, uniform_open_open_f32},
    sampling::{MAX_WEIGHT, ROOT_SAMPLE_STREAM, Scrambler, sample_roots, scramble, weight},
    verify::{
        BINNED_BINS, DEFAULT_TOP_K, DegreeArray, DegreeEntry, DegreeReport, DegreeSummary,
        EXACT_BINS, REDUCTION_BLOCK, SCAN_BLOCK_RECORDS, TopKTracker, ValidationError,
        ValidationErrorCode, VerificationPhase, Verifier, VerifyError, VerifyErrorCode, binned_bin,
        summarize_degrees,
    },
};
