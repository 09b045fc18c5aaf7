//! Error types for graph configuration, seeding, and generation.
//!
//! Every public error enum carries a stable machine-readable code so callers
//! can surface failures in logs without matching on display strings.

use std::{fmt, io};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

pub(crate) use define_error_codes;

/// Invalid graph or producer configuration.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// `scale` was zero or above the supported maximum.
    #[error("scale must be in 1..={max} (got {scale})")]
    ScaleOutOfRange {
        /// Requested scale.
        scale: u32,
        /// Largest supported scale.
        max: u32,
    },
    /// `edgefactor` must be at least one.
    #[error("edgefactor must be at least 1")]
    ZeroEdgefactor,
    /// `edgefactor * 2^scale` does not fit the supported edge index range.
    #[error("edgefactor {edgefactor} at scale {scale} exceeds the supported edge count")]
    EdgeCountOverflow {
        /// Requested scale.
        scale: u32,
        /// Requested edgefactor.
        edgefactor: u64,
    },
    /// A quadrant probability was negative or not finite.
    #[error("probability `{name}` must be finite and non-negative (got {value})")]
    InvalidProbability {
        /// Name of the offending probability.
        name: &'static str,
        /// Value supplied by the caller.
        value: f64,
    },
    /// `A + 2B` exceeded one, leaving no mass for quadrant D.
    #[error("quadrant probabilities A={a} and B=C={b} sum to more than 1")]
    ProbabilitySum {
        /// Probability of quadrant A.
        a: f64,
        /// Probability of quadrants B and C.
        b: f64,
    },
    /// Noise factor outside `[0, 1)`.
    #[error("noise factor must lie in [0, 1) (got {value})")]
    InvalidNoiseFactor {
        /// Value supplied by the caller.
        value: f64,
    },
    /// Chunk producers need room for at least one edge.
    #[error("chunk size must be at least 1")]
    ZeroChunkSize,
    /// Requested more sampled roots than there are vertices.
    #[error("cannot sample {roots} roots from {num_vertices} vertices")]
    RootCountOutOfRange {
        /// Requested root count.
        roots: u64,
        /// Vertex population.
        num_vertices: u64,
    },
    /// The tree skeleton needs more edge indices than the graph has.
    #[error("tree skeleton needs {tree_edges} edges but the graph only has {num_edges}")]
    TreeExceedsEdges {
        /// Edges consumed by the skeleton.
        tree_edges: u64,
        /// Total edges requested.
        num_edges: u64,
    },
}

define_error_codes! {
    /// Stable codes describing [`ConfigError`] variants.
    enum ConfigErrorCode for ConfigError {
        /// `scale` was out of range.
        ScaleOutOfRange => ScaleOutOfRange { .. } => "CONFIG_SCALE_OUT_OF_RANGE",
        /// `edgefactor` was zero.
        ZeroEdgefactor => ZeroEdgefactor => "CONFIG_ZERO_EDGEFACTOR",
        /// The edge count overflowed.
        EdgeCountOverflow => EdgeCountOverflow { .. } => "CONFIG_EDGE_COUNT_OVERFLOW",
        /// A probability was negative or not finite.
        InvalidProbability => InvalidProbability { .. } => "CONFIG_INVALID_PROBABILITY",
        /// Probabilities summed to more than one.
        ProbabilitySum => ProbabilitySum { .. } => "CONFIG_PROBABILITY_SUM",
        /// Noise factor outside `[0, 1)`.
        InvalidNoiseFactor => InvalidNoiseFactor { .. } => "CONFIG_INVALID_NOISE_FACTOR",
        /// Chunk size was zero.
        ZeroChunkSize => ZeroChunkSize => "CONFIG_ZERO_CHUNK_SIZE",
        /// Root count exceeded the vertex count.
        RootCountOutOfRange => RootCountOutOfRange { .. } => "CONFIG_ROOT_COUNT_OUT_OF_RANGE",
        /// Tree skeleton larger than the edge budget.
        TreeExceedsEdges => TreeExceedsEdges { .. } => "CONFIG_TREE_EXCEEDS_EDGES",
    }
}

/// Failure while applying a `SEED0`..`SEED3` override.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SeedError {
    /// The variable was set but is not a decimal 32-bit unsigned integer.
    #[error("environment variable `{name}` must be a 32-bit unsigned integer (got `{value}`)")]
    Unparsable {
        /// Name of the environment variable.
        name: &'static str,
        /// Raw value found in the environment.
        value: String,
    },
    /// The variable was set to data that is not valid Unicode.
    #[error("environment variable `{name}` contained invalid UTF-8")]
    InvalidUnicode {
        /// Name of the environment variable.
        name: &'static str,
    },
}

define_error_codes! {
    /// Stable codes describing [`SeedError`] variants.
    enum SeedErrorCode for SeedError {
        /// Seed value was not a `u32`.
        Unparsable => Unparsable { .. } => "SEED_UNPARSABLE",
        /// Seed value was not Unicode.
        InvalidUnicode => InvalidUnicode { .. } => "SEED_INVALID_UNICODE",
    }
}

/// Failure inside a sampling primitive.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SamplingError {
    /// A weight draw mapped to zero.
    #[error("edge {index} drew a zero weight")]
    ZeroWeight {
        /// Edge index whose weight was drawn.
        index: u64,
    },
    /// A skeleton edge referenced a root position outside the sampled set.
    #[error("skeleton position {position} is outside the {roots} sampled roots")]
    SkeletonPosition {
        /// Position requested.
        position: u64,
        /// Number of sampled roots.
        roots: u64,
    },
}

define_error_codes! {
    /// Stable codes describing [`SamplingError`] variants.
    enum SamplingErrorCode for SamplingError {
        /// A weight draw mapped to zero.
        ZeroWeight => ZeroWeight { .. } => "SAMPLING_ZERO_WEIGHT",
        /// A skeleton position was out of range.
        SkeletonPosition => SkeletonPosition { .. } => "SAMPLING_SKELETON_POSITION",
    }
}

/// Error raised while streaming a generated graph.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The generator or producer configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A sampling primitive failed.
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    /// The chunk buffer could not be allocated.
    #[error("failed to allocate a chunk buffer for {capacity} edges")]
    Allocation {
        /// Requested capacity in edges.
        capacity: usize,
    },
    /// The edge sink failed to accept a chunk.
    #[error("failed to write edges: {0}")]
    Sink(#[from] io::Error),
}

define_error_codes! {
    /// Stable codes describing [`GenerateError`] variants.
    enum GenerateErrorCode for GenerateError {
        /// Configuration was rejected.
        Config => Config { .. } => "GENERATE_CONFIG",
        /// A sampling primitive failed.
        Sampling => Sampling { .. } => "GENERATE_SAMPLING",
        /// Chunk buffer allocation failed.
        Allocation => Allocation { .. } => "GENERATE_ALLOCATION",
        /// The sink failed.
        Sink => Sink { .. } => "GENERATE_SINK",
    }
}

impl GenerateError {
    /// Retrieve the inner [`ConfigErrorCode`] when configuration was rejected.
    #[must_use]
    pub const fn config_code(&self) -> Option<ConfigErrorCode> {
        match self {
            Self::Config(error) => Some(error.code()),
            _ => None,
        }
    }
}
