//! Recursive Kronecker (R-MAT) edge sampling.
//!
//! Every edge is a pure function of `(index, params, key)`. Generating index
//! `i` never touches state from any other index, so chunked and parallel
//! generation produce the same graph.

use std::ops::Range;

use rayon::prelude::*;

use crate::{
    error::{ConfigError, SamplingError},
    params::{GraphParameters, TreeMode},
    prng::{Key, uniform_closed_open_f64, uniform_open_open_f32},
    sampling::{ROOT_SAMPLE_STREAM, Scrambler, TREE_PARENT_COUNTER, sample_roots, weight},
};

/// A generated edge. Endpoints lie in `[0, 2^scale)`; the weight in `[1, 255]`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Edge {
    /// Source vertex.
    pub src: u64,
    /// Destination vertex.
    pub dst: u64,
    /// Edge weight.
    pub weight: u8,
}

/// Places edge `index` with the recursive quadrant sampler.
///
/// Level `l` reads its quadrant and noise draws from counter `(index, 1 + l / 2)`:
/// even levels use words 0 and 1, odd levels words 2 and 3. Level 0 decides
/// the most significant bit of each endpoint. Both endpoints are scrambled.
///
/// # Errors
/// Returns [`SamplingError`] if the weight draw fails.
///
/// # Examples
/// ```
/// use krongen_core::{GraphParametersBuilder, Key, generate_edge};
///
/// let params = GraphParametersBuilder::new().with_scale(8).build().expect("valid");
/// let key = Key::default();
/// let edge = generate_edge(42, &params, &key).expect("edge");
/// assert_eq!(edge, generate_edge(42, &params, &key).expect("edge"));
/// assert!(edge.src < 256 && edge.dst < 256);
/// ```
pub fn generate_edge(index: u64, params: &GraphParameters, key: &Key) -> Result<Edge, SamplingError> {
    recursive_edge(index, params, key, &Scrambler::new(params.scale()))
}

fn recursive_edge(
    index: u64,
    params: &GraphParameters,
    key: &Key,
    scrambler: &Scrambler,
) -> Result<Edge, SamplingError> {
    let (src, dst) = kronecker_endpoints(index, params, key);
    Ok(Edge {
        src: scrambler.scramble(src),
        dst: scrambler.scramble(dst),
        weight: weight(key, index)?,
    })
}

/// Unscrambled endpoints built from `scale` quadrant choices.
fn kronecker_endpoints(index: u64, params: &GraphParameters, key: &Key) -> (u64, u64) {
    let base = params.probabilities();
    let noise_factor = params.noise_factor();
    let mut src = 0_u64;
    let mut dst = 0_u64;
    let mut block = [0_u32; 4];

    for level in 0..params.scale() {
        if level % 2 == 0 {
            block = key.draw(index, 1 + u64::from(level / 2));
        }
        let [w0, w1, w2, w3] = block;
        let (quadrant_word, noise_word) = if level % 2 == 0 { (w0, w1) } else { (w2, w3) };
        let quadrant = base
            .perturbed(noise_factor, uniform_open_open_f32(noise_word))
            .select(uniform_open_open_f32(quadrant_word));
        src = (src << 1) | quadrant.src_bit();
        dst = (dst << 1) | quadrant.dst_bit();
    }
    (src, dst)
}

/// Vertex sequence the tree skeleton connects.
#[derive(Clone, Debug, PartialEq)]
enum Skeleton {
    Absent,
    Spanning { vertices: u64 },
    Roots(Vec<u64>),
}

impl Skeleton {
    fn resolve(params: &GraphParameters, key: &Key) -> Result<Self, ConfigError> {
        Ok(match params.tree() {
            TreeMode::Off => Self::Absent,
            TreeMode::Spanning => Self::Spanning {
                vertices: params.num_vertices(),
            },
            TreeMode::Roots(count) => Self::Roots(sample_roots(
                key,
                ROOT_SAMPLE_STREAM,
                count,
                params.num_vertices(),
            )?),
        })
    }

    fn root_count(&self) -> u64 {
        match self {
            Self::Absent => 0,
            Self::Spanning { vertices } => *vertices,
            Self::Roots(roots) => roots.len() as u64,
        }
    }

    fn edge_count(&self) -> u64 {
        self.root_count().saturating_sub(1)
    }

    fn vertex(&self, position: u64) -> Result<u64, SamplingError> {
        let missing = || SamplingError::SkeletonPosition {
            position,
            roots: self.root_count(),
        };
        match self {
            Self::Spanning { vertices } if position < *vertices => Ok(position),
            Self::Roots(roots) => usize::try_from(position)
                .ok()
                .and_then(|slot| roots.get(slot).copied())
                .ok_or_else(missing),
            _ => Err(missing()),
        }
    }
}

/// Edge source for one graph: the recursive sampler plus the optional tree
/// skeleton.
///
/// With a skeleton of `n` roots, indices `k < n - 1` join root `k + 1` to a
/// root chosen uniformly from `0..=k`, drawn from counter
/// `(k, TREE_PARENT_COUNTER)`. Those edges form a random recursive tree, so the
/// roots are always connected; every other index uses the recursive sampler.
///
/// # Examples
/// ```
/// use krongen_core::{EdgeGenerator, GraphParametersBuilder, Key, TreeMode};
///
/// let params = GraphParametersBuilder::new()
///     .with_scale(6)
///     .with_tree(TreeMode::Spanning)
///     .build()
///     .expect("valid");
/// let generator = EdgeGenerator::new(params, Key::default()).expect("generator");
/// assert_eq!(generator.skeleton_edges(), 63);
/// let edges = generator.edges(0..10).expect("edges");
/// assert_eq!(edges.len(), 10);
/// ```
#[derive(Clone, Debug)]
pub struct EdgeGenerator {
    params: GraphParameters,
    key: Key,
    scrambler: Scrambler,
    skeleton: Skeleton,
}

impl EdgeGenerator {
    /// Prepares a generator, sampling skeleton roots when tree mode asks for
    /// them.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if root sampling is out of range.
    pub fn new(params: GraphParameters, key: Key) -> Result<Self, ConfigError> {
        let skeleton = Skeleton::resolve(&params, &key)?;
        let tree_edges = skeleton.edge_count();
        if tree_edges > params.num_edges() {
            return Err(ConfigError::TreeExceedsEdges {
                tree_edges,
                num_edges: params.num_edges(),
            });
        }
        Ok(Self {
            scrambler: Scrambler::new(params.scale()),
            params,
            key,
            skeleton,
        })
    }

    /// Replaces the vertex permutation, e.g. with [`Scrambler::keyed`].
    #[must_use]
    pub const fn with_scrambler(mut self, scrambler: Scrambler) -> Self {
        self.scrambler = scrambler;
        self
    }

    /// Returns the graph parameters.
    #[must_use]
    #[rustfmt::skip]
    pub const fn params(&self) -> &GraphParameters { &self.params }

    /// Returns the generator key.
    #[must_use]
    #[rustfmt::skip]
    pub const fn key(&self) -> Key { self.key }

    /// Returns the total number of edges.
    #[must_use]
    pub const fn num_edges(&self) -> u64 {
        self.params.num_edges()
    }

    /// Number of leading indices reserved for skeleton edges.
    #[must_use]
    pub fn skeleton_edges(&self) -> u64 {
        self.skeleton.edge_count()
    }

    /// Generates edge `index`.
    ///
    /// # Errors
    /// Returns [`SamplingError`] if a sampling primitive fails.
    pub fn edge(&self, index: u64) -> Result<Edge, SamplingError> {
        if index < self.skeleton.edge_count() {
            self.skeleton_edge(index)
        } else {
            recursive_edge(index, &self.params, &self.key, &self.scrambler)
        }
    }

    /// Generates a contiguous index range in one shot, in parallel.
    ///
    /// # Errors
    /// Returns the first [`SamplingError`] encountered.
    pub fn edges(&self, range: Range<u64>) -> Result<Vec<Edge>, SamplingError> {
        range.into_par_iter().map(|index| self.edge(index)).collect()
    }

    fn skeleton_edge(&self, index: u64) -> Result<Edge, SamplingError> {
        let [low, high, ..] = self.key.draw(index, TREE_PARENT_COUNTER);
        let slot = parent_slot(index, uniform_closed_open_f64(low, high));
        let child = self.skeleton.vertex(index + 1)?;
        let parent = self.skeleton.vertex(slot)?;
        Ok(Edge {
            src: self.scrambler.scramble(child),
            dst: self.scrambler.scramble(parent),
            weight: weight(&self.key, index)?,
        })
    }
}

/// Picks the parent of tree node `index + 1` among nodes `0..=index` as
/// `floor(u * (index + 1))` for `u` in `[0, 1)`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    reason = "u has 53 significant bits and the product stays below index + 1"
)]
fn parent_slot(index: u64, u: f64) -> u64 {
    ((u * (index + 1) as f64) as u64).min(index)
}
