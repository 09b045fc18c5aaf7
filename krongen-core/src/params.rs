//! Graph parameters and their validating builder.
//!
//! Quadrant probabilities follow the symmetric R-MAT convention: callers pick
//! `A` and `B`, `C` mirrors `B`, and `D` takes the remaining mass.

use crate::error::ConfigError;

/// Largest supported `scale`.
pub const MAX_SCALE: u32 = 48;

/// Largest supported edge count; higher counters are reserved for side streams.
pub const MAX_EDGES: u64 = 1 << 62;

/// Default `scale`.
pub const DEFAULT_SCALE: u32 = 16;
/// Default edges per vertex.
pub const DEFAULT_EDGEFACTOR: u64 = 16;
/// Default probability of quadrant A.
pub const DEFAULT_A: f64 = 0.57;
/// Default probability of quadrants B and C.
pub const DEFAULT_B: f64 = 0.19;
/// Default noise factor.
pub const DEFAULT_NOISE_FACTOR: f64 = 0.1;

const SUM_TOLERANCE: f64 = 1e-9;

/// One of the four sub-matrices chosen at each recursion level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Quadrant {
    /// Top-left: neither endpoint gains a set bit.
    A,
    /// Top-right: the source gains a set bit.
    B,
    /// Bottom-left: the destination gains a set bit.
    C,
    /// Bottom-right: both endpoints gain a set bit.
    D,
}

impl Quadrant {
    /// Bit appended to the source id.
    #[must_use]
    pub const fn src_bit(self) -> u64 {
        match self {
            Self::B | Self::D => 1,
            Self::A | Self::C => 0,
        }
    }

    /// Bit appended to the destination id.
    #[must_use]
    pub const fn dst_bit(self) -> u64 {
        match self {
            Self::C | Self::D => 1,
            Self::A | Self::B => 0,
        }
    }
}

/// Probabilities of the four quadrants; always a valid simplex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadrantProbabilities {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl QuadrantProbabilities {
    /// Returns `[A, B, C, D]`.
    #[must_use]
    #[rustfmt::skip]
    pub const fn as_array(&self) -> [f64; 4] { [self.a, self.b, self.c, self.d] }

    /// Applies one level of noisy-SKG perturbation.
    ///
    /// `draw` in `(0, 1)` maps to `mu = noise_factor * (2 * draw - 1) *
    /// min(B, (A + D) / 2)`; B and C gain `mu` while A and D give it up in
    /// proportion to their share of `A + D`. Negative results are clamped to
    /// zero and the vector is renormalized.
    #[must_use]
    pub fn perturbed(self, noise_factor: f64, draw: f32) -> Self {
        let diagonal = self.a + self.d;
        if noise_factor <= 0.0 || diagonal <= 0.0 {
            return self;
        }
        let bound = self.b.min(diagonal / 2.0);
        let mu = noise_factor * (2.0 * f64::from(draw) - 1.0) * bound;
        Self {
            a: self.a - 2.0 * mu * self.a / diagonal,
            b: self.b + mu,
            c: self.c + mu,
            d: self.d - 2.0 * mu * self.d / diagonal,
        }
        .normalized()
    }

    fn normalized(self) -> Self {
        let [a, b, c, d] = self.as_array().map(|p| p.max(0.0));
        let total = a + b + c + d;
        if total <= 0.0 {
            return self;
        }
        Self {
            a: a / total,
            b: b / total,
            c: c / total,
            d: d / total,
        }
    }

    /// Picks the first quadrant, in order A, B, C, D, whose cumulative
    /// probability exceeds `draw`.
    #[must_use]
    pub fn select(&self, draw: f32) -> Quadrant {
        let point = f64::from(draw);
        let mut cumulative = self.a;
        if point < cumulative {
            return Quadrant::A;
        }
        cumulative += self.b;
        if point < cumulative {
            return Quadrant::B;
        }
        cumulative += self.c;
        if point < cumulative {
            return Quadrant::C;
        }
        Quadrant::D
    }
}

/// Tree-skeleton configuration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TreeMode {
    /// Every edge comes from the recursive sampler.
    #[default]
    Off,
    /// The first `num_vertices - 1` edges form a random spanning tree.
    Spanning,
    /// The first `n - 1` edges form a random tree over `n` sampled roots.
    Roots(u64),
}

/// Validated parameters describing one generated graph.
///
/// # Examples
/// ```
/// use krongen_core::GraphParametersBuilder;
///
/// let params = GraphParametersBuilder::new()
///     .with_scale(10)
///     .with_edgefactor(8)
///     .build()
///     .expect("valid parameters");
/// assert_eq!(params.num_vertices(), 1024);
/// assert_eq!(params.num_edges(), 8 * 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphParameters {
    scale: u32,
    edgefactor: u64,
    num_edges: u64,
    probabilities: QuadrantProbabilities,
    noise_factor: f64,
    tree: TreeMode,
}

impl GraphParameters {
    /// Returns the scale; the graph has `2^scale` vertices.
    #[must_use]
    #[rustfmt::skip]
    pub const fn scale(&self) -> u32 { self.scale }

    /// Returns the number of edges per vertex.
    #[must_use]
    #[rustfmt::skip]
    pub const fn edgefactor(&self) -> u64 { self.edgefactor }

    /// Returns `2^scale`.
    #[must_use]
    #[rustfmt::skip]
    pub const fn num_vertices(&self) -> u64 { 1 << self.scale }

    /// Returns `edgefactor * 2^scale`.
    #[must_use]
    #[rustfmt::skip]
    pub const fn num_edges(&self) -> u64 { self.num_edges }

    /// Returns the unperturbed quadrant probabilities.
    #[must_use]
    #[rustfmt::skip]
    pub const fn probabilities(&self) -> QuadrantProbabilities { self.probabilities }

    /// Returns the per-level noise factor.
    #[must_use]
    #[rustfmt::skip]
    pub const fn noise_factor(&self) -> f64 { self.noise_factor }

    /// Returns the tree-skeleton configuration.
    #[must_use]
    #[rustfmt::skip]
    pub const fn tree(&self) -> TreeMode { self.tree }
}

/// Configures and validates [`GraphParameters`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphParametersBuilder {
    scale: u32,
    edgefactor: u64,
    a: f64,
    b: f64,
    noise_factor: f64,
    tree: TreeMode,
}

impl Default for GraphParametersBuilder {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            edgefactor: DEFAULT_EDGEFACTOR,
            a: DEFAULT_A,
            b: DEFAULT_B,
            noise_factor: DEFAULT_NOISE_FACTOR,
            tree: TreeMode::Off,
        }
    }
}

impl GraphParametersBuilder {
    /// Creates a builder populated with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    /// Overrides the edgefactor.
    #[must_use]
    pub const fn with_edgefactor(mut self, edgefactor: u64) -> Self {
        self.edgefactor = edgefactor;
        self
    }

    /// Overrides quadrant probabilities A and B (C = B, D = 1 - A - 2B).
    #[must_use]
    pub const fn with_probabilities(mut self, a: f64, b: f64) -> Self {
        self.a = a;
        self.b = b;
        self
    }

    /// Overrides the per-level noise factor.
    #[must_use]
    pub const fn with_noise_factor(mut self, noise_factor: f64) -> Self {
        self.noise_factor = noise_factor;
        self
    }

    /// Overrides the tree-skeleton configuration.
    #[must_use]
    pub const fn with_tree(mut self, tree: TreeMode) -> Self {
        self.tree = tree;
        self
    }

    /// Validates the configuration and constructs [`GraphParameters`].
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the scale, edgefactor, probabilities,
    /// noise factor, or tree configuration are out of range.
    pub fn build(self) -> Result<GraphParameters, ConfigError> {
        if !(1..=MAX_SCALE).contains(&self.scale) {
            return Err(ConfigError::ScaleOutOfRange {
                scale: self.scale,
                max: MAX_SCALE,
            });
        }
        if self.edgefactor == 0 {
            return Err(ConfigError::ZeroEdgefactor);
        }
        let num_edges = self
            .edgefactor
            .checked_mul(1 << self.scale)
            .filter(|&edges| edges <= MAX_EDGES)
            .ok_or(ConfigError::EdgeCountOverflow {
                scale: self.scale,
                edgefactor: self.edgefactor,
            })?;

        let probabilities = self.quadrant_probabilities()?;
        if !self.noise_factor.is_finite() || !(0.0..1.0).contains(&self.noise_factor) {
            return Err(ConfigError::InvalidNoiseFactor {
                value: self.noise_factor,
            });
        }
        validate_tree(self.tree, 1 << self.scale, num_edges)?;

        Ok(GraphParameters {
            scale: self.scale,
            edgefactor: self.edgefactor,
            num_edges,
            probabilities,
            noise_factor: self.noise_factor,
            tree: self.tree,
        })
    }

    fn quadrant_probabilities(&self) -> Result<QuadrantProbabilities, ConfigError> {
        for (name, value) in [("A", self.a), ("B", self.b)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        let d = 1.0 - self.a - 2.0 * self.b;
        if d < -SUM_TOLERANCE {
            return Err(ConfigError::ProbabilitySum {
                a: self.a,
                b: self.b,
            });
        }
        Ok(QuadrantProbabilities {
            a: self.a,
            b: self.b,
            c: self.b,
            d: d.max(0.0),
        }
        .normalized())
    }
}

fn validate_tree(tree: TreeMode, num_vertices: u64, num_edges: u64) -> Result<(), ConfigError> {
    let roots = match tree {
        TreeMode::Off => return Ok(()),
        TreeMode::Spanning => num_vertices,
        TreeMode::Roots(roots) => {
            if roots == 0 || roots > num_vertices {
                return Err(ConfigError::RootCountOutOfRange {
                    roots,
                    num_vertices,
                });
            }
            roots
        }
    };
    let tree_edges = roots - 1;
    if tree_edges > num_edges {
        return Err(ConfigError::TreeExceedsEdges {
            tree_edges,
            num_edges,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use rstest::rstest;

    use crate::test_utils::suite_proptest_config;

    fn sum(probabilities: QuadrantProbabilities) -> f64 {
        probabilities.as_array().iter().sum()
    }

    #[test]
    fn defaults_match_the_reference_benchmark() {
        let params = GraphParametersBuilder::new().build().expect("defaults valid");
        assert_eq!(params.scale(), DEFAULT_SCALE);
        assert_eq!(params.num_vertices(), 1 << 16);
        assert_eq!(params.num_edges(), 16 << 16);
        let [a, b, c, d] = params.probabilities().as_array();
        assert!((a - 0.57).abs() < 1e-12);
        assert!((b - 0.19).abs() < 1e-12);
        assert!((c - 0.19).abs() < 1e-12);
        assert!((d - 0.05).abs() < 1e-12);
    }

    #[rstest]
    #[case::zero_scale(
        GraphParametersBuilder::new().with_scale(0),
        ConfigError::ScaleOutOfRange { scale: 0, max: MAX_SCALE },
    )]
    #[case::huge_scale(
        GraphParametersBuilder::new().with_scale(MAX_SCALE + 1),
        ConfigError::ScaleOutOfRange { scale: MAX_SCALE + 1, max: MAX_SCALE },
    )]
    #[case::zero_edgefactor(
        GraphParametersBuilder::new().with_edgefactor(0),
        ConfigError::ZeroEdgefactor,
    )]
    #[case::edge_overflow(
        GraphParametersBuilder::new().with_scale(MAX_SCALE).with_edgefactor(1 << 20),
        ConfigError::EdgeCountOverflow { scale: MAX_SCALE, edgefactor: 1 << 20 },
    )]
    #[case::negative_a(
        GraphParametersBuilder::new().with_probabilities(-0.1, 0.2),
        ConfigError::InvalidProbability { name: "A", value: -0.1 },
    )]
    #[case::excess_mass(
        GraphParametersBuilder::new().with_probabilities(0.6, 0.3),
        ConfigError::ProbabilitySum { a: 0.6, b: 0.3 },
    )]
    #[case::noise_one(
        GraphParametersBuilder::new().with_noise_factor(1.0),
        ConfigError::InvalidNoiseFactor { value: 1.0 },
    )]
    #[case::zero_roots(
        GraphParametersBuilder::new().with_scale(4).with_tree(TreeMode::Roots(0)),
        ConfigError::RootCountOutOfRange { roots: 0, num_vertices: 16 },
    )]
    #[case::too_many_roots(
        GraphParametersBuilder::new().with_scale(4).with_tree(TreeMode::Roots(17)),
        ConfigError::RootCountOutOfRange { roots: 17, num_vertices: 16 },
    )]
    fn build_rejects_invalid_configuration(
        #[case] builder: GraphParametersBuilder,
        #[case] expected: ConfigError,
    ) {
        let err = builder.build().expect_err("configuration must be rejected");
        assert_eq!(err, expected);
    }

    #[test]
    fn spanning_tree_must_fit_in_the_edge_budget() {
        // With edgefactor 1 there are exactly as many edges as vertices.
        let params = GraphParametersBuilder::new()
            .with_scale(3)
            .with_edgefactor(1)
            .with_tree(TreeMode::Spanning)
            .build()
            .expect("7 tree edges fit in 8");
        assert_eq!(params.tree(), TreeMode::Spanning);
    }

    #[test]
    fn select_uses_cumulative_order() {
        let probabilities = GraphParametersBuilder::new()
            .with_probabilities(0.5, 0.2)
            .build()
            .expect("valid")
            .probabilities();
        assert_eq!(probabilities.select(0.1), Quadrant::A);
        assert_eq!(probabilities.select(0.55), Quadrant::B);
        assert_eq!(probabilities.select(0.8), Quadrant::C);
        assert_eq!(probabilities.select(0.95), Quadrant::D);
    }

    #[test]
    fn quadrant_bits_follow_the_matrix_layout() {
        let bits: Vec<(u64, u64)> = [Quadrant::A, Quadrant::B, Quadrant::C, Quadrant::D]
            .into_iter()
            .map(|q| (q.src_bit(), q.dst_bit()))
            .collect();
        assert_eq!(bits, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn zero_noise_leaves_probabilities_untouched() {
        let base = GraphParametersBuilder::new().build().expect("valid").probabilities();
        assert_eq!(base.perturbed(0.0, 0.9), base);
    }

    proptest! {
        #![proptest_config(suite_proptest_config(128))]

        #[test]
        fn perturbation_keeps_a_valid_simplex(
            a in 0.0_f64..=1.0,
            b_share in 0.0_f64..=1.0,
            noise in 0.0_f64..1.0,
            draw in 0.0_f32..1.0,
        ) {
            let b = (1.0 - a) / 2.0 * b_share;
            let base = GraphParametersBuilder::new()
                .with_probabilities(a, b)
                .with_noise_factor(noise)
                .build()
                .expect("generated parameters are valid")
                .probabilities();
            let perturbed = base.perturbed(noise, draw);
            prop_assert!(perturbed.as_array().iter().all(|&p| p >= 0.0));
            prop_assert!((sum(perturbed) - 1.0).abs() < 1e-9);
        }
    }
}
