//! Sampling primitives built on the counter-based generator.
//!
//! Counter layout per edge index `i`:
//!
//! - `(i, 0)` feeds the edge weight;
//! - `(i, 1 + level / 2)` feeds the Kronecker levels, two levels per draw;
//! - `(i, TREE_PARENT_COUNTER)` feeds tree-skeleton parent choices.
//!
//! Root sampling uses a separate stream `(ROOT_SAMPLE_STREAM, m)` that edge
//! indices never reach.

use crate::{
    error::{ConfigError, SamplingError},
    prng::{Key, uniform_closed_open_f64, uniform_open_open_f32},
};

/// Largest edge weight; weights lie in `[1, MAX_WEIGHT]`.
pub const MAX_WEIGHT: u8 = 255;

/// Low counter word used for skeleton parent draws.
pub(crate) const TREE_PARENT_COUNTER: u64 = u64::MAX;

/// Counter feeding keyed scrambler offsets; no edge or root draw reaches it.
const SCRAMBLE_OFFSET_COUNTER: (u64, u64) = (u64::MAX, u64::MAX);

/// High counter word reserved for root sampling.
pub const ROOT_SAMPLE_STREAM: u64 = u64::MAX - 1;

const SCRAMBLE_MUL0: u64 = 0x4519_8402_1149_3211;
const SCRAMBLE_MUL1: u64 = 0x3050_8521_02C8_43A5;

/// Draws the weight of edge `index` as `ceil(255 * u)` with `u` in `(0, 1)`.
///
/// # Errors
/// Returns [`SamplingError::ZeroWeight`] if the mapped value is zero.
///
/// # Examples
/// ```
/// use krongen_core::{Key, weight};
///
/// let w = weight(&Key::default(), 17).expect("weights are positive");
/// assert!(w >= 1);
/// ```
pub fn weight(key: &Key, index: u64) -> Result<u8, SamplingError> {
    let [word, ..] = key.draw(index, 0);
    let scaled = (f32::from(MAX_WEIGHT) * uniform_open_open_f32(word)).ceil();
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "scaled lies in [1, 255] because the draw lies in (0, 1)"
    )]
    let value = scaled as u8;
    if value == 0 {
        return Err(SamplingError::ZeroWeight { index });
    }
    Ok(value)
}

/// Samples `n_roots` distinct vertices from `[0, num_vertices)` without
/// replacement, in strictly increasing order.
///
/// Implements Vitter's sequential Method A: for each selection a skip length
/// is drawn from the shrinking ratio of unselected to remaining candidates.
/// Draw `m` uses the counter `(stream, m)`. Work is `O(num_vertices)` in the
/// worst case and every subset of size `n_roots` is equally likely.
///
/// # Errors
/// Returns [`ConfigError::RootCountOutOfRange`] when `n_roots > num_vertices`
/// or when the output does not fit in memory addressing.
///
/// # Examples
/// ```
/// use krongen_core::{Key, ROOT_SAMPLE_STREAM, sample_roots};
///
/// let roots = sample_roots(&Key::default(), ROOT_SAMPLE_STREAM, 5, 100)
///     .expect("5 <= 100");
/// assert_eq!(roots.len(), 5);
/// assert!(roots.windows(2).all(|pair| pair[0] < pair[1]));
/// ```
#[expect(
    clippy::cast_precision_loss,
    reason = "population counts are below 2^53 for every supported scale"
)]
pub fn sample_roots(
    key: &Key,
    stream: u64,
    n_roots: u64,
    num_vertices: u64,
) -> Result<Vec<u64>, ConfigError> {
    let out_of_range = || ConfigError::RootCountOutOfRange {
        roots: n_roots,
        num_vertices,
    };
    if n_roots > num_vertices {
        return Err(out_of_range());
    }
    let capacity = usize::try_from(n_roots).map_err(|_| out_of_range())?;
    let mut roots = Vec::with_capacity(capacity);
    let Some(last_draw) = n_roots.checked_sub(1) else {
        return Ok(roots);
    };

    // `remaining` candidates start at `cursor`; `unselected` of them will be skipped.
    let mut remaining = num_vertices;
    let mut unselected = num_vertices - n_roots;
    let mut cursor = 0_u64;

    for draw_index in 0..last_draw {
        let threshold = closed_open_draw(key, stream, draw_index);
        let mut skip = 0_u64;
        let mut quotient = unselected as f64 / remaining as f64;
        while quotient > threshold {
            skip += 1;
            unselected -= 1;
            remaining -= 1;
            quotient *= unselected as f64 / remaining as f64;
        }
        let chosen = cursor + skip;
        roots.push(chosen);
        cursor = chosen + 1;
        remaining -= 1;
    }

    let threshold = closed_open_draw(key, stream, last_draw);
    let remaining = num_vertices - cursor;
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "the product lies in [0, remaining) before flooring"
    )]
    let skip = ((remaining as f64 * threshold).floor() as u64).min(remaining - 1);
    roots.push(cursor + skip);
    Ok(roots)
}

fn closed_open_draw(key: &Key, stream: u64, index: u64) -> f64 {
    let [low, high, ..] = key.draw(stream, index);
    uniform_closed_open_f64(low, high)
}

/// Bijective vertex permutation over `[0, 2^scale)`.
///
/// Two rounds of add-multiply hashing, each followed by reversing the low
/// `scale` bits. Recursive generation concentrates degree on ids that share
/// high-probability bit prefixes; scrambling keeps the degree distribution
/// while removing that positional correlation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Scrambler {
    scale: u32,
    offset0: u64,
    offset1: u64,
}

impl Scrambler {
    /// Creates the scrambler for `2^scale` vertices. `scale` must lie in
    /// `1..=63`.
    #[must_use]
    pub const fn new(scale: u32) -> Self {
        Self {
            scale,
            offset0: 0,
            offset1: 0,
        }
    }

    /// Creates a scrambler whose offsets are drawn from `key`, so graphs built
    /// with different keys also use different vertex permutations.
    #[must_use]
    pub fn keyed(scale: u32, key: &Key) -> Self {
        let (high, low) = SCRAMBLE_OFFSET_COUNTER;
        let [w0, w1, w2, w3] = key.draw(high, low);
        Self {
            scale,
            offset0: (u64::from(w0) << 32) | u64::from(w1),
            offset1: (u64::from(w2) << 32) | u64::from(w3),
        }
    }

    /// Returns the permuted id of `vertex`.
    #[must_use]
    pub const fn scramble(&self, vertex: u64) -> u64 {
        let mut v = vertex.wrapping_add(self.offset0.wrapping_add(self.offset1));
        v = v.wrapping_mul(self.offset0 | SCRAMBLE_MUL0);
        v = reverse_low_bits(v, self.scale);
        v = v.wrapping_mul(self.offset1 | SCRAMBLE_MUL1);
        reverse_low_bits(v, self.scale)
    }
}

/// Permutes `vertex` within `[0, 2^scale)`; see [`Scrambler`].
///
/// # Examples
/// ```
/// use krongen_core::scramble;
///
/// let image: std::collections::BTreeSet<u64> = (0..16).map(|v| scramble(v, 4)).collect();
/// assert_eq!(image.len(), 16);
/// assert!(image.iter().all(|&v| v < 16));
/// ```
#[must_use]
pub const fn scramble(vertex: u64, scale: u32) -> u64 {
    Scrambler::new(scale).scramble(vertex)
}

const fn reverse_low_bits(value: u64, bits: u32) -> u64 {
    if bits == 0 {
        return 0;
    }
    value.reverse_bits() >> (u64::BITS - bits)
}
