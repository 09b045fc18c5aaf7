//! Counter-based pseudorandom generation.
//!
//! Randomness comes from the Threefry-4x32 block function (20 rounds): a keyed
//! permutation over a 128-bit counter. [`Key::draw`] is a pure function of the
//! key and a pair of 64-bit counters, so any edge, recursion level, or worker
//! can derive its random words independently of every other draw.

use std::ffi::OsString;

use crate::error::SeedError;

/// Key words used when no override is supplied.
pub const DEFAULT_KEY_WORDS: [u32; 4] = [0xdead_beef, 0xdece_a5ed, 0x0bad_cafe, 0x5ca1_ab1e];

/// Environment variables overriding individual key words.
pub const SEED_ENV_VARS: [&str; 4] = ["SEED0", "SEED1", "SEED2", "SEED3"];

const ROUNDS: usize = 20;
const SKEIN_KS_PARITY: u32 = 0x1BD1_1BDA;
const ROTATIONS: [[u32; 2]; 8] = [
    [10, 26],
    [11, 21],
    [13, 27],
    [23, 5],
    [6, 20],
    [17, 11],
    [25, 10],
    [18, 20],
];

/// 2^-23, the spacing of the 23-bit open-interval float grid.
const F32_GRID: f32 = 1.0 / 8_388_608.0;
/// 2^-24, half a grid step, keeps the float away from zero.
const F32_HALF_STEP: f32 = 1.0 / 16_777_216.0;
/// 2^-53, the spacing of the 53-bit double grid.
const F64_GRID: f64 = 1.0 / 9_007_199_254_740_992.0;

/// Immutable generator key made of four 32-bit words.
///
/// A key fully determines every edge of a generated graph. It is `Copy` and is
/// threaded explicitly through every sampling call; there is no global key.
///
/// # Examples
/// ```
/// use krongen_core::Key;
///
/// let key = Key::default().with_overrides([None, Some(7), None, None]);
/// assert_eq!(key.words()[1], 7);
/// assert_eq!(key.draw(3, 4), key.draw(3, 4));
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    words: [u32; 4],
}

impl Default for Key {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_WORDS)
    }
}

impl Key {
    /// Creates a key from explicit words.
    #[must_use]
    pub const fn new(words: [u32; 4]) -> Self {
        Self { words }
    }

    /// Returns the key words.
    #[must_use]
    #[rustfmt::skip]
    pub const fn words(&self) -> [u32; 4] { self.words }

    /// Replaces every word for which `overrides` holds a value.
    #[must_use]
    pub fn with_overrides(mut self, overrides: [Option<u32>; 4]) -> Self {
        for (word, replacement) in self.words.iter_mut().zip(overrides) {
            if let Some(value) = replacement {
                *word = value;
            }
        }
        self
    }

    /// Applies `SEED0`..`SEED3` overrides resolved through `lookup`.
    ///
    /// # Errors
    /// Returns [`SeedError`] when a variable is set but is not a decimal `u32`.
    ///
    /// # Examples
    /// ```
    /// use krongen_core::Key;
    ///
    /// let key = Key::default()
    ///     .with_env_overrides(|name| (name == "SEED2").then(|| "42".into()))
    ///     .expect("valid override");
    /// assert_eq!(key.words()[2], 42);
    /// ```
    pub fn with_env_overrides(
        self,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self, SeedError> {
        let mut overrides = [None; 4];
        for (slot, name) in overrides.iter_mut().zip(SEED_ENV_VARS) {
            if let Some(raw) = lookup(name) {
                *slot = Some(parse_seed(name, raw)?);
            }
        }
        Ok(self.with_overrides(overrides))
    }

    /// Draws four pseudorandom words for the counter `(counter_high, counter_low)`.
    #[must_use]
    pub fn draw(&self, counter_high: u64, counter_low: u64) -> [u32; 4] {
        draw(self, counter_high, counter_low)
    }
}

fn parse_seed(name: &'static str, raw: OsString) -> Result<u32, SeedError> {
    let text = raw
        .into_string()
        .map_err(|_| SeedError::InvalidUnicode { name })?;
    text.trim()
        .parse::<u32>()
        .map_err(|_| SeedError::Unparsable { name, value: text })
}

/// Pure counter-based draw: Threefry-4x32-20 of the counter
/// `(hi >> 32, hi, lo >> 32, lo)` under `key`.
#[must_use]
pub fn draw(key: &Key, counter_high: u64, counter_low: u64) -> [u32; 4] {
    threefry4x32(split_counter(counter_high, counter_low), key.words)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "counters are deliberately split into 32-bit halves"
)]
const fn split_counter(high: u64, low: u64) -> [u32; 4] {
    [
        (high >> 32) as u32,
        high as u32,
        (low >> 32) as u32,
        low as u32,
    ]
}

fn threefry4x32(counter: [u32; 4], key: [u32; 4]) -> [u32; 4] {
    let [k0, k1, k2, k3] = key;
    let schedule = [k0, k1, k2, k3, SKEIN_KS_PARITY ^ k0 ^ k1 ^ k2 ^ k3];
    let [c0, c1, c2, c3] = counter;
    let mut x = [
        c0.wrapping_add(k0),
        c1.wrapping_add(k1),
        c2.wrapping_add(k2),
        c3.wrapping_add(k3),
    ];

    for round in 0..ROUNDS {
        let [r0, r1] = ROTATIONS[round % ROTATIONS.len()];
        let [mut x0, mut x1, mut x2, mut x3] = x;
        if round % 2 == 0 {
            x0 = x0.wrapping_add(x1);
            x1 = x1.rotate_left(r0) ^ x0;
            x2 = x2.wrapping_add(x3);
            x3 = x3.rotate_left(r1) ^ x2;
        } else {
            x0 = x0.wrapping_add(x3);
            x3 = x3.rotate_left(r0) ^ x0;
            x2 = x2.wrapping_add(x1);
            x1 = x1.rotate_left(r1) ^ x2;
        }
        x = [x0, x1, x2, x3];

        if round % 4 == 3 {
            let injection = (round + 1) / 4;
            for (offset, word) in x.iter_mut().enumerate() {
                *word = word.wrapping_add(schedule[(injection + offset) % schedule.len()]);
            }
            #[expect(
                clippy::cast_possible_truncation,
                reason = "at most five key injections happen in twenty rounds"
            )]
            let injection_word = injection as u32;
            x[3] = x[3].wrapping_add(injection_word);
        }
    }
    x
}

/// Maps a word to a float in the open interval `(0, 1)` on a fixed 23-bit grid.
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    reason = "the shifted value has 23 significant bits and is exact in f32"
)]
pub fn uniform_open_open_f32(word: u32) -> f32 {
    (word >> 9) as f32 * F32_GRID + F32_HALF_STEP
}

/// Maps two words to a double in `[0, 1)` on a fixed 53-bit grid; `low` holds
/// the least significant half of the 64-bit source value.
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    reason = "the shifted value has 53 significant bits and is exact in f64"
)]
pub fn uniform_closed_open_f64(low: u32, high: u32) -> f64 {
    let bits = (u64::from(high) << 32) | u64::from(low);
    (bits >> 11) as f64 * F64_GRID
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::zeros([0; 4], [0; 4], [0x9c6c_a96a, 0xe17e_ae66, 0xfc10_ecd4, 0x5256_a7d8])]
    #[case::ones(
        [u32::MAX; 4],
        [u32::MAX; 4],
        [0x2a88_1696, 0x5701_2287, 0xf6c7_446e, 0xa16a_6732],
    )]
    #[case::pi_digits(
        [0x243f_6a88, 0x85a3_08d3, 0x1319_8a2e, 0x0370_7344],
        [0xa409_3822, 0x299f_31d0, 0x082e_fa98, 0xec4e_6c89],
        [0x59cd_1dbb, 0xb887_9579, 0x86b5_d00c, 0xac8b_6d84],
    )]
    fn threefry_matches_known_answers(
        #[case] counter: [u32; 4],
        #[case] key: [u32; 4],
        #[case] expected: [u32; 4],
    ) {
        assert_eq!(threefry4x32(counter, key), expected);
    }

    #[test]
    fn draw_is_pure() {
        let key = Key::default();
        assert_eq!(key.draw(12, 34), draw(&key, 12, 34));
        assert_eq!(key.draw(12, 34), key.draw(12, 34));
        assert_ne!(key.draw(12, 34), key.draw(12, 35));
        assert_ne!(key.draw(12, 34), key.draw(13, 34));
    }

    #[test]
    fn different_keys_produce_different_words() {
        let base = Key::default();
        let other = base.with_overrides([Some(1), None, None, None]);
        assert_ne!(base.draw(0, 0), other.draw(0, 0));
    }

    #[test]
    fn counter_halves_land_in_expected_words() {
        assert_eq!(
            split_counter(0x0102_0304_0506_0708, 0x1112_1314_1516_1718),
            [0x0102_0304, 0x0506_0708, 0x1112_1314, 0x1516_1718],
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(0x8000_0000)]
    #[case(u32::MAX)]
    fn open_open_float_excludes_endpoints(#[case] word: u32) {
        let value = uniform_open_open_f32(word);
        assert!(value > 0.0 && value < 1.0, "{value} outside (0, 1)");
    }

    #[test]
    fn closed_open_double_covers_zero_but_not_one() {
        assert_eq!(uniform_closed_open_f64(0, 0), 0.0);
        let top = uniform_closed_open_f64(u32::MAX, u32::MAX);
        assert!(top < 1.0);
        assert!(top > 0.999_999);
    }

    #[test]
    fn closed_open_double_uses_high_word_as_most_significant() {
        let low_only = uniform_closed_open_f64(u32::MAX, 0);
        let high_only = uniform_closed_open_f64(0, 1);
        assert!(low_only < high_only);
    }

    #[test]
    fn env_overrides_replace_selected_words() {
        let key = Key::default()
            .with_env_overrides(|name| match name {
                "SEED0" => Some("1".into()),
                "SEED3" => Some(" 4294967295 ".into()),
                _ => None,
            })
            .expect("overrides must parse");
        assert_eq!(
            key.words(),
            [1, DEFAULT_KEY_WORDS[1], DEFAULT_KEY_WORDS[2], u32::MAX],
        );
    }

    #[rstest]
    #[case("abc")]
    #[case("-1")]
    #[case("4294967296")]
    #[case("")]
    fn env_overrides_reject_invalid_values(#[case] raw: &str) {
        let err = Key::default()
            .with_env_overrides(|name| (name == "SEED1").then(|| raw.into()))
            .expect_err("invalid seed must fail");
        assert_eq!(
            err,
            SeedError::Unparsable {
                name: "SEED1",
                value: raw.to_owned(),
            }
        );
    }
}
