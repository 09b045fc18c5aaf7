//! The el64 header line.
//!
//! A header is a single newline-terminated line of space-separated `--key
//! value` tokens, for example:
//!
//! ```text
//! --format el64 --num_edges 1024 --num_vertices 64 --is_undirected --seed0 1 --seed1 2 --seed2 3 --seed3 4
//! ```

use std::fmt;

use thiserror::Error;

use crate::{error::define_error_codes, prng::Key};

/// Format marker accepted in the header.
pub const EL64_FORMAT: &str = "el64";

/// Upper bound on the header line length, newline included.
pub const MAX_HEADER_LEN: usize = 4096;

/// Size in bytes of one binary edge record.
pub const EL64_RECORD_LEN: usize = 16;

/// Header describing an el64 edge list.
///
/// # Examples
/// ```
/// use krongen_core::EdgeListHeader;
///
/// let header = EdgeListHeader::new(64, 1024).with_seeds([1, 2, 3, 4]);
/// let line = header.to_string();
/// assert!(line.starts_with("--format el64 --num_edges 1024 --num_vertices 64"));
/// assert_eq!(EdgeListHeader::parse(line.as_bytes()).expect("round trip"), header);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EdgeListHeader {
    num_vertices: u64,
    num_edges: u64,
    undirected: bool,
    seeds: [u64; 4],
}

impl EdgeListHeader {
    /// Creates an undirected header with zero seeds.
    #[must_use]
    pub const fn new(num_vertices: u64, num_edges: u64) -> Self {
        Self {
            num_vertices,
            num_edges,
            undirected: true,
            seeds: [0; 4],
        }
    }

    /// Records the generator seeds.
    #[must_use]
    pub const fn with_seeds(mut self, seeds: [u64; 4]) -> Self {
        self.seeds = seeds;
        self
    }

    /// Records the words of `key` as the seeds.
    #[must_use]
    pub fn with_key(self, key: &Key) -> Self {
        self.with_seeds(key.words().map(u64::from))
    }

    /// Returns the declared vertex count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn num_vertices(&self) -> u64 { self.num_vertices }

    /// Returns the declared edge count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn num_edges(&self) -> u64 { self.num_edges }

    /// Returns whether the edge list is flagged undirected.
    #[must_use]
    #[rustfmt::skip]
    pub const fn is_undirected(&self) -> bool { self.undirected }

    /// Returns the recorded seeds; absent seeds read as zero.
    #[must_use]
    #[rustfmt::skip]
    pub const fn seeds(&self) -> [u64; 4] { self.seeds }

    /// Returns `floor(log2(num_vertices))`.
    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.num_vertices.ilog2()
    }

    /// Parses a header line. The trailing newline is optional here; stream
    /// readers enforce it. Unknown tokens are ignored.
    ///
    /// # Errors
    /// Returns [`FormatError`] when the format marker is missing or not
    /// `el64`, a required count is missing, a number does not parse, or the
    /// vertex count is zero.
    pub fn parse(line: &[u8]) -> Result<Self, FormatError> {
        let text = std::str::from_utf8(line).map_err(|_| FormatError::NotUtf8)?;
        let mut tokens = text.split_ascii_whitespace();
        let mut format = None;
        let mut num_vertices = None;
        let mut num_edges = None;
        let mut undirected = false;
        let mut seeds = [0_u64; 4];

        while let Some(token) = tokens.next() {
            match token {
                "--format" => format = Some(value(&mut tokens, "format")?),
                "--num_edges" => num_edges = Some(number(&mut tokens, "num_edges")?),
                "--num_vertices" => num_vertices = Some(number(&mut tokens, "num_vertices")?),
                "--is_undirected" => undirected = true,
                "--is_directed" => undirected = false,
                "--seed0" => seeds[0] = number(&mut tokens, "seed0")?,
                "--seed1" => seeds[1] = number(&mut tokens, "seed1")?,
                "--seed2" => seeds[2] = number(&mut tokens, "seed2")?,
                "--seed3" => seeds[3] = number(&mut tokens, "seed3")?,
                _ => {}
            }
        }

        match format {
            None => return Err(FormatError::MissingFormat),
            Some(EL64_FORMAT) => {}
            Some(other) => {
                return Err(FormatError::UnsupportedFormat {
                    format: other.to_owned(),
                });
            }
        }
        let num_vertices = num_vertices.ok_or(FormatError::MissingField {
            field: "num_vertices",
        })?;
        let num_edges = num_edges.ok_or(FormatError::MissingField { field: "num_edges" })?;
        if num_vertices == 0 {
            return Err(FormatError::ZeroVertices);
        }
        Ok(Self {
            num_vertices,
            num_edges,
            undirected,
            seeds,
        })
    }
}

fn value<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<&'a str, FormatError> {
    tokens.next().ok_or(FormatError::MissingValue { field })
}

fn number<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<u64, FormatError> {
    let raw = value(tokens, field)?;
    raw.parse().map_err(|_| FormatError::InvalidNumber {
        field,
        value: raw.to_owned(),
    })
}

impl fmt::Display for EdgeListHeader {
    /// Renders the header line, newline included.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "--format {EL64_FORMAT} --num_edges {} --num_vertices {}",
            self.num_edges, self.num_vertices
        )?;
        if self.undirected {
            f.write_str(" --is_undirected")?;
        }
        let [s0, s1, s2, s3] = self.seeds;
        writeln!(f, " --seed0 {s0} --seed1 {s1} --seed2 {s2} --seed3 {s3}")
    }
}

/// Malformed or unsupported edge-list header.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum FormatError {
    /// The input ended before any header byte.
    #[error("input is empty; expected an el64 header line")]
    MissingHeader,
    /// No newline within [`MAX_HEADER_LEN`] bytes.
    #[error("header line is not newline-terminated within {limit} bytes")]
    UnterminatedHeader {
        /// Maximum accepted header length.
        limit: usize,
    },
    /// The header contained invalid UTF-8.
    #[error("header line is not valid UTF-8")]
    NotUtf8,
    /// `--format` never appeared.
    #[error("header does not declare a format")]
    MissingFormat,
    /// `--format` named something other than `el64`.
    #[error("unsupported format `{format}`; expected `el64`")]
    UnsupportedFormat {
        /// Format declared by the header.
        format: String,
    },
    /// A required field was absent.
    #[error("header is missing `--{field}`")]
    MissingField {
        /// Field name without the leading dashes.
        field: &'static str,
    },
    /// A key appeared as the last token with no value.
    #[error("header field `--{field}` has no value")]
    MissingValue {
        /// Field name without the leading dashes.
        field: &'static str,
    },
    /// A numeric field did not parse as `u64`.
    #[error("header field `--{field}` is not a valid number: `{value}`")]
    InvalidNumber {
        /// Field name without the leading dashes.
        field: &'static str,
        /// Raw token.
        value: String,
    },
    /// The declared vertex count was zero.
    #[error("header declares zero vertices")]
    ZeroVertices,
}

define_error_codes! {
    /// Stable codes describing [`FormatError`] variants.
    enum FormatErrorCode for FormatError {
        /// Empty input.
        MissingHeader => MissingHeader => "FORMAT_MISSING_HEADER",
        /// Header not newline-terminated.
        UnterminatedHeader => UnterminatedHeader { .. } => "FORMAT_UNTERMINATED_HEADER",
        /// Header not UTF-8.
        NotUtf8 => NotUtf8 => "FORMAT_NOT_UTF8",
        /// Format marker missing.
        MissingFormat => MissingFormat => "FORMAT_MISSING_FORMAT",
        /// Format marker unsupported.
        UnsupportedFormat => UnsupportedFormat { .. } => "FORMAT_UNSUPPORTED_FORMAT",
        /// Required field missing.
        MissingField => MissingField { .. } => "FORMAT_MISSING_FIELD",
        /// Field value missing.
        MissingValue => MissingValue { .. } => "FORMAT_MISSING_VALUE",
        /// Numeric field unparsable.
        InvalidNumber => InvalidNumber { .. } => "FORMAT_INVALID_NUMBER",
        /// Zero vertices declared.
        ZeroVertices => ZeroVertices => "FORMAT_ZERO_VERTICES",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[test]
    fn renders_the_reference_layout() {
        let header = EdgeListHeader::new(16, 256).with_seeds([1, 2, 3, 4]);
        assert_eq!(
            header.to_string(),
            "--format el64 --num_edges 256 --num_vertices 16 --is_undirected \
             --seed0 1 --seed1 2 --seed2 3 --seed3 4\n",
        );
    }

    #[test]
    fn parses_minimal_headers_with_default_seeds() {
        let header = EdgeListHeader::parse(b"--num_vertices 8 --format el64 --num_edges 3\n")
            .expect("valid header");
        assert_eq!(header.num_vertices(), 8);
        assert_eq!(header.num_edges(), 3);
        assert_eq!(header.seeds(), [0; 4]);
        assert!(!header.is_undirected());
        assert_eq!(header.scale(), 3);
    }

    #[test]
    fn ignores_unknown_tokens() {
        let header = EdgeListHeader::parse(
            b"--format el64 --is_sorted --num_edges 5 --num_vertices 4 --extra thing",
        )
        .expect("unknown tokens are ignored");
        assert_eq!((header.num_vertices(), header.num_edges()), (4, 5));
    }

    #[test]
    fn key_words_become_seeds() {
        let header = EdgeListHeader::new(2, 2).with_key(&Key::new([9, 8, 7, 6]));
        assert_eq!(header.seeds(), [9, 8, 7, 6]);
    }

    #[rstest]
    #[case::no_format(&b"--num_edges 1 --num_vertices 1"[..], FormatError::MissingFormat)]
    #[case::wrong_format(
        &b"--format el32 --num_edges 1 --num_vertices 1"[..],
        FormatError::UnsupportedFormat { format: "el32".to_owned() },
    )]
    #[case::no_edges(
        &b"--format el64 --num_vertices 1"[..],
        FormatError::MissingField { field: "num_edges" },
    )]
    #[case::no_vertices(
        &b"--format el64 --num_edges 1"[..],
        FormatError::MissingField { field: "num_vertices" },
    )]
    #[case::dangling_key(
        &b"--format el64 --num_vertices 1 --num_edges"[..],
        FormatError::MissingValue { field: "num_edges" },
    )]
    #[case::bad_number(
        &b"--format el64 --num_vertices 1 --num_edges ten"[..],
        FormatError::InvalidNumber { field: "num_edges", value: "ten".to_owned() },
    )]
    #[case::bad_seed(
        &b"--format el64 --num_vertices 1 --num_edges 1 --seed2 -3"[..],
        FormatError::InvalidNumber { field: "seed2", value: "-3".to_owned() },
    )]
    #[case::zero_vertices(
        &b"--format el64 --num_vertices 0 --num_edges 0"[..],
        FormatError::ZeroVertices,
    )]
    #[case::binary_noise(&[0xff, 0xfe, b'\n'][..], FormatError::NotUtf8)]
    fn rejects_malformed_headers(#[case] line: &[u8], #[case] expected: FormatError) {
        assert_eq!(EdgeListHeader::parse(line).expect_err("must fail"), expected);
    }
}
