//! Edge-list serialization: the el64 binary layout, tab-separated text, and
//! graph-import CSV.

mod header;

use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};

pub use header::{
    EL64_FORMAT, EL64_RECORD_LEN, EdgeListHeader, FormatError, FormatErrorCode, MAX_HEADER_LEN,
};

use crate::{chunk::EdgeSink, kronecker::Edge};

/// Header line of the graph-import CSV layout.
pub const CSV_HEADER: &str = ":TYPE,:START_ID,:END_ID\n";

/// Output layout for generated edges.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum EdgeFormat {
    /// el64 header followed by little-endian `(src, dst)` records; no weights.
    Binary,
    /// `src\tdst\tweight` per line.
    #[default]
    Text,
    /// `:TYPE,:START_ID,:END_ID` header followed by `EDGE,src,dst` rows.
    Csv,
}

impl EdgeFormat {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Text => "text",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for EdgeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`EdgeFormat`] name.
#[derive(Clone, Debug, Eq, thiserror::Error, PartialEq)]
#[error("unknown edge format `{0}`; expected binary, text, or csv")]
pub struct UnknownEdgeFormat(pub String);

impl FromStr for EdgeFormat {
    type Err = UnknownEdgeFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "binary" | "el64" => Ok(Self::Binary),
            "text" | "tsv" => Ok(Self::Text),
            "csv" | "neo4j" => Ok(Self::Csv),
            _ => Err(UnknownEdgeFormat(value.to_owned())),
        }
    }
}

/// [`EdgeSink`] serializing chunks into a byte stream.
///
/// The preamble (el64 header or CSV header) is written on construction.
/// Wrap unbuffered writers in [`io::BufWriter`].
///
/// # Examples
/// ```
/// use krongen_core::{Edge, EdgeFormat, EdgeListHeader, EdgeSink, EdgeWriter};
///
/// let header = EdgeListHeader::new(4, 1);
/// let mut writer = EdgeWriter::new(Vec::new(), EdgeFormat::Csv, &header).expect("in memory");
/// writer
///     .write_chunk(0, &[Edge { src: 1, dst: 2, weight: 9 }])
///     .expect("in memory");
/// assert_eq!(writer.into_inner(), b":TYPE,:START_ID,:END_ID\nEDGE,1,2\n");
/// ```
#[derive(Debug)]
pub struct EdgeWriter<W: Write> {
    inner: W,
    format: EdgeFormat,
    records: Vec<u8>,
}

impl<W: Write> EdgeWriter<W> {
    /// Writes the preamble for `format` and returns the writer.
    ///
    /// # Errors
    /// Returns any I/O error raised while writing the preamble.
    pub fn new(mut inner: W, format: EdgeFormat, header: &EdgeListHeader) -> io::Result<Self> {
        match format {
            EdgeFormat::Binary => write!(inner, "{header}")?,
            EdgeFormat::Csv => inner.write_all(CSV_HEADER.as_bytes())?,
            EdgeFormat::Text => {}
        }
        Ok(Self {
            inner,
            format,
            records: Vec::new(),
        })
    }

    /// Returns the output format.
    #[must_use]
    #[rustfmt::skip]
    pub const fn format(&self) -> EdgeFormat { self.format }

    /// Consumes the writer, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_binary(&mut self, edges: &[Edge]) -> io::Result<()> {
        self.records.clear();
        self.records.reserve(edges.len() * EL64_RECORD_LEN);
        for edge in edges {
            self.records.extend_from_slice(&edge.src.to_le_bytes());
            self.records.extend_from_slice(&edge.dst.to_le_bytes());
        }
        self.inner.write_all(&self.records)
    }
}

impl<W: Write> EdgeSink for EdgeWriter<W> {
    fn write_chunk(&mut self, _first_index: u64, edges: &[Edge]) -> io::Result<()> {
        match self.format {
            EdgeFormat::Binary => self.write_binary(edges),
            EdgeFormat::Text => edges.iter().try_for_each(|edge| {
                writeln!(self.inner, "{}\t{}\t{}", edge.src, edge.dst, edge.weight)
            }),
            EdgeFormat::Csv => edges
                .iter()
                .try_for_each(|edge| writeln!(self.inner, "EDGE,{},{}", edge.src, edge.dst)),
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn sample_edges() -> [Edge; 2] {
        [
            Edge {
                src: 1,
                dst: 2,
                weight: 3,
            },
            Edge {
                src: 0x0102_0304_0506_0708,
                dst: 0,
                weight: 255,
            },
        ]
    }

    fn render(format: EdgeFormat) -> Vec<u8> {
        let header = EdgeListHeader::new(8, 2).with_seeds([5, 6, 7, 8]);
        let mut writer = EdgeWriter::new(Vec::new(), format, &header).expect("in memory");
        writer.write_chunk(0, &sample_edges()).expect("in memory");
        writer.finish().expect("in memory");
        writer.into_inner()
    }

    #[test]
    fn text_lines_carry_weights() {
        let text = String::from_utf8(render(EdgeFormat::Text)).expect("utf-8");
        assert_eq!(text, "1\t2\t3\n72623859790382856\t0\t255\n");
    }

    #[test]
    fn csv_rows_follow_the_import_header() {
        let csv = String::from_utf8(render(EdgeFormat::Csv)).expect("utf-8");
        assert_eq!(csv, ":TYPE,:START_ID,:END_ID\nEDGE,1,2\nEDGE,72623859790382856,0\n");
    }

    #[test]
    fn binary_records_are_little_endian_pairs() {
        let bytes = render(EdgeFormat::Binary);
        let header = EdgeListHeader::new(8, 2).with_seeds([5, 6, 7, 8]).to_string();
        let (preamble, records) = bytes.split_at(header.len());
        assert_eq!(preamble, header.as_bytes());
        assert_eq!(records.len(), 2 * EL64_RECORD_LEN);
        assert_eq!(&records[..16], &[1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&records[16..24], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&records[24..], &[0; 8]);
    }

    #[rstest]
    #[case("binary", EdgeFormat::Binary)]
    #[case("EL64", EdgeFormat::Binary)]
    #[case("text", EdgeFormat::Text)]
    #[case("csv", EdgeFormat::Csv)]
    #[case("neo4j", EdgeFormat::Csv)]
    fn formats_parse_by_name(#[case] name: &str, #[case] expected: EdgeFormat) {
        assert_eq!(name.parse::<EdgeFormat>().expect("known format"), expected);
    }

    #[test]
    fn unknown_format_names_are_rejected() {
        assert_eq!(
            "parquet".parse::<EdgeFormat>(),
            Err(UnknownEdgeFormat("parquet".to_owned())),
        );
    }
}
