//! Degree verification of el64 edge lists.
//!
//! [`Verifier`] walks a fixed sequence of phases:
//!
//! ```text
//! ReadingHeader -> ScanningEdges -> Reducing -> Done
//! ```
//!
//! Any failure moves it to `Failed`, from which no step succeeds. The scan is
//! a single sequential pass counting source degrees; the reduction runs on
//! rayon over disjoint vertex ranges.

mod degrees;
mod error;
mod histogram;
mod top_k;

use std::{
    fmt,
    io::{self, BufRead, Read},
};

use serde::Serialize;
use tracing::{Span, debug, field, info, instrument, warn};

pub use self::{
    degrees::DegreeArray,
    error::{ValidationError, ValidationErrorCode, VerifyError, VerifyErrorCode},
    histogram::{
        BINNED_BINS, DegreeSummary, EXACT_BINS, REDUCTION_BLOCK, binned_bin, summarize_degrees,
    },
    top_k::{DEFAULT_TOP_K, DegreeEntry, TopKTracker},
};
use crate::format::{EL64_RECORD_LEN, EdgeListHeader, FormatError, MAX_HEADER_LEN};

/// Records read from the input per block during the scan.
pub const SCAN_BLOCK_RECORDS: usize = 1 << 16;

/// Edge-to-vertex ratio of the reference benchmark graphs.
const EXPECTED_EDGEFACTOR: u64 = 16;

/// Phase of a [`Verifier`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum VerificationPhase {
    /// Waiting for the header line.
    ReadingHeader,
    /// Header accepted; edges not yet scanned.
    ScanningEdges,
    /// All edges counted; statistics not yet reduced.
    Reducing,
    /// The report is available.
    Done,
    /// A step failed; the verifier is unusable.
    Failed,
}

impl VerificationPhase {
    const fn as_str(self) -> &'static str {
        match self {
            Self::ReadingHeader => "reading_header",
            Self::ScanningEdges => "scanning_edges",
            Self::Reducing => "reducing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for VerificationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final statistics of a verified edge list, serialized as the JSON report.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DegreeReport {
    scale: u32,
    num_vertices: u64,
    num_edges: u64,
    seeds: [u64; 4],
    hist: Vec<u64>,
    binned_hist: Vec<u64>,
    max_degree: u64,
    largest_degree_vertices: Vec<DegreeEntry>,
}

impl DegreeReport {
    /// Builds a report from a header and a reduced summary.
    #[must_use]
    pub fn new(header: &EdgeListHeader, summary: &DegreeSummary) -> Self {
        Self {
            scale: header.scale(),
            num_vertices: header.num_vertices(),
            num_edges: header.num_edges(),
            seeds: header.seeds(),
            hist: summary.exact().to_vec(),
            binned_hist: summary.binned().to_vec(),
            max_degree: summary.max_degree(),
            largest_degree_vertices: summary.top().iter().collect(),
        }
    }

    /// Returns `floor(log2(num_vertices))`.
    #[must_use]
    #[rustfmt::skip]
    pub const fn scale(&self) -> u32 { self.scale }

    /// Returns the declared vertex count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn num_vertices(&self) -> u64 { self.num_vertices }

    /// Returns the declared (and verified) edge count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn num_edges(&self) -> u64 { self.num_edges }

    /// Returns the seeds recorded in the header.
    #[must_use]
    #[rustfmt::skip]
    pub const fn seeds(&self) -> [u64; 4] { self.seeds }

    /// Returns the exact-degree histogram (degrees `0..=32`).
    #[must_use]
    pub fn hist(&self) -> &[u64] {
        &self.hist
    }

    /// Returns the power-of-two histogram.
    #[must_use]
    pub fn binned_hist(&self) -> &[u64] {
        &self.binned_hist
    }

    /// Returns the largest degree.
    #[must_use]
    #[rustfmt::skip]
    pub const fn max_degree(&self) -> u64 { self.max_degree }

    /// Returns the highest-degree vertices in ascending degree order.
    #[must_use]
    pub fn largest_degree_vertices(&self) -> &[DegreeEntry] {
        &self.largest_degree_vertices
    }
}

/// Streaming degree verifier over an el64 input.
///
/// # Examples
/// ```
/// use krongen_core::{EdgeListHeader, VerificationPhase, Verifier};
///
/// let mut input = EdgeListHeader::new(2, 1).to_string().into_bytes();
/// input.extend_from_slice(&1_u64.to_le_bytes());
/// input.extend_from_slice(&0_u64.to_le_bytes());
///
/// let mut verifier = Verifier::new(input.as_slice());
/// verifier.read_header().expect("valid header");
/// assert_eq!(verifier.phase(), VerificationPhase::ScanningEdges);
/// verifier.scan_edges().expect("valid edges");
/// let report = verifier.reduce().expect("consistent");
/// assert_eq!(report.hist()[..2], [1, 1]);
/// assert_eq!(verifier.phase(), VerificationPhase::Done);
/// ```
#[derive(Debug)]
pub struct Verifier<R> {
    reader: R,
    top_k: usize,
    phase: VerificationPhase,
    header: Option<EdgeListHeader>,
    degrees: Option<DegreeArray>,
    report: Option<DegreeReport>,
}

impl<R: BufRead> Verifier<R> {
    /// Creates a verifier reading from `reader`.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            top_k: DEFAULT_TOP_K,
            phase: VerificationPhase::ReadingHeader,
            header: None,
            degrees: None,
            report: None,
        }
    }

    /// Overrides the number of top vertices retained.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Returns the current phase.
    #[must_use]
    #[rustfmt::skip]
    pub const fn phase(&self) -> VerificationPhase { self.phase }

    /// Returns the parsed header once available.
    #[must_use]
    pub const fn header(&self) -> Option<&EdgeListHeader> {
        self.header.as_ref()
    }

    /// Returns the report once the verifier is done.
    #[must_use]
    pub const fn report(&self) -> Option<&DegreeReport> {
        self.report.as_ref()
    }

    /// Runs every phase and returns the report.
    ///
    /// # Errors
    /// Returns the first [`VerifyError`] raised by any phase.
    pub fn run(mut self) -> Result<DegreeReport, VerifyError> {
        self.read_header()?;
        self.scan_edges()?;
        self.reduce()
    }

    /// Reads and parses the header line, keeping a copy for later phases.
    ///
    /// # Errors
    /// Returns [`VerifyError::Format`] for a missing, unterminated, or
    /// malformed header and [`VerifyError::Io`] if reading fails.
    #[instrument(name = "verify.read_header", err, skip(self))]
    pub fn read_header(&mut self) -> Result<EdgeListHeader, VerifyError> {
        self.expect_phase(VerificationPhase::ReadingHeader)?;
        let parsed = read_header_line(&mut self.reader);
        let header = self.settle(parsed)?;
        info!(
            num_vertices = header.num_vertices(),
            num_edges = header.num_edges(),
            "header parsed"
        );
        if header.num_edges().checked_div(header.num_vertices()) != Some(EXPECTED_EDGEFACTOR) {
            warn!(
                num_vertices = header.num_vertices(),
                num_edges = header.num_edges(),
                "edge-to-vertex ratio differs from {EXPECTED_EDGEFACTOR}"
            );
        }
        self.phase = VerificationPhase::ScanningEdges;
        self.header = Some(header);
        Ok(header)
    }

    /// Reads every record, counting source degrees. Fails on the first
    /// out-of-range endpoint, on a trailing partial record, or when the record
    /// count differs from the header.
    ///
    /// # Errors
    /// Returns [`VerifyError::Validation`], [`VerifyError::Allocation`], or
    /// [`VerifyError::Io`].
    #[instrument(name = "verify.scan_edges", err, skip(self), fields(edges = field::Empty))]
    pub fn scan_edges(&mut self) -> Result<u64, VerifyError> {
        self.expect_phase(VerificationPhase::ScanningEdges)?;
        let Some(header) = self.header else {
            return Err(self.fail(VerifyError::UnexpectedPhase {
                expected: VerificationPhase::ScanningEdges,
                actual: VerificationPhase::ReadingHeader,
            }));
        };
        let scanned = DegreeArray::zeroed(header.num_vertices())
            .and_then(|degrees| scan_records(&mut self.reader, &header, degrees));
        let (degrees, edges_read) = self.settle(scanned)?;
        Span::current().record("edges", edges_read);
        self.degrees = Some(degrees);
        self.phase = VerificationPhase::Reducing;
        Ok(edges_read)
    }

    /// Reduces the degree counters and checks histogram consistency. The
    /// report stays available through [`Verifier::report`].
    ///
    /// # Errors
    /// Returns [`VerifyError::Validation`] if the histograms disagree.
    #[instrument(name = "verify.reduce", err, skip(self), fields(max_degree = field::Empty))]
    pub fn reduce(&mut self) -> Result<DegreeReport, VerifyError> {
        self.expect_phase(VerificationPhase::Reducing)?;
        let (Some(header), Some(degrees)) = (self.header, self.degrees.take()) else {
            return Err(self.fail(VerifyError::UnexpectedPhase {
                expected: VerificationPhase::Reducing,
                actual: VerificationPhase::ScanningEdges,
            }));
        };
        let summary = degrees.summarize(self.top_k);
        let checked = summary.check_consistency().map_err(VerifyError::from);
        self.settle(checked)?;
        Span::current().record("max_degree", summary.max_degree());
        debug!(
            retained = summary.top().len(),
            "reduced {} vertices",
            degrees.num_vertices()
        );
        self.phase = VerificationPhase::Done;
        Ok(self.report.insert(DegreeReport::new(&header, &summary)).clone())
    }

    fn expect_phase(&mut self, expected: VerificationPhase) -> Result<(), VerifyError> {
        if self.phase == expected {
            return Ok(());
        }
        let actual = self.phase;
        Err(self.fail(VerifyError::UnexpectedPhase { expected, actual }))
    }

    fn settle<T>(&mut self, result: Result<T, VerifyError>) -> Result<T, VerifyError> {
        result.map_err(|error| self.fail(error))
    }

    fn fail(&mut self, error: VerifyError) -> VerifyError {
        self.phase = VerificationPhase::Failed;
        error
    }
}

fn read_header_line(reader: &mut impl BufRead) -> Result<EdgeListHeader, VerifyError> {
    let mut line = Vec::new();
    reader
        .take(MAX_HEADER_LEN as u64)
        .read_until(b'\n', &mut line)?;
    match line.last() {
        None => Err(FormatError::MissingHeader.into()),
        Some(b'\n') => Ok(EdgeListHeader::parse(&line)?),
        Some(_) => Err(FormatError::UnterminatedHeader {
            limit: MAX_HEADER_LEN,
        }
        .into()),
    }
}

fn scan_records(
    reader: &mut impl Read,
    header: &EdgeListHeader,
    mut degrees: DegreeArray,
) -> Result<(DegreeArray, u64), VerifyError> {
    let mut block = vec![0_u8; SCAN_BLOCK_RECORDS * EL64_RECORD_LEN];
    let mut edges_read = 0_u64;
    loop {
        let filled = fill_block(reader, &mut block)?;
        let bytes = block.get(..filled).unwrap_or_default();
        let (records, trailing) = bytes.as_chunks::<EL64_RECORD_LEN>();
        for record in records {
            let (src, dst) = decode_record(record);
            degrees.count(edges_read, src, dst)?;
            edges_read += 1;
        }
        if !trailing.is_empty() {
            return Err(ValidationError::TruncatedRecord {
                edges_read,
                trailing_bytes: trailing.len(),
            }
            .into());
        }
        debug!(edges_read, "scanned block");
        if filled < block.len() {
            break;
        }
    }
    if edges_read != header.num_edges() {
        return Err(ValidationError::EdgeCountMismatch {
            declared: header.num_edges(),
            read: edges_read,
        }
        .into());
    }
    Ok((degrees, edges_read))
}

/// Reads until `block` is full or the input ends; returns the bytes read.
fn fill_block(reader: &mut impl Read, block: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while let Some(rest) = block.get_mut(filled..).filter(|rest| !rest.is_empty()) {
        match reader.read(rest) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the record packs two little-endian u64 halves"
)]
const fn decode_record(record: &[u8; EL64_RECORD_LEN]) -> (u64, u64) {
    let packed = u128::from_le_bytes(*record);
    (packed as u64, (packed >> 64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::{fixture, rstest};

    fn el64(num_vertices: u64, declared_edges: u64, edges: &[(u64, u64)]) -> Vec<u8> {
        let mut bytes = EdgeListHeader::new(num_vertices, declared_edges)
            .with_seeds([11, 12, 13, 14])
            .to_string()
            .into_bytes();
        for &(src, dst) in edges {
            bytes.extend_from_slice(&src.to_le_bytes());
            bytes.extend_from_slice(&dst.to_le_bytes());
        }
        bytes
    }

    #[fixture]
    fn degree_two_graph() -> Vec<u8> {
        let edges: Vec<(u64, u64)> = (0..32).map(|i| (i % 16, (i + 3) % 16)).collect();
        el64(16, 32, &edges)
    }

    #[rstest]
    fn every_vertex_of_degree_two_lands_in_bin_two(degree_two_graph: Vec<u8>) {
        let report = Verifier::new(degree_two_graph.as_slice())
            .run()
            .expect("valid graph");
        let mut expected = vec![0; EXACT_BINS];
        expected[2] = 16;
        assert_eq!(report.hist(), expected.as_slice());
        assert_eq!(report.binned_hist()[2], 16);
        assert_eq!(report.binned_hist().iter().sum::<u64>(), 16);
        assert_eq!(report.max_degree(), 2);
        assert_eq!(report.scale(), 4);
        assert_eq!(report.seeds(), [11, 12, 13, 14]);
        assert_eq!(report.largest_degree_vertices().len(), 16);
    }

    #[rstest]
    fn stepwise_results_match_the_retained_state(degree_two_graph: Vec<u8>) {
        let mut verifier = Verifier::new(degree_two_graph.as_slice());
        let header = verifier.read_header().expect("valid header");
        assert_eq!(verifier.header(), Some(&header));
        assert_eq!(header.num_vertices(), 16);
        assert_eq!(verifier.scan_edges().expect("valid edges"), 32);
        let report = verifier.reduce().expect("consistent");
        assert_eq!(verifier.report(), Some(&report));
        assert_eq!(verifier.phase(), VerificationPhase::Done);
    }

    #[test]
    fn one_missing_edge_is_a_count_mismatch() {
        let edges: Vec<(u64, u64)> = (0..99).map(|i| (i % 10, 0)).collect();
        let input = el64(10, 100, &edges);
        let mut verifier = Verifier::new(input.as_slice());
        verifier.read_header().expect("valid header");
        let err = verifier.scan_edges().expect_err("99 of 100 edges");
        assert!(matches!(
            err,
            VerifyError::Validation(ValidationError::EdgeCountMismatch {
                declared: 100,
                read: 99,
            })
        ));
        assert_eq!(verifier.phase(), VerificationPhase::Failed);
    }

    /// Slice reader that errors instead of reporting the end of input.
    struct Tripwire<'a> {
        data: &'a [u8],
    }

    impl Read for Tripwire<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::other("read past the end of the first block"));
            }
            self.data.read(buf)
        }
    }

    impl BufRead for Tripwire<'_> {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            Ok(self.data)
        }

        fn consume(&mut self, amount: usize) {
            self.data.consume(amount);
        }
    }

    #[test]
    fn out_of_range_vertex_stops_the_scan_immediately() {
        // One full block with a bad second record; any further read trips the wire.
        let mut edges = vec![(0, 1); SCAN_BLOCK_RECORDS];
        edges[1] = (9, 2);
        let input = el64(8, SCAN_BLOCK_RECORDS as u64 + 1, &edges);
        let mut verifier = Verifier::new(Tripwire { data: &input });
        verifier.read_header().expect("valid header");
        let err = verifier.scan_edges().expect_err("vertex 9 of 8");
        assert!(matches!(
            err,
            VerifyError::Validation(ValidationError::VertexOutOfRange {
                edge: 1,
                src: 9,
                dst: 2,
                num_vertices: 8,
            })
        ));
        assert_eq!(verifier.phase(), VerificationPhase::Failed);
        assert!(verifier.reduce().is_err());
    }

    #[test]
    fn destination_out_of_range_also_fails() {
        let input = el64(8, 1, &[(0, 8)]);
        let err = Verifier::new(input.as_slice()).run().expect_err("dst 8 of 8");
        assert_eq!(err.detailed_code(), "VALIDATION_VERTEX_OUT_OF_RANGE");
    }

    #[test]
    fn trailing_partial_record_is_rejected() {
        let mut input = el64(4, 1, &[(0, 1)]);
        input.extend_from_slice(&[1, 2, 3]);
        let err = Verifier::new(input.as_slice()).run().expect_err("partial record");
        assert!(matches!(
            err,
            VerifyError::Validation(ValidationError::TruncatedRecord {
                edges_read: 1,
                trailing_bytes: 3,
            })
        ));
    }

    #[rstest]
    #[case::empty(&b""[..], FormatError::MissingHeader)]
    #[case::no_newline(
        &b"--format el64 --num_edges 0 --num_vertices 1"[..],
        FormatError::UnterminatedHeader { limit: MAX_HEADER_LEN },
    )]
    #[case::wrong_marker(
        &b"--format el32 --num_edges 0 --num_vertices 1\n"[..],
        FormatError::UnsupportedFormat { format: "el32".to_owned() },
    )]
    fn header_problems_are_format_errors(#[case] input: &[u8], #[case] expected: FormatError) {
        let mut verifier = Verifier::new(input);
        let err = verifier.read_header().expect_err("bad header");
        match err {
            VerifyError::Format(actual) => assert_eq!(actual, expected),
            other => panic!("expected a format error, got {other:?}"),
        }
        assert_eq!(verifier.phase(), VerificationPhase::Failed);
    }

    #[test]
    fn oversized_header_lines_are_unterminated() {
        let mut input = vec![b' '; MAX_HEADER_LEN + 10];
        input.push(b'\n');
        let err = Verifier::new(input.as_slice()).run().expect_err("too long");
        assert!(matches!(
            err,
            VerifyError::Format(FormatError::UnterminatedHeader { .. })
        ));
    }

    #[test]
    fn steps_must_run_in_order() {
        let input = el64(2, 0, &[]);
        let mut verifier = Verifier::new(input.as_slice());
        let err = verifier.scan_edges().expect_err("header first");
        assert!(matches!(
            err,
            VerifyError::UnexpectedPhase {
                expected: VerificationPhase::ScanningEdges,
                actual: VerificationPhase::ReadingHeader,
            }
        ));
        assert_eq!(verifier.phase(), VerificationPhase::Failed);
    }

    #[test]
    fn empty_edge_lists_are_valid() {
        let report = Verifier::new(el64(4, 0, &[]).as_slice())
            .run()
            .expect("no edges");
        assert_eq!(report.hist()[0], 4);
        assert_eq!(report.binned_hist()[0], 4);
        assert_eq!(report.max_degree(), 0);
    }

    #[test]
    fn scans_span_multiple_blocks() {
        // 64 full rounds over 1024 vertices plus five extra edges for vertices 0..5.
        let count = SCAN_BLOCK_RECORDS as u64 + 5;
        let edges: Vec<(u64, u64)> = (0..count).map(|i| (i % 1_024, 0)).collect();
        let report = Verifier::new(el64(1_024, count, &edges).as_slice())
            .with_top_k(4)
            .run()
            .expect("valid");
        assert_eq!(report.num_edges(), count);
        assert_eq!(report.max_degree(), 65);
        assert_eq!(report.hist().iter().sum::<u64>(), 0);
        assert_eq!(report.binned_hist()[7], 1_024);
        let top: Vec<(u64, u64)> = report
            .largest_degree_vertices()
            .iter()
            .map(|entry| (entry.vertex_id, entry.degree))
            .collect();
        assert_eq!(top, vec![(1, 65), (2, 65), (3, 65), (4, 65)]);
    }

    #[test]
    fn report_serializes_with_reference_field_names() {
        let report = Verifier::new(el64(2, 1, &[(1, 0)]).as_slice())
            .with_top_k(1)
            .run()
            .expect("valid");
        let json = serde_json::to_value(&report).expect("serializable");
        assert_eq!(json["scale"], 1);
        assert_eq!(json["num_vertices"], 2);
        assert_eq!(json["num_edges"], 1);
        assert_eq!(json["seeds"], serde_json::json!([11, 12, 13, 14]));
        assert_eq!(json["hist"].as_array().map(Vec::len), Some(EXACT_BINS));
        assert_eq!(json["binned_hist"].as_array().map(Vec::len), Some(BINNED_BINS));
        assert_eq!(json["max_degree"], 1);
        assert_eq!(
            json["largest_degree_vertices"],
            serde_json::json!([{ "vertex_id": 1, "degree": 1 }]),
        );
    }
}
