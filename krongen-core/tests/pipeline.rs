//! End-to-end generation and verification.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
};

use krongen_core::{
    ChunkProducer, EdgeFormat, EdgeGenerator, EdgeListHeader, EdgeSink, EdgeWriter,
    GraphParameters, GraphParametersBuilder, Key, TreeMode, Verifier, VerifyError,
};
use krongen_test_support::tracing::RecordingLayer;
use rstest::{fixture, rstest};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

#[fixture]
fn params() -> GraphParameters {
    GraphParametersBuilder::new()
        .with_scale(9)
        .build()
        .expect("valid parameters")
}

fn render(generator: &EdgeGenerator, key: &Key, format: EdgeFormat, chunk_size: usize) -> Vec<u8> {
    let params = generator.params();
    let header = EdgeListHeader::new(params.num_vertices(), params.num_edges()).with_key(key);
    let mut writer = EdgeWriter::new(Vec::new(), format, &header).expect("in memory");
    ChunkProducer::new(generator, chunk_size)
        .expect("non-zero chunk")
        .produce(&mut writer)
        .expect("in-memory sink");
    writer.into_inner()
}

#[rstest]
fn generated_graphs_verify_through_a_file(params: GraphParameters) {
    let key = Key::default().with_overrides([Some(1), Some(2), Some(3), Some(4)]);
    let generator = EdgeGenerator::new(params, key).expect("generator");
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("graph.el64");

    let header = EdgeListHeader::new(params.num_vertices(), params.num_edges()).with_key(&key);
    let file = File::create(&path).expect("create output");
    let mut writer =
        EdgeWriter::new(BufWriter::new(file), EdgeFormat::Binary, &header).expect("preamble");
    let summary = ChunkProducer::new(&generator, 777)
        .expect("producer")
        .produce(&mut writer)
        .expect("write graph");
    assert_eq!(summary.edges(), params.num_edges());
    drop(writer);

    let input = BufReader::new(File::open(&path).expect("open graph"));
    let report = Verifier::new(input).run().expect("graph verifies");
    assert_eq!(report.scale(), 9);
    assert_eq!(report.num_vertices(), 512);
    assert_eq!(report.num_edges(), params.num_edges());
    assert_eq!(report.seeds(), [1, 2, 3, 4]);
    assert_eq!(report.binned_hist().iter().sum::<u64>(), 512);
    let top = report.largest_degree_vertices();
    assert!(top.windows(2).all(|pair| pair[0].degree <= pair[1].degree));
    assert_eq!(top.last().map(|entry| entry.degree), Some(report.max_degree()));
}

#[rstest]
#[case(1)]
#[case(1_000)]
#[case(8_192)]
fn output_bytes_do_not_depend_on_chunk_size(params: GraphParameters, #[case] chunk_size: usize) {
    let key = Key::default();
    let generator = EdgeGenerator::new(params, key).expect("generator");
    let reference = render(&generator, &key, EdgeFormat::Binary, params.num_edges() as usize);
    assert_eq!(render(&generator, &key, EdgeFormat::Binary, chunk_size), reference);
}

#[rstest]
fn text_output_lists_every_edge(params: GraphParameters) {
    let key = Key::default();
    let generator = EdgeGenerator::new(params, key).expect("generator");
    let text = String::from_utf8(render(&generator, &key, EdgeFormat::Text, 4_096)).expect("utf-8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len() as u64, params.num_edges());
    let first = generator.edge(0).expect("edge");
    assert_eq!(lines[0], format!("{}\t{}\t{}", first.src, first.dst, first.weight));
}

#[test]
fn spanning_tree_graphs_leave_no_isolated_source_component() {
    // Every vertex is the child of exactly one skeleton edge except the first root.
    let params = GraphParametersBuilder::new()
        .with_scale(7)
        .with_tree(TreeMode::Spanning)
        .build()
        .expect("valid");
    let key = Key::default();
    let generator = EdgeGenerator::new(params, key).expect("generator");
    let bytes = render(&generator, &key, EdgeFormat::Binary, 500);
    let report = Verifier::new(bytes.as_slice()).run().expect("verifies");
    let isolated = report.hist()[0];
    assert!(isolated <= 1, "{isolated} vertices have no outgoing edge");
}

#[test]
fn truncated_files_fail_verification() {
    let params = GraphParametersBuilder::new().with_scale(5).build().expect("valid");
    let key = Key::default();
    let generator = EdgeGenerator::new(params, key).expect("generator");
    let mut bytes = render(&generator, &key, EdgeFormat::Binary, 64);
    bytes.truncate(bytes.len() - 16);
    let err = Verifier::new(bytes.as_slice()).run().expect_err("one edge short");
    assert_eq!(err.detailed_code(), "VALIDATION_EDGE_COUNT_MISMATCH");
    assert!(matches!(err, VerifyError::Validation(_)));
}

#[rstest]
fn production_and_verification_are_traced(params: GraphParameters) {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let key = Key::default();
    let generator = EdgeGenerator::new(params, key).expect("generator");

    let bytes = tracing::subscriber::with_default(subscriber, || {
        let bytes = render(&generator, &key, EdgeFormat::Binary, 3_000);
        Verifier::new(bytes.as_slice()).run().expect("verifies");
        bytes
    });
    assert!(!bytes.is_empty());

    let produce = layer.span("generate.produce").expect("produce span");
    assert_eq!(produce.field("num_edges"), Some("8192"));
    assert_eq!(produce.field("chunk_size"), Some("3000"));
    assert_eq!(produce.field("chunks"), Some("3"));

    let scan = layer.span("verify.scan_edges").expect("scan span");
    assert_eq!(scan.field("edges"), Some("8192"));
    assert!(layer.span("verify.read_header").is_some());
    assert!(layer.span("verify.reduce").is_some());
    assert!(layer.has_message(Level::INFO, "generation complete"));
    assert!(layer.has_message(Level::INFO, "header parsed"));
}

#[test]
fn failed_phases_record_an_error_event() {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let input = b"--format el32 --num_edges 0 --num_vertices 1\n";

    let err = tracing::subscriber::with_default(subscriber, || {
        Verifier::new(&input[..]).run().expect_err("unsupported format")
    });
    assert!(matches!(err, VerifyError::Format(_)));
    assert!(layer.span("verify.read_header").is_some());
    assert!(
        layer
            .events()
            .iter()
            .any(|event| event.level == Level::ERROR && event.field("error").is_some())
    );
}

/// Sink that refuses every chunk after the first.
struct OneChunkSink {
    accepted: usize,
}

impl EdgeSink for OneChunkSink {
    fn write_chunk(&mut self, _first_index: u64, edges: &[krongen_core::Edge]) -> std::io::Result<()> {
        if self.accepted > 0 {
            return Err(std::io::Error::other("sink closed"));
        }
        self.accepted = edges.len();
        Ok(())
    }
}

#[rstest]
fn sink_failures_surface_as_generate_errors(params: GraphParameters) {
    let generator = EdgeGenerator::new(params, Key::default()).expect("generator");
    let mut sink = OneChunkSink { accepted: 0 };
    let err = ChunkProducer::new(&generator, 100)
        .expect("producer")
        .produce(&mut sink)
        .expect_err("second chunk fails");
    assert_eq!(err.code().as_str(), "GENERATE_SINK");
    assert_eq!(sink.accepted, 100);
}
