//! Command implementations and argument parsing for the krongen CLI.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use krongen_core::{
    BINNED_BINS, ChunkProducer, ConfigError, DEFAULT_A, DEFAULT_B, DEFAULT_CHUNK_SIZE, DEFAULT_EDGEFACTOR,
    DEFAULT_NOISE_FACTOR, DEFAULT_TOP_K, DegreeReport, EdgeFormat, EdgeGenerator, EdgeListHeader,
    EdgeWriter, GenerateError, GraphParameters, GraphParametersBuilder, Key, Scrambler, SeedError,
    TreeMode, Verifier, VerifyError,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

/// Default path of the verification report.
pub const DEFAULT_REPORT_PATH: &str = "graph_meta.json";

/// Output path that selects standard output.
const STDOUT_PATH: &str = "-";

/// Input buffer used while scanning an edge list.
const READ_BUFFER_BYTES: usize = 1 << 20;

/// Top vertices shown by [`render_summary`].
const PREVIEW_VERTICES: usize = 10;

/// Leading exact-degree bins shown by [`render_summary`].
const PREVIEW_EXACT_BINS: usize = 16;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "krongen",
    about = "Generate reproducible Kronecker graphs and verify their degree distributions."
)]
pub struct Cli {
    /// Log verbosity: 0 warn, 1 info, 2 debug, 3 trace. Overrides `VERBOSE`.
    #[arg(long, short = 'v', global = true)]
    pub verbose: Option<u8>,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate a graph and stream its edge list.
    Generate(GenerateArgs),
    /// Verify an el64 edge list and write its degree report.
    Verify(VerifyArgs),
}

/// Options accepted by the `generate` command.
#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Base-2 logarithm of the vertex count.
    #[arg(long)]
    pub scale: u32,

    /// Edges per vertex.
    #[arg(long, default_value_t = DEFAULT_EDGEFACTOR)]
    pub edgefactor: u64,

    /// Probability of the top-left quadrant.
    #[arg(short = 'A', long = "prob-a", default_value_t = DEFAULT_A)]
    pub a: f64,

    /// Probability of each off-diagonal quadrant.
    #[arg(short = 'B', long = "prob-b", default_value_t = DEFAULT_B)]
    pub b: f64,

    /// Per-level perturbation amplitude.
    #[arg(long, default_value_t = DEFAULT_NOISE_FACTOR)]
    pub noise: f64,

    /// Prepend a spanning tree over every vertex.
    #[arg(long, conflicts_with = "tree_roots")]
    pub tree: bool,

    /// Prepend a tree over this many sampled roots.
    #[arg(long = "tree-roots", value_name = "N")]
    pub tree_roots: Option<u64>,

    /// Edges materialised per chunk.
    #[arg(long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Output format: binary (el64), text, or csv.
    #[arg(long, default_value_t = EdgeFormat::default())]
    pub format: EdgeFormat,

    /// Output path; `-` or omitted writes to standard output.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Key word 0; overrides `SEED0`.
    #[arg(long)]
    pub seed0: Option<u32>,

    /// Key word 1; overrides `SEED1`.
    #[arg(long)]
    pub seed1: Option<u32>,

    /// Key word 2; overrides `SEED2`.
    #[arg(long)]
    pub seed2: Option<u32>,

    /// Key word 3; overrides `SEED3`.
    #[arg(long)]
    pub seed3: Option<u32>,

    /// Derive the vertex permutation from the key instead of the fixed one.
    #[arg(long = "keyed-scramble")]
    pub keyed_scramble: bool,
}

impl GenerateArgs {
    fn tree_mode(&self) -> TreeMode {
        match (self.tree, self.tree_roots) {
            (_, Some(roots)) => TreeMode::Roots(roots),
            (true, None) => TreeMode::Spanning,
            (false, None) => TreeMode::Off,
        }
    }

    const fn seed_overrides(&self) -> [Option<u32>; 4] {
        [self.seed0, self.seed1, self.seed2, self.seed3]
    }

    fn destination(&self) -> Option<&Path> {
        self.output
            .as_deref()
            .filter(|path| path.as_os_str() != STDOUT_PATH)
    }

    fn parameters(&self) -> Result<GraphParameters, ConfigError> {
        GraphParametersBuilder::new()
            .with_scale(self.scale)
            .with_edgefactor(self.edgefactor)
            .with_probabilities(self.a, self.b)
            .with_noise_factor(self.noise)
            .with_tree(self.tree_mode())
            .build()
    }
}

/// Options accepted by the `verify` command.
#[derive(Debug, Args, Clone)]
pub struct VerifyArgs {
    /// el64 edge list to verify.
    pub input: PathBuf,

    /// Path of the JSON report.
    #[arg(default_value = DEFAULT_REPORT_PATH)]
    pub output: PathBuf,

    /// Number of highest-degree vertices kept in the report.
    #[arg(long = "top-k", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O failed while opening, writing, or flushing a path.
    #[error("failed to access `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The verification report could not be serialised.
    #[error("failed to write report `{path}`: {source}")]
    Report {
        /// Report path.
        path: PathBuf,
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
    /// A seed override in the environment was malformed.
    #[error(transparent)]
    Seed(#[from] SeedError),
    /// Graph parameters were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Generation failed.
    #[error(transparent)]
    Generate(#[from] GenerateError),
    /// Verification failed.
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

impl CliError {
    /// Returns the stable code of the underlying core error, if any.
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Io { .. } | Self::Report { .. } => None,
            Self::Seed(err) => Some(err.code().as_str()),
            Self::Config(err) => Some(err.code().as_str()),
            Self::Generate(err) => Some(err.code().as_str()),
            Self::Verify(err) => Some(err.detailed_code()),
        }
    }
}

/// Outcome of a `generate` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Output file, or `None` for standard output.
    pub output: Option<PathBuf>,
    /// Format the edges were written in.
    pub format: EdgeFormat,
    /// Header describing the generated graph.
    pub header: EdgeListHeader,
    /// Number of chunks produced.
    pub chunks: u64,
}

/// Outcome of a `verify` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSummary {
    /// Path of the written JSON report.
    pub report_path: PathBuf,
    /// Degree statistics of the verified graph.
    pub report: DegreeReport,
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionSummary {
    /// A graph was generated.
    Generated(GenerationSummary),
    /// A graph was verified.
    Verified(VerificationSummary),
}

/// Executes the CLI command represented by `cli`, resolving seed overrides
/// from the process environment.
///
/// # Errors
/// Returns [`CliError`] when parameters are rejected or execution fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use clap::Parser;
/// # use krongen_cli::cli::{Cli, ExecutionSummary, run_cli};
/// # use tempfile::TempDir;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let dir = TempDir::new()?;
/// let graph = dir.path().join("graph.el64");
/// let report = dir.path().join("graph_meta.json");
/// run_cli(Cli::try_parse_from([
///     "krongen", "generate", "--scale", "6", "--format", "binary",
///     "--seed0", "1", "--seed1", "2", "--seed2", "3", "--seed3", "4",
///     "--output", graph.to_str().ok_or("path")?,
/// ])?)?;
/// let summary = run_cli(Cli::try_parse_from([
///     "krongen", "verify", graph.to_str().ok_or("path")?, report.to_str().ok_or("path")?,
/// ])?)?;
/// let ExecutionSummary::Verified(verified) = summary else { unreachable!() };
/// assert_eq!(verified.report.num_edges(), 1024);
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    run_with_env(cli, |name| std::env::var_os(name))
}

pub(super) fn run_with_env(
    cli: Cli,
    lookup: impl Fn(&str) -> Option<OsString>,
) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    match cli.command {
        Command::Generate(args) => {
            span.record("command", field::display("generate"));
            let key = resolve_key(&args, lookup)?;
            run_generate(&args, key).map(ExecutionSummary::Generated)
        }
        Command::Verify(args) => {
            span.record("command", field::display("verify"));
            run_verify(&args).map(ExecutionSummary::Verified)
        }
    }
}

/// Applies `SEED0`..`SEED3` from `lookup`, then the explicit `--seedN` flags.
pub(super) fn resolve_key(
    args: &GenerateArgs,
    lookup: impl Fn(&str) -> Option<OsString>,
) -> Result<Key, SeedError> {
    Ok(Key::default()
        .with_env_overrides(lookup)?
        .with_overrides(args.seed_overrides()))
}

#[instrument(
    name = "cli.generate",
    err,
    skip(args, key),
    fields(scale = args.scale, format = %args.format, output = field::Empty),
)]
pub(super) fn run_generate(args: &GenerateArgs, key: Key) -> Result<GenerationSummary, CliError> {
    let params = args.parameters()?;
    let mut generator = EdgeGenerator::new(params, key)?;
    if args.keyed_scramble {
        generator = generator.with_scrambler(Scrambler::keyed(params.scale(), &key));
    }
    let producer = ChunkProducer::new(&generator, args.chunk_size)?;
    let header = EdgeListHeader::new(params.num_vertices(), params.num_edges()).with_key(&key);

    let destination = args.destination();
    let label = destination.unwrap_or_else(|| Path::new(STDOUT_PATH));
    Span::current().record("output", field::display(label.display()));
    let io_error = |source| CliError::Io {
        path: label.to_path_buf(),
        source,
    };

    let chunks = match destination {
        Some(path) => {
            let file = File::create(path).map_err(io_error)?;
            write_edges(&producer, BufWriter::new(file), args.format, &header, io_error)?
        }
        None => {
            let stdout = io::stdout();
            write_edges(&producer, BufWriter::new(stdout.lock()), args.format, &header, io_error)?
        }
    };

    info!(
        num_vertices = header.num_vertices(),
        num_edges = header.num_edges(),
        chunks,
        "graph written"
    );
    Ok(GenerationSummary {
        output: destination.map(Path::to_path_buf),
        format: args.format,
        header,
        chunks,
    })
}

fn write_edges<W: Write>(
    producer: &ChunkProducer<'_>,
    out: W,
    format: EdgeFormat,
    header: &EdgeListHeader,
    io_error: impl Fn(io::Error) -> CliError,
) -> Result<u64, CliError> {
    let mut writer = EdgeWriter::new(out, format, header).map_err(&io_error)?;
    match producer.produce(&mut writer) {
        Ok(summary) => Ok(summary.chunks()),
        Err(GenerateError::Sink(source)) => Err(io_error(source)),
        Err(err) => Err(err.into()),
    }
}

#[instrument(
    name = "cli.verify",
    err,
    skip(args),
    fields(input = %args.input.display(), report = %args.output.display()),
)]
pub(super) fn run_verify(args: &VerifyArgs) -> Result<VerificationSummary, CliError> {
    let reader = open_edge_list(&args.input)?;
    let report = Verifier::new(reader).with_top_k(args.top_k).run()?;
    write_report(&report, &args.output)?;
    info!(
        max_degree = report.max_degree(),
        report = %args.output.display(),
        "verification complete"
    );
    Ok(VerificationSummary {
        report_path: args.output.clone(),
        report,
    })
}

pub(super) fn open_edge_list(path: &Path) -> Result<BufReader<File>, CliError> {
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::with_capacity(READ_BUFFER_BYTES, file))
}

pub(super) fn write_report(report: &DegreeReport, path: &Path) -> Result<(), CliError> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).map_err(|source| CliError::Report {
        path: path.to_path_buf(),
        source,
    })?;
    writeln!(writer).map_err(io_error)?;
    writer.flush().map_err(io_error)
}

/// Renders `summary` to `writer` in a human-readable text format. Nothing is
/// written for a graph streamed to standard output.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary {
        ExecutionSummary::Generated(generated) => {
            let Some(path) = &generated.output else {
                return Ok(());
            };
            writeln!(
                writer,
                "wrote {} edges over {} vertices ({}) to {}",
                generated.header.num_edges(),
                generated.header.num_vertices(),
                generated.format,
                path.display(),
            )
        }
        ExecutionSummary::Verified(verified) => render_report(&verified.report, &verified.report_path, writer),
    }
}

fn render_report(report: &DegreeReport, path: &Path, mut writer: impl Write) -> io::Result<()> {
    writeln!(
        writer,
        "scale {}: {} vertices, {} edges",
        report.scale(),
        report.num_vertices(),
        report.num_edges(),
    )?;
    writeln!(writer, "max degree: {}", report.max_degree())?;
    writeln!(writer, "exact degrees:")?;
    for (degree, count) in report.hist().iter().enumerate().take(PREVIEW_EXACT_BINS) {
        writeln!(writer, "  {degree}\t{count}")?;
    }
    writeln!(writer, "degree histogram:")?;
    for (bin, &count) in report.binned_hist().iter().enumerate() {
        if count != 0 {
            writeln!(writer, "  {}\t{count}", bin_label(bin))?;
        }
    }
    writeln!(writer, "largest degrees:")?;
    for entry in report.largest_degree_vertices().iter().rev().take(PREVIEW_VERTICES) {
        writeln!(writer, "  {}\t{}", entry.vertex_id, entry.degree)?;
    }
    writeln!(writer, "report: {}", path.display())
}

/// Degree range of a power-of-two bin. The last bin is open ended.
pub(super) fn bin_label(bin: usize) -> String {
    let Ok(bits) = u32::try_from(bin) else {
        return format!("bin {bin}");
    };
    let low = if bits == 0 { 0 } else { 1_u64 << (bits - 1) };
    if bin + 1 >= BINNED_BINS {
        return format!("[{low}, inf)");
    }
    format!("[{low}, {})", 1_u64 << bits)
}
