//! Command-line interface for generating Kronecker graphs and verifying their
//! degree distributions.
//!
//! `generate` streams an edge list in one of the supported formats and
//! `verify` reads an el64 file back, checks it against its header, and writes
//! a JSON degree report.

mod commands;

pub use commands::{
    Cli, CliError, Command, DEFAULT_REPORT_PATH, ExecutionSummary, GenerateArgs,
    GenerationSummary, VerificationSummary, VerifyArgs, render_summary, run_cli,
};
