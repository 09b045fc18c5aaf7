//! Benchmark support crate for krongen.
//!
//! Provides parameter types and in-memory graph fixtures used by the Criterion
//! benchmarks for chunked generation and degree verification.

pub mod error;
pub mod fixtures;
pub mod params;
