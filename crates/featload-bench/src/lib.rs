#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! Benchmark harness for featload.
//!
//! Run benchmarks with: `cargo bench -p featload-bench`
//!
//! The crate only holds criterion benchmarks for the index and resolver.
