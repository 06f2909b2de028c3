//! `perf-trends` library crate.
//!
//! The binary (`perf-trends`) is a thin wrapper around this library so that:
//!
//! - the normalization pipeline is testable without spawning processes
//! - the fetch layer can be driven by an in-memory source in tests
//! - presentation (`log` printing, `chart` TUI) stays separate from data shaping

pub mod app;
pub mod chart;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod report;
pub mod tui;
