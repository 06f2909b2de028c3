//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`AlignmentMode`, `TimestampPrecision`)
//! - the raw wire record (`RawRecord`)
//! - normalized output points and series (`NormalizedPoint`, `SeriesMap`)

pub mod types;

pub use types::*;
