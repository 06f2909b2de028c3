//! Data sources.
//!
//! - `results`: manifest + per-file JSON documents over HTTP

pub mod results;

pub use results::{
    HttpResultsSource, ResultsSource, SourceConfig, deployment_base, fetch_data, try_fetch_data,
};
