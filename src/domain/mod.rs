//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the in-memory dataset (`DynamicSpectrum`) and its metadata attributes
//! - registry identifiers and spectral line markers
//! - run configuration (`AnalysisConfig`, `ZoomRequest`, `Sign`)

pub mod types;

pub use types::*;
