//! Dataset acquisition: cached remote archive files and synthetic spectra.

pub mod fetch;
pub mod synthetic;

pub use fetch::{DataFetcher, Registry};
pub use synthetic::{SyntheticConfig, SyntheticData, generate};
