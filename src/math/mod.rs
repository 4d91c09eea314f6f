//! Numerical core: residuals and truncated decomposition.

pub mod lanczos;
pub mod residual;
pub mod svd;

pub use lanczos::{LanczosOptions, PartialSvd, partial_svd};
pub use residual::*;
pub use svd::*;
