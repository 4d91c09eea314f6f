//! Rendering boundary and the built-in terminal renderer.
//!
//! - `payload`: what a renderer receives (transposed image, extent, curves, markers)
//! - `ascii`: a small heatmap for terminals

pub mod ascii;
pub mod payload;

pub use ascii::AsciiHeatmap;
pub use payload::{Curve, RenderPayload, Renderer};
