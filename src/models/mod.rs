//! Outer-product models built from singular triplets.
//!
//! Each retained triplet becomes an `OuterProductModel`: the wavelength basis
//! along x, the phase basis along y, with pixel-aligned display extents.

pub mod outer;

pub use outer::*;
