//! Input/output helpers.
//!
//! - dataset readers/writers and sources (`dataset`)
//! - HDF5 archive reader, behind the `hdf5` feature (`h5`)
//! - result exports (JSON/CSV) (`export`)

pub mod dataset;
pub mod export;
#[cfg(feature = "hdf5")]
pub mod h5;

pub use dataset::*;
pub use export::*;
