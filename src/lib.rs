//! `dynspec` library crate.
//!
//! The binary (`dynspec`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the numerical core (`math`, `models`) is reusable from other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
