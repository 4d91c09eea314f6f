//! Command-line parsing for the dynamic-spectrum SVD tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the numerical code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::DatasetId;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dynspec", version, about = "Low-rank SVD analysis of dynamic stellar spectra")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decompose a dynamic spectrum, print the components and optionally render/export them.
    Analyze(AnalyzeArgs),
    /// Download archived datasets into the local cache.
    Fetch(FetchArgs),
    /// Write a seeded synthetic dataset (quiet star + rank-1 spot signal) to JSON.
    Synth(SynthArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Archived dataset to analyze (fetched on first use).
    #[arg(long, value_enum, conflicts_with_all = ["input", "synthetic"])]
    pub dataset: Option<DatasetId>,

    /// Dataset file on disk (JSON layout).
    #[arg(short = 'i', long, value_name = "PATH", conflicts_with = "synthetic")]
    pub input: Option<PathBuf>,

    /// Analyze a generated dataset instead of an archive.
    #[arg(long)]
    pub synthetic: bool,

    /// Seed for `--synthetic`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of singular triplets to compute.
    #[arg(short = 'k', long = "rank", default_value_t = 3)]
    pub rank: usize,

    /// Rescale the residual matrix to [0, 1] before decomposing (enabled by default).
    #[arg(long, default_value_t = true)]
    pub normalize: bool,

    /// Decompose the raw residual matrix.
    #[arg(long)]
    pub raw: bool,

    /// Flip the sign of the N-th component counted from the dominant one (repeatable).
    #[arg(long, value_name = "N")]
    pub flip: Vec<usize>,

    /// Restrict the wavelength axis to [LO, HI] (Angstrom).
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], allow_negative_numbers = true)]
    pub zoom_x: Option<Vec<f64>>,

    /// Restrict the phase axis to [LO, HI]. Requires `--zoom-x`.
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], allow_negative_numbers = true, requires = "zoom_x")]
    pub zoom_y: Option<Vec<f64>>,

    /// Place line markers at vacuum instead of air wavelengths.
    #[arg(long)]
    pub vacuum: bool,

    /// Render each component as a terminal heatmap.
    #[arg(long)]
    pub heatmap: bool,

    /// Heatmap width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Heatmap height (rows).
    #[arg(long, default_value_t = 24)]
    pub height: usize,

    /// Export component payloads (image, extent, curves, markers) to JSON.
    #[arg(long = "export-json", value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// Export singular values to CSV.
    #[arg(long = "export-csv", value_name = "PATH")]
    pub export_csv: Option<PathBuf>,

    /// Cache directory for archived datasets (default: $DYNSPEC_CACHE_DIR or ./SOAP2-1Spot).
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    /// Dataset to download; all registry entries when omitted.
    #[arg(long, value_enum)]
    pub dataset: Option<DatasetId>,

    /// Cache directory (default: $DYNSPEC_CACHE_DIR or ./SOAP2-1Spot).
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output JSON file.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of phases.
    #[arg(long, default_value_t = 40)]
    pub phases: usize,

    /// Number of wavelength samples.
    #[arg(long, default_value_t = 600)]
    pub wavelengths: usize,

    /// Spot signal amplitude (fraction of the continuum).
    #[arg(long, default_value_t = 0.02)]
    pub amplitude: f64,

    /// Gaussian noise sigma.
    #[arg(long, default_value_t = 1e-4)]
    pub noise: f64,
}
