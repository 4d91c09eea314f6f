//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - produced by any dataset source (archive, JSON file, synthetic generator)
//! - consumed read-only by the residual/decomposition/outer-product core
//! - exported alongside computed components for external plotting

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// A scalar metadata attribute attached to a dataset.
///
/// Archives carry an open-ended set of run parameters (stellar temperature,
/// spot size, inclination, ...). We keep them as an explicit name -> value map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Numeric view of the attribute (integers are widened).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Int(v) => Some(*v as f64),
            ScalarValue::Bool(_) | ScalarValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Bool(v) => write!(f, "{v}"),
            ScalarValue::Int(v) => write!(f, "{v}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Text(v) => write!(f, "{v}"),
        }
    }
}

pub type Attributes = BTreeMap<String, ScalarValue>;

/// A dynamic spectrum: one spectrum per rotational phase.
///
/// `active` is stored phase-major (P rows x N columns). The dataset is built
/// once and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DynamicSpectrum {
    wavelengths: Vec<f64>,
    phases: Vec<f64>,
    quiet: Vec<f64>,
    active: DMatrix<f64>,
    attributes: Attributes,
    source: Option<PathBuf>,
}

impl DynamicSpectrum {
    /// Assemble a dataset, checking the shape invariant
    /// `active.rows == len(phases)` and `active.cols == len(wavelengths) == len(quiet)`.
    ///
    /// Monotonicity of the grids is the source's responsibility and is not checked.
    pub fn new(
        wavelengths: Vec<f64>,
        phases: Vec<f64>,
        quiet: Vec<f64>,
        active: DMatrix<f64>,
        attributes: Attributes,
    ) -> Result<Self, AnalysisError> {
        if wavelengths.is_empty() || phases.is_empty() {
            return Err(AnalysisError::invalid(format!(
                "dataset grids must be non-empty (wavelengths={}, phases={})",
                wavelengths.len(),
                phases.len()
            )));
        }
        if quiet.len() != wavelengths.len() {
            return Err(AnalysisError::invalid(format!(
                "quiet spectrum has {} samples but wavelength grid has {}",
                quiet.len(),
                wavelengths.len()
            )));
        }
        if active.nrows() != phases.len() || active.ncols() != wavelengths.len() {
            return Err(AnalysisError::invalid(format!(
                "active matrix is {}x{}, expected {}x{} (phases x wavelengths)",
                active.nrows(),
                active.ncols(),
                phases.len(),
                wavelengths.len()
            )));
        }

        Ok(Self {
            wavelengths,
            phases,
            quiet,
            active,
            attributes,
            source: None,
        })
    }

    /// Record the file the dataset was read from.
    pub fn with_source(mut self, path: PathBuf) -> Self {
        self.source = Some(path);
        self
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn phases(&self) -> &[f64] {
        &self.phases
    }

    pub fn quiet(&self) -> &[f64] {
        &self.quiet
    }

    pub fn active(&self) -> &DMatrix<f64> {
        &self.active
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    pub fn nphases(&self) -> usize {
        self.phases.len()
    }

    pub fn nwavelengths(&self) -> usize {
        self.wavelengths.len()
    }

    /// Look up a metadata attribute by name.
    pub fn attr(&self, name: &str) -> Option<&ScalarValue> {
        self.attributes.get(name)
    }

    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        self.attr(name).and_then(ScalarValue::as_f64)
    }
}

/// Joint orientation of a singular pair.
///
/// `(u, v)` and `(-u, -v)` describe the same rank-1 term; the choice only
/// affects how the margin curves are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    #[default]
    Positive,
    Negative,
}

impl Sign {
    pub fn factor(self) -> f64 {
        match self {
            Sign::Positive => 1.0,
            Sign::Negative => -1.0,
        }
    }
}

/// Archived datasets known to the fetch registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetId {
    /// Full spectrum (3923–6664 Å) computed at 4 phases.
    Full,
    /// Ca II H & K region (3923–4010 Å) computed at 100 phases.
    CaHk,
}

impl DatasetId {
    /// File name of the archive in the registry and cache directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DatasetId::Full => "lambda-3923-6664-phases-4.h5",
            DatasetId::CaHk => "lambda-3923-4010-phases-100.h5",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DatasetId::Full => "Full spectrum, 4 phases",
            DatasetId::CaHk => "Ca II H & K region, 100 phases",
        }
    }
}

/// A named spectral line used as a vertical marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralLine {
    pub name: &'static str,
    /// Air wavelength (Å).
    pub air: f64,
    /// Vacuum wavelength (Å).
    pub vacuum: f64,
}

/// Ca II K resonance line.
pub const CA_II_K: SpectralLine = SpectralLine {
    name: "Ca II K",
    air: 3933.663,
    vacuum: 3934.777,
};

/// Ca II H resonance line.
pub const CA_II_H: SpectralLine = SpectralLine {
    name: "Ca II H",
    air: 3968.468,
    vacuum: 3969.591,
};

/// Marker lines for the Ca II region. SOAP2 spectra use air wavelengths.
pub const CA_II_LINES: [SpectralLine; 2] = [CA_II_K, CA_II_H];

/// Where the analysis reads its dataset from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    Archive(DatasetId),
    File(PathBuf),
    Synthetic { seed: u64 },
}

/// A zoom window over the display axes.
///
/// Zooming is always fulfilled by sub-selecting data (see
/// `OuterProductModel::zoom`), never by changing axis limits on rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRequest {
    pub x: (f64, f64),
    pub y: Option<(f64, f64)>,
}

/// A full run's configuration as understood by the pipeline.
///
/// Derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub source: SourceSpec,
    pub cache_dir: Option<PathBuf>,

    /// Number of singular triplets to compute.
    pub rank: usize,
    /// Rescale the residual matrix to [0, 1] before decomposing.
    pub normalize: bool,
    /// Components (1 = dominant) whose sign is flipped for presentation.
    pub flip: Vec<usize>,

    pub zoom: Option<ZoomRequest>,
    pub markers: Vec<f64>,

    pub heatmap: bool,
    pub heatmap_width: usize,
    pub heatmap_height: usize,

    pub export_json: Option<PathBuf>,
    pub export_csv: Option<PathBuf>,
}

impl AnalysisConfig {
    /// Presentation sign for the `n`-th component counted from the dominant one.
    pub fn sign_for(&self, n: usize) -> Sign {
        if self.flip.contains(&n) {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            source: SourceSpec::Archive(DatasetId::CaHk),
            cache_dir: None,
            rank: 3,
            normalize: true,
            flip: Vec::new(),
            zoom: None,
            markers: CA_II_LINES.iter().map(|l| l.air).collect(),
            heatmap: false,
            heatmap_width: 80,
            heatmap_height: 24,
            export_json: None,
            export_csv: None,
        }
    }
}
