//! Synthetic dynamic spectra with an injected starspot signal.
//!
//! The quiet star is a unit continuum with Gaussian absorption lines. Each
//! active spectrum adds a separable spot term
//!
//! ```text
//! amplitude * profile(λ) * modulation(φ)
//! ```
//!
//! plus seeded Gaussian noise. `profile` is the antisymmetric distortion a
//! rotating spot imprints on each line (first derivative of the line shape)
//! and `modulation` is `sin(2πφ)`. Because the spot term is rank 1 by
//! construction, these datasets are the reference case for the decomposition.

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{Attributes, CA_II_LINES, DynamicSpectrum, ScalarValue};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub lambda_min: f64,
    pub lambda_max: f64,
    pub n_wavelengths: usize,
    pub phase_min: f64,
    pub phase_max: f64,
    pub n_phases: usize,
    /// Absorption line centers (Å).
    pub line_centers: Vec<f64>,
    /// Fractional depth of each line below the continuum.
    pub line_depth: f64,
    /// Gaussian sigma of each line (Å).
    pub line_width: f64,
    pub spot_amplitude: f64,
    pub noise_sigma: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            lambda_min: 3923.0,
            lambda_max: 4010.0,
            n_wavelengths: 600,
            phase_min: -0.5,
            phase_max: 0.5,
            n_phases: 40,
            line_centers: CA_II_LINES.iter().map(|l| l.air).collect(),
            line_depth: 0.8,
            line_width: 1.5,
            spot_amplitude: 0.02,
            noise_sigma: 1e-4,
            seed: 42,
        }
    }
}

/// A generated dataset and the exact spot term that was injected (P x N).
#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub dataset: DynamicSpectrum,
    pub injected: DMatrix<f64>,
}

pub fn generate(config: &SyntheticConfig) -> Result<SyntheticData, AppError> {
    if config.n_wavelengths < 2 || config.n_phases < 2 {
        return Err(AppError::new(2, "Synthetic grids need at least 2 wavelengths and 2 phases."));
    }
    if !(config.lambda_min.is_finite() && config.lambda_max.is_finite() && config.lambda_max > config.lambda_min) {
        return Err(AppError::new(2, "Invalid synthetic wavelength range."));
    }
    if !(config.phase_min.is_finite() && config.phase_max.is_finite() && config.phase_max > config.phase_min) {
        return Err(AppError::new(2, "Invalid synthetic phase range."));
    }
    if !(config.line_width.is_finite() && config.line_width > 0.0) {
        return Err(AppError::new(2, "Synthetic line width must be > 0."));
    }

    let noise = Normal::new(0.0, config.noise_sigma)
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let wavelengths = linspace(config.lambda_min, config.lambda_max, config.n_wavelengths);
    let phases = linspace(config.phase_min, config.phase_max, config.n_phases);

    let quiet: Vec<f64> = wavelengths
        .iter()
        .map(|&lam| quiet_flux(lam, &config.line_centers, config.line_depth, config.line_width))
        .collect();
    let profile: Vec<f64> = wavelengths
        .iter()
        .map(|&lam| spot_profile(lam, &config.line_centers, config.line_depth, config.line_width))
        .collect();
    let modulation: Vec<f64> = phases
        .iter()
        .map(|&phi| (2.0 * std::f64::consts::PI * phi).sin())
        .collect();

    let injected = DMatrix::from_fn(phases.len(), wavelengths.len(), |i, j| {
        config.spot_amplitude * modulation[i] * profile[j]
    });

    let mut active = injected.clone();
    for i in 0..phases.len() {
        for j in 0..wavelengths.len() {
            active[(i, j)] += quiet[j] + noise.sample(&mut rng);
        }
    }

    let mut attrs = Attributes::new();
    attrs.insert("generator".to_string(), ScalarValue::Text("synthetic".to_string()));
    let seed = match i64::try_from(config.seed) {
        Ok(v) => ScalarValue::Int(v),
        Err(_) => ScalarValue::Text(config.seed.to_string()),
    };
    attrs.insert("seed".to_string(), seed);
    attrs.insert("spot_amplitude".to_string(), ScalarValue::Float(config.spot_amplitude));
    attrs.insert("noise_sigma".to_string(), ScalarValue::Float(config.noise_sigma));
    attrs.insert("line_width".to_string(), ScalarValue::Float(config.line_width));

    let dataset = DynamicSpectrum::new(wavelengths, phases, quiet, active, attrs)?;
    Ok(SyntheticData { dataset, injected })
}

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n as f64 - 1.0);
    (0..n).map(|i| start + step * i as f64).collect()
}

fn quiet_flux(lam: f64, centers: &[f64], depth: f64, width: f64) -> f64 {
    1.0 - centers
        .iter()
        .map(|&c| depth * gaussian(lam - c, width))
        .sum::<f64>()
}

fn spot_profile(lam: f64, centers: &[f64], depth: f64, width: f64) -> f64 {
    centers
        .iter()
        .map(|&c| {
            let d = lam - c;
            depth * (d / width) * gaussian(d, width)
        })
        .sum()
}

fn gaussian(d: f64, width: f64) -> f64 {
    (-0.5 * (d / width).powi(2)).exp()
}
