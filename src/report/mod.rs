//! Reporting utilities: per-component summaries and formatted terminal output.

use nalgebra::DMatrix;

use crate::domain::Sign;
use crate::math::{TripletSet, phase_subset_step};
use crate::models::Extent;

pub mod format;

pub use format::*;

/// One retained component as shown in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSummary {
    /// 1 = dominant.
    pub from_end: usize,
    pub sigma: f64,
    /// `σ² / ‖M‖_F²` for the decomposed matrix `M`.
    pub energy_fraction: f64,
    pub extent: Extent,
    pub sign: Sign,
}

/// Spread of one residual spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseAmplitude {
    pub index: usize,
    pub phase: f64,
    pub min: f64,
    pub max: f64,
    pub rms: f64,
}

/// Fraction of the total energy carried by each triplet, in the set's order.
///
/// A zero-energy matrix yields zeros rather than NaNs.
pub fn energy_fractions(set: &TripletSet, total_energy: f64) -> Vec<f64> {
    set.singular_values()
        .iter()
        .map(|s| if total_energy > 0.0 { s * s / total_energy } else { 0.0 })
        .collect()
}

/// Amplitudes of the mean-subtracted spectra at a readable subset of phases.
pub fn phase_amplitudes(phases: &[f64], delta: &DMatrix<f64>) -> Vec<PhaseAmplitude> {
    let n = delta.ncols();
    if n == 0 {
        return Vec::new();
    }
    let step = phase_subset_step(delta.nrows());

    (0..delta.nrows().min(phases.len()))
        .step_by(step)
        .map(|i| {
            let row = delta.row(i);
            PhaseAmplitude {
                index: i,
                phase: phases[i],
                min: row.min(),
                max: row.max(),
                rms: (row.norm_squared() / n as f64).sqrt(),
            }
        })
        .collect()
}
