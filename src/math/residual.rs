//! Mean-subtracted ("delta") representation of a dynamic spectrum.
//!
//! Given the phase-major active matrix `A` (P x N):
//!
//! ```text
//! average[j] = (1/P) Σ_i A[i][j]
//! delta[i][j] = A[i][j] - average[j]
//! ```
//!
//! Subtracting the time-averaged spectrum removes the static stellar spectrum
//! and leaves only the phase-dependent (spot-induced) variation.

use nalgebra::{DMatrix, DVector};

use crate::error::AnalysisError;

/// Time-averaged spectrum and residual matrix.
#[derive(Debug, Clone)]
pub struct Residual {
    pub average: DVector<f64>,
    pub delta: DMatrix<f64>,
}

impl Residual {
    /// Compute the residual of a phase-major matrix.
    pub fn of(active: &DMatrix<f64>) -> Result<Self, AnalysisError> {
        let (average, delta) = compute_residual(active)?;
        Ok(Self { average, delta })
    }

    /// `delta` rescaled to `[0, 1]`.
    pub fn normalized(&self) -> Result<DMatrix<f64>, AnalysisError> {
        normalize(&self.delta)
    }

    /// Squared Frobenius norm of `delta` (total variance energy).
    pub fn energy(&self) -> f64 {
        self.delta.norm_squared()
    }
}

/// Subtract the column-wise mean from each row.
pub fn compute_residual(active: &DMatrix<f64>) -> Result<(DVector<f64>, DMatrix<f64>), AnalysisError> {
    let (p, n) = active.shape();
    if p == 0 || n == 0 {
        return Err(AnalysisError::invalid(format!(
            "residual needs a non-empty matrix, got {p}x{n}"
        )));
    }

    let inv_p = 1.0 / p as f64;
    let average = DVector::from_iterator(n, active.column_iter().map(|col| col.sum() * inv_p));

    let mut delta = active.clone();
    for (j, mut col) in delta.column_iter_mut().enumerate() {
        col.add_scalar_mut(-average[j]);
    }

    Ok((average, delta))
}

/// Rescale a matrix linearly so its minimum maps to 0 and its maximum to 1.
///
/// A flat matrix has no range to rescale and is reported as `DegenerateRange`.
pub fn normalize(delta: &DMatrix<f64>) -> Result<DMatrix<f64>, AnalysisError> {
    if delta.is_empty() {
        return Err(AnalysisError::invalid("cannot normalize an empty matrix"));
    }
    if delta.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::invalid("cannot normalize a matrix with non-finite entries"));
    }

    let lo = delta.min();
    let hi = delta.max();
    if hi == lo {
        return Err(AnalysisError::DegenerateRange { value: lo });
    }

    let span = hi - lo;
    Ok(delta.map(|v| (v - lo) / span))
}

/// Stride used to sample a readable subset of phases for reports.
///
/// Every tenth of the series when there are at least ten phases, else every phase.
pub fn phase_subset_step(nphases: usize) -> usize {
    if nphases >= 10 { nphases / 10 } else { 1 }
}
