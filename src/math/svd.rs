//! Truncated decomposition of the residual matrix into singular triplets.
//!
//! Ordering convention: triplets come back in **increasing** order of σ, the
//! same layout as the classic `(U, s, Vt)` sparse-SVD output. The dominant
//! component is the last one, the second-most-dominant the one before it, and
//! so on. `TripletSet::from_end(1)` is the dominant triplet.
//!
//! Sign convention: none. Each `(u, v)` pair may come back as `(-u, -v)`
//! relative to another implementation; presentation code picks the sign
//! explicitly (see `domain::Sign`).

use nalgebra::{DMatrix, DVector};

use crate::error::AnalysisError;
use crate::math::lanczos::{LanczosOptions, partial_svd};

/// One singular triplet.
///
/// - `u`: phase-basis vector (length P, one entry per phase)
/// - `v`: wavelength-basis vector (length N, one entry per wavelength)
#[derive(Debug, Clone, PartialEq)]
pub struct SingularTriplet {
    pub sigma: f64,
    pub u: DVector<f64>,
    pub v: DVector<f64>,
}

impl SingularTriplet {
    /// `σ u vᵀ`, phase-major (P x N) like the matrix it was taken from.
    pub fn rank_one(&self) -> DMatrix<f64> {
        &self.u * self.v.transpose() * self.sigma
    }
}

/// The `k` retained triplets, ascending in σ.
#[derive(Debug, Clone)]
pub struct TripletSet {
    singular_values: Vec<f64>,
    /// P x k; column `i` pairs with `singular_values[i]`.
    u: DMatrix<f64>,
    /// k x N; row `i` pairs with `singular_values[i]`.
    vt: DMatrix<f64>,
    subspace: usize,
}

impl TripletSet {
    pub fn len(&self) -> usize {
        self.singular_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singular_values.is_empty()
    }

    /// Singular values in increasing order.
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    /// Krylov dimension the decomposition needed to converge.
    pub fn subspace(&self) -> usize {
        self.subspace
    }

    /// Phase-basis vectors as columns (P x k).
    pub fn u(&self) -> &DMatrix<f64> {
        &self.u
    }

    /// Wavelength-basis vectors as rows (k x N).
    pub fn vt(&self) -> &DMatrix<f64> {
        &self.vt
    }

    /// Triplet at position `i` in the returned (ascending) order.
    pub fn triplet(&self, i: usize) -> Option<SingularTriplet> {
        let sigma = *self.singular_values.get(i)?;
        Some(SingularTriplet {
            sigma,
            u: self.u.column(i).into_owned(),
            v: self.vt.row(i).transpose(),
        })
    }

    /// The `n`-th triplet counted from the end: `n = 1` is the dominant one,
    /// `n = 2` the second, and so on.
    pub fn from_end(&self, n: usize) -> Option<SingularTriplet> {
        if n == 0 || n > self.len() {
            return None;
        }
        self.triplet(self.len() - n)
    }

    /// Triplets from the dominant one downwards, paired with their rank from the end.
    pub fn dominant_first(&self) -> impl Iterator<Item = (usize, SingularTriplet)> + '_ {
        (1..=self.len()).filter_map(move |n| self.from_end(n).map(|t| (n, t)))
    }

    /// `σ_i u_i v_iᵀ` for the triplet at position `i`.
    pub fn rank_one(&self, i: usize) -> Option<DMatrix<f64>> {
        self.triplet(i).map(|t| t.rank_one())
    }

    /// Sum of all retained rank-1 terms (P x N).
    pub fn reconstruct(&self) -> DMatrix<f64> {
        let sigma = DMatrix::from_diagonal(&DVector::from_column_slice(&self.singular_values));
        &self.u * sigma * &self.vt
    }
}

/// Computes the top-k singular triplets of a matrix.
#[derive(Debug, Clone, Default)]
pub struct TruncatedDecomposer {
    options: LanczosOptions,
}

impl TruncatedDecomposer {
    pub fn new(options: LanczosOptions) -> Self {
        Self { options }
    }

    /// Decompose `matrix` (P x N) into `k` triplets, ascending in σ.
    ///
    /// `k` must satisfy `1 <= k < min(P, N)`; it is never clamped.
    pub fn decompose(&self, matrix: &DMatrix<f64>, k: usize) -> Result<TripletSet, AnalysisError> {
        let (rows, cols) = matrix.shape();
        if rows == 0 || cols == 0 {
            return Err(AnalysisError::invalid(format!(
                "cannot decompose an empty {rows}x{cols} matrix"
            )));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::invalid("matrix contains non-finite entries"));
        }

        let limit = rows.min(cols);
        if k == 0 || k >= limit {
            return Err(AnalysisError::InvalidRank { k, limit });
        }

        let svd = partial_svd(matrix, k, &self.options);

        // The primitive returns descending order; flip to ascending.
        let mut singular_values = svd.singular_values;
        singular_values.reverse();
        let order: Vec<usize> = (0..k).rev().collect();
        let u = svd.left.select_columns(&order);
        let vt = svd.right.select_columns(&order).transpose();

        Ok(TripletSet {
            singular_values,
            u,
            vt,
            subspace: svd.subspace,
        })
    }
}

/// Decompose with default Lanczos options.
pub fn decompose(matrix: &DMatrix<f64>, k: usize) -> Result<TripletSet, AnalysisError> {
    TruncatedDecomposer::default().decompose(matrix, k)
}
