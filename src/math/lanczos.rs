//! Truncated SVD via Golub–Kahan–Lanczos bidiagonalization.
//!
//! For a tall matrix `A` (m x n, m >= n) we build orthonormal Krylov bases
//!
//! ```text
//! V = [v_0 .. v_{l-1}]   (n x l),   U = [u_0 .. u_{l-1}]   (m x l)
//! ```
//!
//! by alternating `A v` and `A^T u` products, and then take a dense SVD of the
//! small projected matrix `B = U^T A V` (l x l). Ritz vectors `U·ub_i`, `V·vb_i`
//! approximate the leading singular vectors of `A`.
//!
//! Implementation choices:
//! - Full reorthogonalization (two Gram–Schmidt passes) against all previous
//!   basis vectors. Bases stay small, and this keeps `B` an honest projection
//!   even when the recurrence breaks down on rank-deficient inputs (which is
//!   the normal case: a mean-subtracted P x N matrix has rank <= P - 1).
//! - On breakdown we continue with a fresh random direction orthogonal to the
//!   current basis instead of stopping.
//! - The subspace dimension starts small and doubles until the requested
//!   triplets meet the residual tolerance. Once `l == n` the basis `V` spans
//!   all of `R^n` and the result is exact.
//! - The start vector and any restart directions come from a seeded RNG, so a
//!   given input and options always produce the same vectors, signs included.
//! - Wide inputs are handled by decomposing `A^T` and swapping the factors.

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

/// Default seed for the Krylov start vector.
pub const DEFAULT_SEED: u64 = 0x5EED_0F_5B07;

/// Tuning knobs for the Lanczos iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanczosOptions {
    /// Accepted residual `max(‖A v - σ u‖, ‖Aᵀ u - σ v‖)`, relative to the largest
    /// Ritz value.
    pub tolerance: f64,
    /// Seed for the start vector and breakdown restarts.
    pub seed: u64,
    /// Floor on the initial Krylov subspace dimension.
    pub min_subspace: usize,
}

impl Default for LanczosOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            seed: DEFAULT_SEED,
            min_subspace: 20,
        }
    }
}

/// Leading singular triplets in **descending** order of σ.
#[derive(Debug, Clone)]
pub struct PartialSvd {
    pub singular_values: Vec<f64>,
    /// Left singular vectors as columns (m x k).
    pub left: DMatrix<f64>,
    /// Right singular vectors as columns (n x k).
    pub right: DMatrix<f64>,
    /// Krylov dimension used for the accepted result.
    pub subspace: usize,
}

/// Compute the `k` largest singular triplets of `a`.
///
/// Callers validate `k` (see `TruncatedDecomposer`); here `k` is only assumed to
/// be in `1..=min(m, n)`.
pub fn partial_svd(a: &DMatrix<f64>, k: usize, opts: &LanczosOptions) -> PartialSvd {
    if a.nrows() < a.ncols() {
        let at = a.transpose();
        let svd = partial_svd_tall(&at, k, opts);
        return PartialSvd {
            singular_values: svd.singular_values,
            left: svd.right,
            right: svd.left,
            subspace: svd.subspace,
        };
    }
    partial_svd_tall(a, k, opts)
}

fn partial_svd_tall(a: &DMatrix<f64>, k: usize, opts: &LanczosOptions) -> PartialSvd {
    let n = a.ncols();
    let mut steps = (2 * k + 1).max(opts.min_subspace).min(n);

    loop {
        let mut rng = StdRng::seed_from_u64(opts.seed);
        let (u_basis, v_basis) = bidiagonalize(a, steps, &mut rng);
        let candidate = ritz_triplets(a, &u_basis, &v_basis, k);

        if steps >= n || converged(a, &candidate, opts.tolerance) {
            return PartialSvd {
                subspace: steps,
                ..candidate
            };
        }
        steps = (steps * 2).min(n);
    }
}

/// Build orthonormal bases `U` (m x steps) and `V` (n x steps) of the
/// Golub–Kahan Krylov spaces.
fn bidiagonalize(a: &DMatrix<f64>, steps: usize, rng: &mut StdRng) -> (DMatrix<f64>, DMatrix<f64>) {
    let (m, n) = a.shape();
    let breakdown = f64::EPSILON * a.norm().max(f64::MIN_POSITIVE) * (m.max(n) as f64);

    let mut us: Vec<DVector<f64>> = Vec::with_capacity(steps);
    let mut vs: Vec<DVector<f64>> = Vec::with_capacity(steps);

    let mut v = random_unit(n, &vs, rng);
    for j in 0..steps {
        vs.push(v.clone());

        let mut p = a * &v;
        orthogonalize(&mut p, &us);
        let alpha = p.norm();
        let u = if alpha > breakdown {
            p / alpha
        } else {
            random_unit(m, &us, rng)
        };
        us.push(u);

        if j + 1 == steps {
            break;
        }

        let mut r = a.tr_mul(&us[j]);
        orthogonalize(&mut r, &vs);
        let beta = r.norm();
        v = if beta > breakdown {
            r / beta
        } else {
            random_unit(n, &vs, rng)
        };
    }

    (DMatrix::from_columns(&us), DMatrix::from_columns(&vs))
}

/// Project `a` onto the bases and lift the top-k singular pairs of the projection.
fn ritz_triplets(a: &DMatrix<f64>, u_basis: &DMatrix<f64>, v_basis: &DMatrix<f64>, k: usize) -> PartialSvd {
    let av = a * v_basis;
    let b = u_basis.tr_mul(&av);
    let svd = b.svd(true, true);

    let (Some(ub), Some(vbt)) = (svd.u.as_ref(), svd.v_t.as_ref()) else {
        unreachable!("SVD computed with both factors requested");
    };

    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&i, &j| svd.singular_values[j].total_cmp(&svd.singular_values[i]));
    order.truncate(k);

    let mut singular_values = Vec::with_capacity(k);
    let mut left = Vec::with_capacity(k);
    let mut right = Vec::with_capacity(k);
    for &i in &order {
        singular_values.push(svd.singular_values[i].max(0.0));
        left.push(u_basis * ub.column(i));
        right.push(v_basis * vbt.row(i).transpose());
    }

    PartialSvd {
        singular_values,
        left: DMatrix::from_columns(&left),
        right: DMatrix::from_columns(&right),
        subspace: v_basis.ncols(),
    }
}

fn converged(a: &DMatrix<f64>, svd: &PartialSvd, tolerance: f64) -> bool {
    let scale = svd
        .singular_values
        .first()
        .copied()
        .unwrap_or(0.0)
        .max(f64::MIN_POSITIVE);

    svd.singular_values.iter().enumerate().all(|(i, &sigma)| {
        let u = svd.left.column(i);
        let v = svd.right.column(i);
        let forward = (a * v - u * sigma).norm();
        let backward = (a.tr_mul(&u) - v * sigma).norm();
        forward.max(backward) <= tolerance * scale
    })
}

/// Two-pass classical Gram–Schmidt against an orthonormal basis.
fn orthogonalize(x: &mut DVector<f64>, basis: &[DVector<f64>]) {
    for _ in 0..2 {
        for q in basis {
            let c = q.dot(x);
            x.axpy(-c, q, 1.0);
        }
    }
}

/// A random unit vector orthogonal to `basis` (which must not span the space).
fn random_unit(dim: usize, basis: &[DVector<f64>], rng: &mut StdRng) -> DVector<f64> {
    loop {
        let mut x = DVector::from_fn(dim, |_, _| -> f64 { StandardNormal.sample(&mut *rng) });
        orthogonalize(&mut x, basis);
        let norm = x.norm();
        if norm > 1e-8 {
            return x / norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_matrix(m: usize, n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(m, n, |i, j| {
            let x = i as f64 + 1.0;
            let y = j as f64 + 1.0;
            (x * 0.7 + y * 1.3).sin() + 0.1 * x * y / (x + y)
        })
    }

    fn dense_descending(a: &DMatrix<f64>) -> Vec<f64> {
        let mut s: Vec<f64> = a.clone().svd(false, false).singular_values.iter().copied().collect();
        s.sort_by(|x, y| y.total_cmp(x));
        s
    }

    #[test]
    fn matches_dense_svd_on_tall_and_wide_inputs() {
        for (m, n) in [(12, 7), (7, 12), (30, 30)] {
            let a = test_matrix(m, n);
            let dense = dense_descending(&a);
            let svd = partial_svd(&a, 3, &LanczosOptions::default());
            assert_eq!(svd.singular_values.len(), 3);
            for (got, want) in svd.singular_values.iter().zip(&dense) {
                assert_relative_eq!(*got, *want, max_relative = 1e-9);
            }
            assert_eq!(svd.left.nrows(), m);
            assert_eq!(svd.right.nrows(), n);
        }
    }

    #[test]
    fn ritz_vectors_satisfy_singular_relations() {
        let a = test_matrix(60, 45);
        let opts = LanczosOptions {
            min_subspace: 8,
            ..LanczosOptions::default()
        };
        let svd = partial_svd(&a, 2, &opts);
        for i in 0..2 {
            let u = svd.left.column(i);
            let v = svd.right.column(i);
            let sigma = svd.singular_values[i];
            assert_relative_eq!(u.norm(), 1.0, epsilon = 1e-10);
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-10);
            assert!((&a * v - u * sigma).norm() <= 1e-8 * svd.singular_values[0]);
        }
    }

    #[test]
    fn rank_deficient_input_does_not_stall() {
        // Rank 1: every row is a multiple of the same profile.
        let profile = [1.0, -2.0, 0.5, 3.0, 0.0];
        let a = DMatrix::from_fn(6, 5, |i, j| (i as f64 - 2.5) * profile[j]);
        let svd = partial_svd(&a, 3, &LanczosOptions::default());
        let dense = dense_descending(&a);
        assert_relative_eq!(svd.singular_values[0], dense[0], max_relative = 1e-12);
        assert!(svd.singular_values[1].abs() < 1e-10);
        assert!(svd.singular_values[2].abs() < 1e-10);
    }

    #[test]
    fn same_seed_gives_identical_vectors() {
        let a = test_matrix(20, 9);
        let first = partial_svd(&a, 2, &LanczosOptions::default());
        let second = partial_svd(&a, 2, &LanczosOptions::default());
        assert_eq!(first.left, second.left);
        assert_eq!(first.right, second.right);
        assert_eq!(first.singular_values, second.singular_values);
    }
}
