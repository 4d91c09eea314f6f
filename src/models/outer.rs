//! Rank-1 outer-product model of two tabulated functions.
//!
//! A 2-D function is approximated as
//!
//! ```text
//! f(x, y) = u(x) * v(y)
//! ```
//!
//! with `u` sampled on `x_grid` (wavelengths) and `v` on `y_grid` (phases).
//! Grids may be non-uniform.
//!
//! Two conventions matter downstream:
//!
//! - **Storage** is x-major: `matrix[(i, j)] = u[i] * v[j]`, shape `len(x) x len(y)`.
//!   Image renderers index (row, column) = (vertical, horizontal), so whoever
//!   hands the matrix to a renderer must transpose it. `image()` is that
//!   transposition; `plot::RenderPayload` is the only caller in the crate.
//! - **Extents** put each sample at the center of its pixel. The bounding box
//!   is widened by half the *local* spacing at each end of each axis:
//!   `x_low = x[0] - (x[1] - x[0]) / 2`, `x_high = x[-1] + (x[-1] - x[-2]) / 2`.
//!
//! Zooming is done by sub-selecting samples (`restrict`, `zoom`) and building a
//! new model, which recomputes the extents. Changing the axis limits of an
//! already-rendered image does not move the pixel grid and gives misaligned
//! results.

use std::ops::Range;

use nalgebra::DMatrix;
use serde::Serialize;

use crate::domain::{Sign, ZoomRequest};
use crate::error::AnalysisError;
use crate::math::SingularTriplet;

/// Display bounding box with samples at pixel centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub x_low: f64,
    pub x_high: f64,
    pub y_low: f64,
    pub y_high: f64,
}

impl Extent {
    /// `(x_low, x_high, y_low, y_high)`, the order image renderers expect.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.x_low, self.x_high, self.y_low, self.y_high)
    }
}

/// Half-sample-widened bounds of a grid with at least two samples.
pub fn pixel_bounds(grid: &[f64]) -> Option<(f64, f64)> {
    let n = grid.len();
    if n < 2 {
        return None;
    }
    let low = grid[0] - 0.5 * (grid[1] - grid[0]);
    let high = grid[n - 1] + 0.5 * (grid[n - 1] - grid[n - 2]);
    Some((low, high))
}

/// Contiguous index range of the samples of a monotonic increasing grid that
/// fall inside `[low, high]`.
pub fn window_indices(grid: &[f64], low: f64, high: f64) -> Result<Range<usize>, AnalysisError> {
    if !(low.is_finite() && high.is_finite()) || low > high {
        return Err(AnalysisError::invalid(format!(
            "invalid zoom window [{low}, {high}]"
        )));
    }
    let start = grid.partition_point(|&g| g < low);
    let end = grid.partition_point(|&g| g <= high).max(start);
    Ok(start..end)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OuterProductModel {
    x_grid: Vec<f64>,
    u_of_x: Vec<f64>,
    y_grid: Vec<f64>,
    v_of_y: Vec<f64>,
    matrix: DMatrix<f64>,
    extent: Extent,
}

impl OuterProductModel {
    /// Build `outer(u_of_x, v_of_y)` and its pixel-aligned extent.
    pub fn build(
        x_grid: Vec<f64>,
        u_of_x: Vec<f64>,
        y_grid: Vec<f64>,
        v_of_y: Vec<f64>,
    ) -> Result<Self, AnalysisError> {
        check_axis("x", &x_grid, &u_of_x)?;
        check_axis("y", &y_grid, &v_of_y)?;

        let (x_low, x_high) = pixel_bounds(&x_grid).ok_or(AnalysisError::InsufficientSamples {
            axis: "x",
            len: x_grid.len(),
        })?;
        let (y_low, y_high) = pixel_bounds(&y_grid).ok_or(AnalysisError::InsufficientSamples {
            axis: "y",
            len: y_grid.len(),
        })?;

        let matrix = DMatrix::from_fn(u_of_x.len(), v_of_y.len(), |i, j| u_of_x[i] * v_of_y[j]);

        Ok(Self {
            x_grid,
            u_of_x,
            y_grid,
            v_of_y,
            matrix,
            extent: Extent {
                x_low,
                x_high,
                y_low,
                y_high,
            },
        })
    }

    /// Pair a triplet's wavelength basis (`v`, along x) with its phase basis
    /// (`u`, along y), both multiplied by `sign`.
    ///
    /// The singular value is not applied; the model shows the shape of the
    /// component, not its weight. A joint sign flip leaves `matrix` unchanged.
    pub fn from_triplet(
        wavelengths: &[f64],
        phases: &[f64],
        triplet: &SingularTriplet,
        sign: Sign,
    ) -> Result<Self, AnalysisError> {
        let s = sign.factor();
        Self::build(
            wavelengths.to_vec(),
            triplet.v.iter().map(|v| s * v).collect(),
            phases.to_vec(),
            triplet.u.iter().map(|u| s * u).collect(),
        )
    }

    pub fn x_grid(&self) -> &[f64] {
        &self.x_grid
    }

    pub fn u_of_x(&self) -> &[f64] {
        &self.u_of_x
    }

    pub fn y_grid(&self) -> &[f64] {
        &self.y_grid
    }

    pub fn v_of_y(&self) -> &[f64] {
        &self.v_of_y
    }

    /// x-major outer product (`len(x) x len(y)`).
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// The matrix in image orientation: row `j` follows `y_grid[j]`, column `i`
    /// follows `x_grid[i]` (`len(y) x len(x)`).
    pub fn image(&self) -> DMatrix<f64> {
        self.matrix.transpose()
    }

    /// Sub-model over the contiguous x samples `range`; y is unchanged.
    pub fn restrict(&self, range: Range<usize>) -> Result<Self, AnalysisError> {
        let (x, u) = slice_axis("x", &self.x_grid, &self.u_of_x, range)?;
        Self::build(x, u, self.y_grid.clone(), self.v_of_y.clone())
    }

    /// Sub-model over the contiguous y samples `range`; x is unchanged.
    pub fn restrict_y(&self, range: Range<usize>) -> Result<Self, AnalysisError> {
        let (y, v) = slice_axis("y", &self.y_grid, &self.v_of_y, range)?;
        Self::build(self.x_grid.clone(), self.u_of_x.clone(), y, v)
    }

    /// Keep the x samples inside `[low, high]`.
    pub fn restrict_to_x_window(&self, low: f64, high: f64) -> Result<Self, AnalysisError> {
        self.restrict(window_indices(&self.x_grid, low, high)?)
    }

    /// Keep the y samples inside `[low, high]`.
    pub fn restrict_to_y_window(&self, low: f64, high: f64) -> Result<Self, AnalysisError> {
        self.restrict_y(window_indices(&self.y_grid, low, high)?)
    }

    /// Fulfil a zoom request by sub-selecting data on both axes.
    pub fn zoom(&self, request: &ZoomRequest) -> Result<Self, AnalysisError> {
        let zoomed = self.restrict_to_x_window(request.x.0, request.x.1)?;
        match request.y {
            Some((low, high)) => zoomed.restrict_to_y_window(low, high),
            None => Ok(zoomed),
        }
    }

    /// Largest absolute difference from a same-shape x-major matrix.
    pub fn max_abs_error(&self, other: &DMatrix<f64>) -> Result<f64, AnalysisError> {
        if other.shape() != self.matrix.shape() {
            return Err(AnalysisError::invalid(format!(
                "shape mismatch: model is {:?}, other is {:?}",
                self.matrix.shape(),
                other.shape()
            )));
        }
        Ok((&self.matrix - other).amax())
    }
}

fn check_axis(axis: &'static str, grid: &[f64], values: &[f64]) -> Result<(), AnalysisError> {
    if grid.len() != values.len() {
        return Err(AnalysisError::invalid(format!(
            "{axis} grid has {} samples but function has {}",
            grid.len(),
            values.len()
        )));
    }
    if grid.len() < 2 {
        return Err(AnalysisError::InsufficientSamples {
            axis,
            len: grid.len(),
        });
    }
    Ok(())
}

fn slice_axis(
    axis: &'static str,
    grid: &[f64],
    values: &[f64],
    range: Range<usize>,
) -> Result<(Vec<f64>, Vec<f64>), AnalysisError> {
    if range.start > range.end || range.end > grid.len() {
        return Err(AnalysisError::invalid(format!(
            "{axis} range {}..{} out of bounds for {} samples",
            range.start,
            range.end,
            grid.len()
        )));
    }
    Ok((grid[range.clone()].to_vec(), values[range].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn model() -> OuterProductModel {
        OuterProductModel::build(
            vec![1.0, 2.0, 3.0],
            vec![1.0, 2.0, 3.0],
            vec![0.0, 0.5, 1.0],
            vec![1.0, 0.0, -1.0],
        )
        .unwrap()
    }

    #[test]
    fn outer_product_is_exact() {
        let m = model();
        let expected = DMatrix::from_row_slice(
            3,
            3,
            &[
                1.0, 0.0, -1.0, //
                2.0, 0.0, -2.0, //
                3.0, 0.0, -3.0,
            ],
        );
        assert_eq!(m.matrix(), &expected);
    }

    #[test]
    fn uniform_grid_extent_is_half_step_wider() {
        let (low, high) = pixel_bounds(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!((low, high), (0.5, 5.5));
    }

    #[test]
    fn non_uniform_grid_uses_local_spacing_at_each_end() {
        let (low, high) = pixel_bounds(&[0.0, 1.0, 3.0, 7.0]).unwrap();
        assert_eq!((low, high), (-0.5, 9.0));
    }

    #[test]
    fn extent_covers_both_axes() {
        // Wavelength-like x on 1..5, phase-like y on 0..10 in steps of 2.
        let m = OuterProductModel::build(
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![0.0, 1.0, 0.0, -1.0, 0.0],
            vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0],
            vec![-2.0, -1.0, 0.0, 1.0, 2.0, 1.0],
        )
        .unwrap();
        assert_eq!(m.extent().as_tuple(), (0.5, 5.5, -1.0, 11.0));
        assert_eq!(m.matrix().shape(), (5, 6));
    }

    #[test]
    fn image_is_the_transpose_with_rows_along_y() {
        let m = model();
        let image = m.image();
        assert_eq!(image.shape(), (3, 3));
        for (i, &u) in m.u_of_x().iter().enumerate() {
            for (j, &v) in m.v_of_y().iter().enumerate() {
                assert_eq!(image[(j, i)], u * v);
            }
        }
        // Row 0 of the image is the lowest phase: u(x) * v(y_0) = [1, 2, 3].
        assert_eq!(image.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn build_rejects_bad_inputs() {
        let err = OuterProductModel::build(vec![1.0, 2.0], vec![1.0], vec![0.0, 1.0], vec![1.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));

        let err = OuterProductModel::build(vec![1.0], vec![1.0], vec![0.0, 1.0], vec![1.0, 1.0])
            .unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientSamples { axis: "x", len: 1 });

        let err = OuterProductModel::build(vec![1.0, 2.0], vec![1.0, 2.0], vec![], vec![])
            .unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientSamples { axis: "y", len: 0 });
    }

    #[test]
    fn restrict_full_range_is_identity() {
        let m = model();
        assert_eq!(m.restrict(0..3).unwrap(), m);
        assert_eq!(m.restrict_y(0..3).unwrap(), m);
    }

    #[test]
    fn nested_restricts_compose() {
        let m = OuterProductModel::build(
            vec![0.0, 1.0, 3.0, 7.0, 8.0, 10.0],
            vec![0.5, -1.0, 2.0, 0.0, 3.0, 1.0],
            vec![0.0, 0.25, 0.5],
            vec![1.0, -2.0, 0.5],
        )
        .unwrap();
        let nested = m.restrict(1..6).unwrap().restrict(1..4).unwrap();
        let direct = m.restrict(2..5).unwrap();
        assert_eq!(nested, direct);
        assert_eq!(direct.x_grid(), &[3.0, 7.0, 8.0]);
        // Extent recomputed from the local spacing of the sub-grid.
        assert_eq!(direct.extent().x_low, 1.0);
        assert_eq!(direct.extent().x_high, 8.5);
        assert_eq!(direct.extent().y_low, m.extent().y_low);
    }

    #[test]
    fn restrict_rejects_bad_ranges() {
        let m = model();
        assert!(matches!(m.restrict(1..4), Err(AnalysisError::InvalidInput(_))));
        assert_eq!(
            m.restrict(1..2).unwrap_err(),
            AnalysisError::InsufficientSamples { axis: "x", len: 1 }
        );
    }

    #[test]
    fn zoom_selects_samples_inside_windows() {
        let m = OuterProductModel::build(
            vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
            vec![1.0; 6],
            vec![-0.5, -0.25, 0.0, 0.25, 0.5],
            vec![1.0; 5],
        )
        .unwrap();
        let zoomed = m
            .zoom(&ZoomRequest {
                x: (11.5, 14.0),
                y: Some((-0.3, 0.3)),
            })
            .unwrap();
        assert_eq!(zoomed.x_grid(), &[12.0, 13.0, 14.0]);
        assert_eq!(zoomed.y_grid(), &[-0.25, 0.0, 0.25]);
        assert_eq!(zoomed.extent().as_tuple(), (11.5, 14.5, -0.375, 0.375));

        let err = m.restrict_to_x_window(16.0, 20.0).unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientSamples { axis: "x", len: 0 });
        assert!(matches!(
            m.restrict_to_x_window(14.0, 11.0),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn joint_sign_flip_keeps_the_matrix() {
        let triplet = SingularTriplet {
            sigma: 2.0,
            u: DVector::from_column_slice(&[0.6, -0.8]),
            v: DVector::from_column_slice(&[1.0, 0.0, -1.0]),
        };
        let waves = [400.0, 401.0, 402.0];
        let phases = [0.0, 0.5];
        let pos = OuterProductModel::from_triplet(&waves, &phases, &triplet, Sign::Positive).unwrap();
        let neg = OuterProductModel::from_triplet(&waves, &phases, &triplet, Sign::Negative).unwrap();

        assert_eq!(pos.matrix(), neg.matrix());
        assert_eq!(pos.u_of_x(), &[1.0, 0.0, -1.0]);
        assert_eq!(neg.u_of_x(), &[-1.0, -0.0, 1.0]);
        assert_eq!(neg.v_of_y(), &[-0.6, 0.8]);
        assert_eq!(pos.max_abs_error(neg.matrix()).unwrap(), 0.0);
    }
}
