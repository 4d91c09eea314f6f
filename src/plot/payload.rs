//! Boundary between outer-product models and renderers.
//!
//! A `RenderPayload` carries everything an image-style renderer needs:
//!
//! - the image in (row, column) = (y, x) orientation, row 0 at the *lowest* y
//!   (origin at the lower left)
//! - the pixel-aligned extent `(x_low, x_high, y_low, y_high)`
//! - the two component curves for the margins
//! - vertical marker positions (spectral lines)
//!
//! `from_model` is the single place where the x-major model matrix is
//! transposed into image orientation. `from_image` takes data that is already
//! phase-major (the residual matrix) and applies the same extent rule.

use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::{AnalysisError, AppError};
use crate::models::{Extent, OuterProductModel, pixel_bounds};

/// A sampled 1-D curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPayload {
    pub title: String,
    /// `len(y)` rows of `len(x)` values.
    pub image: Vec<Vec<f64>>,
    pub extent: Extent,
    /// `u(x)` for the top margin.
    pub x_curve: Curve,
    /// `v(y)` for the side margin, as (y, v) samples.
    pub y_curve: Curve,
    /// Marker positions on x that fall inside the extent.
    pub markers: Vec<f64>,
}

impl RenderPayload {
    pub fn from_model(model: &OuterProductModel, markers: &[f64], title: impl Into<String>) -> Self {
        let extent = model.extent();
        let image = model
            .image()
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();

        Self {
            title: title.into(),
            image,
            extent,
            x_curve: Curve {
                x: model.x_grid().to_vec(),
                y: model.u_of_x().to_vec(),
            },
            y_curve: Curve {
                x: model.y_grid().to_vec(),
                y: model.v_of_y().to_vec(),
            },
            markers: in_extent(markers, &extent),
        }
    }

    /// Payload for a phase-major image (`len(y_grid)` rows x `len(x_grid)` columns).
    ///
    /// The margin curves are the spread of the image along each axis: the
    /// standard deviation over phases at each x, and over wavelengths at each y.
    pub fn from_image(
        image: &DMatrix<f64>,
        x_grid: &[f64],
        y_grid: &[f64],
        markers: &[f64],
        title: impl Into<String>,
    ) -> Result<Self, AnalysisError> {
        if image.shape() != (y_grid.len(), x_grid.len()) {
            return Err(AnalysisError::invalid(format!(
                "image is {:?}, grids need ({}, {})",
                image.shape(),
                y_grid.len(),
                x_grid.len()
            )));
        }
        let (x_low, x_high) = pixel_bounds(x_grid).ok_or(AnalysisError::InsufficientSamples {
            axis: "x",
            len: x_grid.len(),
        })?;
        let (y_low, y_high) = pixel_bounds(y_grid).ok_or(AnalysisError::InsufficientSamples {
            axis: "y",
            len: y_grid.len(),
        })?;
        let extent = Extent {
            x_low,
            x_high,
            y_low,
            y_high,
        };

        Ok(Self {
            title: title.into(),
            image: image.row_iter().map(|row| row.iter().copied().collect()).collect(),
            extent,
            x_curve: Curve {
                x: x_grid.to_vec(),
                y: image
                    .column_iter()
                    .map(|c| spread(&c.iter().copied().collect::<Vec<_>>()))
                    .collect(),
            },
            y_curve: Curve {
                x: y_grid.to_vec(),
                y: image
                    .row_iter()
                    .map(|r| spread(&r.iter().copied().collect::<Vec<_>>()))
                    .collect(),
            },
            markers: in_extent(markers, &extent),
        })
    }

    /// `(rows, columns)` of the image.
    pub fn shape(&self) -> (usize, usize) {
        (self.image.len(), self.image.first().map_or(0, Vec::len))
    }
}

fn in_extent(markers: &[f64], extent: &Extent) -> Vec<f64> {
    markers
        .iter()
        .copied()
        .filter(|m| (extent.x_low..=extent.x_high).contains(m))
        .collect()
}

/// Population standard deviation.
fn spread(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Something that turns a payload into visual output.
pub trait Renderer {
    fn render(&self, payload: &RenderPayload) -> Result<String, AppError>;
}
