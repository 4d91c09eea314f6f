//! Terminal heatmap for render payloads.
//!
//! Deliberately simple (fixed-size character grid), for quick sanity checks
//! in a terminal and deterministic output in tests.
//!
//! - Rows are drawn top-down from the highest y, so the payload's row 0
//!   (lowest y) ends up on the last line, matching a lower-left origin.
//! - Each output cell shows the sample whose pixel contains the cell center.
//! - Values are scaled by the largest magnitude onto a diverging ramp
//!   (`%` most negative, blank for zero, `#` most positive).
//! - Marker columns are drawn as `|` over blank cells.

use crate::error::AppError;
use crate::plot::payload::{RenderPayload, Renderer};

const RAMP: [char; 7] = ['%', '=', '-', ' ', '+', '*', '#'];

#[derive(Debug, Clone, Copy)]
pub struct AsciiHeatmap {
    pub width: usize,
    pub height: usize,
}

impl Renderer for AsciiHeatmap {
    fn render(&self, payload: &RenderPayload) -> Result<String, AppError> {
        let (rows, cols) = payload.shape();
        if rows == 0 || cols == 0 {
            return Err(AppError::new(3, "Cannot render an empty image."));
        }
        let width = self.width.max(2);
        let height = self.height.max(2);
        let ext = payload.extent;

        let max_abs = payload
            .image
            .iter()
            .flatten()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));

        let mut grid = vec![vec![' '; width]; height];
        for (r, line) in grid.iter_mut().enumerate() {
            let y = ext.y_high - (r as f64 + 0.5) * (ext.y_high - ext.y_low) / height as f64;
            let row = nearest(&payload.y_curve.x, y);
            for (c, cell) in line.iter_mut().enumerate() {
                let x = ext.x_low + (c as f64 + 0.5) * (ext.x_high - ext.x_low) / width as f64;
                let col = nearest(&payload.x_curve.x, x);
                *cell = shade(payload.image[row][col], max_abs);
            }
        }

        for &m in &payload.markers {
            let c = map_x(m, ext.x_low, ext.x_high, width);
            for line in grid.iter_mut() {
                if line[c] == ' ' {
                    line[c] = '|';
                }
            }
        }

        let mut out = String::new();
        out.push_str(&format!("{}\n", payload.title));
        out.push_str(&format!(
            "x=[{:.3}, {:.3}] | y=[{:.3}, {:.3}] | max|v|={:.3e}\n",
            ext.x_low, ext.x_high, ext.y_low, ext.y_high, max_abs
        ));
        for line in grid {
            out.push_str(&line.into_iter().collect::<String>());
            out.push('\n');
        }
        Ok(out)
    }
}

fn shade(v: f64, max_abs: f64) -> char {
    if max_abs <= 0.0 || !v.is_finite() {
        return RAMP[RAMP.len() / 2];
    }
    let u = ((v / max_abs).clamp(-1.0, 1.0) + 1.0) / 2.0;
    RAMP[(u * (RAMP.len() - 1) as f64).round() as usize]
}

/// Index of the grid sample closest to `t` (grid increasing).
fn nearest(grid: &[f64], t: f64) -> usize {
    let i = grid.partition_point(|&g| g < t);
    if i == 0 {
        return 0;
    }
    if i >= grid.len() {
        return grid.len() - 1;
    }
    if (t - grid[i - 1]) <= (grid[i] - t) { i - 1 } else { i }
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    ((u * width as f64) as usize).min(width - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OuterProductModel;

    #[test]
    fn heatmap_golden_snapshot_small() {
        let model = OuterProductModel::build(
            vec![1.0, 2.0, 3.0],
            vec![1.0, 2.0, 3.0],
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, -1.0],
        )
        .unwrap();
        let payload = RenderPayload::from_model(&model, &[], "outer");
        let txt = AsciiHeatmap { width: 3, height: 3 }.render(&payload).unwrap();

        let expected = concat!(
            "outer\n",
            "x=[0.500, 3.500] | y=[-0.500, 2.500] | max|v|=3.000e0\n",
            "-=%\n",
            "   \n",
            "+*#\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn markers_fill_blank_cells_only() {
        let model = OuterProductModel::build(
            vec![1.0, 2.0, 3.0, 4.0],
            vec![0.0, 0.0, 1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
        )
        .unwrap();
        let payload = RenderPayload::from_model(&model, &[1.0, 3.0], "m");
        let txt = AsciiHeatmap { width: 4, height: 2 }.render(&payload).unwrap();
        let rows: Vec<&str> = txt.lines().skip(2).collect();
        assert_eq!(rows, vec!["| # ", "| # "]);
    }

    #[test]
    fn nearest_picks_closest_sample() {
        let grid = [0.0, 1.0, 3.0, 7.0];
        assert_eq!(nearest(&grid, -5.0), 0);
        assert_eq!(nearest(&grid, 1.9), 1);
        assert_eq!(nearest(&grid, 2.1), 2);
        assert_eq!(nearest(&grid, 100.0), 3);
    }
}
