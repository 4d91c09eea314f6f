//! Export analysis results.
//!
//! - JSON: the residual image plus one render payload per component, for
//!   external plotting tools
//! - CSV: the retained singular values, easy to consume in spreadsheets

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::math::TripletSet;
use crate::plot::RenderPayload;

/// Run-level fields written next to the payloads.
#[derive(Debug, Clone, Serialize)]
pub struct ExportMeta {
    pub dataset: String,
    pub rank: usize,
    pub normalized: bool,
    /// Increasing order, as returned by the decomposition.
    pub singular_values: Vec<f64>,
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    meta: &'a ExportMeta,
    residual: &'a RenderPayload,
    components: &'a [RenderPayload],
}

/// Write the residual and component payloads to a pretty-printed JSON file.
pub fn write_payloads_json(
    path: &Path,
    residual: &RenderPayload,
    payloads: &[RenderPayload],
    meta: &ExportMeta,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;

    let doc = ExportDocument {
        generated_at: Utc::now(),
        meta,
        residual,
        components: payloads,
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &doc)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

/// Write the singular values to CSV, one row per triplet in returned order.
pub fn write_triplets_csv(path: &Path, set: &TripletSet) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writeln!(file, "index,from_end,sigma,sigma_squared")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    let k = set.len();
    for (i, sigma) in set.singular_values().iter().enumerate() {
        writeln!(file, "{},{},{:.12e},{:.12e}", i, k - i, sigma, sigma * sigma)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::decompose;
    use crate::models::OuterProductModel;
    use nalgebra::DMatrix;

    #[test]
    fn triplets_csv_lists_ascending_sigma_with_rank_from_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sv.csv");
        let m = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![5.0, 3.0, 1.0, 0.5]));
        let set = decompose(&m, 2).unwrap();
        write_triplets_csv(&path, &set).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "index,from_end,sigma,sigma_squared");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,2,3.0"));
        assert!(lines[2].starts_with("1,1,5.0"));
    }

    #[test]
    fn payload_json_has_meta_and_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let model = OuterProductModel::build(vec![1.0, 2.0], vec![1.0, 2.0], vec![0.0, 1.0], vec![1.0, -1.0]).unwrap();
        let payload = RenderPayload::from_model(&model, &[1.5], "component 1");
        let meta = ExportMeta {
            dataset: "synthetic".to_string(),
            rank: 1,
            normalized: false,
            singular_values: vec![2.0],
        };
        let residual = RenderPayload::from_image(
            &nalgebra::DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]),
            &[1.0, 2.0],
            &[0.0, 1.0],
            &[],
            "residual",
        )
        .unwrap();
        write_payloads_json(&path, &residual, &[payload], &meta).unwrap();

        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["dataset"], "synthetic");
        assert!(v["generated_at"].is_string());
        let comp = &v["components"][0];
        assert_eq!(comp["title"], "component 1");
        assert_eq!(comp["image"][1][0], -1.0);
        assert_eq!(comp["extent"]["x_low"], 0.5);
        assert_eq!(comp["markers"][0], 1.5);
        assert_eq!(v["residual"]["title"], "residual");
        assert_eq!(v["residual"]["image"][0][1], 1.0);
    }
}
