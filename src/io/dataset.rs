//! Dataset readers and sources.
//!
//! A dataset file holds four arrays plus scalar attributes:
//!
//! - `lambdas`: wavelength grid (N)
//! - `phases`: phase grid (P)
//! - `quiet`: no-activity spectrum (N)
//! - `active`: one spectrum per phase, row-major (P rows of N values)
//! - `attrs`: free-form name -> scalar map (optional)
//!
//! JSON is read and written here. The remote archives are HDF5, read by
//! `io::h5` when the crate is built with the `hdf5` feature; without it
//! `read_dataset` reports them as unsupported, and archive sources refuse to
//! download a file no reader can open.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::info;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::data::{DataFetcher, SyntheticConfig, generate};
use crate::domain::{Attributes, DatasetId, DynamicSpectrum};
use crate::error::AppError;

/// Anything that can hand the analysis a fully materialized dataset.
pub trait DatasetSource {
    type Id: ?Sized;

    fn load(&self, id: &Self::Id) -> Result<DynamicSpectrum, AppError>;
}

/// Registry archives, fetched into the local cache and then read.
pub struct ArchiveSource {
    fetcher: DataFetcher,
}

impl ArchiveSource {
    pub fn new(fetcher: DataFetcher) -> Self {
        Self { fetcher }
    }
}

impl DatasetSource for ArchiveSource {
    type Id = DatasetId;

    fn load(&self, id: &DatasetId) -> Result<DynamicSpectrum, AppError> {
        ensure_readable(Path::new(id.file_name()))?;
        let path = self.fetcher.fetch_dataset(*id)?;
        read_dataset(&path)
    }
}

/// Dataset files already on disk.
pub struct FileSource;

impl DatasetSource for FileSource {
    type Id = Path;

    fn load(&self, path: &Path) -> Result<DynamicSpectrum, AppError> {
        read_dataset(path)
    }
}

/// Seeded synthetic spectra.
pub struct SyntheticSource {
    pub config: SyntheticConfig,
}

impl DatasetSource for SyntheticSource {
    type Id = u64;

    fn load(&self, seed: &u64) -> Result<DynamicSpectrum, AppError> {
        let config = SyntheticConfig {
            seed: *seed,
            ..self.config.clone()
        };
        Ok(generate(&config)?.dataset)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DatasetFile {
    lambdas: Vec<f64>,
    phases: Vec<f64>,
    quiet: Vec<f64>,
    active: Vec<Vec<f64>>,
    #[serde(default)]
    attrs: Attributes,
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Whether this build has a reader for the file's format.
pub fn is_readable(path: &Path) -> bool {
    match extension_of(path).as_str() {
        "json" => true,
        "h5" | "hdf5" => cfg!(feature = "hdf5"),
        _ => false,
    }
}

/// Fail with a usage error if no reader in this build can open `path`.
pub fn ensure_readable(path: &Path) -> Result<(), AppError> {
    if is_readable(path) {
        return Ok(());
    }
    let ext = extension_of(path);
    let hint = if matches!(ext.as_str(), "h5" | "hdf5") {
        "rebuild with `--features hdf5`, or use --input with a JSON dataset or --synthetic"
    } else {
        "convert it to the JSON dataset layout"
    };
    Err(AppError::new(
        2,
        format!("Unsupported archive format '.{ext}' for '{}'; {hint}.", path.display()),
    ))
}

/// Read a dataset file, dispatching on its extension.
pub fn read_dataset(path: &Path) -> Result<DynamicSpectrum, AppError> {
    ensure_readable(path)?;
    match extension_of(path).as_str() {
        #[cfg(feature = "hdf5")]
        "h5" | "hdf5" => crate::io::h5::read_dataset_h5(path),
        _ => read_dataset_json(path),
    }
}

pub fn read_dataset_json(path: &Path) -> Result<DynamicSpectrum, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open dataset '{}': {e}", path.display())))?;
    let raw: DatasetFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid dataset JSON '{}': {e}", path.display())))?;

    let n = raw.lambdas.len();
    if let Some((i, row)) = raw.active.iter().enumerate().find(|(_, row)| row.len() != n) {
        return Err(AppError::new(
            2,
            format!("Active spectrum {i} has {} samples, expected {n}.", row.len()),
        ));
    }
    let active = DMatrix::from_fn(raw.active.len(), n, |i, j| raw.active[i][j]);

    info!("loaded dataset {}", path.display());
    for (name, value) in &raw.attrs {
        info!("  {name}: {value}");
    }

    let dataset = DynamicSpectrum::new(raw.lambdas, raw.phases, raw.quiet, active, raw.attrs)?;
    Ok(dataset.with_source(PathBuf::from(path)))
}

/// Write a dataset in the JSON layout read by `read_dataset_json`.
pub fn write_dataset_json(path: &Path, dataset: &DynamicSpectrum) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dataset '{}': {e}", path.display())))?;

    let raw = DatasetFile {
        lambdas: dataset.wavelengths().to_vec(),
        phases: dataset.phases().to_vec(),
        quiet: dataset.quiet().to_vec(),
        active: dataset
            .active()
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect(),
        attrs: dataset.attributes().clone(),
    };

    serde_json::to_writer(BufWriter::new(file), &raw)
        .map_err(|e| AppError::new(2, format!("Failed to write dataset JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScalarValue;

    #[test]
    fn json_dataset_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.json");

        let data = generate(&SyntheticConfig {
            n_wavelengths: 12,
            n_phases: 4,
            ..SyntheticConfig::default()
        })
        .unwrap();
        write_dataset_json(&path, &data.dataset).unwrap();

        let back = FileSource.load(&path).unwrap();
        assert_eq!(back.wavelengths(), data.dataset.wavelengths());
        assert_eq!(back.phases(), data.dataset.phases());
        assert_eq!(back.active(), data.dataset.active());
        assert_eq!(back.attr("seed"), Some(&ScalarValue::Int(42)));
        assert_eq!(back.source(), Some(&path));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.json");
        std::fs::write(
            &path,
            r#"{"lambdas":[1,2,3],"phases":[0,1],"quiet":[1,1,1],"active":[[1,2,3],[1,2]]}"#,
        )
        .unwrap();
        let err = read_dataset(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("Active spectrum 1"));
    }

    #[test]
    fn shape_mismatch_surfaces_as_analysis_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short_quiet.json");
        std::fs::write(
            &path,
            r#"{"lambdas":[1,2,3],"phases":[0,1],"quiet":[1,1],"active":[[1,2,3],[1,2,3]],"attrs":{"Tstar":5778}}"#,
        )
        .unwrap();
        assert_eq!(read_dataset(&path).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn readable_formats_follow_build_features() {
        assert!(is_readable(Path::new("a/b.json")));
        assert!(is_readable(Path::new("a/B.JSON")));
        assert!(!is_readable(Path::new("a/b.csv")));
        assert!(!is_readable(Path::new("a/noext")));
        assert_eq!(is_readable(Path::new("x.h5")), cfg!(feature = "hdf5"));
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn hdf5_archives_are_reported_unsupported() {
        let err = read_dataset(Path::new("cache/lambda-3923-6664-phases-4.h5")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains(".h5"));
        assert!(err.message().contains("--features hdf5"));
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn archive_source_refuses_before_downloading() {
        use crate::data::Registry;

        // Nothing cached and an unreachable URL: reaching the network would be
        // a remote failure (exit 4), not a usage error.
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::default().with_entry(DatasetId::CaHk.file_name(), "http://127.0.0.1:9/unreachable");
        let source = ArchiveSource::new(DataFetcher::new(dir.path()).with_registry(registry));

        let err = source.load(&DatasetId::CaHk).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("--features hdf5"));
        assert!(!dir.path().join(DatasetId::CaHk.file_name()).exists());
    }

    #[cfg(feature = "hdf5")]
    #[test]
    fn archive_source_reads_cached_hdf5_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DatasetId::CaHk.file_name());
        {
            let file = hdf5::File::create(&path).unwrap();
            let write = |name: &str, v: &[f64]| {
                file.new_dataset::<f64>().shape(v.len()).create(name).unwrap().write_raw(v).unwrap();
            };
            write("lambdas", &[3923.0, 3924.0, 3925.0]);
            write("quiet", &[1.0, 0.5, 1.0]);
            write("phases", &[0.0, 0.5]);
            file.new_dataset::<f64>()
                .shape([2, 3])
                .create("active")
                .unwrap()
                .write_raw(&[1.0, 0.5, 1.0, 1.0, 0.6, 1.0])
                .unwrap();
        }

        let source = ArchiveSource::new(DataFetcher::new(dir.path()));
        let ds = source.load(&DatasetId::CaHk).unwrap();
        assert_eq!(ds.nphases(), 2);
        assert_eq!(ds.source(), Some(&path));
    }

    #[test]
    fn synthetic_source_uses_requested_seed() {
        let source = SyntheticSource {
            config: SyntheticConfig {
                n_wavelengths: 10,
                n_phases: 3,
                ..SyntheticConfig::default()
            },
        };
        let ds = source.load(&9).unwrap();
        assert_eq!(ds.attr("seed"), Some(&ScalarValue::Int(9)));
    }
}
