//! HDF5 archive reader.
//!
//! The archived stores hold four datasets on the root group (`lambdas`,
//! `quiet`, `phases`, `active` with one row per phase) plus scalar attributes
//! describing the simulation. Numeric datasets are converted to `f64` on read.
//! Attributes of types without a `ScalarValue` counterpart (arrays, enums,
//! compounds) are skipped.

use std::path::{Path, PathBuf};

use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};
use log::{debug, info};
use nalgebra::DMatrix;

use crate::domain::{Attributes, DynamicSpectrum, ScalarValue};
use crate::error::AppError;

pub fn read_dataset_h5(path: &Path) -> Result<DynamicSpectrum, AppError> {
    let file = hdf5::File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open HDF5 store '{}': {e}", path.display())))?;
    info!("loaded HDF5 store {}", path.display());

    let attrs = read_attributes(&file).map_err(|e| h5_error(path, "attributes", e))?;
    for (name, value) in &attrs {
        info!("  {name}: {value}");
    }

    let lambdas = read_vector(&file, "lambdas", path)?;
    let quiet = read_vector(&file, "quiet", path)?;
    let phases = read_vector(&file, "phases", path)?;

    let active_ds = file.dataset("active").map_err(|e| h5_error(path, "active", e))?;
    let shape = active_ds.shape();
    let &[p, n] = shape.as_slice() else {
        return Err(AppError::new(
            2,
            format!("Dataset 'active' in '{}' must be 2-D, got shape {shape:?}.", path.display()),
        ));
    };
    let flat: Vec<f64> = active_ds.read_raw().map_err(|e| h5_error(path, "active", e))?;
    let active = DMatrix::from_row_slice(p, n, &flat);

    let dataset = DynamicSpectrum::new(lambdas, phases, quiet, active, attrs)?;
    Ok(dataset.with_source(PathBuf::from(path)))
}

fn read_vector(file: &hdf5::File, name: &str, path: &Path) -> Result<Vec<f64>, AppError> {
    let ds = file.dataset(name).map_err(|e| h5_error(path, name, e))?;
    if ds.ndim() != 1 {
        return Err(AppError::new(
            2,
            format!("Dataset '{name}' in '{}' must be 1-D, got shape {:?}.", path.display(), ds.shape()),
        ));
    }
    ds.read_raw().map_err(|e| h5_error(path, name, e))
}

fn read_attributes(file: &hdf5::File) -> hdf5::Result<Attributes> {
    let mut attrs = Attributes::new();
    for name in file.attr_names()? {
        let attr = file.attr(&name)?;
        if !attr.is_scalar() {
            debug!("skipping non-scalar attribute {name}");
            continue;
        }
        let value = match attr.dtype()?.to_descriptor()? {
            TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => ScalarValue::Int(attr.read_scalar::<i64>()?),
            TypeDescriptor::Float(_) => ScalarValue::Float(attr.read_scalar::<f64>()?),
            TypeDescriptor::Boolean => ScalarValue::Bool(attr.read_scalar::<bool>()?),
            TypeDescriptor::VarLenUnicode => ScalarValue::Text(attr.read_scalar::<VarLenUnicode>()?.as_str().to_string()),
            TypeDescriptor::VarLenAscii => ScalarValue::Text(attr.read_scalar::<VarLenAscii>()?.as_str().to_string()),
            other => {
                debug!("skipping attribute {name} of type {other:?}");
                continue;
            }
        };
        attrs.insert(name, value);
    }
    Ok(attrs)
}

fn h5_error(path: &Path, what: &str, e: hdf5::Error) -> AppError {
    AppError::new(2, format!("Failed to read '{what}' from '{}': {e}", path.display()))
}
