//! Local, cached access to archived dynamic-spectrum files on a remote server.
//!
//! Files are looked up by name in a fixed registry (name -> URL). A fetch
//! returns the cached copy when present; otherwise the file is downloaded into
//! the cache directory first. No versioning or checksums: the archive is an
//! interim store and its files are not expected to change.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use reqwest::blocking::Client;

use crate::domain::DatasetId;
use crate::error::AppError;

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "DYNSPEC_CACHE_DIR";

/// Cache directory used when nothing else is configured.
pub const DEFAULT_CACHE_DIR: &str = "SOAP2-1Spot";

const URL_FULL: &str = "https://www.dropbox.com/s/pyeapovhk4q6az0/lambda-3923-6664-phases-4.h5?dl=1";
const URL_CA_HK: &str = "https://www.dropbox.com/s/5b9m1pq5qif5obf/lambda-3923-4010-phases-100.h5?dl=1";

/// File name -> download URL.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, String>,
}

impl Registry {
    /// The archived SOAP2 single-spot runs.
    pub fn soap2() -> Self {
        Self::default()
            .with_entry(DatasetId::Full.file_name(), URL_FULL)
            .with_entry(DatasetId::CaHk.file_name(), URL_CA_HK)
    }

    pub fn with_entry(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.entries.insert(name.into(), url.into());
        self
    }

    pub fn url(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

pub struct DataFetcher {
    client: Client,
    cache_dir: PathBuf,
    registry: Registry,
}

impl DataFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            cache_dir: cache_dir.into(),
            registry: Registry::soap2(),
        }
    }

    /// Cache directory from `DYNSPEC_CACHE_DIR` (`.env` is honored), else the default.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let dir = std::env::var(CACHE_DIR_ENV).unwrap_or_else(|_| DEFAULT_CACHE_DIR.to_string());
        Self::new(dir)
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cached_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    /// Fetch an archived dataset by id.
    pub fn fetch_dataset(&self, id: DatasetId) -> Result<PathBuf, AppError> {
        self.fetch(id.file_name())
    }

    /// Return a local path for a registry file, downloading it if needed.
    pub fn fetch(&self, name: &str) -> Result<PathBuf, AppError> {
        let url = self
            .registry
            .url(name)
            .ok_or_else(|| AppError::new(2, format!("'{name}' is not in the data registry.")))?;

        let path = self.cached_path(name);
        if path.is_file() {
            debug!("cache hit for {name} at {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.cache_dir).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to create cache dir '{}': {e}", self.cache_dir.display()),
            )
        })?;

        info!("downloading {name} into {}", self.cache_dir.display());
        let mut resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::new(4, format!("Download of {name} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Download of {name} failed with status {}.", resp.status()),
            ));
        }

        // Stream next to the target and rename so an interrupted download never
        // looks like a cache hit.
        let partial = self.cache_dir.join(format!("{name}.part"));
        let bytes = store_atomically(&partial, &path, |writer| {
            resp.copy_to(writer)
                .map_err(|e| AppError::new(4, format!("Failed to read body of {name}: {e}")))
        })?;

        info!("cached {name} ({bytes} bytes)");
        Ok(path)
    }
}

/// Write through `fill` into `partial`, then rename it to `target`.
///
/// `partial` is removed on any failure.
fn store_atomically<F>(partial: &Path, target: &Path, fill: F) -> Result<u64, AppError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<u64, AppError>,
{
    let result = write_then_rename(partial, target, fill);
    if result.is_err() && partial.exists() {
        let _ = fs::remove_file(partial);
    }
    result
}

fn write_then_rename<F>(partial: &Path, target: &Path, fill: F) -> Result<u64, AppError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<u64, AppError>,
{
    let file = File::create(partial)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", partial.display())))?;
    let mut writer = BufWriter::new(file);
    let bytes = fill(&mut writer)?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", partial.display())))?;
    drop(writer);

    fs::rename(partial, target)
        .map_err(|e| AppError::new(2, format!("Failed to move '{}' into cache: {e}", target.display())))?;
    Ok(bytes)
}
