//! Shared analysis pipeline.
//!
//! dataset -> residual -> truncated decomposition -> one outer-product model
//! per retained triplet (sign and zoom applied)
//!
//! The CLI only handles presentation (report, heatmaps, exports).

use log::{debug, info};
use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::data::{DataFetcher, SyntheticConfig};
use crate::domain::{AnalysisConfig, DynamicSpectrum, Sign, SourceSpec, ZoomRequest};
use crate::error::AppError;
use crate::io::{ArchiveSource, DatasetSource, FileSource, SyntheticSource};
use crate::math::{Residual, SingularTriplet, TripletSet, TruncatedDecomposer};
use crate::models::{OuterProductModel, window_indices};
use crate::plot::RenderPayload;

/// A retained component ready for presentation.
#[derive(Debug, Clone)]
pub struct Component {
    /// 1 = dominant.
    pub from_end: usize,
    pub sigma: f64,
    pub sign: Sign,
    pub model: OuterProductModel,
}

/// All computed outputs of a single `dynspec analyze` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: DynamicSpectrum,
    pub residual: Residual,
    /// The matrix handed to the decomposer (normalized or raw residual).
    pub decomposed: DMatrix<f64>,
    /// Squared Frobenius norm of `decomposed`.
    pub energy: f64,
    pub triplets: TripletSet,
    /// Dominant first.
    pub components: Vec<Component>,
}

impl RunOutput {
    /// The decomposed matrix as an image payload, restricted to the zoom window.
    pub fn residual_payload(
        &self,
        zoom: Option<&ZoomRequest>,
        markers: &[f64],
        title: impl Into<String>,
    ) -> Result<RenderPayload, AppError> {
        let wavelengths = self.dataset.wavelengths();
        let phases = self.dataset.phases();

        let (xs, ys) = match zoom {
            Some(z) => (
                window_indices(wavelengths, z.x.0, z.x.1)?,
                match z.y {
                    Some((low, high)) => window_indices(phases, low, high)?,
                    None => 0..phases.len(),
                },
            ),
            None => (0..wavelengths.len(), 0..phases.len()),
        };

        let image = self
            .decomposed
            .view((ys.start, xs.start), (ys.len(), xs.len()))
            .into_owned();
        Ok(RenderPayload::from_image(
            &image,
            &wavelengths[xs],
            &phases[ys],
            markers,
            title,
        )?)
    }
}

/// Load the configured dataset and run the analysis.
pub fn run_analysis(config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let dataset = load_dataset(config)?;
    run_analysis_on(dataset, config)
}

/// Run the analysis on an already loaded dataset.
pub fn run_analysis_on(dataset: DynamicSpectrum, config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let residual = Residual::of(dataset.active())?;
    let (decomposed, energy) = if config.normalize {
        let normalized = residual.normalized()?;
        let energy = normalized.norm_squared();
        (normalized, energy)
    } else {
        (residual.delta.clone(), residual.energy())
    };

    info!(
        "decomposing {}x{} residual (k={}, normalized={})",
        decomposed.nrows(),
        decomposed.ncols(),
        config.rank,
        config.normalize
    );
    let triplets = TruncatedDecomposer::default().decompose(&decomposed, config.rank)?;
    debug!(
        "singular values (ascending): {:?}, Krylov dimension {}",
        triplets.singular_values(),
        triplets.subspace()
    );

    let ranked: Vec<(usize, SingularTriplet)> = triplets.dominant_first().collect();
    let components = ranked
        .into_par_iter()
        .map(|(n, triplet)| build_component(&dataset, n, triplet, config))
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(RunOutput {
        dataset,
        residual,
        decomposed,
        energy,
        triplets,
        components,
    })
}

fn build_component(
    dataset: &DynamicSpectrum,
    n: usize,
    triplet: SingularTriplet,
    config: &AnalysisConfig,
) -> Result<Component, AppError> {
    let sign = config.sign_for(n);

    let mut model = OuterProductModel::from_triplet(dataset.wavelengths(), dataset.phases(), &triplet, sign)?;
    if let Some(zoom) = &config.zoom {
        model = model.zoom(zoom)?;
    }

    Ok(Component {
        from_end: n,
        sigma: triplet.sigma,
        sign,
        model,
    })
}

fn load_dataset(config: &AnalysisConfig) -> Result<DynamicSpectrum, AppError> {
    match &config.source {
        SourceSpec::Archive(id) => {
            let fetcher = match &config.cache_dir {
                Some(dir) => DataFetcher::new(dir),
                None => DataFetcher::from_env(),
            };
            ArchiveSource::new(fetcher).load(id)
        }
        SourceSpec::File(path) => FileSource.load(path),
        SourceSpec::Synthetic { seed } => SyntheticSource {
            config: SyntheticConfig::default(),
        }
        .load(seed),
    }
}
