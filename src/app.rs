//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads (fetches or generates) the dataset
//! - runs the residual + truncated SVD + outer-product pipeline
//! - prints reports/heatmaps
//! - writes optional exports

use std::path::Path;

use clap::Parser;
use log::info;

use crate::cli::{AnalyzeArgs, Command, FetchArgs, SynthArgs};
use crate::data::{DataFetcher, SyntheticConfig, generate};
use crate::domain::{AnalysisConfig, CA_II_LINES, DatasetId, SourceSpec, ZoomRequest};
use crate::error::AppError;
use crate::plot::{AsciiHeatmap, RenderPayload, Renderer};
use crate::report::ComponentSummary;

pub mod pipeline;

/// Entry point for the `dynspec` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Fetch(args) => handle_fetch(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = config_from_args(&args)?;
    let run = pipeline::run_analysis(&config)?;

    let label = source_label(&config.source);
    println!("{}", crate::report::format_dataset_summary(&run.dataset, &label));
    println!("{}", crate::report::format_markers(&CA_II_LINES));

    let total = run.energy;
    let fractions = crate::report::energy_fractions(&run.triplets, total);
    println!("{}", crate::report::format_singular_values(&run.triplets, &fractions));

    let summaries: Vec<ComponentSummary> = run
        .components
        .iter()
        .map(|c| ComponentSummary {
            from_end: c.from_end,
            sigma: c.sigma,
            energy_fraction: if total > 0.0 { c.sigma * c.sigma / total } else { 0.0 },
            extent: c.model.extent(),
            sign: c.sign,
        })
        .collect();
    println!("{}", crate::report::format_components(&summaries));

    let amps = crate::report::phase_amplitudes(run.dataset.phases(), &run.residual.delta);
    println!("{}", crate::report::format_phase_amplitudes(&amps));

    let residual = run.residual_payload(
        config.zoom.as_ref(),
        &config.markers,
        format!("{label} | difference from time-averaged spectrum"),
    )?;
    let payloads: Vec<RenderPayload> = run
        .components
        .iter()
        .map(|c| {
            RenderPayload::from_model(
                &c.model,
                &config.markers,
                format!("{label} | component {} (sigma={:.4e})", c.from_end, c.sigma),
            )
        })
        .collect();

    if config.heatmap {
        let renderer = AsciiHeatmap {
            width: config.heatmap_width,
            height: config.heatmap_height,
        };
        for payload in std::iter::once(&residual).chain(&payloads) {
            println!("{}", renderer.render(payload)?);
        }
    }

    // Optional exports.
    if let Some(path) = &config.export_json {
        let meta = crate::io::ExportMeta {
            dataset: label.clone(),
            rank: config.rank,
            normalized: config.normalize,
            singular_values: run.triplets.singular_values().to_vec(),
        };
        crate::io::write_payloads_json(path, &residual, &payloads, &meta)?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = &config.export_csv {
        crate::io::write_triplets_csv(path, &run.triplets)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let fetcher = match &args.cache_dir {
        Some(dir) => DataFetcher::new(dir),
        None => DataFetcher::from_env(),
    };

    let names: Vec<String> = match args.dataset {
        Some(id) => vec![id.file_name().to_string()],
        None => fetcher.registry().names().map(str::to_string).collect(),
    };
    // Check every file first so nothing is downloaded that this build cannot read.
    for name in &names {
        crate::io::ensure_readable(Path::new(name))?;
    }

    println!("Cache: {}", fetcher.cache_dir().display());
    for name in &names {
        let path = fetcher.fetch(name)?;
        println!("  {}", path.display());
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SyntheticConfig {
        n_phases: args.phases,
        n_wavelengths: args.wavelengths,
        spot_amplitude: args.amplitude,
        noise_sigma: args.noise,
        seed: args.seed,
        ..SyntheticConfig::default()
    };
    let data = generate(&config)?;
    crate::io::write_dataset_json(&args.output, &data.dataset)?;
    println!(
        "Wrote {} phases x {} wavelengths to {}",
        data.dataset.nphases(),
        data.dataset.nwavelengths(),
        args.output.display()
    );
    Ok(())
}

pub fn config_from_args(args: &AnalyzeArgs) -> Result<AnalysisConfig, AppError> {
    let source = if let Some(path) = &args.input {
        SourceSpec::File(path.clone())
    } else if args.synthetic {
        SourceSpec::Synthetic { seed: args.seed }
    } else {
        let id = args.dataset.unwrap_or(DatasetId::CaHk);
        crate::io::ensure_readable(Path::new(id.file_name()))?;
        SourceSpec::Archive(id)
    };

    let zoom = match &args.zoom_x {
        Some(x) => Some(ZoomRequest {
            x: window_pair(x, "--zoom-x")?,
            y: args.zoom_y.as_deref().map(|y| window_pair(y, "--zoom-y")).transpose()?,
        }),
        None => None,
    };

    let markers = CA_II_LINES
        .iter()
        .map(|l| if args.vacuum { l.vacuum } else { l.air })
        .collect();

    Ok(AnalysisConfig {
        source,
        cache_dir: args.cache_dir.clone(),
        rank: args.rank,
        normalize: args.normalize && !args.raw,
        flip: args.flip.clone(),
        zoom,
        markers,
        heatmap: args.heatmap,
        heatmap_width: args.width,
        heatmap_height: args.height,
        export_json: args.export_json.clone(),
        export_csv: args.export_csv.clone(),
    })
}

fn window_pair(values: &[f64], flag: &str) -> Result<(f64, f64), AppError> {
    match values {
        [lo, hi] if lo <= hi => Ok((*lo, *hi)),
        [lo, hi] => Err(AppError::new(2, format!("{flag}: LO ({lo}) must not exceed HI ({hi})."))),
        _ => Err(AppError::new(2, format!("{flag} takes exactly two values."))),
    }
}

fn source_label(source: &SourceSpec) -> String {
    match source {
        SourceSpec::Archive(id) => id.display_name().to_string(),
        SourceSpec::File(path) => path.display().to_string(),
        SourceSpec::Synthetic { seed } => format!("synthetic (seed {seed})"),
    }
}
