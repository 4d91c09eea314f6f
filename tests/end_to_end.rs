use approx::assert_relative_eq;
use nalgebra::DMatrix;

use dynspec::app::pipeline::run_analysis;
use dynspec::data::{SyntheticConfig, generate};
use dynspec::domain::{AnalysisConfig, Attributes, DynamicSpectrum, Sign, SourceSpec};
use dynspec::io::write_dataset_json;
use dynspec::math::{Residual, decompose};
use dynspec::models::OuterProductModel;

const WAVELENGTHS: [f64; 6] = [4000.0, 4000.5, 4001.0, 4001.5, 4002.0, 4002.5];
const PHASES: [f64; 5] = [0.0, 1.0, 2.0, 3.0, 4.0];

/// Baseline spectrum repeated on every phase plus `u(phase) * v(lambda)`.
fn injected_dataset() -> (DynamicSpectrum, DMatrix<f64>) {
    let baseline = [1.0, 0.9, 0.4, 0.35, 0.85, 1.0];
    let u = [0.3, -1.2, 0.8, 2.0, -0.5];
    let v = [0.1, -0.4, 1.0, 0.7, -0.2, 0.05];

    let injected = DMatrix::from_fn(5, 6, |i, j| u[i] * v[j]);
    let active = DMatrix::from_fn(5, 6, |i, j| baseline[j] + injected[(i, j)]);
    let dataset = DynamicSpectrum::new(
        WAVELENGTHS.to_vec(),
        PHASES.to_vec(),
        baseline.to_vec(),
        active,
        Attributes::new(),
    )
    .unwrap();

    let (_, expected) = dynspec::math::compute_residual(&injected).unwrap();
    (dataset, expected)
}

fn relative_error(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    (a - b).norm() / b.norm()
}

#[test]
fn rank_one_signal_is_recovered_from_residual() {
    let (dataset, expected) = injected_dataset();
    let residual = Residual::of(dataset.active()).unwrap();

    for col in residual.delta.column_iter() {
        assert!(col.sum().abs() < 1e-12);
    }

    let set = decompose(&residual.delta, 1).unwrap();
    assert_eq!(set.len(), 1);
    let dominant = set.from_end(1).unwrap();
    assert!(dominant.sigma > 0.0);
    assert!(relative_error(&dominant.rank_one(), &expected) < 1e-6);
    assert!(relative_error(&set.reconstruct(), &expected) < 1e-6);
}

#[test]
fn outer_product_of_dominant_triplet_is_the_transposed_component() {
    let (dataset, expected) = injected_dataset();
    let residual = Residual::of(dataset.active()).unwrap();
    let triplet = decompose(&residual.delta, 1).unwrap().from_end(1).unwrap();

    for sign in [Sign::Positive, Sign::Negative] {
        let model = OuterProductModel::from_triplet(dataset.wavelengths(), dataset.phases(), &triplet, sign).unwrap();
        assert_eq!(model.matrix().shape(), (6, 5));

        let scaled = model.image() * triplet.sigma;
        assert!(relative_error(&scaled, &expected) < 1e-6);

        let ext = model.extent();
        assert_relative_eq!(ext.x_low, 3999.75);
        assert_relative_eq!(ext.x_high, 4002.75);
        assert_relative_eq!(ext.y_low, -0.5);
        assert_relative_eq!(ext.y_high, 4.5);
    }
}

#[test]
fn pipeline_reads_dataset_file_and_recovers_signal() {
    let (dataset, expected) = injected_dataset();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("injected.json");
    write_dataset_json(&path, &dataset).unwrap();

    let run = run_analysis(&AnalysisConfig {
        source: SourceSpec::File(path),
        rank: 1,
        normalize: false,
        ..AnalysisConfig::default()
    })
    .unwrap();

    let component = &run.components[0];
    let scaled = component.model.image() * component.sigma;
    assert!(relative_error(&scaled, &expected) < 1e-6);
}

#[test]
fn synthetic_spot_dominates_the_decomposition() {
    let data = generate(&SyntheticConfig {
        n_wavelengths: 200,
        n_phases: 24,
        noise_sigma: 1e-6,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let residual = Residual::of(data.dataset.active()).unwrap();
    let set = decompose(&residual.delta, 3).unwrap();

    let sv = set.singular_values();
    assert!(sv.windows(2).all(|w| w[0] <= w[1]));
    // The injected term is rank 1; the rest is noise.
    assert!(sv[2] > 100.0 * sv[1]);

    let (_, injected) = dynspec::math::compute_residual(&data.injected).unwrap();
    let dominant = set.from_end(1).unwrap().rank_one();
    assert!(relative_error(&dominant, &injected) < 1e-3);
}
