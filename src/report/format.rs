//! Formatted terminal output.
//!
//! Formatting lives here so the numerical code stays free of presentation and
//! output changes are localized.

use crate::domain::{DynamicSpectrum, Sign, SpectralLine};
use crate::math::TripletSet;
use crate::report::{ComponentSummary, PhaseAmplitude};

/// Dataset header: grids, origin and scalar attributes.
pub fn format_dataset_summary(dataset: &DynamicSpectrum, label: &str) -> String {
    let mut out = String::new();

    out.push_str("=== dynspec - Dynamic Spectrum SVD ===\n");
    out.push_str(&format!("Dataset: {label}\n"));
    if let Some(path) = dataset.source() {
        out.push_str(&format!("File: {}\n", path.display()));
    }

    let lam = dataset.wavelengths();
    let ph = dataset.phases();
    out.push_str(&format!(
        "Wavelengths: n={} | [{:.3}, {:.3}] A\n",
        lam.len(),
        lam.first().copied().unwrap_or(f64::NAN),
        lam.last().copied().unwrap_or(f64::NAN),
    ));
    out.push_str(&format!(
        "Phases: n={} | [{:.4}, {:.4}]\n",
        ph.len(),
        ph.first().copied().unwrap_or(f64::NAN),
        ph.last().copied().unwrap_or(f64::NAN),
    ));

    if !dataset.attributes().is_empty() {
        out.push_str("\nAttributes:\n");
        for (name, value) in dataset.attributes() {
            out.push_str(&format!("  {name:<20} {value}\n"));
        }
    }

    out
}

pub fn format_markers(lines: &[SpectralLine]) -> String {
    let mut out = String::from("\nLine markers (air / vacuum, A):\n");
    for l in lines {
        out.push_str(&format!("  {:<8} {:>10.3} {:>10.3}\n", l.name, l.air, l.vacuum));
    }
    out
}

/// Singular values in the order returned (ascending) with their rank from the end.
pub fn format_singular_values(set: &TripletSet, fractions: &[f64]) -> String {
    let mut out = String::from("\nSingular values (ascending):\n");
    out.push_str("  idx  from_end  sigma              energy\n");
    let k = set.len();
    for (i, s) in set.singular_values().iter().enumerate() {
        let frac = fractions.get(i).copied().unwrap_or(f64::NAN);
        out.push_str(&format!("  {i:>3}  {:>8}  {s:<17.10e}  {:>6.2}%\n", k - i, frac * 100.0));
    }
    out
}

pub fn format_components(components: &[ComponentSummary]) -> String {
    let mut out = String::from("\nComponents (dominant first):\n");
    for c in components {
        let sign = match c.sign {
            Sign::Positive => "+",
            Sign::Negative => "-",
        };
        out.push_str(&format!(
            "  #{} sign={} sigma={:.6e} energy={:.2}% | x=[{:.3}, {:.3}] y=[{:.4}, {:.4}]\n",
            c.from_end,
            sign,
            c.sigma,
            c.energy_fraction * 100.0,
            c.extent.x_low,
            c.extent.x_high,
            c.extent.y_low,
            c.extent.y_high,
        ));
    }
    out
}

pub fn format_phase_amplitudes(amps: &[PhaseAmplitude]) -> String {
    let mut out = String::from("\nResidual spectra (mean subtracted):\n");
    out.push_str("  idx     phase          min          max          rms\n");
    for a in amps {
        out.push_str(&format!(
            "  {:>3}  {:>8.4}  {:>11.4e}  {:>11.4e}  {:>11.4e}\n",
            a.index, a.phase, a.min, a.max, a.rms
        ));
    }
    out
}
