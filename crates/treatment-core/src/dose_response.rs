// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Dose Response
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coagulant dose sweeps (jar-test style) and dose selection.
//!
//! Each dose is an independent pipeline run, so the sweep is parallel over
//! doses with rayon; results keep the input order.

use crate::pipeline::TreatmentPipeline;
use crate::runner::RunControl;
use ndarray::Array1;
use rayon::prelude::*;
use serde::Serialize;
use treatment_types::config::PlantConfig;
use treatment_types::error::{ensure_non_negative, TreatmentError, TreatmentResult};

/// Lowest dose of the default sweep [g/L].
pub const DEFAULT_MIN_DOSE: f64 = 0.005;
/// Highest dose of the default sweep [g/L].
pub const DEFAULT_MAX_DOSE: f64 = 0.060;
pub const DEFAULT_DOSE_POINTS: usize = 8;
/// Removal [%] the economic dose must reach.
pub const DEFAULT_TARGET_EFFICIENCY: f64 = 90.0;

/// One point of a dose–response curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DosePoint {
    /// g/L
    pub dose: f64,
    /// %
    pub efficiency: f64,
    /// Settled-water solids [mg/L]
    pub effluent: f64,
    pub ph: f64,
    /// mg/L as CaCO3
    pub alkalinity: f64,
    pub coagulant_kg_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoseOptimum {
    /// Highest removal on the curve.
    pub optimal: DosePoint,
    /// Smallest dose reaching the target, or the optimal dose if none does.
    pub economic: DosePoint,
    pub target_efficiency: f64,
    pub target_reached: bool,
    pub curve: Vec<DosePoint>,
}

/// Run the configured plant once per dose.
///
/// The first failing dose aborts the sweep with its error.
pub fn dose_response(config: &PlantConfig, doses: &[f64]) -> TreatmentResult<Vec<DosePoint>> {
    for &dose in doses {
        ensure_non_negative("coagulant dose", dose)?;
    }
    let pipeline = TreatmentPipeline::from_config(config)?;
    let (water, influent) = pipeline.influent()?;
    tracing::debug!(points = doses.len(), "dose sweep: start");

    doses
        .par_iter()
        .map(|&dose| {
            let report = pipeline.run_with(&water, &influent, dose, &RunControl::unbounded())?;
            tracing::trace!(dose, efficiency = report.final_efficiency, "dose sweep: point");
            Ok(DosePoint {
                dose,
                efficiency: report.final_efficiency,
                effluent: report.sedimentation.effluent_mass,
                ph: report.after_coagulation.ph,
                alkalinity: report.after_coagulation.alkalinity,
                coagulant_kg_per_day: report.performance.coagulant_kg_per_day,
            })
        })
        .collect()
}

/// Sweep `n_points` evenly spaced doses in `[min_dose, max_dose]` and pick
/// the optimal and economic doses.
pub fn optimize_dose(
    config: &PlantConfig,
    min_dose: f64,
    max_dose: f64,
    n_points: usize,
    target_efficiency: f64,
) -> TreatmentResult<DoseOptimum> {
    ensure_non_negative("minimum dose", min_dose)?;
    ensure_non_negative("maximum dose", max_dose)?;
    if max_dose < min_dose {
        return Err(TreatmentError::InvalidInput(format!(
            "maximum dose {max_dose} is below minimum dose {min_dose}"
        )));
    }
    if n_points == 0 {
        return Err(TreatmentError::InvalidInput(
            "dose sweep needs at least one point".to_string(),
        ));
    }
    if !target_efficiency.is_finite() {
        return Err(TreatmentError::InvalidInput(format!(
            "target efficiency must be finite, got {target_efficiency}"
        )));
    }

    let doses = if n_points == 1 {
        vec![min_dose]
    } else {
        Array1::linspace(min_dose, max_dose, n_points).to_vec()
    };
    let curve = dose_response(config, &doses)?;

    let mut optimal = curve[0];
    for point in &curve[1..] {
        if point.efficiency > optimal.efficiency {
            optimal = *point;
        }
    }
    let reached = curve.iter().find(|p| p.efficiency >= target_efficiency).copied();
    tracing::debug!(
        optimal_dose = optimal.dose,
        optimal_efficiency = optimal.efficiency,
        target_reached = reached.is_some(),
        "dose sweep: done"
    );

    Ok(DoseOptimum {
        optimal,
        economic: reached.unwrap_or(optimal),
        target_efficiency,
        target_reached: reached.is_some(),
        curve,
    })
}
