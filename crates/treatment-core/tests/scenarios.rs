// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Plant Scenarios
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! End-to-end plant runs through the public pipeline API.

use treatment_core::dose_response::optimize_dose;
use treatment_core::pipeline::TreatmentPipeline;
use treatment_core::runner::{spawn_run_with, CancelToken, RunControl};
use treatment_types::config::PlantConfig;
use treatment_types::constants::ModelConstants;
use treatment_types::error::TreatmentError;

fn config_path(name: &str) -> String {
    format!("{}/../../configs/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn light_baseline() -> PlantConfig {
    let mut cfg = PlantConfig::baseline();
    cfg.distribution.bins = 24;
    cfg.solver.output_points = 10;
    cfg
}

fn assert_config_error(cfg: &PlantConfig) {
    match TreatmentPipeline::from_config(cfg) {
        Err(TreatmentError::ConfigError(_)) => {}
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_baseline_scenario() {
    let report = TreatmentPipeline::from_config(&PlantConfig::baseline())
        .unwrap()
        .run()
        .unwrap();

    let after = report.after_coagulation;
    assert!(after.alkalinity < 120.0);
    assert!((report.rapid_mix.alkalinity_consumed - 35.10).abs() < 0.01);
    assert!(after.ph >= 4.0 && after.ph < 7.5, "pH {}", after.ph);
    assert!((after.ph - 7.4473).abs() < 1e-3);

    assert!(report.final_efficiency > 0.0 && report.final_efficiency < 100.0);
    assert!(report.sedimentation.effluent_mass < report.sedimentation.influent_mass);

    assert_eq!(report.flocculation.chambers.len(), 3);
    assert_eq!(report.flocculation.chamber_time_s, 600.0);
    assert_eq!(report.flocculation.camp_number, 90_000.0);
    assert_eq!(
        report.flocculation.initial_mean_size_um,
        report.rapid_mix.mean_size_after_um
    );

    let perf = report.performance;
    assert!((perf.coagulant_kg_per_day - 48.0).abs() < 1e-9);
    assert!(perf.removed_solids_mg_per_l > 0.0);
    assert!(perf.sludge_kg_per_day > 0.0);
}

#[test]
fn test_zero_dose_leaves_chemistry_untouched() {
    let mut cfg = light_baseline();
    cfg.coagulant_dose = 0.0;
    let report = TreatmentPipeline::from_config(&cfg).unwrap().run().unwrap();

    assert_eq!(report.after_coagulation.ph, report.initial.ph);
    assert_eq!(report.after_coagulation.alkalinity, report.initial.alkalinity);
    assert_eq!(report.rapid_mix.neutralization_factor, 0.0);
    assert_eq!(report.rapid_mix.size_scale, 1.0);
    assert_eq!(report.rapid_mix.alkalinity_consumed, 0.0);
    assert!(report.final_efficiency >= 0.0 && report.final_efficiency <= 100.0);
}

#[test]
fn test_doubling_chambers_keeps_final_state() {
    let three = light_baseline();
    let mut six = light_baseline();
    six.flocculation.chambers = 6;

    let a = TreatmentPipeline::from_config(&three).unwrap().run().unwrap();
    let b = TreatmentPipeline::from_config(&six).unwrap().run().unwrap();

    assert_eq!(b.flocculation.chamber_time_s, a.flocculation.chamber_time_s / 2.0);
    assert_eq!(b.flocculation.chambers.len(), 2 * a.flocculation.chambers.len());

    // each chamber record covers its own, shorter horizon
    let end_a = *a.flocculation.chambers[0].times.last().unwrap();
    let end_b = *b.flocculation.chambers[0].times.last().unwrap();
    assert_eq!(end_a, 600.0);
    assert_eq!(end_b, 300.0);
    assert_ne!(
        a.flocculation.chambers[0].final_distribution,
        b.flocculation.chambers[0].final_distribution
    );

    let fa = &a.flocculation.chambers[2].final_distribution;
    let fb = &b.flocculation.chambers[5].final_distribution;
    for (x, y) in fa.concentrations().iter().zip(fb.concentrations().iter()) {
        assert!((x - y).abs() <= 1e-4 * (1.0 + x.abs()), "{x} vs {y}");
    }
    // same autonomous system over the same total time, but a different step
    // history, so the outlets agree to tolerance without being bit-identical
    assert_ne!(fa, fb);
    let rel = (a.final_efficiency - b.final_efficiency).abs() / a.final_efficiency.max(1e-12);
    assert!(rel < 1e-3, "efficiency {} vs {}", a.final_efficiency, b.final_efficiency);
}

#[test]
fn test_pure_aggregation_conserves_mass() {
    let mut cfg = light_baseline();
    cfg.constants = ModelConstants::without_breakage();
    let report = TreatmentPipeline::from_config(&cfg).unwrap().run().unwrap();

    let before = report.influent.total_mass();
    let after = report.sedimentation.influent_mass;
    assert!(((after - before) / before).abs() < 1e-6, "{before} -> {after}");
    // Mean size is not monotone here: birth only feeds a bin from the bins
    // below it, so on the full log-normal grid the mean drifts slightly down.
    // Growth holds for populations seeded in the small bins only.
}

#[test]
fn test_all_zero_influent_gives_zero_efficiency() {
    let mut cfg = light_baseline();
    cfg.water.initial_solids = Some(0.0);
    let report = TreatmentPipeline::from_config(&cfg).unwrap().run().unwrap();
    assert_eq!(report.final_efficiency, 0.0);
    assert_eq!(report.sedimentation.effluent_mass, 0.0);
    assert_eq!(report.performance.sludge_kg_per_day, 0.0);
}

#[test]
fn test_invalid_plants_rejected() {
    let mut cfg = light_baseline();
    cfg.flocculation.chambers = 0;
    assert_config_error(&cfg);

    let mut cfg = light_baseline();
    cfg.coagulant_dose = -0.01;
    assert_config_error(&cfg);

    let mut cfg = light_baseline();
    cfg.flocculation.volume = -5.0;
    assert_config_error(&cfg);

    let mut cfg = light_baseline();
    cfg.sedimentation.area = -100.0;
    assert_config_error(&cfg);

    let mut cfg = light_baseline();
    cfg.flocculation.total_time = -1.0;
    assert_config_error(&cfg);
}

#[test]
fn test_negative_dose_rejected_at_stage_entry() {
    let pipeline = TreatmentPipeline::from_config(&light_baseline()).unwrap();
    let (water, dist) = pipeline.influent().unwrap();
    let err = pipeline
        .run_with(&water, &dist, -0.02, &RunControl::unbounded())
        .unwrap_err();
    assert!(matches!(err, TreatmentError::InvalidInput(_)));
}

#[test]
fn test_step_budget_reports_chamber() {
    let mut cfg = light_baseline();
    cfg.solver.max_steps = 3;
    let err = TreatmentPipeline::from_config(&cfg).unwrap().run().unwrap_err();
    match err {
        TreatmentError::ChamberNonConvergence { chamber, .. } => assert_eq!(chamber, 1),
        other => panic!("expected chamber failure, got {other:?}"),
    }
}

#[test]
fn test_cancelled_run() {
    let token = CancelToken::new();
    token.cancel();
    let pipeline = TreatmentPipeline::from_config(&light_baseline()).unwrap();
    let err = pipeline
        .run_with_control(&RunControl::with_cancel(token.clone()))
        .unwrap_err();
    assert!(matches!(err, TreatmentError::Cancelled { completed_chambers: 0 }));

    let handle = spawn_run_with(light_baseline(), RunControl::with_cancel(token));
    assert!(matches!(handle.wait(), Err(TreatmentError::Cancelled { .. })));
}

#[test]
fn test_config_files_run() {
    let cfg = PlantConfig::from_file(&config_path("baseline_plant.json")).unwrap();
    assert_eq!(cfg, PlantConfig::baseline());

    let mut six = PlantConfig::from_file(&config_path("six_chamber_plant.json")).unwrap();
    six.distribution.bins = 16;
    let report = TreatmentPipeline::from_config(&six).unwrap().run().unwrap();
    assert_eq!(report.flocculation.chambers.len(), 6);
    assert_eq!(report.flocculation.chamber_time_s, 400.0);
    assert!(report.final_efficiency >= 0.0 && report.final_efficiency <= 100.0);
}

#[test]
fn test_report_serializes() {
    let report = TreatmentPipeline::from_config(&light_baseline())
        .unwrap()
        .run()
        .unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"final_efficiency\""));
    assert!(json.contains("\"chambers\""));
}

#[test]
fn test_dose_optimization_on_light_plant() {
    let mut cfg = light_baseline();
    cfg.distribution.bins = 12;
    let opt = optimize_dose(&cfg, 0.0, 0.06, 4, 101.0).unwrap();
    assert_eq!(opt.curve.len(), 4);
    assert_eq!(opt.curve[0].dose, 0.0);
    assert!((opt.curve[3].dose - 0.06).abs() < 1e-15);
    assert!(opt.curve.windows(2).all(|w| w[1].ph <= w[0].ph));
}
