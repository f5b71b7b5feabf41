// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Stages
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coagulation–flocculation–sedimentation process model.
//!
//! Stage modules: rapid mix, flocculation (population balance), sedimentation.
//! Around them: kernels, hydraulics, the pipeline, dose sweeps, run control.

pub mod dose_response;
pub mod flocculation;
pub mod hydraulics;
pub mod kernels;
pub mod pipeline;
pub mod population_balance;
pub mod rapid_mix;
pub mod runner;
pub mod sedimentation;
