// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Errors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;
use treatment_math::ode::OdeError;

#[derive(Error, Debug)]
pub enum TreatmentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("ODE integration failed at t={time:.6e} s after {steps} steps: {message}")]
    IntegrationFailed {
        time: f64,
        steps: usize,
        message: String,
    },

    #[error("Flocculation chamber {chamber} did not converge: {source}")]
    ChamberNonConvergence {
        chamber: usize,
        #[source]
        source: Box<TreatmentError>,
    },

    #[error("Run cancelled after {completed_chambers} flocculation chamber(s)")]
    Cancelled { completed_chambers: usize },

    #[error("Run deadline exceeded after {completed_chambers} flocculation chamber(s)")]
    Timeout { completed_chambers: usize },

    #[error("Background worker exited without a result")]
    WorkerLost,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TreatmentResult<T> = Result<T, TreatmentError>;

impl From<OdeError> for TreatmentError {
    fn from(err: OdeError) -> Self {
        match err {
            OdeError::InvalidSetup(msg) => TreatmentError::InvalidInput(msg),
            other => TreatmentError::IntegrationFailed {
                time: other.time(),
                steps: other.steps(),
                message: other.to_string(),
            },
        }
    }
}

/// Reject negative or non-finite values for a named physical quantity.
pub fn ensure_non_negative(name: &str, value: f64) -> TreatmentResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(TreatmentError::InvalidInput(format!(
            "{name} must be finite and >= 0, got {value}"
        )));
    }
    Ok(value)
}

/// Reject zero, negative or non-finite values for a named physical quantity.
pub fn ensure_positive(name: &str, value: f64) -> TreatmentResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TreatmentError::InvalidInput(format!(
            "{name} must be finite and > 0, got {value}"
        )));
    }
    Ok(value)
}
