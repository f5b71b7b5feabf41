// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Adaptive ODE Integration
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Explicit Runge-Kutta integration for first-order systems `y' = f(t, y)`.
//!
//! The production path is an embedded Dormand–Prince 5(4) pair with FSAL,
//! RMS error control and the Hairer initial-step heuristic. A fixed-step
//! classical RK4 stepper is kept as a reference for regression comparison.
//!
//! References:
//! - Dormand & Prince, J. Comput. Appl. Math. 6, 19 (1980)
//! - Hairer, Nørsett & Wanner, "Solving ODEs I", 2nd ed., §II.4

use ndarray::Array1;
use thiserror::Error;

/// Step-size safety factor.
const SAFETY: f64 = 0.9;
/// Smallest step shrink per attempt.
const MIN_FACTOR: f64 = 0.2;
/// Largest step growth per accepted step.
const MAX_FACTOR: f64 = 10.0;
/// Error exponent 1/(q+1) for the 4th-order embedded estimate.
const ERROR_EXPONENT: f64 = -0.2;

// Dormand–Prince 5(4) tableau.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// Right-hand side of a first-order ODE system.
pub trait OdeSystem {
    /// Length of the state vector.
    fn dimension(&self) -> usize;
    /// Write `dy/dt` at `(t, y)` into `dydt`.
    fn rhs(&self, t: f64, y: &Array1<f64>, dydt: &mut Array1<f64>);
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OdeError {
    #[error("invalid integration setup: {0}")]
    InvalidSetup(String),

    #[error("step size {h:.3e} fell below the minimum at t={t:.6e}")]
    StepSizeUnderflow { t: f64, h: f64, steps: usize },

    #[error("step budget of {max_steps} exhausted at t={t:.6e}")]
    MaxStepsExceeded { t: f64, max_steps: usize },

    #[error("state became non-finite at t={t:.6e}")]
    NonFinite { t: f64, steps: usize },
}

impl OdeError {
    /// Integration time at which the failure occurred.
    pub fn time(&self) -> f64 {
        match self {
            OdeError::InvalidSetup(_) => 0.0,
            OdeError::StepSizeUnderflow { t, .. }
            | OdeError::MaxStepsExceeded { t, .. }
            | OdeError::NonFinite { t, .. } => *t,
        }
    }

    /// Attempted steps (accepted + rejected) before the failure.
    pub fn steps(&self) -> usize {
        match self {
            OdeError::InvalidSetup(_) => 0,
            OdeError::StepSizeUnderflow { steps, .. } | OdeError::NonFinite { steps, .. } => {
                *steps
            }
            OdeError::MaxStepsExceeded { max_steps, .. } => *max_steps,
        }
    }
}

/// Tolerances and limits for [`solve_dopri45`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdeOptions {
    pub rtol: f64,
    pub atol: f64,
    /// Budget of attempted steps, accepted plus rejected.
    pub max_steps: usize,
    /// First trial step; chosen automatically when `None`.
    pub h_initial: Option<f64>,
    /// Absolute floor on the step size [same unit as t].
    pub h_min: f64,
}

impl Default for OdeOptions {
    fn default() -> Self {
        OdeOptions {
            rtol: 1e-6,
            atol: 1e-9,
            max_steps: 100_000,
            h_initial: None,
            h_min: 1e-12,
        }
    }
}

/// Work counters from one integration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OdeStats {
    pub accepted: usize,
    pub rejected: usize,
    pub rhs_evals: usize,
}

/// Result of [`solve_dopri45`].
#[derive(Debug, Clone)]
pub struct OdeSolution {
    /// Final time (equal to `t_end`).
    pub t: f64,
    /// State at `t`.
    pub y: Array1<f64>,
    /// States at the requested output times, in order.
    pub samples: Vec<(f64, Array1<f64>)>,
    pub stats: OdeStats,
}

fn rms_scaled(v: &Array1<f64>, scale: &Array1<f64>) -> f64 {
    let n = v.len().max(1) as f64;
    let sum: f64 = v
        .iter()
        .zip(scale.iter())
        .map(|(vi, si)| {
            let r = vi / si;
            r * r
        })
        .sum();
    (sum / n).sqrt()
}

/// Hairer's starting step estimate (Solving ODEs I, §II.4).
fn initial_step<S: OdeSystem>(
    system: &S,
    y0: &Array1<f64>,
    f0: &Array1<f64>,
    options: &OdeOptions,
    stats: &mut OdeStats,
) -> f64 {
    let scale = y0.mapv(|v| options.atol + options.rtol * v.abs());
    let d0 = rms_scaled(y0, &scale);
    let d1 = rms_scaled(f0, &scale);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };

    let mut y1 = y0.clone();
    y1.scaled_add(h0, f0);
    let mut f1 = Array1::zeros(y0.len());
    system.rhs(h0, &y1, &mut f1);
    stats.rhs_evals += 1;

    let diff = &f1 - f0;
    let d2 = rms_scaled(&diff, &scale) / h0;
    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / 5.0)
    };
    if h1.is_finite() {
        (100.0 * h0).min(h1)
    } else {
        h0
    }
}

/// Integrate `system` from `t = 0` to `t_end` with the Dormand–Prince 5(4) pair.
///
/// `output_times` must be non-decreasing and lie in `[0, t_end]`; steps are
/// clipped so each requested time is hit exactly and the state there is
/// copied into `samples`.
pub fn solve_dopri45<S: OdeSystem>(
    system: &S,
    y0: &Array1<f64>,
    t_end: f64,
    options: &OdeOptions,
    output_times: &[f64],
) -> Result<OdeSolution, OdeError> {
    let n = system.dimension();
    if y0.len() != n {
        return Err(OdeError::InvalidSetup(format!(
            "initial state length {} does not match system dimension {n}",
            y0.len()
        )));
    }
    if !t_end.is_finite() || t_end < 0.0 {
        return Err(OdeError::InvalidSetup(format!(
            "t_end must be finite and >= 0, got {t_end}"
        )));
    }
    if !options.rtol.is_finite() || options.rtol <= 0.0 || !options.atol.is_finite() || options.atol < 0.0
    {
        return Err(OdeError::InvalidSetup(format!(
            "tolerances must satisfy rtol > 0 and atol >= 0, got rtol={} atol={}",
            options.rtol, options.atol
        )));
    }
    if output_times
        .iter()
        .any(|&t| !t.is_finite() || t < 0.0 || t > t_end)
    {
        return Err(OdeError::InvalidSetup(
            "output times must lie inside [0, t_end]".to_string(),
        ));
    }
    if output_times.windows(2).any(|w| w[1] < w[0]) {
        return Err(OdeError::InvalidSetup(
            "output times must be non-decreasing".to_string(),
        ));
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(OdeError::NonFinite { t: 0.0, steps: 0 });
    }

    let mut stats = OdeStats::default();
    let mut samples = Vec::with_capacity(output_times.len());
    let mut next_out = 0;
    let mut t = 0.0_f64;
    let mut y = y0.clone();

    while next_out < output_times.len() && output_times[next_out] <= t {
        samples.push((output_times[next_out], y.clone()));
        next_out += 1;
    }
    if t_end == 0.0 {
        return Ok(OdeSolution {
            t,
            y,
            samples,
            stats,
        });
    }

    let mut k1 = Array1::zeros(n);
    system.rhs(t, &y, &mut k1);
    stats.rhs_evals += 1;
    if k1.iter().any(|v| !v.is_finite()) {
        return Err(OdeError::NonFinite { t, steps: 0 });
    }

    let mut h = match options.h_initial {
        Some(h0) if h0.is_finite() && h0 > 0.0 => h0,
        _ => initial_step(system, &y, &k1, options, &mut stats),
    };
    h = h.min(t_end).max(options.h_min);

    let mut k2 = Array1::zeros(n);
    let mut k3 = Array1::zeros(n);
    let mut k4 = Array1::zeros(n);
    let mut k5 = Array1::zeros(n);
    let mut k6 = Array1::zeros(n);
    let mut k7 = Array1::zeros(n);
    let mut stage = Array1::zeros(n);
    let mut y_new = Array1::zeros(n);
    let mut err = Array1::zeros(n);
    let mut last_rejected = false;

    while t < t_end {
        let attempted = stats.accepted + stats.rejected;
        if attempted >= options.max_steps {
            return Err(OdeError::MaxStepsExceeded {
                t,
                max_steps: options.max_steps,
            });
        }

        let stop = if next_out < output_times.len() {
            output_times[next_out].min(t_end)
        } else {
            t_end
        };
        let remaining = stop - t;
        let clipped = h >= remaining;
        let h_try = if clipped { remaining } else { h };

        stage.assign(&y);
        stage.scaled_add(h_try * A21, &k1);
        system.rhs(t + C2 * h_try, &stage, &mut k2);

        stage.assign(&y);
        stage.scaled_add(h_try * A31, &k1);
        stage.scaled_add(h_try * A32, &k2);
        system.rhs(t + C3 * h_try, &stage, &mut k3);

        stage.assign(&y);
        stage.scaled_add(h_try * A41, &k1);
        stage.scaled_add(h_try * A42, &k2);
        stage.scaled_add(h_try * A43, &k3);
        system.rhs(t + C4 * h_try, &stage, &mut k4);

        stage.assign(&y);
        stage.scaled_add(h_try * A51, &k1);
        stage.scaled_add(h_try * A52, &k2);
        stage.scaled_add(h_try * A53, &k3);
        stage.scaled_add(h_try * A54, &k4);
        system.rhs(t + C5 * h_try, &stage, &mut k5);

        stage.assign(&y);
        stage.scaled_add(h_try * A61, &k1);
        stage.scaled_add(h_try * A62, &k2);
        stage.scaled_add(h_try * A63, &k3);
        stage.scaled_add(h_try * A64, &k4);
        stage.scaled_add(h_try * A65, &k5);
        system.rhs(t + h_try, &stage, &mut k6);

        y_new.assign(&y);
        y_new.scaled_add(h_try * B1, &k1);
        y_new.scaled_add(h_try * B3, &k3);
        y_new.scaled_add(h_try * B4, &k4);
        y_new.scaled_add(h_try * B5, &k5);
        y_new.scaled_add(h_try * B6, &k6);
        system.rhs(t + h_try, &y_new, &mut k7);
        stats.rhs_evals += 6;

        err.fill(0.0);
        err.scaled_add(h_try * E1, &k1);
        err.scaled_add(h_try * E3, &k3);
        err.scaled_add(h_try * E4, &k4);
        err.scaled_add(h_try * E5, &k5);
        err.scaled_add(h_try * E6, &k6);
        err.scaled_add(h_try * E7, &k7);

        let mut sum = 0.0;
        for i in 0..n {
            let scale = options.atol + options.rtol * y[i].abs().max(y_new[i].abs());
            let r = err[i] / scale;
            sum += r * r;
        }
        let err_norm = (sum / n.max(1) as f64).sqrt();

        if err_norm.is_finite() && err_norm <= 1.0 {
            t = if clipped { stop } else { t + h_try };
            std::mem::swap(&mut y, &mut y_new);
            std::mem::swap(&mut k1, &mut k7);
            stats.accepted += 1;

            while next_out < output_times.len() && output_times[next_out] <= t {
                samples.push((output_times[next_out], y.clone()));
                next_out += 1;
            }

            let mut factor = if err_norm == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err_norm.powf(ERROR_EXPONENT)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            if last_rejected {
                factor = factor.min(1.0);
            }
            last_rejected = false;
            // A clipped step says nothing about how large the next one may be.
            h = if clipped {
                h.max(h_try * factor)
            } else {
                h_try * factor
            };
        } else {
            stats.rejected += 1;
            last_rejected = true;
            let factor = if err_norm.is_finite() {
                (SAFETY * err_norm.powf(ERROR_EXPONENT)).clamp(MIN_FACTOR, 1.0)
            } else {
                MIN_FACTOR
            };
            h = h_try * factor;
            let h_floor = options.h_min.max(16.0 * f64::EPSILON * t.abs());
            if h < h_floor {
                let steps = stats.accepted + stats.rejected;
                if !err_norm.is_finite() {
                    return Err(OdeError::NonFinite { t, steps });
                }
                return Err(OdeError::StepSizeUnderflow { t, h, steps });
            }
        }
    }

    Ok(OdeSolution {
        t,
        y,
        samples,
        stats,
    })
}

/// Classical fixed-step RK4 from `t = 0` to `t_end` in `steps` equal steps.
///
/// Reference integrator for regression comparison; no error control.
pub fn integrate_rk4<S: OdeSystem>(
    system: &S,
    y0: &Array1<f64>,
    t_end: f64,
    steps: usize,
) -> Array1<f64> {
    let n = y0.len();
    let mut y = y0.clone();
    if steps == 0 || t_end == 0.0 {
        return y;
    }
    let h = t_end / steps as f64;
    let mut k1 = Array1::zeros(n);
    let mut k2 = Array1::zeros(n);
    let mut k3 = Array1::zeros(n);
    let mut k4 = Array1::zeros(n);
    let mut stage = Array1::zeros(n);
    for s in 0..steps {
        let t = s as f64 * h;
        system.rhs(t, &y, &mut k1);
        stage.assign(&y);
        stage.scaled_add(0.5 * h, &k1);
        system.rhs(t + 0.5 * h, &stage, &mut k2);
        stage.assign(&y);
        stage.scaled_add(0.5 * h, &k2);
        system.rhs(t + 0.5 * h, &stage, &mut k3);
        stage.assign(&y);
        stage.scaled_add(h, &k3);
        system.rhs(t + h, &stage, &mut k4);
        y.scaled_add(h / 6.0, &k1);
        y.scaled_add(h / 3.0, &k2);
        y.scaled_add(h / 3.0, &k3);
        y.scaled_add(h / 6.0, &k4);
    }
    y
}

/// Linear decay `y_i' = -λ_i y_i`; exact solution `y_i(t) = y_i(0) e^{-λ_i t}`.
#[derive(Debug, Clone)]
pub struct LinearDecay {
    pub rates: Array1<f64>,
}

impl OdeSystem for LinearDecay {
    fn dimension(&self) -> usize {
        self.rates.len()
    }

    fn rhs(&self, _t: f64, y: &Array1<f64>, dydt: &mut Array1<f64>) {
        for i in 0..y.len() {
            dydt[i] = -self.rates[i] * y[i];
        }
    }
}
