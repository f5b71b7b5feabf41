// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Population Balance
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Discrete population balance for aggregation and breakage.
//!
//! For bin concentrations nᵢ on a fixed size grid:
//!
//!   dnᵢ/dt = ½ Σ_{j<i} K(j, i−j−1)·n_j·n_{i−j−1}   (aggregation birth)
//!          − nᵢ Σ_j K(i, j)·n_j                    (aggregation death)
//!          − Sᵢ·nᵢ                                 (breakage death)
//!          + Σ_{j>i} b_ij·S_j·n_j                  (fragment birth)
//!
//! K, S and the fragment matrix F = b_ij·S_j depend only on the grid, G and
//! the water, so they are assembled once per chamber. The system is
//! autonomous.

use crate::kernels::{breakage_rate, coagulation_rate, fragment_distribution};
use ndarray::{Array1, Array2};
use treatment_math::ode::{solve_dopri45, OdeOptions, OdeSystem};
use treatment_math::quadrature::weighted_mean;
use treatment_types::constants::{ModelConstants, FLOC_DENSITY};
use treatment_types::error::{ensure_non_negative, TreatmentError, TreatmentResult};
use treatment_types::state::{SizeDistribution, SolverStats, WaterChemistry};

/// μm → m
const MICRON: f64 = 1e-6;

/// Aggregation–breakage right-hand side on a fixed size grid.
#[derive(Debug, Clone)]
pub struct PopulationBalance {
    sizes_um: Array1<f64>,
    velocity_gradient: f64,
    /// K[i, j] [m³/s]
    kernel: Array2<f64>,
    /// S[i] [s⁻¹]
    breakage: Array1<f64>,
    /// F[i, j] = b_ij·S_j for j > i, else 0
    fragments: Array2<f64>,
}

/// Outcome of one population-balance integration.
#[derive(Debug, Clone)]
pub struct Integration {
    pub distribution: SizeDistribution,
    /// Output times [s]
    pub times: Array1<f64>,
    /// Concentrations at `times`, shape [time × bin]
    pub trajectory: Array2<f64>,
    /// Mass-weighted mean size at `times` [μm]
    pub mean_sizes: Array1<f64>,
    pub stats: SolverStats,
}

impl PopulationBalance {
    /// Assemble kernel matrix, breakage vector and fragment matrix for
    /// `sizes_um` at velocity gradient `g` [s⁻¹].
    pub fn new(
        sizes_um: &Array1<f64>,
        g: f64,
        chemistry: &WaterChemistry,
        constants: &ModelConstants,
    ) -> TreatmentResult<Self> {
        ensure_non_negative("velocity gradient", g)?;
        if let Some(bad) = sizes_um.iter().find(|d| !d.is_finite() || **d <= 0.0) {
            return Err(TreatmentError::InvalidInput(format!(
                "bin sizes must be finite and > 0, got {bad}"
            )));
        }

        let n = sizes_um.len();
        let d_m = sizes_um.mapv(|d| d * MICRON);
        let temperature = chemistry.temperature();
        let viscosity = chemistry.viscosity();

        let kernel = Array2::from_shape_fn((n, n), |(i, j)| {
            coagulation_rate(d_m[i], d_m[j], g, temperature, viscosity, constants)
        });
        let breakage = d_m.mapv(|d| {
            breakage_rate(d, g, FLOC_DENSITY, viscosity, chemistry.density(), constants)
        });
        let fragments = Array2::from_shape_fn((n, n), |(i, j)| {
            fragment_distribution(i, j) * breakage[j]
        });

        Ok(PopulationBalance {
            sizes_um: sizes_um.clone(),
            velocity_gradient: g,
            kernel,
            breakage,
            fragments,
        })
    }

    pub fn sizes(&self) -> &Array1<f64> {
        &self.sizes_um
    }

    pub fn velocity_gradient(&self) -> f64 {
        self.velocity_gradient
    }

    pub fn kernel(&self) -> &Array2<f64> {
        &self.kernel
    }

    pub fn breakage(&self) -> &Array1<f64> {
        &self.breakage
    }

    /// Integrate `distribution` for `duration` seconds.
    ///
    /// `output_points` evenly spaced samples over [0, duration] are recorded,
    /// endpoints included. Round-off negatives in the final state are
    /// clamped to zero.
    pub fn integrate(
        &self,
        distribution: &SizeDistribution,
        duration: f64,
        options: &OdeOptions,
        output_points: usize,
    ) -> TreatmentResult<Integration> {
        ensure_non_negative("integration duration", duration)?;
        if distribution.len() != self.sizes_um.len() {
            return Err(TreatmentError::InvalidInput(format!(
                "distribution has {} bins, population balance expects {}",
                distribution.len(),
                self.sizes_um.len()
            )));
        }

        let output_times: Vec<f64> = match output_points {
            0 => Vec::new(),
            1 => vec![duration],
            n => Array1::linspace(0.0, duration, n).to_vec(),
        };

        let solution = solve_dopri45(
            self,
            distribution.concentrations(),
            duration,
            options,
            &output_times,
        )?;

        let n_bins = self.sizes_um.len();
        let mut trajectory = Array2::zeros((solution.samples.len(), n_bins));
        let mut times = Array1::zeros(solution.samples.len());
        let mut mean_sizes = Array1::zeros(solution.samples.len());
        for (k, (t, y)) in solution.samples.iter().enumerate() {
            times[k] = *t;
            trajectory.row_mut(k).assign(y);
            mean_sizes[k] = weighted_mean(y, &self.sizes_um);
        }

        let final_state = solution.y.mapv(|v| v.max(0.0));
        let stats = SolverStats::from(solution.stats);
        tracing::trace!(
            duration,
            accepted = stats.accepted_steps,
            rejected = stats.rejected_steps,
            rhs_evals = stats.rhs_evaluations,
            "population balance integrated"
        );

        Ok(Integration {
            distribution: distribution.with_concentrations(final_state)?,
            times,
            trajectory,
            mean_sizes,
            stats,
        })
    }
}

impl OdeSystem for PopulationBalance {
    fn dimension(&self) -> usize {
        self.sizes_um.len()
    }

    fn rhs(&self, _t: f64, y: &Array1<f64>, dydt: &mut Array1<f64>) {
        let n = y.len();
        let k_n = self.kernel.dot(y);
        let f_n = self.fragments.dot(y);
        for i in 0..n {
            let mut birth = 0.0;
            for j in 0..i {
                let partner = i - j - 1;
                birth += 0.5 * self.kernel[[j, partner]] * y[j] * y[partner];
            }
            let death_agg = y[i] * k_n[i];
            let death_break = self.breakage[i] * y[i];
            dydt[i] = birth - death_agg - death_break + f_n[i];
        }
    }
}
