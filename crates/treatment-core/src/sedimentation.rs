// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Sedimentation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Settling velocities and ideal-basin removal.
//!
//! Free settling uses Stokes' law in the creeping-flow regime and the
//! Schiller-Naumann drag correlation above the Reynolds switch:
//!
//!   v_s = g·d²·(ρp − ρw) / (18·μ)
//!   C_d = 24/Re + 3/√Re + 0.34,  v = √(4·g·d·(ρp − ρw) / (3·C_d·ρw))
//!
//! Hindrance follows Richardson-Zaki, v_h = v·(1 − φ)^n, and a bin is removed
//! in proportion to v_h over the surface overflow rate (Hazen).
//!
//! Diameters are in metres, velocities in m/s.

use crate::hydraulics::SECONDS_PER_HOUR;
use ndarray::Array1;
use treatment_math::quadrature::trapezoid;
use treatment_types::config::PlantConfig;
use treatment_types::constants::ModelConstants;
use treatment_types::error::{ensure_positive, TreatmentResult};
use treatment_types::state::{SedimentationResult, SizeDistribution, WaterChemistry};

/// Stokes terminal velocity. Negative when the particle is buoyant.
pub fn stokes_velocity(
    diameter: f64,
    particle_density: f64,
    water_density: f64,
    viscosity: f64,
    gravity: f64,
) -> f64 {
    gravity * diameter * diameter * (particle_density - water_density) / (18.0 * viscosity)
}

/// Particle Reynolds number ρw·v·d/μ.
pub fn reynolds_number(velocity: f64, diameter: f64, water_density: f64, viscosity: f64) -> f64 {
    water_density * velocity * diameter / viscosity
}

/// Terminal velocity with Schiller-Naumann drag, Re taken from the Stokes estimate.
///
/// Buoyant or neutrally buoyant particles return the (non-positive) Stokes value.
pub fn schiller_naumann_velocity(
    diameter: f64,
    particle_density: f64,
    water_density: f64,
    viscosity: f64,
    gravity: f64,
) -> f64 {
    let v_stokes = stokes_velocity(diameter, particle_density, water_density, viscosity, gravity);
    if v_stokes <= 0.0 {
        return v_stokes;
    }
    let re = reynolds_number(v_stokes, diameter, water_density, viscosity);
    let cd = 24.0 / re + 3.0 / re.sqrt() + 0.34;
    (4.0 * gravity * diameter * (particle_density - water_density) / (3.0 * cd * water_density))
        .sqrt()
}

/// Free settling velocity: Stokes up to the Reynolds switch, Schiller-Naumann above.
pub fn settling_velocity(
    diameter: f64,
    particle_density: f64,
    water_density: f64,
    viscosity: f64,
    constants: &ModelConstants,
) -> f64 {
    let g = constants.gravity;
    let v_stokes = stokes_velocity(diameter, particle_density, water_density, viscosity, g);
    let re = reynolds_number(v_stokes, diameter, water_density, viscosity);
    if re > constants.stokes_reynolds_limit {
        schiller_naumann_velocity(diameter, particle_density, water_density, viscosity, g)
    } else {
        v_stokes
    }
}

/// Solids volume fraction of `concentration` mg/L at `particle_density`
/// kg/m³, clamped to [0, `max_fraction`].
pub fn solids_volume_fraction(concentration: f64, particle_density: f64, max_fraction: f64) -> f64 {
    let conc_kg_m3 = concentration / 1e6;
    (conc_kg_m3 / particle_density).clamp(0.0, max_fraction)
}

/// Richardson-Zaki hindered velocity v·(1 − φ)^n.
pub fn hindered_settling_velocity(free_velocity: f64, solids_fraction: f64, exponent: f64) -> f64 {
    free_velocity * (1.0 - solids_fraction).powf(exponent)
}

#[derive(Debug, Clone)]
pub struct Sedimentation {
    /// m²
    area: f64,
    /// m
    height: f64,
    /// m³/m²/h
    overflow_rate: f64,
    /// kg/m³
    floc_density: f64,
    constants: ModelConstants,
}

impl Sedimentation {
    pub fn new(
        area: f64,
        height: f64,
        overflow_rate: f64,
        floc_density: f64,
        constants: ModelConstants,
    ) -> TreatmentResult<Self> {
        ensure_positive("basin area", area)?;
        ensure_positive("basin height", height)?;
        ensure_positive("overflow rate", overflow_rate)?;
        ensure_positive("floc density", floc_density)?;
        Ok(Sedimentation {
            area,
            height,
            overflow_rate,
            floc_density,
            constants,
        })
    }

    pub fn from_config(config: &PlantConfig) -> TreatmentResult<Self> {
        Self::new(
            config.sedimentation.area,
            config.sedimentation.height,
            config.sedimentation.overflow_rate,
            config.sedimentation.floc_density,
            config.constants.clone(),
        )
    }

    /// Settling time over the full depth at the overflow rate [s].
    pub fn residence_time(&self) -> f64 {
        self.height / (self.overflow_rate / SECONDS_PER_HOUR)
    }

    /// m³/h
    pub fn hydraulic_capacity(&self) -> f64 {
        self.area * self.overflow_rate
    }

    pub fn process(
        &self,
        chemistry: &WaterChemistry,
        distribution: &SizeDistribution,
    ) -> TreatmentResult<SedimentationResult> {
        let residence = self.residence_time();
        let rho_w = chemistry.density();
        let mu = chemistry.viscosity();
        let c = &self.constants;

        let influent_mass = distribution.total_mass();
        let phi = solids_volume_fraction(influent_mass, self.floc_density, c.max_solids_fraction);

        let velocities: Array1<f64> = distribution.sizes().mapv(|d_um| {
            let free = settling_velocity(d_um * 1e-6, self.floc_density, rho_w, mu, c);
            hindered_settling_velocity(free, phi, c.richardson_zaki_exponent)
        });
        let removal = velocities.mapv(|v| (v * residence / self.height).clamp(0.0, 1.0));
        let effluent_conc = distribution
            .concentrations()
            .iter()
            .zip(removal.iter())
            .map(|(n, f)| n * (1.0 - f))
            .collect::<Array1<f64>>();

        let effluent_mass = trapezoid(&effluent_conc, distribution.sizes());
        let efficiency = if influent_mass > 0.0 {
            ((influent_mass - effluent_mass) / influent_mass * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        tracing::debug!(
            residence,
            solids_fraction = phi,
            influent_mass,
            effluent_mass,
            efficiency,
            "sedimentation: done"
        );

        Ok(SedimentationResult {
            residence_time_s: residence,
            solids_fraction: phi,
            settling_velocities: velocities,
            removal_fractions: removal,
            effluent: distribution.with_concentrations(effluent_conc)?,
            influent_mass,
            effluent_mass,
            efficiency_percent: efficiency,
            hydraulic_capacity_m3h: self.hydraulic_capacity(),
        })
    }
}
