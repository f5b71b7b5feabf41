// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

/// Boltzmann constant (J/K)
pub const K_BOLTZMANN: f64 = 1.380649e-23;

/// Celsius to Kelvin offset.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.81;

/// Molar mass of aluminium sulfate Al2(SO4)3 (g/mol)
pub const M_ALUM: f64 = 342.15;

/// Molar mass of CaCO3 (g/mol)
pub const M_CACO3: f64 = 100.09;

/// mol CaCO3-equivalent alkalinity consumed per mol Al2(SO4)3.
/// Al2(SO4)3 + 6 H2O -> 2 Al(OH)3 + 3 H2SO4
pub const ALUM_ALKALINITY_STOICHIOMETRY: f64 = 6.0;

/// pH drop per 100 mg/L CaCO3 of alkalinity consumed.
pub const PH_BUFFER_SHIFT: f64 = 0.15;

/// pH window after coagulant addition.
pub const PH_MIN_AFTER_DOSE: f64 = 4.0;
pub const PH_MAX_AFTER_DOSE: f64 = 9.0;

/// Dose (g/L) at which charge neutralization saturates.
pub const CHARGE_SATURATION_DOSE: f64 = 0.05;

/// Relative size growth from primary aggregation at full neutralization.
pub const PRIMARY_AGGREGATION_GROWTH: f64 = 0.1;

/// Saffman-Turner collision efficiency α.
pub const COLLISION_EFFICIENCY: f64 = 0.2;

/// Water density used inside the coagulation kernel (kg/m³).
pub const KERNEL_WATER_DENSITY: f64 = 1000.0;

/// Breakage rate prefactor. Empirical calibration, not derived.
pub const BREAKAGE_COEFFICIENT: f64 = 1e-5;

/// Particle Reynolds number above which Schiller-Naumann drag replaces Stokes.
pub const STOKES_REYNOLDS_LIMIT: f64 = 0.1;

/// Richardson-Zaki hindered-settling exponent.
pub const RICHARDSON_ZAKI_EXPONENT: f64 = 4.65;

/// Upper clamp on solids volume fraction for hindered settling.
pub const MAX_SOLIDS_FRACTION: f64 = 0.6;

/// Default floc density (kg/m³).
pub const FLOC_DENSITY: f64 = 1200.0;

/// Every calibration and physical constant the model reads.
///
/// Passed explicitly into the chemistry, kernels and stages so that tests and
/// config files can override any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConstants {
    pub boltzmann: f64,
    pub gravity: f64,
    pub alum_molar_mass: f64,
    pub caco3_molar_mass: f64,
    pub alkalinity_stoichiometry: f64,
    pub ph_buffer_shift: f64,
    pub ph_min: f64,
    pub ph_max: f64,
    pub charge_saturation_dose: f64,
    pub primary_aggregation_growth: f64,
    pub collision_efficiency: f64,
    pub kernel_water_density: f64,
    /// Tunable; set to 0 to switch breakage off.
    pub breakage_coefficient: f64,
    pub stokes_reynolds_limit: f64,
    pub richardson_zaki_exponent: f64,
    pub max_solids_fraction: f64,
}

impl Default for ModelConstants {
    fn default() -> Self {
        ModelConstants {
            boltzmann: K_BOLTZMANN,
            gravity: GRAVITY,
            alum_molar_mass: M_ALUM,
            caco3_molar_mass: M_CACO3,
            alkalinity_stoichiometry: ALUM_ALKALINITY_STOICHIOMETRY,
            ph_buffer_shift: PH_BUFFER_SHIFT,
            ph_min: PH_MIN_AFTER_DOSE,
            ph_max: PH_MAX_AFTER_DOSE,
            charge_saturation_dose: CHARGE_SATURATION_DOSE,
            primary_aggregation_growth: PRIMARY_AGGREGATION_GROWTH,
            collision_efficiency: COLLISION_EFFICIENCY,
            kernel_water_density: KERNEL_WATER_DENSITY,
            breakage_coefficient: BREAKAGE_COEFFICIENT,
            stokes_reynolds_limit: STOKES_REYNOLDS_LIMIT,
            richardson_zaki_exponent: RICHARDSON_ZAKI_EXPONENT,
            max_solids_fraction: MAX_SOLIDS_FRACTION,
        }
    }
}

impl ModelConstants {
    /// Same constants with the breakage kernel switched off.
    pub fn without_breakage() -> Self {
        ModelConstants {
            breakage_coefficient: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> crate::error::TreatmentResult<()> {
        use crate::error::{ensure_non_negative, ensure_positive, TreatmentError};
        ensure_positive("boltzmann", self.boltzmann)?;
        ensure_positive("gravity", self.gravity)?;
        ensure_positive("alum_molar_mass", self.alum_molar_mass)?;
        ensure_positive("caco3_molar_mass", self.caco3_molar_mass)?;
        ensure_non_negative("alkalinity_stoichiometry", self.alkalinity_stoichiometry)?;
        ensure_non_negative("ph_buffer_shift", self.ph_buffer_shift)?;
        ensure_positive("charge_saturation_dose", self.charge_saturation_dose)?;
        ensure_non_negative("primary_aggregation_growth", self.primary_aggregation_growth)?;
        ensure_non_negative("collision_efficiency", self.collision_efficiency)?;
        ensure_positive("kernel_water_density", self.kernel_water_density)?;
        ensure_non_negative("breakage_coefficient", self.breakage_coefficient)?;
        ensure_non_negative("stokes_reynolds_limit", self.stokes_reynolds_limit)?;
        ensure_non_negative("richardson_zaki_exponent", self.richardson_zaki_exponent)?;
        if !self.ph_min.is_finite() || !self.ph_max.is_finite() || self.ph_min > self.ph_max {
            return Err(TreatmentError::ConfigError(format!(
                "pH window [{}, {}] is not ordered",
                self.ph_min, self.ph_max
            )));
        }
        if !(0.0..1.0).contains(&self.max_solids_fraction) {
            return Err(TreatmentError::ConfigError(format!(
                "max_solids_fraction must lie in [0, 1), got {}",
                self.max_solids_fraction
            )));
        }
        Ok(())
    }
}
