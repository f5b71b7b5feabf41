// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Rapid Mix
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coagulant addition and particle destabilization.

use crate::hydraulics::{camp_number, residence_time};
use treatment_types::config::PlantConfig;
use treatment_types::constants::ModelConstants;
use treatment_types::error::{ensure_non_negative, ensure_positive, TreatmentResult};
use treatment_types::state::{RapidMixResult, SizeDistribution, WaterChemistry};

#[derive(Debug, Clone)]
pub struct RapidMix {
    /// m³
    volume: f64,
    /// m³/h
    flow_rate: f64,
    /// s⁻¹
    velocity_gradient: f64,
    /// s
    mixing_time: f64,
    constants: ModelConstants,
}

impl RapidMix {
    pub fn new(
        volume: f64,
        flow_rate: f64,
        velocity_gradient: f64,
        mixing_time: f64,
        constants: ModelConstants,
    ) -> TreatmentResult<Self> {
        ensure_non_negative("rapid mix volume", volume)?;
        ensure_positive("flow rate", flow_rate)?;
        ensure_non_negative("rapid mix velocity gradient", velocity_gradient)?;
        ensure_non_negative("rapid mix time", mixing_time)?;
        Ok(RapidMix {
            volume,
            flow_rate,
            velocity_gradient,
            mixing_time,
            constants,
        })
    }

    pub fn from_config(config: &PlantConfig) -> TreatmentResult<Self> {
        Self::new(
            config.rapid_mix.volume,
            config.flow_rate,
            config.rapid_mix.velocity_gradient,
            config.rapid_mix.mixing_time,
            config.constants.clone(),
        )
    }

    /// Hydraulic residence time [s].
    pub fn residence_time(&self) -> TreatmentResult<f64> {
        residence_time(self.volume, self.flow_rate)
    }

    /// Degree of charge neutralization in [0, 1] for `dose` g/L.
    pub fn neutralization_factor(&self, dose: f64) -> f64 {
        (dose / self.constants.charge_saturation_dose).min(1.0)
    }

    /// Dose the water and apply primary aggregation.
    ///
    /// Inputs are left untouched; the dosed chemistry and the coarsened
    /// distribution (same total mass) are returned with the stage record.
    pub fn process(
        &self,
        chemistry: &WaterChemistry,
        distribution: &SizeDistribution,
        dose: f64,
    ) -> TreatmentResult<(WaterChemistry, SizeDistribution, RapidMixResult)> {
        ensure_non_negative("coagulant dose", dose)?;
        tracing::debug!(dose, g = self.velocity_gradient, "rapid mix: start");

        let mut dosed = chemistry.clone();
        let (ph, alkalinity) = dosed.apply_coagulant(dose, &self.constants)?;

        let factor = self.neutralization_factor(dose);
        let scale = 1.0 + self.constants.primary_aggregation_growth * factor;
        let coarsened = distribution
            .with_scaled_sizes(scale)?
            .normalized(distribution.total_mass())?;

        let result = RapidMixResult {
            chemistry: dosed.snapshot(),
            alkalinity_consumed: chemistry.alkalinity() - alkalinity,
            neutralization_factor: factor,
            size_scale: scale,
            residence_time_s: self.residence_time()?,
            camp_number: camp_number(self.velocity_gradient, self.mixing_time)?,
            mean_size_before_um: distribution.mean_size(),
            mean_size_after_um: coarsened.mean_size(),
            removal_percent: 0.0,
        };

        tracing::debug!(
            ph,
            alkalinity,
            neutralization = factor,
            mean_size = result.mean_size_after_um,
            "rapid mix: done"
        );
        Ok((dosed, coarsened, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (RapidMix, WaterChemistry, SizeDistribution) {
        let stage = RapidMix::new(10.0, 100.0, 1000.0, 30.0, ModelConstants::default()).unwrap();
        let water = WaterChemistry::new(20.0, 7.5, 120.0, 50.0).unwrap();
        let dist = SizeDistribution::log_normal(50, 0.1, 100.0, 2.0, 0.8)
            .unwrap()
            .normalized(50.0)
            .unwrap();
        (stage, water, dist)
    }

    #[test]
    fn test_baseline_dose() {
        let (stage, water, dist) = setup();
        let (dosed, out, result) = stage.process(&water, &dist, 0.02).unwrap();
        assert!((result.neutralization_factor - 0.4).abs() < 1e-12);
        assert!((result.size_scale - 1.04).abs() < 1e-12);
        assert!((out.total_mass() - 50.0).abs() < 1e-9);
        assert!((result.mean_size_after_um - 1.04 * result.mean_size_before_um).abs() < 1e-9);
        assert!((result.alkalinity_consumed - 35.10).abs() < 0.01);
        assert!((dosed.ph() - 7.4473).abs() < 1e-3);
        assert_eq!(result.chemistry.ph, dosed.ph());
        assert_eq!(result.removal_percent, 0.0);
        // 10 m³ / (100 m³/h) = 360 s, G·t = 1000·30
        assert!((result.residence_time_s - 360.0).abs() < 1e-9);
        assert_eq!(result.camp_number, 30_000.0);
        // inputs untouched
        assert_eq!(water.ph(), 7.5);
    }

    #[test]
    fn test_zero_dose_is_neutral() {
        let (stage, water, dist) = setup();
        let (dosed, out, result) = stage.process(&water, &dist, 0.0).unwrap();
        assert_eq!(dosed, water);
        assert_eq!(result.neutralization_factor, 0.0);
        assert_eq!(result.size_scale, 1.0);
        assert_eq!(out.sizes(), dist.sizes());
        assert_eq!(result.alkalinity_consumed, 0.0);
    }

    #[test]
    fn test_neutralization_saturates() {
        let (stage, water, dist) = setup();
        let (_, _, result) = stage.process(&water, &dist, 0.2).unwrap();
        assert_eq!(result.neutralization_factor, 1.0);
        assert!((result.size_scale - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(RapidMix::new(-1.0, 100.0, 1000.0, 30.0, ModelConstants::default()).is_err());
        assert!(RapidMix::new(10.0, 0.0, 1000.0, 30.0, ModelConstants::default()).is_err());
        assert!(RapidMix::new(10.0, 100.0, -5.0, 30.0, ModelConstants::default()).is_err());
        assert!(RapidMix::new(10.0, 100.0, 1000.0, -30.0, ModelConstants::default()).is_err());
        let (stage, water, dist) = setup();
        assert!(stage.process(&water, &dist, -0.01).is_err());
    }
}
