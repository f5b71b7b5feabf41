// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{ModelConstants, KELVIN_OFFSET};
use crate::error::{ensure_non_negative, ensure_positive, TreatmentError, TreatmentResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use treatment_math::ode::OdeStats;
use treatment_math::quadrature::{log_space, trapezoid, weighted_mean};

/// Liquid water density [kg/m³] at `temperature_c` [°C].
pub fn water_density(temperature_c: f64) -> f64 {
    1000.0 - 0.0178 * (temperature_c - 4.0).abs().powf(1.9)
}

/// Dynamic viscosity of water [Pa·s] at `temperature_c` [°C] (Vogel fit).
pub fn water_viscosity(temperature_c: f64) -> f64 {
    let t_k = temperature_c + KELVIN_OFFSET;
    2.414e-5 * 10.0_f64.powf(247.8 / (t_k - 140.0))
}

/// Raw-water chemistry and the transport properties derived from temperature.
///
/// Temperature is fixed at construction, so density and viscosity never go
/// stale. pH and alkalinity change only through [`WaterChemistry::apply_coagulant`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterChemistry {
    temperature: f64,
    ph: f64,
    alkalinity: f64,
    turbidity: f64,
    density: f64,
    viscosity: f64,
}

impl WaterChemistry {
    /// Temperature in °C (liquid range 0–100), pH clamped to [0, 14],
    /// alkalinity in mg/L as CaCO3, turbidity in NTU.
    pub fn new(temperature: f64, ph: f64, alkalinity: f64, turbidity: f64) -> TreatmentResult<Self> {
        if !temperature.is_finite() || !(0.0..=100.0).contains(&temperature) {
            return Err(TreatmentError::InvalidInput(format!(
                "temperature must lie in [0, 100] °C, got {temperature}"
            )));
        }
        if !ph.is_finite() {
            return Err(TreatmentError::InvalidInput(format!("pH must be finite, got {ph}")));
        }
        ensure_non_negative("alkalinity", alkalinity)?;
        ensure_non_negative("turbidity", turbidity)?;

        Ok(WaterChemistry {
            temperature,
            ph: ph.clamp(0.0, 14.0),
            alkalinity,
            turbidity,
            density: water_density(temperature),
            viscosity: water_viscosity(temperature),
        })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn ph(&self) -> f64 {
        self.ph
    }

    pub fn alkalinity(&self) -> f64 {
        self.alkalinity
    }

    pub fn turbidity(&self) -> f64 {
        self.turbidity
    }

    /// kg/m³
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Pa·s
    pub fn viscosity(&self) -> f64 {
        self.viscosity
    }

    /// Alkalinity [mg/L CaCO3] consumed by an alum dose [g/L].
    pub fn alkalinity_demand(dose: f64, constants: &ModelConstants) -> f64 {
        let molar = dose / constants.alum_molar_mass;
        molar * constants.alkalinity_stoichiometry * constants.caco3_molar_mass * 1000.0
    }

    /// Dose aluminium sulfate [g/L] and return the new `(pH, alkalinity)`.
    ///
    /// Alkalinity is floored at 0 and pH is clamped to the post-dose window.
    /// A zero dose changes nothing.
    pub fn apply_coagulant(
        &mut self,
        dose: f64,
        constants: &ModelConstants,
    ) -> TreatmentResult<(f64, f64)> {
        ensure_non_negative("coagulant dose", dose)?;
        let consumed = Self::alkalinity_demand(dose, constants);
        self.alkalinity = (self.alkalinity - consumed).max(0.0);
        if consumed > 0.0 {
            let shift = (consumed / 100.0) * constants.ph_buffer_shift;
            self.ph = (self.ph - shift).clamp(constants.ph_min, constants.ph_max);
        }
        Ok((self.ph, self.alkalinity))
    }

    pub fn snapshot(&self) -> ChemistrySnapshot {
        ChemistrySnapshot {
            temperature: self.temperature,
            ph: self.ph,
            alkalinity: self.alkalinity,
            turbidity: self.turbidity,
            density: self.density,
            viscosity: self.viscosity,
        }
    }
}

/// Frozen copy of [`WaterChemistry`] for reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChemistrySnapshot {
    pub temperature: f64,
    pub ph: f64,
    pub alkalinity: f64,
    pub turbidity: f64,
    pub density: f64,
    pub viscosity: f64,
}

/// Particle mass concentration [mg/L] per size bin [μm].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeDistribution {
    sizes: Array1<f64>,
    concentrations: Array1<f64>,
}

impl SizeDistribution {
    /// Requires at least two bins, positive finite sizes and non-negative
    /// finite concentrations of equal length.
    pub fn new(sizes: Array1<f64>, concentrations: Array1<f64>) -> TreatmentResult<Self> {
        if sizes.len() < 2 {
            return Err(TreatmentError::InvalidInput(format!(
                "size distribution needs at least 2 bins, got {}",
                sizes.len()
            )));
        }
        if sizes.len() != concentrations.len() {
            return Err(TreatmentError::InvalidInput(format!(
                "sizes ({}) and concentrations ({}) differ in length",
                sizes.len(),
                concentrations.len()
            )));
        }
        if let Some(bad) = sizes.iter().find(|d| !d.is_finite() || **d <= 0.0) {
            return Err(TreatmentError::InvalidInput(format!(
                "bin sizes must be finite and > 0, got {bad}"
            )));
        }
        Self::check_concentrations(&concentrations)?;
        Ok(SizeDistribution {
            sizes,
            concentrations,
        })
    }

    fn check_concentrations(concentrations: &Array1<f64>) -> TreatmentResult<()> {
        if let Some(bad) = concentrations.iter().find(|c| !c.is_finite() || **c < 0.0) {
            return Err(TreatmentError::InvalidInput(format!(
                "concentrations must be finite and >= 0, got {bad}"
            )));
        }
        Ok(())
    }

    /// Log-normal density over `bins` log-spaced sizes in `[min, max]` μm.
    ///
    /// `mu` and `sigma` are the mean and standard deviation of ln(d). The
    /// result is an unnormalized shape; call [`SizeDistribution::normalized`]
    /// to set the total mass.
    pub fn log_normal(
        bins: usize,
        min: f64,
        max: f64,
        mu: f64,
        sigma: f64,
    ) -> TreatmentResult<Self> {
        ensure_positive("minimum size", min)?;
        ensure_positive("log-normal sigma", sigma)?;
        if !max.is_finite() || max <= min {
            return Err(TreatmentError::InvalidInput(format!(
                "maximum size {max} must exceed minimum size {min}"
            )));
        }
        if !mu.is_finite() {
            return Err(TreatmentError::InvalidInput(format!("log-normal mu must be finite, got {mu}")));
        }
        let sizes = log_space(min, max, bins);
        let norm = sigma * (2.0 * std::f64::consts::PI).sqrt();
        let concentrations = sizes.mapv(|d| {
            let z = d.ln() - mu;
            (-(z * z) / (2.0 * sigma * sigma)).exp() / (d * norm)
        });
        Self::new(sizes, concentrations)
    }

    pub fn sizes(&self) -> &Array1<f64> {
        &self.sizes
    }

    pub fn concentrations(&self) -> &Array1<f64> {
        &self.concentrations
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Trapezoidal integral of concentration over size.
    pub fn total_mass(&self) -> f64 {
        trapezoid(&self.concentrations, &self.sizes)
    }

    /// Mass-weighted mean size [μm]; 0 for an empty distribution.
    pub fn mean_size(&self) -> f64 {
        weighted_mean(&self.concentrations, &self.sizes)
    }

    /// Rescale so that [`SizeDistribution::total_mass`] equals `total`.
    /// A zero-mass distribution is returned unchanged.
    pub fn normalized(&self, total: f64) -> TreatmentResult<Self> {
        ensure_non_negative("target mass", total)?;
        let mass = self.total_mass();
        if mass <= 0.0 {
            return Ok(self.clone());
        }
        let scale = total / mass;
        Ok(SizeDistribution {
            sizes: self.sizes.clone(),
            concentrations: self.concentrations.mapv(|c| c * scale),
        })
    }

    /// Same concentrations on sizes multiplied by `factor`.
    pub fn with_scaled_sizes(&self, factor: f64) -> TreatmentResult<Self> {
        ensure_positive("size scale factor", factor)?;
        Ok(SizeDistribution {
            sizes: self.sizes.mapv(|d| d * factor),
            concentrations: self.concentrations.clone(),
        })
    }

    /// Same bins carrying new concentrations.
    pub fn with_concentrations(&self, concentrations: Array1<f64>) -> TreatmentResult<Self> {
        if concentrations.len() != self.sizes.len() {
            return Err(TreatmentError::InvalidInput(format!(
                "expected {} concentrations, got {}",
                self.sizes.len(),
                concentrations.len()
            )));
        }
        Self::check_concentrations(&concentrations)?;
        Ok(SizeDistribution {
            sizes: self.sizes.clone(),
            concentrations,
        })
    }
}

/// Step counters from one chamber integration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_evaluations: usize,
}

impl From<OdeStats> for SolverStats {
    fn from(stats: OdeStats) -> Self {
        SolverStats {
            accepted_steps: stats.accepted,
            rejected_steps: stats.rejected,
            rhs_evaluations: stats.rhs_evals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RapidMixResult {
    /// Chemistry after coagulant addition.
    pub chemistry: ChemistrySnapshot,
    /// mg/L as CaCO3
    pub alkalinity_consumed: f64,
    /// Charge neutralization degree in [0, 1].
    pub neutralization_factor: f64,
    pub size_scale: f64,
    pub residence_time_s: f64,
    pub camp_number: f64,
    pub mean_size_before_um: f64,
    pub mean_size_after_um: f64,
    /// Always 0: rapid mixing conditions particles but removes nothing.
    pub removal_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChamberResult {
    /// 1-based position in the train.
    pub chamber: usize,
    pub chamber_time_s: f64,
    pub velocity_gradient: f64,
    /// Output grid [s], relative to the chamber inlet.
    pub times: Array1<f64>,
    /// Mass-weighted mean size at each output time [μm].
    pub mean_sizes: Array1<f64>,
    /// Concentrations, shape [time × bin].
    pub trajectory: Array2<f64>,
    pub final_distribution: SizeDistribution,
    pub stats: SolverStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlocculationResult {
    pub chambers: Vec<ChamberResult>,
    pub chamber_time_s: f64,
    pub total_time_s: f64,
    /// G·t over the whole train.
    pub camp_number: f64,
    pub initial_mean_size_um: f64,
    pub final_mean_size_um: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SedimentationResult {
    pub residence_time_s: f64,
    /// Solids volume fraction used for hindrance.
    pub solids_fraction: f64,
    /// Hindered settling velocity per bin [m/s].
    pub settling_velocities: Array1<f64>,
    pub removal_fractions: Array1<f64>,
    pub effluent: SizeDistribution,
    pub influent_mass: f64,
    pub effluent_mass: f64,
    pub efficiency_percent: f64,
    /// area × overflow rate [m³/h]
    pub hydraulic_capacity_m3h: f64,
}

/// Daily chemical and sludge loads at a given flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPerformance {
    pub removed_solids_mg_per_l: f64,
    pub coagulant_kg_per_day: f64,
    pub sludge_kg_per_day: f64,
}

impl OperatingPerformance {
    /// `dose` g/L (= kg/m³), `flow` m³/h, solids in mg/L (= g/m³).
    pub fn compute(
        dose: f64,
        flow: f64,
        initial_solids: f64,
        effluent_solids: f64,
    ) -> TreatmentResult<Self> {
        ensure_non_negative("coagulant dose", dose)?;
        ensure_non_negative("flow rate", flow)?;
        ensure_non_negative("initial solids", initial_solids)?;
        ensure_non_negative("effluent solids", effluent_solids)?;
        let removed = (initial_solids - effluent_solids).max(0.0);
        Ok(OperatingPerformance {
            removed_solids_mg_per_l: removed,
            coagulant_kg_per_day: dose * flow * 24.0,
            sludge_kg_per_day: removed * flow * 24.0 / 1000.0,
        })
    }
}

/// Everything a single pipeline run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentReport {
    pub initial: ChemistrySnapshot,
    pub after_coagulation: ChemistrySnapshot,
    pub coagulant_dose: f64,
    pub influent: SizeDistribution,
    pub rapid_mix: RapidMixResult,
    pub flocculation: FlocculationResult,
    pub sedimentation: SedimentationResult,
    /// Equal to the sedimentation efficiency [%].
    pub final_efficiency: f64,
    pub performance: OperatingPerformance,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline_water() -> WaterChemistry {
        WaterChemistry::new(20.0, 7.5, 120.0, 50.0).unwrap()
    }

    #[test]
    fn test_density_and_viscosity_at_20c() {
        let w = baseline_water();
        // 1000 - 0.0178·16^1.9
        assert!((w.density() - 996.547).abs() < 0.01, "rho = {}", w.density());
        assert!((w.viscosity() - 1.0e-3).abs() < 2e-5, "mu = {}", w.viscosity());
    }

    #[test]
    fn test_density_symmetric_about_4c() {
        assert_eq!(water_density(4.0), 1000.0);
        assert!(water_density(0.0) < 1000.0);
        assert!(water_density(0.0).is_finite());
    }

    #[test]
    fn test_ph_clamped_at_construction() {
        let w = WaterChemistry::new(15.0, 15.2, 80.0, 10.0).unwrap();
        assert_eq!(w.ph(), 14.0);
    }

    #[test]
    fn test_invalid_chemistry_rejected() {
        assert!(WaterChemistry::new(f64::NAN, 7.0, 100.0, 10.0).is_err());
        assert!(WaterChemistry::new(20.0, 7.0, -1.0, 10.0).is_err());
        assert!(WaterChemistry::new(20.0, 7.0, 100.0, -5.0).is_err());
    }

    #[test]
    fn test_baseline_dose_consumes_alkalinity() {
        let mut w = baseline_water();
        let (ph, alk) = w.apply_coagulant(0.02, &ModelConstants::default()).unwrap();
        let consumed = 0.02 / 342.15 * 6.0 * 100.09 * 1000.0;
        assert!((alk - (120.0 - consumed)).abs() < 1e-9);
        assert!((ph - (7.5 - consumed / 100.0 * 0.15)).abs() < 1e-9);
        assert_eq!(w.ph(), ph);
        assert_eq!(w.alkalinity(), alk);
    }

    #[test]
    fn test_zero_dose_is_identity() {
        let mut w = baseline_water();
        let before = w.clone();
        let (ph, alk) = w.apply_coagulant(0.0, &ModelConstants::default()).unwrap();
        assert_eq!(ph, 7.5);
        assert_eq!(alk, 120.0);
        assert_eq!(w, before);
    }

    #[test]
    fn test_overdose_hits_floors() {
        let mut w = baseline_water();
        let (ph, alk) = w.apply_coagulant(10.0, &ModelConstants::default()).unwrap();
        assert_eq!(alk, 0.0);
        assert_eq!(ph, 4.0);
    }

    #[test]
    fn test_negative_dose_rejected_without_mutation() {
        let mut w = baseline_water();
        assert!(w.apply_coagulant(-0.01, &ModelConstants::default()).is_err());
        assert_eq!(w.alkalinity(), 120.0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut w = baseline_water();
        let snap = w.snapshot();
        w.apply_coagulant(0.03, &ModelConstants::default()).unwrap();
        assert_eq!(snap.ph, 7.5);
        assert!(w.ph() < 7.5);
    }

    #[test]
    fn test_log_normal_normalized_mass() {
        let d = SizeDistribution::log_normal(50, 0.1, 100.0, 2.0, 0.8)
            .unwrap()
            .normalized(50.0)
            .unwrap();
        assert_eq!(d.len(), 50);
        assert!((d.total_mass() - 50.0).abs() < 1e-9);
        // median e^2 ≈ 7.4 μm, mass-weighted mean slightly above
        let mean = d.mean_size();
        assert!(mean > 9.0 && mean < 11.5, "mean = {mean}");
    }

    #[test]
    fn test_zero_mass_distribution() {
        let sizes = log_space(0.1, 100.0, 10);
        let d = SizeDistribution::new(sizes, Array1::zeros(10)).unwrap();
        assert_eq!(d.total_mass(), 0.0);
        assert_eq!(d.mean_size(), 0.0);
        let n = d.normalized(50.0).unwrap();
        assert_eq!(n.total_mass(), 0.0);
    }

    #[test]
    fn test_distribution_validation() {
        let sizes = Array1::from(vec![1.0, 2.0, 3.0]);
        assert!(SizeDistribution::new(sizes.clone(), Array1::from(vec![1.0, 2.0])).is_err());
        assert!(SizeDistribution::new(sizes.clone(), Array1::from(vec![1.0, -2.0, 0.0])).is_err());
        assert!(SizeDistribution::new(Array1::from(vec![1.0]), Array1::from(vec![1.0])).is_err());
        assert!(
            SizeDistribution::new(Array1::from(vec![0.0, 1.0]), Array1::from(vec![1.0, 1.0]))
                .is_err()
        );
        let ok = SizeDistribution::new(sizes, Array1::from(vec![1.0, 2.0, 0.0])).unwrap();
        assert!(ok.with_concentrations(Array1::from(vec![f64::NAN, 0.0, 0.0])).is_err());
        assert!(ok.with_scaled_sizes(0.0).is_err());
    }

    #[test]
    fn test_scaled_sizes_shift_mean() {
        let d = SizeDistribution::log_normal(20, 1.0, 50.0, 2.0, 0.5).unwrap();
        let scaled = d.with_scaled_sizes(1.1).unwrap();
        assert!((scaled.mean_size() - 1.1 * d.mean_size()).abs() < 1e-9);
        assert_eq!(scaled.concentrations(), d.concentrations());
    }

    #[test]
    fn test_operating_performance_units() {
        let p = OperatingPerformance::compute(0.02, 100.0, 50.0, 20.0).unwrap();
        assert!((p.coagulant_kg_per_day - 48.0).abs() < 1e-12);
        assert!((p.sludge_kg_per_day - 72.0).abs() < 1e-12);
        assert_eq!(p.removed_solids_mg_per_l, 30.0);
    }

    #[test]
    fn test_report_records_serialize() {
        let stats = SolverStats::from(OdeStats {
            accepted: 3,
            rejected: 1,
            rhs_evals: 25,
        });
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"accepted_steps\":3"));
    }
}
