// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::ModelConstants;
use crate::error::{ensure_non_negative, ensure_positive, TreatmentError, TreatmentResult};
use crate::state::{SizeDistribution, WaterChemistry};
use serde::{Deserialize, Serialize};
use treatment_math::ode::OdeOptions;

/// Complete description of one plant run.
/// Every field is optional in JSON; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantConfig {
    #[serde(default)]
    pub water: WaterConfig,
    /// m³/h
    #[serde(default = "default_flow_rate")]
    pub flow_rate: f64,
    #[serde(default)]
    pub rapid_mix: RapidMixConfig,
    #[serde(default)]
    pub flocculation: FlocculationConfig,
    #[serde(default)]
    pub sedimentation: SedimentationConfig,
    /// Aluminium sulfate dose [g/L]
    #[serde(default = "default_coagulant_dose")]
    pub coagulant_dose: f64,
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub constants: ModelConstants,
}

fn default_flow_rate() -> f64 {
    100.0
}
fn default_coagulant_dose() -> f64 {
    0.02
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterConfig {
    /// °C
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_ph")]
    pub ph: f64,
    /// mg/L as CaCO3
    #[serde(default = "default_alkalinity")]
    pub alkalinity: f64,
    /// NTU
    #[serde(default = "default_turbidity")]
    pub turbidity: f64,
    /// Suspended solids [mg/L]; falls back to turbidity when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_solids: Option<f64>,
}

fn default_temperature() -> f64 {
    20.0
}
fn default_ph() -> f64 {
    7.0
}
fn default_alkalinity() -> f64 {
    100.0
}
fn default_turbidity() -> f64 {
    50.0
}

impl Default for WaterConfig {
    fn default() -> Self {
        WaterConfig {
            temperature: default_temperature(),
            ph: default_ph(),
            alkalinity: default_alkalinity(),
            turbidity: default_turbidity(),
            initial_solids: None,
        }
    }
}

impl WaterConfig {
    pub fn initial_solids(&self) -> f64 {
        self.initial_solids.unwrap_or(self.turbidity)
    }

    pub fn chemistry(&self) -> TreatmentResult<WaterChemistry> {
        WaterChemistry::new(self.temperature, self.ph, self.alkalinity, self.turbidity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RapidMixConfig {
    /// m³
    #[serde(default = "default_rapid_mix_volume")]
    pub volume: f64,
    /// s⁻¹
    #[serde(default = "default_rapid_mix_g")]
    pub velocity_gradient: f64,
    /// s
    #[serde(default = "default_rapid_mix_time")]
    pub mixing_time: f64,
}

fn default_rapid_mix_volume() -> f64 {
    10.0
}
fn default_rapid_mix_g() -> f64 {
    1000.0
}
fn default_rapid_mix_time() -> f64 {
    30.0
}

impl Default for RapidMixConfig {
    fn default() -> Self {
        RapidMixConfig {
            volume: default_rapid_mix_volume(),
            velocity_gradient: default_rapid_mix_g(),
            mixing_time: default_rapid_mix_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlocculationConfig {
    #[serde(default = "default_chambers")]
    pub chambers: usize,
    /// Total train volume [m³]
    #[serde(default = "default_floc_volume")]
    pub volume: f64,
    /// Average velocity gradient [s⁻¹]
    #[serde(default = "default_floc_g")]
    pub velocity_gradient: f64,
    /// Total residence time split evenly over the chambers [s]
    #[serde(default = "default_floc_time")]
    pub total_time: f64,
}

fn default_chambers() -> usize {
    3
}
fn default_floc_volume() -> f64 {
    200.0
}
fn default_floc_g() -> f64 {
    50.0
}
fn default_floc_time() -> f64 {
    1800.0
}

impl Default for FlocculationConfig {
    fn default() -> Self {
        FlocculationConfig {
            chambers: default_chambers(),
            volume: default_floc_volume(),
            velocity_gradient: default_floc_g(),
            total_time: default_floc_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SedimentationConfig {
    /// m²
    #[serde(default = "default_sed_area")]
    pub area: f64,
    /// m
    #[serde(default = "default_sed_height")]
    pub height: f64,
    /// Surface overflow rate [m³/m²/h]
    #[serde(default = "default_overflow_rate")]
    pub overflow_rate: f64,
    /// kg/m³
    #[serde(default = "default_floc_density")]
    pub floc_density: f64,
}

fn default_sed_area() -> f64 {
    100.0
}
fn default_sed_height() -> f64 {
    3.0
}
fn default_overflow_rate() -> f64 {
    10.0
}
fn default_floc_density() -> f64 {
    crate::constants::FLOC_DENSITY
}

impl Default for SedimentationConfig {
    fn default() -> Self {
        SedimentationConfig {
            area: default_sed_area(),
            height: default_sed_height(),
            overflow_rate: default_overflow_rate(),
            floc_density: default_floc_density(),
        }
    }
}

/// Initial log-normal particle size distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    #[serde(default = "default_bins")]
    pub bins: usize,
    /// μm
    #[serde(default = "default_min_size")]
    pub min_size: f64,
    /// μm
    #[serde(default = "default_max_size")]
    pub max_size: f64,
    /// Mean of ln(d / 1 μm)
    #[serde(default = "default_mu")]
    pub mu: f64,
    /// Standard deviation of ln(d / 1 μm)
    #[serde(default = "default_sigma")]
    pub sigma: f64,
}

fn default_bins() -> usize {
    50
}
fn default_min_size() -> f64 {
    0.1
}
fn default_max_size() -> f64 {
    100.0
}
fn default_mu() -> f64 {
    2.0
}
fn default_sigma() -> f64 {
    0.8
}

impl Default for DistributionConfig {
    fn default() -> Self {
        DistributionConfig {
            bins: default_bins(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            mu: default_mu(),
            sigma: default_sigma(),
        }
    }
}

impl DistributionConfig {
    /// Log-normal distribution normalized to `total_mass` mg/L.
    pub fn build(&self, total_mass: f64) -> TreatmentResult<SizeDistribution> {
        SizeDistribution::log_normal(self.bins, self.min_size, self.max_size, self.mu, self.sigma)?
            .normalized(total_mass)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    #[serde(default = "default_atol")]
    pub atol: f64,
    /// Attempted-step budget per chamber.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Evenly spaced trajectory samples per chamber, endpoints included.
    #[serde(default = "default_output_points")]
    pub output_points: usize,
}

fn default_rtol() -> f64 {
    1e-6
}
fn default_atol() -> f64 {
    1e-9
}
fn default_max_steps() -> usize {
    100_000
}
fn default_output_points() -> usize {
    100
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            rtol: default_rtol(),
            atol: default_atol(),
            max_steps: default_max_steps(),
            output_points: default_output_points(),
        }
    }
}

impl SolverConfig {
    pub fn ode_options(&self) -> OdeOptions {
        OdeOptions {
            rtol: self.rtol,
            atol: self.atol,
            max_steps: self.max_steps,
            ..OdeOptions::default()
        }
    }
}

impl Default for PlantConfig {
    fn default() -> Self {
        PlantConfig {
            water: WaterConfig::default(),
            flow_rate: default_flow_rate(),
            rapid_mix: RapidMixConfig::default(),
            flocculation: FlocculationConfig::default(),
            sedimentation: SedimentationConfig::default(),
            coagulant_dose: default_coagulant_dose(),
            distribution: DistributionConfig::default(),
            solver: SolverConfig::default(),
            constants: ModelConstants::default(),
        }
    }
}

impl PlantConfig {
    /// Reference plant: 20 °C, pH 7.5, 120 mg/L alkalinity, 50 NTU raw water,
    /// 0.02 g/L alum, three 600 s flocculation chambers at G = 50 s⁻¹.
    pub fn baseline() -> Self {
        PlantConfig {
            water: WaterConfig {
                ph: 7.5,
                alkalinity: 120.0,
                initial_solids: Some(50.0),
                ..WaterConfig::default()
            },
            ..PlantConfig::default()
        }
    }

    /// Load from a JSON file.
    pub fn from_file(path: &str) -> TreatmentResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> TreatmentResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> TreatmentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ranges before any stage runs.
    pub fn validate(&self) -> TreatmentResult<()> {
        let wrap = |e: TreatmentError| match e {
            TreatmentError::InvalidInput(msg) => TreatmentError::ConfigError(msg),
            other => other,
        };

        self.water.chemistry().map_err(wrap)?;
        ensure_non_negative("water.initial_solids", self.water.initial_solids()).map_err(wrap)?;
        ensure_positive("flow_rate", self.flow_rate).map_err(wrap)?;
        ensure_non_negative("coagulant_dose", self.coagulant_dose).map_err(wrap)?;

        ensure_non_negative("rapid_mix.volume", self.rapid_mix.volume).map_err(wrap)?;
        ensure_non_negative("rapid_mix.velocity_gradient", self.rapid_mix.velocity_gradient)
            .map_err(wrap)?;
        ensure_non_negative("rapid_mix.mixing_time", self.rapid_mix.mixing_time).map_err(wrap)?;

        if self.flocculation.chambers == 0 {
            return Err(TreatmentError::ConfigError(
                "flocculation.chambers must be at least 1".to_string(),
            ));
        }
        ensure_non_negative("flocculation.volume", self.flocculation.volume).map_err(wrap)?;
        ensure_non_negative(
            "flocculation.velocity_gradient",
            self.flocculation.velocity_gradient,
        )
        .map_err(wrap)?;
        ensure_non_negative("flocculation.total_time", self.flocculation.total_time)
            .map_err(wrap)?;

        ensure_positive("sedimentation.area", self.sedimentation.area).map_err(wrap)?;
        ensure_positive("sedimentation.height", self.sedimentation.height).map_err(wrap)?;
        ensure_positive("sedimentation.overflow_rate", self.sedimentation.overflow_rate)
            .map_err(wrap)?;
        ensure_positive("sedimentation.floc_density", self.sedimentation.floc_density)
            .map_err(wrap)?;

        if self.distribution.bins < 2 {
            return Err(TreatmentError::ConfigError(format!(
                "distribution.bins must be at least 2, got {}",
                self.distribution.bins
            )));
        }
        ensure_positive("distribution.min_size", self.distribution.min_size).map_err(wrap)?;
        if !self.distribution.max_size.is_finite()
            || self.distribution.max_size <= self.distribution.min_size
        {
            return Err(TreatmentError::ConfigError(format!(
                "distribution.max_size {} must exceed min_size {}",
                self.distribution.max_size, self.distribution.min_size
            )));
        }
        ensure_positive("distribution.sigma", self.distribution.sigma).map_err(wrap)?;

        ensure_positive("solver.rtol", self.solver.rtol).map_err(wrap)?;
        ensure_positive("solver.atol", self.solver.atol).map_err(wrap)?;
        if self.solver.max_steps == 0 {
            return Err(TreatmentError::ConfigError(
                "solver.max_steps must be at least 1".to_string(),
            ));
        }

        self.constants.validate().map_err(wrap)?;
        Ok(())
    }
}
