// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Treatment Pipeline
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Rapid mix → flocculation → sedimentation, wired from one [`PlantConfig`].

use crate::flocculation::Flocculation;
use crate::rapid_mix::RapidMix;
use crate::runner::RunControl;
use crate::sedimentation::Sedimentation;
use treatment_types::config::PlantConfig;
use treatment_types::error::TreatmentResult;
use treatment_types::state::{OperatingPerformance, SizeDistribution, TreatmentReport, WaterChemistry};

#[derive(Debug, Clone)]
pub struct TreatmentPipeline {
    config: PlantConfig,
    rapid_mix: RapidMix,
    flocculation: Flocculation,
    sedimentation: Sedimentation,
}

impl TreatmentPipeline {
    /// Validate `config` and build the three stages.
    pub fn from_config(config: &PlantConfig) -> TreatmentResult<Self> {
        config.validate()?;
        Ok(TreatmentPipeline {
            config: config.clone(),
            rapid_mix: RapidMix::from_config(config)?,
            flocculation: Flocculation::from_config(config)?,
            sedimentation: Sedimentation::from_config(config)?,
        })
    }

    pub fn config(&self) -> &PlantConfig {
        &self.config
    }

    pub fn rapid_mix(&self) -> &RapidMix {
        &self.rapid_mix
    }

    pub fn flocculation(&self) -> &Flocculation {
        &self.flocculation
    }

    pub fn sedimentation(&self) -> &Sedimentation {
        &self.sedimentation
    }

    /// Raw water and influent distribution described by the config.
    pub fn influent(&self) -> TreatmentResult<(WaterChemistry, SizeDistribution)> {
        let chemistry = self.config.water.chemistry()?;
        let distribution = self
            .config
            .distribution
            .build(self.config.water.initial_solids())?;
        Ok((chemistry, distribution))
    }

    /// Run the configured plant at the configured dose.
    pub fn run(&self) -> TreatmentResult<TreatmentReport> {
        self.run_with_control(&RunControl::unbounded())
    }

    pub fn run_with_control(&self, control: &RunControl) -> TreatmentResult<TreatmentReport> {
        let (chemistry, distribution) = self.influent()?;
        self.run_with(&chemistry, &distribution, self.config.coagulant_dose, control)
    }

    /// Run the three stages on explicit inputs.
    pub fn run_with(
        &self,
        chemistry: &WaterChemistry,
        distribution: &SizeDistribution,
        dose: f64,
        control: &RunControl,
    ) -> TreatmentResult<TreatmentReport> {
        let initial = chemistry.snapshot();
        tracing::debug!(dose, influent_mass = distribution.total_mass(), "pipeline: start");

        let (dosed, coarsened, rapid_mix) = self.rapid_mix.process(chemistry, distribution, dose)?;
        let (flocculated, flocculation) = self.flocculation.process(&dosed, &coarsened, control)?;
        let sedimentation = self.sedimentation.process(&dosed, &flocculated)?;

        let performance = OperatingPerformance::compute(
            dose,
            self.config.flow_rate,
            sedimentation.influent_mass,
            sedimentation.effluent_mass,
        )?;
        let final_efficiency = sedimentation.efficiency_percent;

        tracing::debug!(final_efficiency, "pipeline: done");
        Ok(TreatmentReport {
            initial,
            after_coagulation: dosed.snapshot(),
            coagulant_dose: dose,
            influent: distribution.clone(),
            rapid_mix,
            flocculation,
            sedimentation,
            final_efficiency,
            performance,
        })
    }
}
