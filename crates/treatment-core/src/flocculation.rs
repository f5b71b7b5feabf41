// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Flocculation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Chambers-in-series flocculator.
//!
//! The total residence time is split evenly over the chambers. Each chamber
//! integrates the population balance at the average velocity gradient and
//! passes its outlet distribution to the next one.

use crate::hydraulics::camp_number;
use crate::population_balance::PopulationBalance;
use crate::runner::RunControl;
use treatment_types::config::{PlantConfig, SolverConfig};
use treatment_types::constants::ModelConstants;
use treatment_types::error::{ensure_non_negative, TreatmentError, TreatmentResult};
use treatment_types::state::{ChamberResult, FlocculationResult, SizeDistribution, WaterChemistry};

#[derive(Debug, Clone)]
pub struct Flocculation {
    chambers: usize,
    /// Total train volume [m³]
    volume: f64,
    /// s⁻¹
    velocity_gradient: f64,
    /// s
    total_time: f64,
    solver: SolverConfig,
    constants: ModelConstants,
}

impl Flocculation {
    pub fn new(
        chambers: usize,
        volume: f64,
        velocity_gradient: f64,
        total_time: f64,
        constants: ModelConstants,
    ) -> TreatmentResult<Self> {
        if chambers == 0 {
            return Err(TreatmentError::InvalidInput(
                "flocculation needs at least one chamber".to_string(),
            ));
        }
        ensure_non_negative("flocculation volume", volume)?;
        ensure_non_negative("flocculation velocity gradient", velocity_gradient)?;
        ensure_non_negative("flocculation time", total_time)?;
        Ok(Flocculation {
            chambers,
            volume,
            velocity_gradient,
            total_time,
            solver: SolverConfig::default(),
            constants,
        })
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn from_config(config: &PlantConfig) -> TreatmentResult<Self> {
        Ok(Self::new(
            config.flocculation.chambers,
            config.flocculation.volume,
            config.flocculation.velocity_gradient,
            config.flocculation.total_time,
            config.constants.clone(),
        )?
        .with_solver(config.solver.clone()))
    }

    pub fn chambers(&self) -> usize {
        self.chambers
    }

    /// s
    pub fn chamber_time(&self) -> f64 {
        self.total_time / self.chambers as f64
    }

    /// m³
    pub fn chamber_volume(&self) -> f64 {
        self.volume / self.chambers as f64
    }

    /// Run every chamber in order.
    ///
    /// `control` is consulted before each chamber. An integration failure
    /// aborts the train with the 1-based index of the failing chamber.
    pub fn process(
        &self,
        chemistry: &WaterChemistry,
        distribution: &SizeDistribution,
        control: &RunControl,
    ) -> TreatmentResult<(SizeDistribution, FlocculationResult)> {
        let chamber_time = self.chamber_time();
        tracing::debug!(
            chambers = self.chambers,
            chamber_time,
            g = self.velocity_gradient,
            "flocculation: start"
        );

        let balance = PopulationBalance::new(
            distribution.sizes(),
            self.velocity_gradient,
            chemistry,
            &self.constants,
        )?;
        let options = self.solver.ode_options();

        let mut current = distribution.clone();
        let mut records = Vec::with_capacity(self.chambers);
        for index in 0..self.chambers {
            control.check(index)?;
            let chamber = index + 1;

            let integration = balance
                .integrate(&current, chamber_time, &options, self.solver.output_points)
                .map_err(|e| match e {
                    TreatmentError::IntegrationFailed { .. } => {
                        TreatmentError::ChamberNonConvergence {
                            chamber,
                            source: Box::new(e),
                        }
                    }
                    other => other,
                })?;

            tracing::debug!(
                chamber,
                accepted = integration.stats.accepted_steps,
                rejected = integration.stats.rejected_steps,
                mean_size = integration.distribution.mean_size(),
                "flocculation: chamber done"
            );

            current = integration.distribution;
            records.push(ChamberResult {
                chamber,
                chamber_time_s: chamber_time,
                velocity_gradient: self.velocity_gradient,
                times: integration.times,
                mean_sizes: integration.mean_sizes,
                trajectory: integration.trajectory,
                final_distribution: current.clone(),
                stats: integration.stats,
            });
        }

        let result = FlocculationResult {
            chambers: records,
            chamber_time_s: chamber_time,
            total_time_s: self.total_time,
            camp_number: camp_number(self.velocity_gradient, self.total_time)?,
            initial_mean_size_um: distribution.mean_size(),
            final_mean_size_um: current.mean_size(),
        };
        Ok((current, result))
    }
}
