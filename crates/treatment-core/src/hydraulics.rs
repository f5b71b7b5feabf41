// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Hydraulics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Unit-process hydraulics: residence times, mixing intensity, head losses.

use treatment_types::constants::GRAVITY;
use treatment_types::error::{ensure_non_negative, ensure_positive, TreatmentResult};

/// Seconds per hour.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Loss coefficient of a 180° baffle turn.
pub const BAFFLE_LOSS_COEFFICIENT: f64 = 2.5;

/// Hydraulic residence time [s] of `volume` m³ at `flow` m³/h.
pub fn residence_time(volume: f64, flow: f64) -> TreatmentResult<f64> {
    ensure_non_negative("volume", volume)?;
    ensure_positive("flow rate", flow)?;
    Ok(volume / (flow / SECONDS_PER_HOUR))
}

/// Camp velocity gradient G = √(P / (μ·V)) [s⁻¹].
pub fn velocity_gradient(power: f64, viscosity: f64, volume: f64) -> TreatmentResult<f64> {
    ensure_non_negative("power", power)?;
    ensure_positive("viscosity", viscosity)?;
    ensure_positive("volume", volume)?;
    Ok((power / (viscosity * volume)).sqrt())
}

/// Kinetic power dissipated by a jet, ½·ρ·v²·Q [W], with `flow` in m³/s.
pub fn jet_dissipation_power(density: f64, jet_velocity: f64, flow: f64) -> TreatmentResult<f64> {
    ensure_positive("density", density)?;
    ensure_non_negative("jet velocity", jet_velocity)?;
    ensure_non_negative("flow", flow)?;
    Ok(0.5 * density * jet_velocity * jet_velocity * flow)
}

/// Head loss through `turns` baffle turns, n·K·v²/(2g) [m].
pub fn baffle_head_loss(turns: u32, loss_coefficient: f64, velocity: f64) -> TreatmentResult<f64> {
    ensure_non_negative("loss coefficient", loss_coefficient)?;
    ensure_non_negative("velocity", velocity)?;
    Ok(turns as f64 * loss_coefficient * velocity * velocity / (2.0 * GRAVITY))
}

/// Power dissipated by a head loss, ρ·g·Q·h [W], with `flow` in m³/s.
pub fn head_loss_power(density: f64, flow: f64, head: f64) -> TreatmentResult<f64> {
    ensure_positive("density", density)?;
    ensure_non_negative("flow", flow)?;
    ensure_non_negative("head loss", head)?;
    Ok(density * GRAVITY * flow * head)
}

/// Dimensionless mixing intensity G·t.
pub fn camp_number(g: f64, time: f64) -> TreatmentResult<f64> {
    ensure_non_negative("velocity gradient", g)?;
    ensure_non_negative("time", time)?;
    Ok(g * time)
}

/// Surface loading rate [m/h] of `flow` m³/h over `area` m².
pub fn surface_loading(flow: f64, area: f64) -> TreatmentResult<f64> {
    ensure_non_negative("flow rate", flow)?;
    ensure_positive("area", area)?;
    Ok(flow / area)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residence_time() {
        // 10 m³ at 100 m³/h = 360 s
        assert!((residence_time(10.0, 100.0).unwrap() - 360.0).abs() < 1e-9);
        assert!(residence_time(10.0, 0.0).is_err());
        assert!(residence_time(-1.0, 100.0).is_err());
    }

    #[test]
    fn test_velocity_gradient_inverts_power() {
        let mu = 1.002e-3;
        let v = 2.0;
        let g = 700.0;
        let p = g * g * mu * v;
        assert!((velocity_gradient(p, mu, v).unwrap() - g).abs() < 1e-9);
    }

    #[test]
    fn test_baffled_channel_power_chain() {
        let h = baffle_head_loss(10, BAFFLE_LOSS_COEFFICIENT, 0.2).unwrap();
        // 10·2.5·0.04 / 19.62
        assert!((h - 1.0 / 19.62).abs() < 1e-12);
        let p = head_loss_power(998.0, 0.01, h).unwrap();
        assert!((p - 998.0 * 9.81 * 0.01 * h).abs() < 1e-9);
        assert_eq!(baffle_head_loss(0, 2.5, 0.3).unwrap(), 0.0);
    }

    #[test]
    fn test_jet_power() {
        let p = jet_dissipation_power(1000.0, 2.0, 0.01).unwrap();
        assert!((p - 20.0).abs() < 1e-12);
        assert!(jet_dissipation_power(1000.0, f64::NAN, 0.01).is_err());
    }

    #[test]
    fn test_camp_number_and_loading() {
        assert_eq!(camp_number(50.0, 1800.0).unwrap(), 90_000.0);
        assert!(camp_number(-1.0, 10.0).is_err());
        assert_eq!(surface_loading(100.0, 100.0).unwrap(), 1.0);
        assert!(surface_loading(100.0, 0.0).is_err());
    }
}
