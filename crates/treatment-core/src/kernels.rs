// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Aggregation & Breakage Kernels
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Collision and fragmentation rate kernels for the population balance.
//!
//! Aggregation combines perikinetic (Brownian, Smoluchowski) and orthokinetic
//! (turbulent shear, Saffman-Turner) collisions:
//!   β_B = 2·kB·T / (3·μ) · (di + dj)² / (di·dj)
//!   β_T = α · √(ε/ν) · (di + dj)³,   ε = G²·μ/ρ,  ν = μ/ρ
//!
//! Breakage is a power law in the turbulent shear rate:
//!   S(d) = C_b · √(ε/ν) · d^(2/3)
//!
//! All diameters are in metres.

use treatment_types::constants::{ModelConstants, KELVIN_OFFSET};

/// Turbulent shear rate √(ε/ν) [s⁻¹] for velocity gradient `g` [s⁻¹].
///
/// Reduces to `g` analytically; evaluated through ε and ν so that the
/// density passed in is the one each kernel is defined with.
pub fn turbulent_shear_rate(g: f64, viscosity: f64, density: f64) -> f64 {
    let epsilon = g * g * viscosity / density;
    let nu = viscosity / density;
    (epsilon / nu).sqrt()
}

/// Brownian (perikinetic) collision frequency [m³/s].
pub fn brownian_rate(di: f64, dj: f64, temperature_c: f64, viscosity: f64, constants: &ModelConstants) -> f64 {
    let t_k = temperature_c + KELVIN_OFFSET;
    let sum = di + dj;
    (2.0 * constants.boltzmann * t_k) / (3.0 * viscosity) * (sum * sum) / (di * dj)
}

/// Turbulent (orthokinetic) collision frequency [m³/s].
pub fn turbulent_rate(di: f64, dj: f64, g: f64, viscosity: f64, constants: &ModelConstants) -> f64 {
    let shear = turbulent_shear_rate(g, viscosity, constants.kernel_water_density);
    constants.collision_efficiency * shear * (di + dj).powi(3)
}

/// Total aggregation kernel β(di, dj) [m³/s].
///
/// Symmetric in `di`, `dj`. Caller guarantees both diameters are > 0.
pub fn coagulation_rate(
    di: f64,
    dj: f64,
    g: f64,
    temperature_c: f64,
    viscosity: f64,
    constants: &ModelConstants,
) -> f64 {
    brownian_rate(di, dj, temperature_c, viscosity, constants)
        + turbulent_rate(di, dj, g, viscosity, constants)
}

/// Fragmentation rate S(d) [s⁻¹].
///
/// `floc_density` is accepted for interface symmetry with the settling model;
/// the calibrated power law does not depend on it.
pub fn breakage_rate(
    d: f64,
    g: f64,
    _floc_density: f64,
    viscosity: f64,
    water_density: f64,
    constants: &ModelConstants,
) -> f64 {
    let shear = turbulent_shear_rate(g, viscosity, water_density);
    constants.breakage_coefficient * shear * d.powf(2.0 / 3.0)
}

/// Fraction of a broken bin-`j` particle that lands in bin `i` (< `j`).
///
/// Uniform-in-index approximation, not mass conserving in general.
pub fn fragment_distribution(i: usize, j: usize) -> f64 {
    if j > i {
        2.0 / (j - i + 1) as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MU: f64 = 1.0e-3;

    #[test]
    fn test_coagulation_rate_symmetric() {
        let c = ModelConstants::default();
        let a = coagulation_rate(2e-6, 30e-6, 50.0, 20.0, MU, &c);
        let b = coagulation_rate(30e-6, 2e-6, 50.0, 20.0, MU, &c);
        assert!((a - b).abs() <= 1e-15 * a.abs());
    }

    #[test]
    fn test_brownian_term_for_equal_sizes() {
        // (di + dj)² / (di·dj) = 4 for di = dj, independent of size
        let c = ModelConstants::default();
        let t_k = 20.0 + KELVIN_OFFSET;
        let expected = 8.0 * c.boltzmann * t_k / (3.0 * MU);
        let small = brownian_rate(1e-7, 1e-7, 20.0, MU, &c);
        let large = brownian_rate(1e-4, 1e-4, 20.0, MU, &c);
        assert!((small - expected).abs() < 1e-12 * expected);
        assert!((large - expected).abs() < 1e-12 * expected);
    }

    #[test]
    fn test_turbulent_term_scales_with_g_and_cube() {
        let c = ModelConstants::default();
        let base = turbulent_rate(10e-6, 10e-6, 50.0, MU, &c);
        let double_g = turbulent_rate(10e-6, 10e-6, 100.0, MU, &c);
        let double_d = turbulent_rate(20e-6, 20e-6, 50.0, MU, &c);
        assert!((double_g / base - 2.0).abs() < 1e-12);
        assert!((double_d / base - 8.0).abs() < 1e-12);
        // α·G·(2d)³ = 0.2·50·8e-15
        assert!((base - 0.2 * 50.0 * 8e-15).abs() < 1e-24);
    }

    #[test]
    fn test_zero_g_leaves_only_brownian() {
        let c = ModelConstants::default();
        let total = coagulation_rate(5e-6, 7e-6, 0.0, 15.0, MU, &c);
        let brown = brownian_rate(5e-6, 7e-6, 15.0, MU, &c);
        assert_eq!(total, brown);
    }

    #[test]
    fn test_breakage_rate_power_law() {
        let c = ModelConstants::default();
        let s1 = breakage_rate(1e-6, 50.0, 1200.0, MU, 998.0, &c);
        let s8 = breakage_rate(8e-6, 50.0, 1200.0, MU, 998.0, &c);
        // (8)^(2/3) = 4
        assert!((s8 / s1 - 4.0).abs() < 1e-12);
        assert!((s1 - 1e-5 * 50.0 * 1e-4).abs() < 1e-15);
    }

    #[test]
    fn test_breakage_ignores_floc_density_and_can_be_disabled() {
        let c = ModelConstants::default();
        let a = breakage_rate(1e-5, 40.0, 1050.0, MU, 998.0, &c);
        let b = breakage_rate(1e-5, 40.0, 2500.0, MU, 998.0, &c);
        assert_eq!(a, b);
        let off = ModelConstants::without_breakage();
        assert_eq!(breakage_rate(1e-5, 40.0, 1200.0, MU, 998.0, &off), 0.0);
    }

    #[test]
    fn test_fragment_distribution() {
        assert_eq!(fragment_distribution(0, 1), 1.0);
        assert_eq!(fragment_distribution(2, 5), 0.5);
        assert_eq!(fragment_distribution(3, 3), 0.0);
        assert_eq!(fragment_distribution(4, 1), 0.0);
    }
}
