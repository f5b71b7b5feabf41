// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Quadrature
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Trapezoidal integration and grid construction over size bins.

use ndarray::Array1;

/// Trapezoidal integral of `y` over the abscissae `x`.
///
/// Non-uniform spacing is supported. Returns 0 for fewer than two points.
/// Panics if the lengths differ.
pub fn trapezoid(y: &Array1<f64>, x: &Array1<f64>) -> f64 {
    assert_eq!(y.len(), x.len(), "trapezoid: y and x lengths differ");
    let n = x.len();
    if n < 2 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n - 1 {
        acc += 0.5 * (y[i] + y[i + 1]) * (x[i + 1] - x[i]);
    }
    acc
}

/// First moment over zeroth moment: ∫x·y dx / ∫y dx.
///
/// Returns 0 when the zeroth moment vanishes (empty or all-zero weights).
pub fn weighted_mean(y: &Array1<f64>, x: &Array1<f64>) -> f64 {
    let m0 = trapezoid(y, x);
    if m0 == 0.0 || !m0.is_finite() {
        return 0.0;
    }
    let xy = x * y;
    trapezoid(&xy, x) / m0
}

/// Geometrically spaced points from `min` to `max` inclusive.
///
/// `log_space(0.1, 100.0, 50)` spans three decades in 50 points.
pub fn log_space(min: f64, max: f64, n: usize) -> Array1<f64> {
    if n == 0 {
        return Array1::zeros(0);
    }
    if n == 1 {
        return Array1::from_elem(1, min);
    }
    let lo = min.log10();
    let hi = max.log10();
    Array1::from_shape_fn(n, |i| {
        let t = i as f64 / (n - 1) as f64;
        10.0_f64.powf(lo + (hi - lo) * t)
    })
}
