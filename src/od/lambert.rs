//! Lambert's problem by universal variables.

use nalgebra::Vector3;

use crate::error::{Error, Result};

/// Iteration budget for the time-of-flight search.
const MAX_ITERATIONS: usize = 80;

/// Convergence tolerance on time of flight, seconds.
const TIME_TOLERANCE: f64 = 1e-8;

/// Transfer branch selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LambertBranch {
    /// Transfer angle below π ("short way").
    #[default]
    Short,
    /// Transfer angle above π ("long way").
    Long,
}

/// Stumpff functions `C(z)` and `S(z)`.
fn stumpff(z: f64) -> (f64, f64) {
    if z > 1e-6 {
        let sqrt_z = z.sqrt();
        (
            (1.0 - sqrt_z.cos()) / z,
            (sqrt_z - sqrt_z.sin()) / (z * sqrt_z),
        )
    } else if z < -1e-6 {
        let sqrt_mz = (-z).sqrt();
        (
            (1.0 - sqrt_mz.cosh()) / z,
            (sqrt_mz.sinh() - sqrt_mz) / ((-z) * sqrt_mz),
        )
    } else {
        // Series limits at z → 0.
        (0.5 - z / 24.0, 1.0 / 6.0 - z / 120.0)
    }
}

/// Solve Lambert's problem: the velocities of the conic connecting `r1`
/// to `r2` in `time_of_flight` seconds around a body of parameter `mu`.
///
/// `revolutions` selects the multi-revolution branch (0 for the direct
/// transfer); `branch` picks the short or long way around. Returns
/// `(v1, v2)` in km/s.
///
/// Universal-variable formulation with a bisection search on the
/// universal parameter (Battin-style single-parameter iteration).
///
/// # Errors
///
/// [`Error::LambertNoConvergence`] when the iteration budget is exhausted, which
/// includes times of flight unreachable on the requested branch.
pub fn lambert(
    r1: &Vector3<f64>,
    r2: &Vector3<f64>,
    time_of_flight: f64,
    mu: f64,
    revolutions: usize,
    branch: LambertBranch,
) -> Result<(Vector3<f64>, Vector3<f64>)> {
    let r1_mag = r1.norm();
    let r2_mag = r2.norm();

    let cos_transfer = (r1.dot(r2) / (r1_mag * r2_mag)).clamp(-1.0, 1.0);
    let direction = if branch == LambertBranch::Short { 1.0 } else { -1.0 };
    let a_parameter = direction * (r1_mag * r2_mag * (1.0 + cos_transfer)).sqrt();
    if a_parameter.abs() < 1e-12 {
        // 180° transfer: the plane is undefined in this formulation.
        return Err(Error::LambertNoConvergence { iterations: 0 });
    }

    // Bracket the universal parameter. Direct transfers sweep from
    // strongly hyperbolic to just under the first parabolic boundary;
    // multi-rev transfers live between consecutive (2kπ)² boundaries.
    let (mut z_low, mut z_high) = if revolutions == 0 {
        (-4.0 * std::f64::consts::PI * std::f64::consts::PI, 4.0 * std::f64::consts::PI * std::f64::consts::PI)
    } else {
        let k = revolutions as f64;
        let lower = (2.0 * k * std::f64::consts::PI).powi(2) + 1e-6;
        let upper = (2.0 * (k + 1.0) * std::f64::consts::PI).powi(2) - 1e-6;
        (lower, upper)
    };

    let time_at = |z: f64| -> Option<(f64, f64)> {
        let (c, s) = stumpff(z);
        let y = r1_mag + r2_mag + a_parameter * (z * s - 1.0) / c.sqrt();
        if y < 0.0 || c <= 0.0 {
            return None;
        }
        let chi = (y / c).sqrt();
        let t = (chi.powi(3) * s + a_parameter * y.sqrt()) / mu.sqrt();
        Some((t, y))
    };

    let mut z = 0.5 * (z_low + z_high);
    let mut y_final = 0.0;
    let mut converged = false;
    for _ in 0..MAX_ITERATIONS {
        z = 0.5 * (z_low + z_high);
        match time_at(z) {
            Some((t, y)) => {
                if (t - time_of_flight).abs() < TIME_TOLERANCE {
                    y_final = y;
                    converged = true;
                    break;
                }
                // Time of flight increases monotonically with z on each
                // branch.
                if t < time_of_flight {
                    z_low = z;
                } else {
                    z_high = z;
                }
            }
            None => {
                // y < 0: z too small for this geometry.
                z_low = z;
            }
        }
    }
    if !converged {
        return Err(Error::LambertNoConvergence { iterations: MAX_ITERATIONS });
    }

    let f = 1.0 - y_final / r1_mag;
    let g = a_parameter * (y_final / mu).sqrt();
    let g_dot = 1.0 - y_final / r2_mag;
    let v1 = (r2 - f * r1) / g;
    let v2 = (g_dot * r2 - r1) / g;
    Ok((v1, v2))
}
