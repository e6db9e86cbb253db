//! Scalar numerical helpers: angle wrapping, polynomial evaluation, Kepler's
//! equation, finite differences, and Gaussian sampling.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::constants::TWO_PI;

/// Normalize an angle into `[0, 2π)`.
#[must_use]
pub fn wrap_two_pi(angle: f64) -> f64 {
    let mut w = angle % TWO_PI;
    if w < 0.0 {
        w += TWO_PI;
    }
    w
}

/// Normalize an angle into `(−π, π]`.
#[must_use]
pub fn wrap_pi(angle: f64) -> f64 {
    let w = wrap_two_pi(angle);
    if w > std::f64::consts::PI {
        w - TWO_PI
    } else {
        w
    }
}

/// Difference `a − b` between two angles, wrapped into `(−π, π]`.
///
/// Subtracting raw right ascensions across the 0/2π seam produces residuals
/// near ±2π; this keeps them small.
#[must_use]
pub fn angle_residual(a: f64, b: f64) -> f64 {
    wrap_pi(a - b)
}

/// Evaluate a polynomial with coefficients in ascending order by Horner's
/// scheme: `c[0] + c[1]·t + c[2]·t² + …`.
#[must_use]
pub fn polyval(t: f64, coefficients: &[f64]) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * t + c)
}

/// Iterations allowed when solving Kepler's equation.
const KEPLER_MAX_ITERATIONS: usize = 32;

/// Convergence tolerance on the eccentric anomaly update, radians.
const KEPLER_TOLERANCE: f64 = 1e-12;

/// Solve Kepler's equation `E − e·sin E = M` for the eccentric anomaly by
/// Newton–Raphson, seeded from the mean anomaly.
///
/// Converges quadratically for elliptical orbits; the iteration cap is a
/// safety net for near-parabolic eccentricities and is not an error when the
/// last update was already below tolerance.
#[must_use]
pub fn kepler_equation(mean_anomaly: f64, eccentricity: f64) -> f64 {
    let m = wrap_two_pi(mean_anomaly);
    let mut e_anom = m;
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let delta = (e_anom - eccentricity * e_anom.sin() - m)
            / (1.0 - eccentricity * e_anom.cos());
        e_anom -= delta;
        if delta.abs() < KEPLER_TOLERANCE {
            break;
        }
    }
    e_anom
}

/// How to measure the angular separation of two spherical directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AngularDistanceMethod {
    /// Spherical law of cosines. Cheap, loses precision below ~1e-5 rad.
    Cosine,
    /// Haversine formula, numerically stable for small separations.
    #[default]
    Haversine,
}

/// Angular distance between two `(azimuth-like, elevation-like)` directions,
/// e.g. two right ascension / declination pairs.
#[must_use]
pub fn angular_distance(
    alpha_1: f64,
    delta_1: f64,
    alpha_2: f64,
    delta_2: f64,
    method: AngularDistanceMethod,
) -> f64 {
    match method {
        AngularDistanceMethod::Cosine => {
            let cos_sep = delta_1.sin() * delta_2.sin()
                + delta_1.cos() * delta_2.cos() * (alpha_2 - alpha_1).cos();
            cos_sep.clamp(-1.0, 1.0).acos()
        }
        AngularDistanceMethod::Haversine => {
            let sd = ((delta_2 - delta_1) * 0.5).sin();
            let sa = ((alpha_2 - alpha_1) * 0.5).sin();
            let h = sd * sd + delta_1.cos() * delta_2.cos() * sa * sa;
            2.0 * h.sqrt().clamp(-1.0, 1.0).asin()
        }
    }
}

/// Jacobian of `f` at `x` by central finite differences.
///
/// Each column `j` is `(f(x + h·eⱼ) − f(x − h·eⱼ)) / 2h` with the step taken
/// from `steps[j]`.
pub fn central_difference_jacobian<F>(
    f: F,
    x: &DVector<f64>,
    steps: &DVector<f64>,
) -> DMatrix<f64>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    let n = x.len();
    let probe = f(x);
    let m = probe.len();
    let mut jacobian = DMatrix::zeros(m, n);
    for j in 0..n {
        let h = steps[j];
        let mut high = x.clone();
        let mut low = x.clone();
        high[j] += h;
        low[j] -= h;
        let column = (f(&high) - f(&low)) / (2.0 * h);
        jacobian.set_column(j, &column);
    }
    jacobian
}

/// Draw a standard normal deviate by the Box–Muller transform.
#[must_use]
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (TWO_PI * u2).cos()
}

/// Draw a normal deviate with the given mean and standard deviation.
#[must_use]
pub fn gaussian_scaled<R: Rng + ?Sized>(rng: &mut R, mean: f64, sigma: f64) -> f64 {
    mean + sigma * gaussian(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn wrapping_is_idempotent_on_canonical_range() {
        assert_abs_diff_eq!(wrap_two_pi(-0.5), TWO_PI - 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_two_pi(TWO_PI + 0.25), 0.25, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_pi(3.5), 3.5 - TWO_PI, epsilon = 1e-15);
        assert_abs_diff_eq!(wrap_pi(-3.5), TWO_PI - 3.5, epsilon = 1e-15);
    }

    #[test]
    fn angle_residual_crosses_the_seam() {
        // 1° past the seam vs 1° before it: the residual is 2°, not 358°.
        let a = 0.5_f64.to_radians();
        let b = 359.5_f64.to_radians();
        assert_abs_diff_eq!(angle_residual(a, b), 1.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn polyval_matches_direct_evaluation() {
        let c = [1.0, -2.0, 0.5, 3.0];
        let t = 1.7;
        let direct = 1.0 - 2.0 * t + 0.5 * t * t + 3.0 * t * t * t;
        assert_abs_diff_eq!(polyval(t, &c), direct, epsilon = 1e-12);
    }

    #[test]
    fn kepler_solution_satisfies_the_equation() {
        for &e in &[0.0, 0.1, 0.7, 0.95] {
            for k in 0..8 {
                let m = k as f64 * PI / 4.0;
                let big_e = kepler_equation(m, e);
                assert_abs_diff_eq!(
                    big_e - e * big_e.sin(),
                    wrap_two_pi(m),
                    epsilon = 1e-10
                );
            }
        }
    }

    #[test]
    fn haversine_agrees_with_cosine_at_large_separation() {
        let d1 = angular_distance(0.1, 0.2, 1.5, -0.4, AngularDistanceMethod::Cosine);
        let d2 = angular_distance(0.1, 0.2, 1.5, -0.4, AngularDistanceMethod::Haversine);
        assert_abs_diff_eq!(d1, d2, epsilon = 1e-10);
    }

    #[test]
    fn jacobian_of_linear_map_is_its_matrix() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, -1.0, 0.5, 4.0]);
        let f = |x: &DVector<f64>| &a * x;
        let x = DVector::from_vec(vec![0.3, -0.7, 1.1]);
        let steps = DVector::from_element(3, 1e-5);
        let j = central_difference_jacobian(f, &x, &steps);
        assert_abs_diff_eq!((j - a).norm(), 0.0, epsilon = 1e-8);
    }

    #[test]
    fn gaussian_moments_are_plausible() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| gaussian(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>()
            / (n - 1) as f64;
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }
}
