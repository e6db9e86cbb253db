//! Embedded EGM-96 geopotential coefficients and the spherical-harmonic
//! acceleration.
//!
//! Coefficients are stored normalized, exactly as published, through degree
//! and order 8 — enough for the medium-fidelity force models this crate
//! targets — and unnormalized once at load. Callers needing higher-degree
//! fields supply their own tables through the same interface.

use nalgebra::Vector3;

use crate::constants::{EARTH_RADIUS_EQUATORIAL, MU_EARTH};

/// Highest degree and order carried by the embedded table.
pub const MAX_DEGREE: usize = 8;

/// Normalized EGM-96 coefficients `(n, m, C̄nm, S̄nm)` for `2 ≤ n ≤ 8`.
#[rustfmt::skip]
const NORMALIZED: [(usize, usize, f64, f64); 42] = [
    (2, 0, -0.484_165_371_736e-3,  0.0),
    (2, 1, -0.186_987_635_955e-9,  0.119_528_012_031e-8),
    (2, 2,  0.243_914_352_398e-5, -0.140_016_683_654e-5),
    (3, 0,  0.957_254_173_792e-6,  0.0),
    (3, 1,  0.202_998_882_184e-5,  0.248_513_158_716e-6),
    (3, 2,  0.904_627_768_605e-6, -0.619_025_944_205e-6),
    (3, 3,  0.721_072_657_057e-6,  0.141_435_626_958e-5),
    (4, 0,  0.539_873_863_789e-6,  0.0),
    (4, 1, -0.536_321_616_971e-6, -0.473_440_265_853e-6),
    (4, 2,  0.350_694_105_785e-6,  0.662_671_572_540e-6),
    (4, 3,  0.990_771_803_829e-6, -0.200_928_369_177e-6),
    (4, 4, -0.188_560_802_735e-6,  0.308_853_169_333e-6),
    (5, 0,  0.685_323_475_630e-7,  0.0),
    (5, 1, -0.621_012_128_528e-7, -0.944_226_127_525e-7),
    (5, 2,  0.652_438_297_612e-6, -0.323_349_612_668e-6),
    (5, 3, -0.451_955_406_071e-6, -0.214_847_190_624e-6),
    (5, 4, -0.295_301_647_654e-6,  0.496_658_876_769e-7),
    (5, 5,  0.174_971_983_203e-6, -0.669_384_278_219e-6),
    (6, 0, -0.149_957_994_714e-6,  0.0),
    (6, 1, -0.760_879_384_947e-7,  0.262_890_545_501e-7),
    (6, 2,  0.481_732_442_832e-7, -0.373_728_201_347e-6),
    (6, 3,  0.571_730_990_516e-7,  0.902_694_517_163e-8),
    (6, 4, -0.862_571_490_092e-7, -0.471_408_154_267e-6),
    (6, 5, -0.267_167_681_441e-6, -0.536_488_432_483e-6),
    (6, 6,  0.967_616_121_092e-8, -0.237_192_006_935e-6),
    (7, 0,  0.909_789_371_450e-7,  0.0),
    (7, 1,  0.279_872_910_488e-6,  0.954_336_911_867e-7),
    (7, 2,  0.329_743_816_488e-6,  0.930_667_596_042e-7),
    (7, 3,  0.250_398_657_706e-6, -0.217_198_608_738e-6),
    (7, 4, -0.275_114_355_257e-6, -0.123_800_392_323e-6),
    (7, 5,  0.193_765_507_243e-8,  0.177_377_719_872e-7),
    (7, 6, -0.358_856_860_645e-6,  0.151_789_817_739e-6),
    (7, 7,  0.109_185_148_045e-8,  0.244_415_707_993e-7),
    (8, 0,  0.496_711_667_324e-7,  0.0),
    (8, 1,  0.233_422_047_893e-7,  0.590_060_493_411e-7),
    (8, 2,  0.802_978_722_615e-7,  0.654_175_425_859e-7),
    (8, 3, -0.191_877_757_009e-7, -0.863_454_445_021e-7),
    (8, 4, -0.244_600_105_471e-6,  0.700_233_016_934e-7),
    (8, 5, -0.255_352_403_037e-7,  0.891_462_164_788e-7),
    (8, 6, -0.657_361_610_961e-7,  0.309_238_461_807e-6),
    (8, 7,  0.672_811_580_072e-7,  0.747_440_473_633e-7),
    (8, 8, -0.124_092_493_016e-6,  0.120_533_165_603e-6),
];

/// An unnormalized geopotential coefficient table.
#[derive(Clone, Debug)]
pub struct GravityField {
    /// `coefficients[n][m] = (Cnm, Snm)`, unnormalized, zero where unused.
    coefficients: Vec<Vec<(f64, f64)>>,
    degree: usize,
    order: usize,
}

impl GravityField {
    /// The embedded EGM-96 field truncated to `degree × order`.
    ///
    /// Values beyond the stored table ([`MAX_DEGREE`]) are clamped.
    #[must_use]
    pub fn egm96(degree: usize, order: usize) -> Self {
        let degree = degree.min(MAX_DEGREE);
        let order = order.min(degree);
        let mut coefficients = vec![vec![(0.0, 0.0); MAX_DEGREE + 1]; MAX_DEGREE + 1];
        for &(n, m, c_norm, s_norm) in &NORMALIZED {
            if n <= degree && m <= order {
                let scale = unnormalization(n, m);
                coefficients[n][m] = (c_norm * scale, s_norm * scale);
            }
        }
        Self { coefficients, degree, order }
    }

    /// Degree of the truncation.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Order of the truncation.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Unnormalized zonal coefficient `Jn = −Cn0`.
    #[must_use]
    pub fn zonal(&self, n: usize) -> f64 {
        -self.coefficients[n][0].0
    }

    /// Perturbing acceleration (beyond the central term) at an Earth-fixed
    /// position, km/s², in the same Earth-fixed axes.
    ///
    /// Classical spherical-harmonic gradient with unnormalized associated
    /// Legendre recursion; stable for the low degrees carried here.
    #[must_use]
    pub fn acceleration_itrf(&self, position: &Vector3<f64>) -> Vector3<f64> {
        if self.degree < 2 {
            return Vector3::zeros();
        }
        let r = position.norm();
        let planar = (position.x * position.x + position.y * position.y).sqrt();
        let latitude = position.z.atan2(planar);
        let longitude = position.y.atan2(position.x);
        let (sin_lat, cos_lat) = latitude.sin_cos();
        let tan_lat = sin_lat / cos_lat;

        // Associated Legendre values P[n][m] at sin(latitude).
        let size = self.degree + 2;
        let mut p = vec![vec![0.0_f64; size + 1]; size + 1];
        p[0][0] = 1.0;
        p[1][0] = sin_lat;
        p[1][1] = cos_lat;
        for n in 2..=size {
            let nf = n as f64;
            p[n][0] =
                ((2.0 * nf - 1.0) * sin_lat * p[n - 1][0] - (nf - 1.0) * p[n - 2][0]) / nf;
            for m in 1..n {
                p[n][m] = p[n - 2][m] + (2.0 * nf - 1.0) * cos_lat * p[n - 1][m - 1];
            }
            p[n][n] = (2.0 * nf - 1.0) * cos_lat * p[n - 1][n - 1];
        }

        let mut partial_r = 0.0;
        let mut partial_lat = 0.0;
        let mut partial_lon = 0.0;
        let ratio = EARTH_RADIUS_EQUATORIAL / r;
        let mut ratio_n = ratio * ratio;
        for n in 2..=self.degree {
            let nf = n as f64;
            let mut sum_r = 0.0;
            let mut sum_lat = 0.0;
            let mut sum_lon = 0.0;
            for m in 0..=n.min(self.order) {
                let mf = m as f64;
                let (c, s) = self.coefficients[n][m];
                let (sin_ml, cos_ml) = (mf * longitude).sin_cos();
                let trig = c * cos_ml + s * sin_ml;
                sum_r += p[n][m] * trig;
                sum_lat += (p[n][m + 1] - mf * tan_lat * p[n][m]) * trig;
                sum_lon += mf * p[n][m] * (s * cos_ml - c * sin_ml);
            }
            partial_r += ratio_n * (nf + 1.0) * sum_r;
            partial_lat += ratio_n * sum_lat;
            partial_lon += ratio_n * sum_lon;
            ratio_n *= ratio;
        }
        let mu_over_r = MU_EARTH / r;
        partial_r *= -mu_over_r / r;
        partial_lat *= mu_over_r;
        partial_lon *= mu_over_r;

        // Gradient in spherical coordinates back to Cartesian.
        let r2 = r * r;
        let common = partial_r / r - position.z * partial_lat / (r2 * planar);
        Vector3::new(
            common * position.x - partial_lon * position.y / (planar * planar),
            common * position.y + partial_lon * position.x / (planar * planar),
            partial_r * position.z / r + planar * partial_lat / r2,
        )
    }
}

/// Factor converting a normalized coefficient to its unnormalized form:
/// `sqrt((2 − δ_m0)(2n + 1)(n − m)! / (n + m)!)`.
fn unnormalization(n: usize, m: usize) -> f64 {
    let k = if m == 0 { 1.0 } else { 2.0 };
    let mut factorial_ratio = 1.0; // (n − m)! / (n + m)!
    for i in (n - m + 1)..=(n + m) {
        factorial_ratio /= i as f64;
    }
    (k * (2.0 * n as f64 + 1.0) * factorial_ratio).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn unnormalized_j2_matches_published_value() {
        let field = GravityField::egm96(8, 8);
        assert_relative_eq!(field.zonal(2), 1.082_626_8e-3, max_relative = 1e-5);
        assert_relative_eq!(field.zonal(3), -2.532_43e-6, max_relative = 1e-3);
    }

    #[test]
    fn equatorial_j2_acceleration_magnitude() {
        // For a pure J2 field the radial perturbation on the equator is
        // 1.5·J2·μ·Re²/r⁴, directed inward.
        let field = GravityField::egm96(2, 0);
        let r = 7000.0;
        let accel = field.acceleration_itrf(&Vector3::new(r, 0.0, 0.0));
        let expected = -1.5 * field.zonal(2) * MU_EARTH
            * EARTH_RADIUS_EQUATORIAL * EARTH_RADIUS_EQUATORIAL
            / r.powi(4);
        assert_relative_eq!(accel.x, expected, max_relative = 1e-9);
        assert_abs_diff_eq!(accel.y, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn truncation_clamps_to_table() {
        let field = GravityField::egm96(36, 36);
        assert_eq!(field.degree(), MAX_DEGREE);
        assert_eq!(field.order(), MAX_DEGREE);
    }

    #[test]
    fn tesseral_terms_break_longitude_symmetry() {
        let zonal_only = GravityField::egm96(8, 0);
        let full = GravityField::egm96(8, 8);
        let a = Vector3::new(7000.0, 0.0, 100.0);
        let b = Vector3::new(0.0, 7000.0, 100.0);
        let za = zonal_only.acceleration_itrf(&a);
        let zb = zonal_only.acceleration_itrf(&b);
        // Zonal field is axially symmetric.
        assert_abs_diff_eq!(za.norm(), zb.norm(), epsilon = 1e-15);
        // The full field is not.
        let fa = full.acceleration_itrf(&a);
        let fb = full.acceleration_itrf(&b);
        assert!((fa.norm() - fb.norm()).abs() > 1e-13);
    }
}
