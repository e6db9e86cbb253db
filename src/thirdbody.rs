//! Low-precision analytic Sun and Moon ephemerides.
//!
//! Vallado's algorithms 29 and 31: accurate to ~0.01° for the Sun and
//! ~0.3° for the Moon, which is ample for third-body perturbation and
//! shadow geometry. Positions are returned in the mean-of-date frame and
//! used directly as J2000; the difference is far below the series error.

use nalgebra::Vector3;

use crate::constants::{ASTRONOMICAL_UNIT, EARTH_RADIUS_EQUATORIAL};
use crate::numerics::wrap_two_pi;
use crate::time::Epoch;

/// Apparent position of the Sun, km.
#[must_use]
pub fn sun_position(epoch: &Epoch) -> Vector3<f64> {
    let t = epoch.julian_centuries();

    let mean_longitude = (280.460 + 36_000.771 * t).to_radians();
    let mean_anomaly = wrap_two_pi((357.529_109_2 + 35_999.050_34 * t).to_radians());

    let ecliptic_longitude = mean_longitude
        + (1.914_666_471 * mean_anomaly.sin()
            + 0.019_994_643 * (2.0 * mean_anomaly).sin())
        .to_radians();
    let distance_au = 1.000_140_612
        - 0.016_708_617 * mean_anomaly.cos()
        - 0.000_139_589 * (2.0 * mean_anomaly).cos();
    let obliquity = (23.439_291 - 0.013_004_2 * t).to_radians();

    let (sin_lon, cos_lon) = ecliptic_longitude.sin_cos();
    let (sin_obl, cos_obl) = obliquity.sin_cos();
    let r = distance_au * ASTRONOMICAL_UNIT;
    Vector3::new(r * cos_lon, r * cos_obl * sin_lon, r * sin_obl * sin_lon)
}

/// Apparent position of the Moon, km.
#[must_use]
pub fn moon_position(epoch: &Epoch) -> Vector3<f64> {
    let t = epoch.julian_centuries();
    let deg = |x: f64| x.to_radians();

    let longitude = deg(218.32 + 481_267.8813 * t)
        + deg(6.29) * deg(134.9 + 477_198.85 * t).sin()
        - deg(1.27) * deg(259.2 - 413_335.38 * t).sin()
        + deg(0.66) * deg(235.7 + 890_534.23 * t).sin()
        + deg(0.21) * deg(269.9 + 954_397.70 * t).sin()
        - deg(0.19) * deg(357.5 + 35_999.05 * t).sin()
        - deg(0.11) * deg(186.6 + 966_404.05 * t).sin();

    let latitude = deg(5.13) * deg(93.3 + 483_202.03 * t).sin()
        + deg(0.28) * deg(228.2 + 960_400.87 * t).sin()
        - deg(0.28) * deg(318.3 + 6_003.18 * t).sin()
        - deg(0.17) * deg(217.6 - 407_332.20 * t).sin();

    let parallax = deg(0.9508)
        + deg(0.0518) * deg(134.9 + 477_198.85 * t).cos()
        + deg(0.0095) * deg(259.2 - 413_335.38 * t).cos()
        + deg(0.0078) * deg(235.7 + 890_534.23 * t).cos()
        + deg(0.0028) * deg(269.9 + 954_397.70 * t).cos();

    let obliquity = deg(23.439_291 - 0.013_004_2 * t);
    let distance = EARTH_RADIUS_EQUATORIAL / parallax.sin();

    let (sin_lon, cos_lon) = longitude.sin_cos();
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let (sin_obl, cos_obl) = obliquity.sin_cos();

    distance
        * Vector3::new(
            cos_lat * cos_lon,
            cos_obl * cos_lat * sin_lon - sin_obl * sin_lat,
            sin_obl * cos_lat * sin_lon + cos_obl * sin_lat,
        )
}

/// Point-mass third-body perturbation on a satellite at `position` from a
/// body of parameter `mu` at `body_position`, km/s².
#[must_use]
pub fn third_body_acceleration(
    position: &Vector3<f64>,
    body_position: &Vector3<f64>,
    mu: f64,
) -> Vector3<f64> {
    let to_body = body_position - position;
    mu * (to_body / to_body.norm().powi(3)
        - body_position / body_position.norm().powi(3))
}
