//! Geodetic coordinates on the WGS-84 ellipsoid.

use nalgebra::Vector3;
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::kilometer;

use crate::constants::{
    EARTH_ECCENTRICITY_SQUARED, EARTH_RADIUS_EQUATORIAL, EARTH_RADIUS_MEAN,
};

/// Iterations of the reduced-latitude fixed point; convergence to
/// < 1e-10 rad is reached well within this for any point on or above the
/// ellipsoid.
const LATITUDE_ITERATIONS: usize = 12;

/// Latitude update tolerance, radians.
const LATITUDE_TOLERANCE: f64 = 1e-10;

/// A geodetic position: latitude, longitude (radians), altitude above the
/// WGS-84 ellipsoid (km).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geodetic {
    /// Geodetic latitude, radians, positive north.
    pub latitude: f64,
    /// Longitude, radians, positive east.
    pub longitude: f64,
    /// Height above the ellipsoid, km.
    pub altitude: f64,
}

impl Geodetic {
    /// Create from raw radians and kilometres.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self { latitude, longitude, altitude }
    }

    /// Create from unit-safe quantities.
    #[must_use]
    pub fn from_quantities(latitude: Angle, longitude: Angle, altitude: Length) -> Self {
        Self {
            latitude: latitude.get::<radian>(),
            longitude: longitude.get::<radian>(),
            altitude: altitude.get::<kilometer>(),
        }
    }

    /// Geodetic latitude as a unit-safe angle.
    #[must_use]
    pub fn latitude_angle(&self) -> Angle {
        Angle::new::<radian>(self.latitude)
    }

    /// Longitude as a unit-safe angle.
    #[must_use]
    pub fn longitude_angle(&self) -> Angle {
        Angle::new::<radian>(self.longitude)
    }

    /// Altitude as a unit-safe length.
    #[must_use]
    pub fn altitude_length(&self) -> Length {
        Length::new::<kilometer>(self.altitude)
    }

    /// Convert an Earth-fixed (ITRF) position to geodetic coordinates.
    ///
    /// Fixed-point iteration on the geodetic latitude with the WGS-84
    /// first eccentricity; sub-centimetre for any orbital altitude.
    #[must_use]
    pub fn from_itrf(position: &Vector3<f64>) -> Self {
        let longitude = position.y.atan2(position.x);
        let equatorial_projection = (position.x * position.x + position.y * position.y).sqrt();

        let mut latitude = position.z.atan2(equatorial_projection);
        let mut prime_vertical = EARTH_RADIUS_EQUATORIAL;
        for _ in 0..LATITUDE_ITERATIONS {
            let sin_lat = latitude.sin();
            prime_vertical = EARTH_RADIUS_EQUATORIAL
                / (1.0 - EARTH_ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
            let next = (position.z + prime_vertical * EARTH_ECCENTRICITY_SQUARED * sin_lat)
                .atan2(equatorial_projection);
            let delta = (next - latitude).abs();
            latitude = next;
            if delta < LATITUDE_TOLERANCE {
                break;
            }
        }

        // Near the poles the equatorial projection collapses and the
        // altitude comes from the z-axis instead.
        let altitude = if equatorial_projection > 1e-6 {
            equatorial_projection / latitude.cos() - prime_vertical
        } else {
            position.z.abs() - prime_vertical * (1.0 - EARTH_ECCENTRICITY_SQUARED)
        };

        Self { latitude, longitude, altitude }
    }

    /// Convert to an Earth-fixed (ITRF) position, km.
    #[must_use]
    pub fn to_itrf(&self) -> Vector3<f64> {
        let (sin_lat, cos_lat) = self.latitude.sin_cos();
        let (sin_lon, cos_lon) = self.longitude.sin_cos();
        let prime_vertical = EARTH_RADIUS_EQUATORIAL
            / (1.0 - EARTH_ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
        let radial = (prime_vertical + self.altitude) * cos_lat;
        Vector3::new(
            radial * cos_lon,
            radial * sin_lon,
            (prime_vertical * (1.0 - EARTH_ECCENTRICITY_SQUARED) + self.altitude) * sin_lat,
        )
    }

    /// Half-angle of the cone of visibility down to the horizon, radians.
    ///
    /// Uses the arithmetic mean Earth radius (see
    /// [`EARTH_RADIUS_MEAN`]); for field-of-view purposes the ellipsoidal
    /// variation is below the accuracy of the spherical-horizon model
    /// itself.
    #[must_use]
    pub fn field_of_view(&self) -> f64 {
        let ratio = EARTH_RADIUS_MEAN / (EARTH_RADIUS_MEAN + self.altitude.max(0.0));
        ratio.clamp(-1.0, 1.0).acos()
    }
}

impl std::fmt::Display for Geodetic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.4}°, {:.4}°, {:.3} km",
            self.latitude.to_degrees(),
            self.longitude.to_degrees(),
            self.altitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;
    use crate::constants::EARTH_RADIUS_POLAR;

    #[test]
    fn north_pole_has_zero_altitude_at_polar_radius() {
        let g = Geodetic::from_itrf(&Vector3::new(0.0, 0.0, EARTH_RADIUS_POLAR));
        assert_abs_diff_eq!(g.latitude, FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(g.altitude, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn equator_has_zero_altitude_at_equatorial_radius() {
        let g = Geodetic::from_itrf(&Vector3::new(EARTH_RADIUS_EQUATORIAL, 0.0, 0.0));
        assert_abs_diff_eq!(g.latitude, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.longitude, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(g.altitude, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn round_trip_through_itrf() {
        let original = Geodetic::new(0.7, -1.9, 412.3);
        let back = Geodetic::from_itrf(&original.to_itrf());
        assert_abs_diff_eq!(back.latitude, original.latitude, epsilon = 1e-10);
        assert_abs_diff_eq!(back.longitude, original.longitude, epsilon = 1e-12);
        assert_abs_diff_eq!(back.altitude, original.altitude, epsilon = 1e-6);
    }

    #[test]
    fn vallado_example_site() {
        // Vallado example 3-3: r = (6524.834, 6862.875, 6448.296) km gives
        // latitude 34.352496°, longitude 46.4464°, altitude 5085.22 km.
        let g = Geodetic::from_itrf(&Vector3::new(6524.834, 6862.875, 6448.296));
        assert_abs_diff_eq!(g.latitude.to_degrees(), 34.352_496, epsilon = 1e-4);
        assert_abs_diff_eq!(g.longitude.to_degrees(), 46.4464, epsilon = 1e-4);
        assert_abs_diff_eq!(g.altitude, 5085.22, epsilon = 0.05);
    }

    #[test]
    fn field_of_view_grows_with_altitude() {
        let ground = Geodetic::new(0.0, 0.0, 0.0);
        let leo = Geodetic::new(0.0, 0.0, 500.0);
        let geo = Geodetic::new(0.0, 0.0, 35_786.0);
        assert_abs_diff_eq!(ground.field_of_view(), 0.0);
        assert!(leo.field_of_view() > 0.3);
        assert!(geo.field_of_view() > leo.field_of_view());
        assert!(geo.field_of_view() < FRAC_PI_2);
    }

    #[test]
    fn quantities_round_trip() {
        use uom::si::angle::degree;
        let g = Geodetic::from_quantities(
            Angle::new::<degree>(45.0),
            Angle::new::<degree>(-122.0),
            Length::new::<kilometer>(0.1),
        );
        assert_abs_diff_eq!(g.latitude, 45.0_f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(g.latitude_angle().get::<degree>(), 45.0, epsilon = 1e-9);
    }
}
