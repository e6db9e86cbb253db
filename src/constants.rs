//! Astrodynamic constants and unit conversion factors.
//!
//! Lengths are kilometres, velocities kilometres per second, angles radians,
//! unless a name says otherwise. Earth geometry follows WGS-84; the
//! gravitational parameter follows EGM-96 so that it stays consistent with
//! the embedded geopotential coefficients.

use std::f64::consts::PI;

/// J2000.0 epoch: 2000-01-01 12:00:00 TT (Julian Date 2451545.0).
pub const J2000_JD: f64 = 2451545.0;

/// Julian Date of the POSIX epoch (1970-01-01 00:00:00 UTC).
pub const POSIX_EPOCH_JD: f64 = 2440587.5;

/// Days per Julian century.
pub const DAYS_PER_CENTURY: f64 = 36525.0;

/// Seconds per day.
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// TT − TAI offset in seconds (defined constant).
pub const TT_MINUS_TAI: f64 = 32.184;

/// Two pi.
pub const TWO_PI: f64 = 2.0 * PI;

/// Arcseconds to radians.
pub const ARCSEC_TO_RAD: f64 = PI / (180.0 * 3600.0);

/// Milliarcseconds to radians.
pub const MAS_TO_RAD: f64 = ARCSEC_TO_RAD * 1e-3;

/// Astronomical Unit (km, IAU 2012 definition).
pub const ASTRONOMICAL_UNIT: f64 = 149_597_870.7;

/// Speed of light in vacuum (km/s, exact by definition).
pub const SPEED_OF_LIGHT: f64 = 299_792.458;

/// Gravitational parameter of Earth (km³/s², EGM-96).
pub const MU_EARTH: f64 = 398_600.4415;

/// Gravitational parameter of the Sun (km³/s²).
pub const MU_SUN: f64 = 132_712_440_017.99;

/// Gravitational parameter of the Moon (km³/s²).
pub const MU_MOON: f64 = 4_902.800_066;

/// Earth equatorial radius (km, EGM-96 reference ellipsoid).
pub const EARTH_RADIUS_EQUATORIAL: f64 = 6378.1363;

/// Earth polar radius (km, derived from the equatorial radius and
/// flattening).
pub const EARTH_RADIUS_POLAR: f64 =
    EARTH_RADIUS_EQUATORIAL * (1.0 - EARTH_FLATTENING);

/// Earth arithmetic mean radius (km).
///
/// Used for horizon and field-of-view geometry. The equatorial or polar
/// radius would shift those results by up to 0.3%; the arithmetic mean of
/// the WGS-84 semi-axes is the convention adopted here.
pub const EARTH_RADIUS_MEAN: f64 = 6371.0087714;

/// Earth flattening (WGS-84).
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Square of Earth's first eccentricity (WGS-84).
pub const EARTH_ECCENTRICITY_SQUARED: f64 =
    EARTH_FLATTENING * (2.0 - EARTH_FLATTENING);

/// Earth sidereal rotation rate (rad/s).
pub const EARTH_ROTATION_RATE: f64 = 7.292_115_146_706_979e-5;

/// Solar radiation pressure at 1 AU (N/m²).
pub const SOLAR_PRESSURE: f64 = 4.56e-6;

/// SGP4 gravity model (WGS-72, the convention TLE mean elements are fit
/// against; deliberately different from the EGM-96 values above).
pub mod wgs72 {
    /// Gravitational parameter (km³/s²).
    pub const MU: f64 = 398_600.8;

    /// Earth equatorial radius (km).
    pub const RADIUS: f64 = 6378.135;

    /// `ke = 60 / sqrt(radius³/mu)`, the mean-motion unit conversion.
    pub const XKE: f64 = 0.074_669_161_331_895_92;

    /// Zonal harmonics.
    pub const J2: f64 = 0.001_082_616;
    pub const J3: f64 = -0.000_002_538_81;
    pub const J4: f64 = -0.000_001_655_97;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eccentricity_consistent_with_flattening() {
        let e2 = 2.0 * EARTH_FLATTENING - EARTH_FLATTENING * EARTH_FLATTENING;
        assert!((EARTH_ECCENTRICITY_SQUARED - e2).abs() < 1e-15);
    }

    #[test]
    fn mean_radius_between_polar_and_equatorial() {
        assert!(EARTH_RADIUS_MEAN > EARTH_RADIUS_POLAR);
        assert!(EARTH_RADIUS_MEAN < EARTH_RADIUS_EQUATORIAL);
    }

    #[test]
    fn wgs72_xke_matches_definition() {
        let xke = 60.0 / (wgs72::RADIUS.powi(3) / wgs72::MU).sqrt();
        assert!((wgs72::XKE - xke).abs() < 1e-12);
    }
}
