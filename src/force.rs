//! Configurable force model for numerical propagation.
//!
//! Each enabled term contributes an additive acceleration; the model is
//! pure (no hidden state) and cheap to clone, so Jacobian machinery can
//! perturb copies without aliasing the nominal propagator.

use std::sync::Arc;

use nalgebra::{Vector3, Vector6};

use crate::constants::{
    ASTRONOMICAL_UNIT, EARTH_RADIUS_EQUATORIAL, EARTH_ROTATION_RATE, MU_EARTH,
    MU_MOON, MU_SUN, SOLAR_PRESSURE,
};
use crate::frames::{transform, Frame};
use crate::gravity::GravityField;
use crate::linalg::{compose_state, line_of_sight};
use crate::maneuvers::Thrust;
use crate::states::StateVector;
use crate::thirdbody::{moon_position, sun_position, third_body_acceleration};

/// Exponential atmosphere: `(base altitude km, density kg/m³, scale height
/// km)`. Vallado table 8-4.
#[rustfmt::skip]
const ATMOSPHERE: [(f64, f64, f64); 28] = [
    (0.0,    1.225,     7.249),
    (25.0,   3.899e-2,  6.349),
    (30.0,   1.774e-2,  6.682),
    (40.0,   3.972e-3,  7.554),
    (50.0,   1.057e-3,  8.382),
    (60.0,   3.206e-4,  7.714),
    (70.0,   8.770e-5,  6.549),
    (80.0,   1.905e-5,  5.799),
    (90.0,   3.396e-6,  5.382),
    (100.0,  5.297e-7,  5.877),
    (110.0,  9.661e-8,  7.263),
    (120.0,  2.438e-8,  9.473),
    (130.0,  8.484e-9,  12.636),
    (140.0,  3.845e-9,  16.149),
    (150.0,  2.070e-9,  22.523),
    (180.0,  5.464e-10, 29.740),
    (200.0,  2.789e-10, 37.105),
    (250.0,  7.248e-11, 45.546),
    (300.0,  2.418e-11, 53.628),
    (350.0,  9.518e-12, 53.298),
    (400.0,  3.725e-12, 58.515),
    (450.0,  1.585e-12, 60.828),
    (500.0,  6.967e-13, 63.822),
    (600.0,  1.454e-13, 71.835),
    (700.0,  3.614e-14, 88.667),
    (800.0,  1.170e-14, 124.64),
    (900.0,  5.245e-15, 181.05),
    (1000.0, 3.019e-15, 268.00),
];

/// Source of atmospheric density for the drag term.
///
/// The force model holds a shared handle and queries density by geodetic
/// altitude, the same pluggable-provider shape as
/// [`crate::eop::EopProvider`]: richer models (tabulated profiles,
/// space-weather driven densities) install through
/// [`ForceModel::with_atmosphere_model`] without touching the drag
/// formulation.
pub trait AtmosphereModel: std::fmt::Debug + Send + Sync {
    /// Density at a geodetic altitude (km), kg/m³.
    fn density(&self, altitude: f64) -> f64;
}

/// The built-in piecewise-exponential profile.
///
/// Zero below ground is clamped to the sea-level band, and densities above
/// the last band keep its scale height.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExponentialAtmosphere;

impl AtmosphereModel for ExponentialAtmosphere {
    fn density(&self, altitude: f64) -> f64 {
        let altitude = altitude.max(0.0);
        let band = ATMOSPHERE
            .iter()
            .rev()
            .find(|(base, _, _)| altitude >= *base)
            .unwrap_or(&ATMOSPHERE[0]);
        let (base, density, scale_height) = *band;
        density * (-(altitude - base) / scale_height).exp()
    }
}

/// A configurable additive force model.
#[derive(Clone, Debug)]
pub struct ForceModel {
    mu: f64,
    gravity: Option<GravityField>,
    sun: bool,
    moon: bool,
    /// Drag `Cd·A/m`, m²/kg; zero disables drag.
    inverse_ballistic_coeff: f64,
    /// SRP `Cr·A/m`, m²/kg; zero disables radiation pressure.
    inverse_srp_coeff: f64,
    atmosphere: Arc<dyn AtmosphereModel>,
    maneuver: Option<Thrust>,
}

impl Default for ForceModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceModel {
    /// A two-body model with Earth's gravitational parameter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mu: MU_EARTH,
            gravity: None,
            sun: false,
            moon: false,
            inverse_ballistic_coeff: 0.0,
            inverse_srp_coeff: 0.0,
            atmosphere: Arc::new(ExponentialAtmosphere),
            maneuver: None,
        }
    }

    /// Override the central gravitational parameter, km³/s².
    #[must_use]
    pub fn with_gravity(mut self, mu: f64) -> Self {
        self.mu = mu;
        self
    }

    /// Enable the spherical-harmonic Earth field to `degree × order`.
    #[must_use]
    pub fn with_earth_gravity(mut self, degree: usize, order: usize) -> Self {
        self.gravity = if degree >= 2 {
            Some(GravityField::egm96(degree, order))
        } else {
            None
        };
        self
    }

    /// Enable Sun and/or Moon third-body attraction.
    #[must_use]
    pub fn with_third_body(mut self, sun: bool, moon: bool) -> Self {
        self.sun = sun;
        self.moon = moon;
        self
    }

    /// Enable atmospheric drag for a spacecraft of `mass` kg, `area` m²,
    /// and drag coefficient `coeff`.
    #[must_use]
    pub fn with_atmospheric_drag(mut self, mass: f64, area: f64, coeff: f64) -> Self {
        self.inverse_ballistic_coeff = coeff * area / mass;
        self
    }

    /// Enable solar radiation pressure for a spacecraft of `mass` kg,
    /// `area` m², and reflectivity coefficient `coeff`.
    #[must_use]
    pub fn with_solar_radiation_pressure(mut self, mass: f64, area: f64, coeff: f64) -> Self {
        self.inverse_srp_coeff = coeff * area / mass;
        self
    }

    /// Set drag through a ballistic coefficient `m/(Cd·A)`, kg/m².
    /// Zero disables drag (the coefficient enters inverted).
    #[must_use]
    pub fn with_ballistic_coeff(mut self, beta: f64) -> Self {
        self.inverse_ballistic_coeff = if beta > 0.0 { 1.0 / beta } else { 0.0 };
        self
    }

    /// Set radiation pressure through `m/(Cr·A)`, kg/m². Zero disables.
    #[must_use]
    pub fn with_srp_coeff(mut self, gamma: f64) -> Self {
        self.inverse_srp_coeff = if gamma > 0.0 { 1.0 / gamma } else { 0.0 };
        self
    }

    /// Replace the atmospheric density model behind the drag term
    /// ([`ExponentialAtmosphere`] until one is installed).
    #[must_use]
    pub fn with_atmosphere_model(mut self, model: Arc<dyn AtmosphereModel>) -> Self {
        self.atmosphere = model;
        self
    }

    /// Drag `Cd·A/m`, m²/kg.
    #[must_use]
    pub fn inverse_ballistic_coeff(&self) -> f64 {
        self.inverse_ballistic_coeff
    }

    /// SRP `Cr·A/m`, m²/kg.
    #[must_use]
    pub fn inverse_srp_coeff(&self) -> f64 {
        self.inverse_srp_coeff
    }

    /// Attach a finite-burn thrust; its acceleration applies inside the
    /// burn window until [`ForceModel::clear_maneuver`].
    pub fn load_maneuver(&mut self, thrust: Thrust) {
        self.maneuver = Some(thrust);
    }

    /// Detach any attached thrust.
    pub fn clear_maneuver(&mut self) {
        self.maneuver = None;
    }

    /// Total acceleration on an inertial state, km/s², in the state's
    /// frame.
    #[must_use]
    pub fn acceleration(&self, state: &StateVector) -> Vector3<f64> {
        let r = state.position.norm();
        let mut accel = -self.mu * state.position / (r * r * r);

        if let Some(field) = &self.gravity {
            let fixed = state.in_frame(Frame::Itrf);
            let perturbation_itrf = field.acceleration_itrf(&fixed.position);
            // A true-force vector re-expressed in inertial axes: rotation
            // only, no frame-rate terms.
            let (perturbation, _) = transform(
                Frame::Itrf,
                state.frame,
                &state.epoch,
                &perturbation_itrf,
                &Vector3::zeros(),
            );
            accel += perturbation;
        }

        if self.sun {
            let sun = sun_position(&state.epoch);
            accel += third_body_acceleration(&state.position, &sun, MU_SUN);
        }
        if self.moon {
            let moon = moon_position(&state.epoch);
            accel += third_body_acceleration(&state.position, &moon, MU_MOON);
        }

        if self.inverse_ballistic_coeff > 0.0 {
            accel += self.drag_acceleration(state);
        }
        if self.inverse_srp_coeff > 0.0 {
            accel += self.srp_acceleration(state);
        }

        if let Some(thrust) = &self.maneuver {
            if thrust.active_at(&state.epoch) {
                accel += thrust.acceleration(state);
            }
        }

        accel
    }

    /// State derivative `(ṙ, v̇)` for the integrators.
    #[must_use]
    pub fn derivative(&self, state: &StateVector) -> Vector6<f64> {
        compose_state(&state.velocity, &self.acceleration(state))
    }

    fn drag_acceleration(&self, state: &StateVector) -> Vector3<f64> {
        let altitude = state.to_geodetic().altitude;
        let density = self.atmosphere.density(altitude);
        // Velocity relative to the co-rotating atmosphere.
        let omega = Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE);
        let v_rel = state.velocity - omega.cross(&state.position);
        // ρ[kg/m³]·(CdA/m)[m²/kg]·v²[km²/s²] carries a 1000 m/km factor
        // into km/s²: −½·1000 = −500.
        -500.0 * density * self.inverse_ballistic_coeff * v_rel.norm() * v_rel
    }

    fn srp_acceleration(&self, state: &StateVector) -> Vector3<f64> {
        let sun = sun_position(&state.epoch);
        if !line_of_sight(&state.position, &sun, EARTH_RADIUS_EQUATORIAL) {
            return Vector3::zeros();
        }
        let from_sun = state.position - sun;
        let distance = from_sun.norm();
        let pressure =
            SOLAR_PRESSURE * (ASTRONOMICAL_UNIT / distance) * (ASTRONOMICAL_UNIT / distance);
        // N/m² · m²/kg = m/s²; convert to km/s².
        pressure * self.inverse_srp_coeff / 1000.0 * (from_sun / distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use crate::time::Epoch;

    fn leo() -> StateVector {
        StateVector::j2000(
            Epoch::from_posix_seconds(1_483_767_060.0),
            Vector3::new(6778.0, 0.0, 0.0),
            Vector3::new(0.0, 7.668, 0.0),
        )
    }

    #[test]
    fn two_body_acceleration_points_inward() {
        let model = ForceModel::new();
        let accel = model.acceleration(&leo());
        let expected = MU_EARTH / (6778.0 * 6778.0);
        assert_relative_eq!(accel.norm(), expected, max_relative = 1e-12);
        assert!(accel.x < 0.0);
    }

    #[test]
    fn j2_perturbs_at_the_expected_scale() {
        let plain = ForceModel::new();
        let j2 = ForceModel::new().with_earth_gravity(2, 0);
        let state = leo();
        let difference = (j2.acceleration(&state) - plain.acceleration(&state)).norm();
        let central = plain.acceleration(&state).norm();
        // J2 is about a thousandth of the central term in LEO.
        assert!(difference / central > 5e-4);
        assert!(difference / central < 5e-3);
    }

    #[test]
    fn density_decreases_with_altitude() {
        let atmosphere = ExponentialAtmosphere;
        assert!(atmosphere.density(200.0) > atmosphere.density(400.0));
        assert!(atmosphere.density(400.0) > atmosphere.density(800.0));
        assert_relative_eq!(atmosphere.density(0.0), 1.225, max_relative = 1e-12);
        // Band boundaries land on the tabulated values.
        assert_relative_eq!(atmosphere.density(450.0), 1.585e-12, max_relative = 1e-9);
    }

    #[test]
    fn custom_atmosphere_model_installs() {
        #[derive(Debug)]
        struct Vacuum;
        impl AtmosphereModel for Vacuum {
            fn density(&self, _altitude: f64) -> f64 {
                0.0
            }
        }

        let state = leo();
        let drag = ForceModel::new().with_atmospheric_drag(100.0, 1.0, 2.2);
        let vacuum = drag.clone().with_atmosphere_model(Arc::new(Vacuum));
        let plain = ForceModel::new();
        // With the vacuum model the drag term contributes nothing.
        assert_abs_diff_eq!(
            (vacuum.acceleration(&state) - plain.acceleration(&state)).norm(),
            0.0
        );
        assert!((drag.acceleration(&state) - plain.acceleration(&state)).norm() > 0.0);
    }

    #[test]
    fn drag_opposes_velocity() {
        let model = ForceModel::new().with_atmospheric_drag(100.0, 1.0, 2.2);
        let state = leo();
        let drag = model.acceleration(&state) - ForceModel::new().acceleration(&state);
        assert!(drag.dot(&state.velocity) < 0.0);
        assert!(drag.norm() > 0.0);
    }

    #[test]
    fn zero_coefficients_mean_disabled() {
        let model = ForceModel::new()
            .with_ballistic_coeff(0.0)
            .with_srp_coeff(0.0);
        let plain = ForceModel::new();
        let state = leo();
        assert_abs_diff_eq!(
            (model.acceleration(&state) - plain.acceleration(&state)).norm(),
            0.0
        );
    }

    #[test]
    fn maneuver_attaches_and_clears() {
        let state = leo();
        let mut model = ForceModel::new();
        let baseline = model.acceleration(&state);
        model.load_maneuver(Thrust::finite(state.epoch, 0.0, 0.01, 0.0, 100.0));
        let thrusting = model.acceleration(&state);
        assert_relative_eq!(
            (thrusting - baseline).norm(),
            0.01 / 100.0,
            max_relative = 1e-9
        );
        model.clear_maneuver();
        assert_abs_diff_eq!((model.acceleration(&state) - baseline).norm(), 0.0);
    }

    #[test]
    fn clones_are_independent() {
        let mut original = ForceModel::new();
        let copy = original.clone();
        original.load_maneuver(Thrust::finite(
            Epoch::from_posix_seconds(0.0),
            0.1,
            0.0,
            0.0,
            10.0,
        ));
        let state = leo();
        assert_abs_diff_eq!(
            (copy.acceleration(&state) - ForceModel::new().acceleration(&state)).norm(),
            0.0
        );
    }
}
