//! Position/velocity states tagged with their reference frame.

use nalgebra::Vector3;

use crate::constants::MU_EARTH;
use crate::elements::ClassicalElements;
use crate::error::{Error, Result};
use crate::frames::{self, Frame};
use crate::geodetic::Geodetic;
use crate::time::Epoch;

/// A position and velocity at an epoch, in a named reference frame.
///
/// Positions are km, velocities km/s. States are values: every operation
/// returns a new state.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateVector {
    /// UTC epoch of validity.
    pub epoch: Epoch,
    /// Position, km.
    pub position: Vector3<f64>,
    /// Velocity, km/s.
    pub velocity: Vector3<f64>,
    /// Reference frame of both vectors.
    pub frame: Frame,
}

impl StateVector {
    /// Create a state in an arbitrary frame.
    #[must_use]
    pub const fn new(
        epoch: Epoch,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        frame: Frame,
    ) -> Self {
        Self { epoch, position, velocity, frame }
    }

    /// Create a mean-of-J2000 state.
    #[must_use]
    pub const fn j2000(epoch: Epoch, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self::new(epoch, position, velocity, Frame::J2000)
    }

    /// Create a TEME state (the SGP4 output frame).
    #[must_use]
    pub const fn teme(epoch: Epoch, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self::new(epoch, position, velocity, Frame::Teme)
    }

    /// Create an Earth-fixed state.
    #[must_use]
    pub const fn itrf(epoch: Epoch, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self::new(epoch, position, velocity, Frame::Itrf)
    }

    /// Create a GCRF state.
    #[must_use]
    pub const fn gcrf(epoch: Epoch, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self::new(epoch, position, velocity, Frame::Gcrf)
    }

    /// This state expressed in another frame at the same epoch.
    #[must_use]
    pub fn in_frame(&self, frame: Frame) -> Self {
        let (position, velocity) =
            frames::transform(self.frame, frame, &self.epoch, &self.position, &self.velocity);
        Self { epoch: self.epoch, position, velocity, frame }
    }

    /// Distance from the Earth's center, km.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.position.norm()
    }

    /// Speed, km/s.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Specific angular momentum vector, km²/s.
    #[must_use]
    pub fn angular_momentum(&self) -> Vector3<f64> {
        self.position.cross(&self.velocity)
    }

    /// Specific mechanical energy `v²/2 − μ/r`, km²/s².
    ///
    /// Negative for bound orbits, positive for hyperbolic ones.
    #[must_use]
    pub fn mechanical_energy(&self) -> f64 {
        0.5 * self.velocity.norm_squared() - MU_EARTH / self.radius()
    }

    /// Semi-major axis from the vis-viva relation, km.
    #[must_use]
    pub fn semimajor_axis(&self) -> f64 {
        -MU_EARTH / (2.0 * self.mechanical_energy())
    }

    /// Orbital period, seconds (bound orbits).
    #[must_use]
    pub fn period(&self) -> f64 {
        let a = self.semimajor_axis();
        crate::constants::TWO_PI * (a * a * a / MU_EARTH).sqrt()
    }

    /// Classical orbital elements of this state.
    ///
    /// # Errors
    ///
    /// [`Error::FrameNotInertial`] when the state is Earth-fixed; convert
    /// to an inertial frame first.
    pub fn to_classical(&self) -> Result<ClassicalElements> {
        if !self.frame.is_inertial() {
            return Err(Error::FrameNotInertial(self.frame));
        }
        Ok(ClassicalElements::from_cartesian(
            self.epoch,
            &self.position,
            &self.velocity,
            MU_EARTH,
        ))
    }

    /// Geodetic coordinates of the sub-state point (converts through ITRF).
    #[must_use]
    pub fn to_geodetic(&self) -> Geodetic {
        Geodetic::from_itrf(&self.in_frame(Frame::Itrf).position)
    }
}

impl std::fmt::Display for StateVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} r=({:.3}, {:.3}, {:.3}) km v=({:.6}, {:.6}, {:.6}) km/s",
            self.frame,
            self.epoch,
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn leo_state() -> StateVector {
        StateVector::j2000(
            Epoch::from_posix_seconds(1_483_767_060.243),
            Vector3::new(-5737.369_776, -3423.651_756, 364.099_770),
            Vector3::new(4.378_112_704, -6.646_623_519, 1.170_571_889),
        )
    }

    #[test]
    fn bound_orbit_has_negative_energy() {
        let state = leo_state();
        assert!(state.mechanical_energy() < 0.0);
        assert!(state.semimajor_axis() > 6378.0);
        assert!(state.period() > 5000.0 && state.period() < 8000.0);
    }

    #[test]
    fn frame_conversion_round_trips() {
        let state = leo_state();
        let back = state.in_frame(Frame::Itrf).in_frame(Frame::J2000);
        assert_abs_diff_eq!((back.position - state.position).norm(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!((back.velocity - state.velocity).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn classical_elements_require_inertial_frame() {
        let fixed = leo_state().in_frame(Frame::Itrf);
        assert!(matches!(
            fixed.to_classical(),
            Err(Error::FrameNotInertial(Frame::Itrf))
        ));
        assert!(leo_state().to_classical().is_ok());
    }

    #[test]
    fn angular_momentum_is_perpendicular_to_orbit() {
        let state = leo_state();
        let h = state.angular_momentum();
        assert_abs_diff_eq!(h.dot(&state.position), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(h.dot(&state.velocity), 0.0, epsilon = 1e-9);
    }
}
