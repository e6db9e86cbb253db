//! Impulsive and finite-burn maneuvers.

use nalgebra::Vector3;

use crate::relative::ric_rotation;
use crate::states::StateVector;
use crate::time::Epoch;

/// A velocity change expressed in the spacecraft's RIC frame.
///
/// `duration == 0` makes the maneuver impulsive: the full Δv is applied at
/// the center epoch. A positive duration spreads it into a constant
/// acceleration over `[start, stop]` centered on `center`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thrust {
    /// Center epoch of the burn.
    pub center: Epoch,
    /// Radial Δv, km/s.
    pub radial: f64,
    /// In-track Δv, km/s.
    pub intrack: f64,
    /// Cross-track Δv, km/s.
    pub crosstrack: f64,
    /// Burn duration, seconds (zero for impulsive).
    pub duration: f64,
}

impl Thrust {
    /// An impulsive maneuver at `center`.
    #[must_use]
    pub const fn impulsive(center: Epoch, radial: f64, intrack: f64, crosstrack: f64) -> Self {
        Self { center, radial, intrack, crosstrack, duration: 0.0 }
    }

    /// A finite burn of `duration` seconds centered on `center`.
    #[must_use]
    pub const fn finite(
        center: Epoch,
        radial: f64,
        intrack: f64,
        crosstrack: f64,
        duration: f64,
    ) -> Self {
        Self { center, radial, intrack, crosstrack, duration }
    }

    /// Whether the full Δv applies instantaneously.
    #[must_use]
    pub fn is_impulsive(&self) -> bool {
        self.duration == 0.0
    }

    /// Burn start epoch.
    #[must_use]
    pub fn start(&self) -> Epoch {
        self.center.roll(-0.5 * self.duration)
    }

    /// Burn stop epoch.
    #[must_use]
    pub fn stop(&self) -> Epoch {
        self.center.roll(0.5 * self.duration)
    }

    /// The Δv vector in RIC axes, km/s.
    #[must_use]
    pub fn delta_v(&self) -> Vector3<f64> {
        Vector3::new(self.radial, self.intrack, self.crosstrack)
    }

    /// Total Δv magnitude, km/s.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.delta_v().norm()
    }

    /// Whether `epoch` falls inside the burn window.
    #[must_use]
    pub fn active_at(&self, epoch: &Epoch) -> bool {
        !self.is_impulsive() && *epoch >= self.start() && *epoch <= self.stop()
    }

    /// Constant thrust acceleration during a finite burn, resolved into
    /// the inertial frame of `state`, km/s².
    ///
    /// Zero for impulsive maneuvers; apply those with [`Thrust::apply_to`].
    #[must_use]
    pub fn acceleration(&self, state: &StateVector) -> Vector3<f64> {
        if self.is_impulsive() {
            return Vector3::zeros();
        }
        let ric = self.delta_v() / self.duration;
        ric_rotation(state).transpose() * ric
    }

    /// Apply the full Δv to a state instantaneously.
    #[must_use]
    pub fn apply_to(&self, state: &StateVector) -> StateVector {
        let inertial_dv = ric_rotation(state).transpose() * self.delta_v();
        StateVector::new(
            state.epoch,
            state.position,
            state.velocity + inertial_dv,
            state.frame,
        )
    }
}
