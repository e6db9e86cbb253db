//! Fixed-step fourth-order Runge–Kutta propagation.

use nalgebra::Vector6;

use crate::error::Result;
use crate::force::ForceModel;
use crate::linalg::{compose_state, position_of, velocity_of};
use crate::maneuvers::Thrust;
use crate::propagators::{Checkpoint, Propagator};
use crate::states::StateVector;
use crate::time::Epoch;

/// Classical RK4 with a constant, configured step size.
///
/// The step direction follows the sign of `target − current`; the final
/// partial step lands exactly on the target epoch.
#[derive(Clone, Debug)]
pub struct Rk4Propagator {
    initial: StateVector,
    state: StateVector,
    force: ForceModel,
    step: f64,
    checkpoints: Vec<StateVector>,
}

impl Rk4Propagator {
    /// Propagator over `force` with a positive `step` in seconds.
    #[must_use]
    pub fn new(state: StateVector, force: ForceModel, step: f64) -> Self {
        Self {
            initial: state,
            state,
            force,
            step: step.abs(),
            checkpoints: Vec::new(),
        }
    }

    /// The force model being integrated.
    #[must_use]
    pub fn force_model(&self) -> &ForceModel {
        &self.force
    }

    fn step_once(&mut self, h: f64) {
        let y = compose_state(&self.state.position, &self.state.velocity);
        let deriv = |offset: f64, y: &Vector6<f64>| {
            let state = StateVector::new(
                self.state.epoch.roll(offset),
                position_of(y),
                velocity_of(y),
                self.state.frame,
            );
            self.force.derivative(&state)
        };
        let k1 = deriv(0.0, &y);
        let k2 = deriv(0.5 * h, &(y + 0.5 * h * k1));
        let k3 = deriv(0.5 * h, &(y + 0.5 * h * k2));
        let k4 = deriv(h, &(y + h * k3));
        let y_next = y + (h / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4);
        self.state = StateVector::new(
            self.state.epoch.roll(h),
            position_of(&y_next),
            velocity_of(&y_next),
            self.state.frame,
        );
    }
}

impl Propagator for Rk4Propagator {
    fn propagate(&mut self, epoch: &Epoch) -> Result<StateVector> {
        loop {
            let delta = epoch.difference(&self.state.epoch);
            // Snap sub-nanosecond remainders: the final partial step can
            // miss the target by an ulp of the POSIX representation.
            if delta.abs() < 1e-9 {
                self.state.epoch = *epoch;
                return Ok(self.state);
            }
            let h = delta.clamp(-self.step, self.step);
            self.step_once(h);
        }
    }

    fn state(&self) -> StateVector {
        self.state
    }

    fn reset(&mut self) {
        self.state = self.initial;
    }

    fn set_state(&mut self, state: StateVector) {
        self.state = state;
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.checkpoints.push(self.state);
        self.checkpoints.len() - 1
    }

    fn restore(&mut self, handle: Checkpoint) {
        self.state = self.checkpoints[handle];
    }

    fn clear_checkpoints(&mut self) {
        self.checkpoints.clear();
    }

    /// Finite burns integrate exactly: the thrust is installed on the
    /// force model across the burn window and detached afterwards.
    fn maneuver(&mut self, thrust: &Thrust, sample_interval: f64) -> Result<Vec<StateVector>> {
        if thrust.is_impulsive() {
            let state = self.propagate(&thrust.center)?;
            let burned = thrust.apply_to(&state);
            self.set_state(burned);
            return Ok(vec![burned]);
        }
        self.propagate(&thrust.start())?;
        self.force.load_maneuver(*thrust);
        let mut samples = Vec::new();
        let mut cursor = thrust.start();
        while cursor < thrust.stop() {
            cursor = cursor.roll(sample_interval);
            if cursor > thrust.stop() {
                cursor = thrust.stop();
            }
            samples.push(self.propagate(&cursor)?);
        }
        self.force.clear_maneuver();
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;
    use crate::propagators::KeplerPropagator;

    fn leo_state() -> StateVector {
        StateVector::j2000(
            Epoch::from_posix_seconds(1_483_767_060.243),
            Vector3::new(-5737.369_776, -3423.651_756, 364.099_770),
            Vector3::new(4.378_112_704, -6.646_623_519, 1.170_571_889),
        )
    }

    #[test]
    fn matches_kepler_for_two_body_forces() {
        let state = leo_state();
        let mut rk4 = Rk4Propagator::new(state, ForceModel::new(), 10.0);
        let mut kepler = KeplerPropagator::from_state(&state).unwrap();
        let target = state.epoch.roll(5400.0);
        let numerical = rk4.propagate(&target).unwrap();
        let analytic = kepler.propagate(&target).unwrap();
        assert_abs_diff_eq!(
            (numerical.position - analytic.position).norm(),
            0.0,
            epsilon = 1e-3
        );
    }

    #[test]
    fn lands_exactly_on_the_target_epoch() {
        let state = leo_state();
        let mut rk4 = Rk4Propagator::new(state, ForceModel::new(), 30.0);
        let target = state.epoch.roll(100.0); // not a step multiple
        let result = rk4.propagate(&target).unwrap();
        assert_eq!(result.epoch, target);
    }

    #[test]
    fn propagates_backward() {
        let state = leo_state();
        let mut rk4 = Rk4Propagator::new(state, ForceModel::new(), 10.0);
        rk4.propagate(&state.epoch.roll(600.0)).unwrap();
        let back = rk4.propagate(&state.epoch).unwrap();
        assert_abs_diff_eq!((back.position - state.position).norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn finite_burn_changes_energy() {
        let state = leo_state();
        let mut rk4 = Rk4Propagator::new(state, ForceModel::new(), 10.0);
        let thrust = Thrust::finite(state.epoch.roll(300.0), 0.0, 0.05, 0.0, 120.0);
        let samples = rk4.maneuver(&thrust, 30.0).unwrap();
        assert!(!samples.is_empty());
        let final_state = *samples.last().unwrap();
        assert!(final_state.mechanical_energy() > state.mechanical_energy());
        // The thrust detached afterwards: only gravity remains.
        assert_abs_diff_eq!(
            (rk4.force_model().acceleration(&final_state)
                - ForceModel::new().acceleration(&final_state))
            .norm(),
            0.0
        );
    }
}
