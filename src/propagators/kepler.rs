//! Analytic two-body propagation.

use crate::elements::ClassicalElements;
use crate::error::Result;
use crate::propagators::{Checkpoint, Propagator};
use crate::states::StateVector;
use crate::time::Epoch;

/// Two-body propagator: advances the mean anomaly linearly and solves
/// Kepler's equation, preserving every other element exactly.
#[derive(Clone, Debug)]
pub struct KeplerPropagator {
    initial: ClassicalElements,
    elements: ClassicalElements,
    checkpoints: Vec<ClassicalElements>,
}

impl KeplerPropagator {
    /// Propagator seeded from classical elements.
    #[must_use]
    pub fn new(elements: ClassicalElements) -> Self {
        Self { initial: elements, elements, checkpoints: Vec::new() }
    }

    /// Propagator seeded from an inertial state.
    ///
    /// # Errors
    ///
    /// [`crate::error::Error::FrameNotInertial`] for Earth-fixed states.
    pub fn from_state(state: &StateVector) -> Result<Self> {
        Ok(Self::new(state.to_classical()?))
    }

    /// Current osculating elements.
    #[must_use]
    pub fn elements(&self) -> &ClassicalElements {
        &self.elements
    }
}

impl Propagator for KeplerPropagator {
    fn propagate(&mut self, epoch: &Epoch) -> Result<StateVector> {
        self.elements = self.elements.propagate_to(*epoch);
        Ok(self.elements.to_state())
    }

    fn state(&self) -> StateVector {
        self.elements.to_state()
    }

    fn reset(&mut self) {
        self.elements = self.initial;
    }

    fn set_state(&mut self, state: StateVector) {
        self.elements = ClassicalElements::from_cartesian(
            state.epoch,
            &state.position,
            &state.velocity,
            self.elements.mu,
        );
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.checkpoints.push(self.elements);
        self.checkpoints.len() - 1
    }

    fn restore(&mut self, handle: Checkpoint) {
        self.elements = self.checkpoints[handle];
    }

    fn clear_checkpoints(&mut self) {
        self.checkpoints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    fn propagator() -> KeplerPropagator {
        let state = StateVector::j2000(
            Epoch::from_posix_seconds(1_483_767_060.243),
            Vector3::new(-5737.369_776, -3423.651_756, 364.099_770),
            Vector3::new(4.378_112_704, -6.646_623_519, 1.170_571_889),
        );
        KeplerPropagator::from_state(&state).unwrap()
    }

    #[test]
    fn energy_and_momentum_are_conserved_over_a_period() {
        let mut prop = propagator();
        let initial = prop.state();
        let period = prop.elements().period();
        let energy_0 = initial.mechanical_energy();
        let h_0 = initial.angular_momentum().norm();
        for i in 1..=16 {
            let state = prop
                .propagate(&initial.epoch.roll(period * i as f64 / 16.0))
                .unwrap();
            assert_abs_diff_eq!(state.mechanical_energy(), energy_0, epsilon = 1e-9);
            assert_abs_diff_eq!(state.angular_momentum().norm(), h_0, epsilon = 1e-9);
        }
    }

    #[test]
    fn one_period_returns_to_the_start() {
        let mut prop = propagator();
        let initial = prop.state();
        let period = prop.elements().period();
        let returned = prop.propagate(&initial.epoch.roll(period)).unwrap();
        assert_abs_diff_eq!(
            (returned.position - initial.position).norm(),
            0.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn backward_propagation_rewinds() {
        let mut prop = propagator();
        let initial = prop.state();
        prop.propagate(&initial.epoch.roll(3600.0)).unwrap();
        let rewound = prop.propagate(&initial.epoch).unwrap();
        assert_abs_diff_eq!(
            (rewound.position - initial.position).norm(),
            0.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn checkpoints_restore_the_cache() {
        let mut prop = propagator();
        let initial = prop.state();
        let handle = prop.checkpoint();
        prop.propagate(&initial.epoch.roll(7200.0)).unwrap();
        assert!((prop.state().position - initial.position).norm() > 100.0);
        prop.restore(handle);
        assert_abs_diff_eq!(
            (prop.state().position - initial.position).norm(),
            0.0,
            epsilon = 1e-9
        );
        prop.clear_checkpoints();
    }

    #[test]
    fn reset_recovers_the_seed_state() {
        let mut prop = propagator();
        let initial = prop.state();
        prop.propagate(&initial.epoch.roll(86_400.0)).unwrap();
        prop.reset();
        assert_eq!(prop.state().epoch, initial.epoch);
    }
}
