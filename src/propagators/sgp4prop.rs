//! [`Propagator`] adapter over the analytic TLE model.

use crate::elements::ClassicalElements;
use crate::error::Result;
use crate::propagators::{Checkpoint, Propagator};
use crate::sgp4::Sgp4;
use crate::states::StateVector;
use crate::time::Epoch;
use crate::tle::Tle;

/// SGP4 behind the common propagation contract. Output states are TEME.
///
/// Mean-element theory cannot absorb an arbitrary replacement state, so
/// after [`Propagator::set_state`] (e.g. a maneuver) the propagator
/// continues on an osculating two-body arc seeded from that state; `reset`
/// returns to the pure SGP4 model.
#[derive(Clone, Debug)]
pub struct Sgp4Propagator {
    model: Sgp4,
    state: StateVector,
    continuation: Option<ClassicalElements>,
    checkpoints: Vec<(StateVector, Option<ClassicalElements>)>,
}

impl Sgp4Propagator {
    /// Build from a parsed element set.
    ///
    /// # Errors
    ///
    /// [`crate::error::Error::PropagatorFailure`] when the element set is
    /// rejected by the model.
    pub fn from_tle(tle: &Tle) -> Result<Self> {
        let mut model = Sgp4::from_tle(tle).map_err(crate::error::Error::PropagatorFailure)?;
        let state = model
            .state_at(&tle.epoch)
            .map_err(crate::error::Error::PropagatorFailure)?;
        Ok(Self { model, state, continuation: None, checkpoints: Vec::new() })
    }

    /// The element-set epoch.
    #[must_use]
    pub fn tle_epoch(&self) -> Epoch {
        self.model.epoch()
    }
}

impl Propagator for Sgp4Propagator {
    fn propagate(&mut self, epoch: &Epoch) -> Result<StateVector> {
        self.state = match &self.continuation {
            Some(elements) => {
                let propagated = elements.propagate_to(*epoch);
                let mut state = propagated.to_state();
                state.frame = self.state.frame;
                self.continuation = Some(propagated);
                state
            }
            None => self
                .model
                .state_at(epoch)
                .map_err(crate::error::Error::PropagatorFailure)?,
        };
        Ok(self.state)
    }

    fn state(&self) -> StateVector {
        self.state
    }

    fn reset(&mut self) {
        self.continuation = None;
        let epoch = self.model.epoch();
        if let Ok(state) = self.model.state_at(&epoch) {
            self.state = state;
        }
    }

    fn set_state(&mut self, state: StateVector) {
        self.continuation = Some(ClassicalElements::from_cartesian(
            state.epoch,
            &state.position,
            &state.velocity,
            crate::constants::MU_EARTH,
        ));
        self.state = state;
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.checkpoints.push((self.state, self.continuation));
        self.checkpoints.len() - 1
    }

    fn restore(&mut self, handle: Checkpoint) {
        let (state, continuation) = self.checkpoints[handle];
        self.state = state;
        self.continuation = continuation;
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
    use crate::frames::Frame;
    use crate::maneuvers::Thrust;

    fn propagator() -> Sgp4Propagator {
        let tle = Tle::from_lines(
            "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753",
            "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
        )
        .unwrap();
        Sgp4Propagator::from_tle(&tle).unwrap()
    }

    #[test]
    fn six_hour_state_matches_reference_vector() {
        let mut prop = propagator();
        let target = prop.tle_epoch().roll(21_600.0);
        let state = prop.propagate(&target).unwrap();
        assert_eq!(state.frame, Frame::Teme);
        let r_expected = Vector3::new(-7154.0312, -3783.1768, -3536.1941);
        let v_expected = Vector3::new(4.741_887, -4.151_818, -2.093_935);
        assert_abs_diff_eq!((state.position - r_expected).norm(), 0.0, epsilon = 0.01);
        assert_abs_diff_eq!((state.velocity - v_expected).norm(), 0.0, epsilon = 0.01);
    }

    #[test]
    fn impulsive_maneuver_switches_to_continuation() {
        let mut prop = propagator();
        let burn_epoch = prop.tle_epoch().roll(3600.0);
        let thrust = Thrust::impulsive(burn_epoch, 0.0, 0.05, 0.0);
        let samples = prop.maneuver(&thrust, 60.0).unwrap();
        assert_eq!(samples.len(), 1);
        let later = prop.propagate(&burn_epoch.roll(600.0)).unwrap();
        assert!(later.epoch > burn_epoch);
        prop.reset();
        let back = prop.state();
        assert_eq!(back.epoch, prop.tle_epoch());
    }

    #[test]
    fn checkpoints_capture_continuation_state() {
        let mut prop = propagator();
        let handle = prop.checkpoint();
        let burn = Thrust::impulsive(prop.tle_epoch().roll(1800.0), 0.01, 0.0, 0.0);
        prop.maneuver(&burn, 60.0).unwrap();
        prop.restore(handle);
        // Restored to the pure SGP4 model at the element epoch.
        let target = prop.tle_epoch().roll(21_600.0);
        let state = prop.propagate(&target).unwrap();
        let r_expected = Vector3::new(-7154.0312, -3783.1768, -3536.1941);
        assert_abs_diff_eq!((state.position - r_expected).norm(), 0.0, epsilon = 0.01);
    }
}
