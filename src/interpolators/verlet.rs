//! Velocity-Verlet blend interpolation.

use nalgebra::Vector3;

use crate::constants::MU_EARTH;
use crate::interpolators::{floor_index, StateInterpolator};
use crate::states::StateVector;
use crate::time::Epoch;

/// Longest Verlet sub-step, seconds.
const MAX_STEP: f64 = 5.0;

/// Keeps the raw ephemeris and bridges between samples with single-body
/// velocity-Verlet integration.
///
/// Stored samples are returned exactly ("truth states"); between samples
/// the two-body bridge stays accurate because the gap is short. This is
/// the default carrier for propagator-generated ephemerides.
#[derive(Clone, Debug)]
pub struct VerletBlendInterpolator {
    samples: Vec<StateVector>,
    epochs: Vec<Epoch>,
}

impl VerletBlendInterpolator {
    /// Wrap an epoch-sorted ephemeris.
    ///
    /// # Panics
    ///
    /// Panics when `samples` is empty.
    #[must_use]
    pub fn new(samples: Vec<StateVector>) -> Self {
        assert!(!samples.is_empty(), "ephemeris must contain at least one sample");
        let epochs = samples.iter().map(|s| s.epoch).collect();
        Self { samples, epochs }
    }

    /// The stored samples.
    #[must_use]
    pub fn samples(&self) -> &[StateVector] {
        &self.samples
    }

    fn bridge(&self, from: &StateVector, epoch: &Epoch) -> StateVector {
        let total = epoch.difference(&from.epoch);
        let steps = (total.abs() / MAX_STEP).ceil().max(1.0) as usize;
        let h = total / steps as f64;
        let accel = |r: &Vector3<f64>| -MU_EARTH * r / r.norm().powi(3);

        let mut position = from.position;
        let mut velocity = from.velocity;
        let mut a = accel(&position);
        for _ in 0..steps {
            position += velocity * h + 0.5 * a * h * h;
            let a_next = accel(&position);
            velocity += 0.5 * (a + a_next) * h;
            a = a_next;
        }
        StateVector::new(*epoch, position, velocity, from.frame)
    }
}

impl StateInterpolator for VerletBlendInterpolator {
    fn window(&self) -> (Epoch, Epoch) {
        (self.epochs[0], self.epochs[self.epochs.len() - 1])
    }

    fn interpolate(&self, epoch: &Epoch) -> Option<StateVector> {
        if !self.in_window(epoch) {
            return None;
        }
        let left = floor_index(&self.epochs, epoch);
        if self.epochs[left] == *epoch {
            return Some(self.samples[left]);
        }
        // Integrate from whichever neighbor is closer.
        let nearest = if left + 1 < self.samples.len()
            && epoch.difference(&self.epochs[left])
                > self.epochs[left + 1].difference(epoch)
        {
            &self.samples[left + 1]
        } else {
            &self.samples[left]
        };
        Some(self.bridge(nearest, epoch))
    }

    fn size_bytes(&self) -> usize {
        self.samples.len() * std::mem::size_of::<StateVector>()
            + self.epochs.len() * std::mem::size_of::<Epoch>()
    }
}
