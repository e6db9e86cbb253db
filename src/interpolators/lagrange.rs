//! Lagrange polynomial interpolation over position samples.

use nalgebra::Vector3;

use crate::frames::Frame;
use crate::interpolators::{floor_index, StateInterpolator};
use crate::states::StateVector;
use crate::time::Epoch;

/// Sliding-window Lagrange interpolator.
///
/// Stores `(t, x, y, z)` samples only; velocity comes from the analytic
/// derivative of the interpolating polynomial. Each query fits the
/// `order` samples nearest the target, so the polynomial degree stays
/// fixed regardless of ephemeris length.
///
/// Interpolating exactly at a stored epoch reproduces that sample (the
/// Lagrange basis is cardinal).
#[derive(Clone, Debug)]
pub struct LagrangeInterpolator {
    epochs: Vec<Epoch>,
    positions: Vec<Vector3<f64>>,
    order: usize,
    frame: Frame,
}

impl LagrangeInterpolator {
    /// Build from an epoch-sorted ephemeris, keeping positions only.
    ///
    /// `order` is the number of samples per fit (polynomial degree + 1),
    /// clamped to the sample count; 8 to 10 suits minute-cadence LEO
    /// ephemerides.
    ///
    /// # Panics
    ///
    /// Panics with fewer than two samples or `order < 2`.
    #[must_use]
    pub fn new(samples: &[StateVector], order: usize) -> Self {
        assert!(samples.len() >= 2, "interpolator needs at least two samples");
        assert!(order >= 2, "order must be at least 2");
        Self {
            epochs: samples.iter().map(|s| s.epoch).collect(),
            positions: samples.iter().map(|s| s.position).collect(),
            order: order.min(samples.len()),
            frame: samples[0].frame,
        }
    }

    /// The contiguous window of `order` samples centered on the target.
    fn fit_range(&self, epoch: &Epoch) -> std::ops::Range<usize> {
        let center = floor_index(&self.epochs, epoch);
        let half = self.order / 2;
        let start = center
            .saturating_sub(half)
            .min(self.epochs.len() - self.order);
        start..start + self.order
    }
}

impl StateInterpolator for LagrangeInterpolator {
    fn window(&self) -> (Epoch, Epoch) {
        (self.epochs[0], self.epochs[self.epochs.len() - 1])
    }

    fn interpolate(&self, epoch: &Epoch) -> Option<StateVector> {
        if !self.in_window(epoch) {
            return None;
        }
        let range = self.fit_range(epoch);
        let t = epoch.posix_seconds();
        let times: Vec<f64> =
            self.epochs[range.clone()].iter().map(Epoch::posix_seconds).collect();
        let points = &self.positions[range];
        let n = times.len();

        let mut position = Vector3::zeros();
        let mut velocity = Vector3::zeros();
        for j in 0..n {
            // Cardinal basis value L_j(t).
            let mut basis = 1.0;
            for k in 0..n {
                if k != j {
                    basis *= (t - times[k]) / (times[j] - times[k]);
                }
            }
            position += basis * points[j];

            // L'_j(t) by the product rule; valid at the nodes too.
            let mut basis_rate = 0.0;
            for m in 0..n {
                if m == j {
                    continue;
                }
                let mut partial = 1.0 / (times[j] - times[m]);
                for k in 0..n {
                    if k != j && k != m {
                        partial *= (t - times[k]) / (times[j] - times[k]);
                    }
                }
                basis_rate += partial;
            }
            velocity += basis_rate * points[j];
        }

        Some(StateVector::new(*epoch, position, velocity, self.frame))
    }

    fn size_bytes(&self) -> usize {
        self.epochs.len() * std::mem::size_of::<Epoch>()
            + self.positions.len() * std::mem::size_of::<Vector3<f64>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::force::ForceModel;
    use crate::propagators::{Propagator, Rk4Propagator};

    fn samples() -> Vec<StateVector> {
        let state = StateVector::j2000(
            Epoch::from_posix_seconds(1_000_000_000.0),
            Vector3::new(7000.0, 0.0, 0.0),
            Vector3::new(0.0, 7.546, 0.2),
        );
        let mut prop = Rk4Propagator::new(state, ForceModel::new(), 10.0);
        (0..=30)
            .map(|i| prop.propagate(&state.epoch.roll(60.0 * f64::from(i))).unwrap())
            .collect()
    }

    #[test]
    fn stored_epochs_are_reproduced_exactly() {
        let samples = samples();
        let interp = LagrangeInterpolator::new(&samples, 8);
        for sample in [&samples[0], &samples[3], &samples[15], &samples[30]] {
            let answer = interp.interpolate(&sample.epoch).unwrap();
            assert_abs_diff_eq!(
                (answer.position - sample.position).norm(),
                0.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn derivative_recovers_velocity() {
        let samples = samples();
        let interp = LagrangeInterpolator::new(&samples, 10);
        let target = samples[0].epoch.roll(605.0);
        let state = samples[0];
        let mut prop = Rk4Propagator::new(state, ForceModel::new(), 5.0);
        let truth = prop.propagate(&target).unwrap();
        let answer = interp.interpolate(&target).unwrap();
        assert_abs_diff_eq!((answer.position - truth.position).norm(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!((answer.velocity - truth.velocity).norm(), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn window_edges_use_one_sided_fits() {
        let samples = samples();
        let interp = LagrangeInterpolator::new(&samples, 8);
        let (start, end) = interp.window();
        assert!(interp.interpolate(&start.roll(10.0)).is_some());
        assert!(interp.interpolate(&end.roll(-10.0)).is_some());
        assert!(interp.interpolate(&end.roll(10.0)).is_none());
    }

    #[test]
    fn order_clamps_to_sample_count() {
        let samples: Vec<StateVector> = samples().into_iter().take(4).collect();
        let interp = LagrangeInterpolator::new(&samples, 16);
        let mid = samples[1].epoch.roll(30.0);
        assert!(interp.interpolate(&mid).is_some());
    }
}
