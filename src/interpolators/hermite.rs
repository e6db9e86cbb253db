//! Cubic Hermite spline interpolation.

use nalgebra::Vector3;

use crate::frames::Frame;
use crate::interpolators::{floor_index, StateInterpolator};
use crate::states::StateVector;
use crate::time::Epoch;

/// Per-segment cubic coefficients for one axis triple:
/// `p(s) = a + b·s + c·s² + d·s³` on normalized time `s ∈ [0, 1]`.
#[derive(Clone, Copy, Debug)]
struct Segment {
    start: Epoch,
    duration: f64,
    a: Vector3<f64>,
    b: Vector3<f64>,
    c: Vector3<f64>,
    d: Vector3<f64>,
}

/// Piecewise cubic Hermite spline over position/velocity samples.
///
/// Coefficients are precomputed from each segment's endpoint states, so
/// queries are a binary search plus a cubic evaluation. Positions and
/// velocities are both continuous across segment boundaries by
/// construction.
#[derive(Clone, Debug)]
pub struct CubicSplineInterpolator {
    segments: Vec<Segment>,
    epochs: Vec<Epoch>,
    end: Epoch,
    frame: Frame,
}

impl CubicSplineInterpolator {
    /// Build from an epoch-sorted ephemeris of at least two samples.
    ///
    /// # Panics
    ///
    /// Panics with fewer than two samples.
    #[must_use]
    pub fn new(samples: &[StateVector]) -> Self {
        assert!(samples.len() >= 2, "spline needs at least two samples");
        let mut segments = Vec::with_capacity(samples.len() - 1);
        for pair in samples.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            let h = right.epoch.difference(&left.epoch);
            let v0 = left.velocity * h;
            let v1 = right.velocity * h;
            let delta = right.position - left.position;
            segments.push(Segment {
                start: left.epoch,
                duration: h,
                a: left.position,
                b: v0,
                c: 3.0 * delta - 2.0 * v0 - v1,
                d: -2.0 * delta + v0 + v1,
            });
        }
        Self {
            segments,
            epochs: samples.iter().map(|s| s.epoch).collect(),
            end: samples[samples.len() - 1].epoch,
            frame: samples[0].frame,
        }
    }
}

impl StateInterpolator for CubicSplineInterpolator {
    fn window(&self) -> (Epoch, Epoch) {
        (self.epochs[0], self.end)
    }

    fn interpolate(&self, epoch: &Epoch) -> Option<StateVector> {
        if !self.in_window(epoch) {
            return None;
        }
        let index = floor_index(&self.epochs, epoch).min(self.segments.len() - 1);
        let segment = &self.segments[index];
        let s = epoch.difference(&segment.start) / segment.duration;
        let position = segment.a + segment.b * s + segment.c * (s * s) + segment.d * (s * s * s);
        let velocity =
            (segment.b + 2.0 * segment.c * s + 3.0 * segment.d * (s * s)) / segment.duration;
        Some(StateVector::new(*epoch, position, velocity, self.frame))
    }

    fn size_bytes(&self) -> usize {
        self.segments.len() * std::mem::size_of::<Segment>()
            + self.epochs.len() * std::mem::size_of::<Epoch>()
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
        (0..=20)
            .map(|i| prop.propagate(&state.epoch.roll(30.0 * f64::from(i))).unwrap())
            .collect()
    }

    #[test]
    fn endpoints_are_reproduced() {
        let samples = samples();
        let spline = CubicSplineInterpolator::new(&samples);
        for sample in [&samples[0], &samples[10], &samples[20]] {
            let answer = spline.interpolate(&sample.epoch).unwrap();
            assert_abs_diff_eq!(
                (answer.position - sample.position).norm(),
                0.0,
                epsilon = 1e-9
            );
            assert_abs_diff_eq!(
                (answer.velocity - sample.velocity).norm(),
                0.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn midpoints_track_the_orbit() {
        let samples = samples();
        let spline = CubicSplineInterpolator::new(&samples);
        let state = samples[0];
        let mut prop = Rk4Propagator::new(state, ForceModel::new(), 5.0);
        let target = state.epoch.roll(315.0);
        let truth = prop.propagate(&target).unwrap();
        let answer = spline.interpolate(&target).unwrap();
        assert_abs_diff_eq!((answer.position - truth.position).norm(), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!((answer.velocity - truth.velocity).norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn out_of_window_is_none() {
        let samples = samples();
        let spline = CubicSplineInterpolator::new(&samples);
        let (start, _) = spline.window();
        assert!(spline.interpolate(&start.roll(-0.001)).is_none());
    }
}
