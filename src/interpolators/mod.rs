//! Ephemeris interpolation.
//!
//! Interpolators cache a finite window of ephemeris and answer
//! state-at-epoch queries inside it. A query outside the window is not an
//! error; it returns `None` and the caller decides whether to rebuild with
//! a wider window.

mod chebyshev;
mod hermite;
mod lagrange;
mod verlet;

pub use chebyshev::{ChebyshevInterpolator, ChebyshevSegment};
pub use hermite::CubicSplineInterpolator;
pub use lagrange::LagrangeInterpolator;
pub use verlet::VerletBlendInterpolator;

use crate::states::StateVector;
use crate::time::Epoch;

/// The common interpolation contract.
pub trait StateInterpolator {
    /// Inclusive epoch span this interpolator can answer for.
    fn window(&self) -> (Epoch, Epoch);

    /// Whether `epoch` lies inside the window.
    fn in_window(&self, epoch: &Epoch) -> bool {
        let (start, end) = self.window();
        *epoch >= start && *epoch <= end
    }

    /// State at `epoch`, or `None` outside the window.
    fn interpolate(&self, epoch: &Epoch) -> Option<StateVector>;

    /// Approximate heap-plus-inline footprint of the cached data, bytes.
    fn size_bytes(&self) -> usize;

    /// The span covered by both `self` and `other`, if any.
    fn overlap(&self, other: &dyn StateInterpolator) -> Option<(Epoch, Epoch)> {
        let (a_start, a_end) = self.window();
        let (b_start, b_end) = other.window();
        let start = if a_start >= b_start { a_start } else { b_start };
        let end = if a_end <= b_end { a_end } else { b_end };
        (start <= end).then_some((start, end))
    }
}

/// Locate the index of the last sample at or before `epoch` in an
/// epoch-sorted slice. Assumes the epoch is inside the sampled span.
pub(crate) fn floor_index(epochs: &[Epoch], epoch: &Epoch) -> usize {
    match epochs.binary_search_by(|e| {
        e.posix_seconds()
            .partial_cmp(&epoch.posix_seconds())
            .expect("epochs are finite")
    }) {
        Ok(exact) => exact,
        Err(insertion) => insertion.saturating_sub(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    struct Stub(f64, f64);
    impl StateInterpolator for Stub {
        fn window(&self) -> (Epoch, Epoch) {
            (
                Epoch::from_posix_seconds(self.0),
                Epoch::from_posix_seconds(self.1),
            )
        }
        fn interpolate(&self, epoch: &Epoch) -> Option<StateVector> {
            self.in_window(epoch).then(|| {
                StateVector::j2000(*epoch, Vector3::zeros(), Vector3::zeros())
            })
        }
        fn size_bytes(&self) -> usize {
            16
        }
    }

    #[test]
    fn overlap_of_disjoint_windows_is_none() {
        let a = Stub(0.0, 10.0);
        let b = Stub(20.0, 30.0);
        assert!(a.overlap(&b).is_none());
    }

    #[test]
    fn overlap_is_the_intersection() {
        let a = Stub(0.0, 10.0);
        let b = Stub(5.0, 30.0);
        let (start, end) = a.overlap(&b).unwrap();
        assert_eq!(start.posix_seconds(), 5.0);
        assert_eq!(end.posix_seconds(), 10.0);
    }

    #[test]
    fn floor_index_picks_the_left_sample() {
        let epochs: Vec<Epoch> =
            [0.0, 10.0, 20.0].iter().map(|&s| Epoch::from_posix_seconds(s)).collect();
        assert_eq!(floor_index(&epochs, &Epoch::from_posix_seconds(10.0)), 1);
        assert_eq!(floor_index(&epochs, &Epoch::from_posix_seconds(14.0)), 1);
        assert_eq!(floor_index(&epochs, &Epoch::from_posix_seconds(0.0)), 0);
    }
}
