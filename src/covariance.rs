//! State covariance and sigma-point uncertainty propagation.

use nalgebra::{Matrix6, Vector3, Vector6};

use crate::error::{Error, Result};
use crate::force::ForceModel;
use crate::linalg::compose_state;
use crate::propagators::{DormandPrince54Propagator, Propagator};
use crate::relative::{ric_rotation, RelativeKind, RelativeState};
use crate::states::StateVector;
use crate::time::Epoch;

/// Frame a covariance matrix is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CovarianceFrame {
    /// Mean-of-J2000 Cartesian axes.
    J2000,
    /// Radial / in-track / cross-track axes of an origin orbit.
    Ric,
}

/// A 6×6 position/velocity covariance with its frame tag.
///
/// The matrix is symmetric positive-semidefinite; constructors that take
/// reduced forms (sigmas, a lower triangle) produce it symmetric by
/// construction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateCovariance {
    matrix: Matrix6<f64>,
    frame: CovarianceFrame,
}

impl StateCovariance {
    /// Wrap a full matrix.
    #[must_use]
    pub fn new(matrix: Matrix6<f64>, frame: CovarianceFrame) -> Self {
        Self { matrix, frame }
    }

    /// Diagonal covariance from per-component standard deviations
    /// (km, km/s).
    #[must_use]
    pub fn from_sigmas(sigmas: &Vector6<f64>, frame: CovarianceFrame) -> Self {
        Self {
            matrix: Matrix6::from_diagonal(&sigmas.map(|s| s * s)),
            frame,
        }
    }

    /// Covariance from the 21 row-major elements of its lower triangle.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] unless exactly 21 values are given.
    pub fn from_lower_triangle(elements: &[f64], frame: CovarianceFrame) -> Result<Self> {
        if elements.len() != 21 {
            return Err(Error::DimensionMismatch { expected: 21, actual: elements.len() });
        }
        let mut matrix = Matrix6::zeros();
        let mut index = 0;
        for row in 0..6 {
            for col in 0..=row {
                matrix[(row, col)] = elements[index];
                matrix[(col, row)] = elements[index];
                index += 1;
            }
        }
        Ok(Self { matrix, frame })
    }

    /// The covariance matrix.
    #[must_use]
    pub fn matrix(&self) -> &Matrix6<f64> {
        &self.matrix
    }

    /// The frame tag.
    #[must_use]
    pub fn frame(&self) -> CovarianceFrame {
        self.frame
    }

    /// Per-component standard deviations (square roots of the diagonal).
    #[must_use]
    pub fn sigmas(&self) -> Vector6<f64> {
        self.matrix.diagonal().map(|v| v.max(0.0).sqrt())
    }

    /// The 6×6 rotation between J2000 and RIC axes of an origin state.
    fn ric_block(origin: &StateVector) -> Matrix6<f64> {
        let rotation = ric_rotation(origin);
        let mut block = Matrix6::zeros();
        block.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        block.fixed_view_mut::<3, 3>(3, 3).copy_from(&rotation);
        block
    }

    /// Express this covariance in the RIC axes of `origin`.
    #[must_use]
    pub fn to_ric(&self, origin: &StateVector) -> Self {
        match self.frame {
            CovarianceFrame::Ric => self.clone(),
            CovarianceFrame::J2000 => {
                let block = Self::ric_block(origin);
                Self {
                    matrix: block * self.matrix * block.transpose(),
                    frame: CovarianceFrame::Ric,
                }
            }
        }
    }

    /// Express this covariance in J2000 axes.
    #[must_use]
    pub fn to_j2000(&self, origin: &StateVector) -> Self {
        match self.frame {
            CovarianceFrame::J2000 => self.clone(),
            CovarianceFrame::Ric => {
                let block = Self::ric_block(origin).transpose();
                Self {
                    matrix: block * self.matrix * block.transpose(),
                    frame: CovarianceFrame::J2000,
                }
            }
        }
    }

    /// Project this covariance into the measurement space of an
    /// observation taken at `origin` (RA/Dec 2×2, range/az/el 3×3, or the
    /// full state 6×6).
    ///
    /// Linearizes the sensor model numerically: `J·P·Jᵀ` with `J` the
    /// central-difference measurement Jacobian around the origin state.
    ///
    /// # Errors
    ///
    /// Propagation failures from the Jacobian machinery.
    pub fn project(
        &self,
        origin: &StateVector,
        observation: &crate::observations::Observation,
    ) -> Result<nalgebra::DMatrix<f64>> {
        let j2000 = self.to_j2000(origin);
        let mut pairs = crate::observations::PropagatorPairs::new(origin, |s| {
            Box::new(DormandPrince54Propagator::new(s, ForceModel::new(), 1e-9))
        });
        let jacobian = observation.jacobian(&mut pairs)?;
        let p = nalgebra::DMatrix::from_iterator(6, 6, j2000.matrix().iter().copied());
        Ok(&jacobian * p * jacobian.transpose())
    }
}

/// How many sigma points a sample carries (± each state axis).
const SIGMA_POINTS: usize = 12;

/// An unscented-style ensemble: twelve propagators seeded at
/// `mean ± √6·S₍:,ᵢ₎` for the Cholesky factor `S` of the covariance.
///
/// Propagation advances every sample in lock-step through the shared
/// force-model configuration (each sample owns an independent clone), so
/// the reconstructed covariance picks up the full nonlinear dynamics.
pub struct SigmaPointSample {
    origin: DormandPrince54Propagator,
    samples: Vec<DormandPrince54Propagator>,
}

impl SigmaPointSample {
    /// Deploy sigma points around `state` with a J2000 covariance.
    ///
    /// # Errors
    ///
    /// [`Error::SingularMatrix`] when the covariance has no Cholesky
    /// factor (not positive definite).
    pub fn new(
        state: &StateVector,
        covariance: &StateCovariance,
        force: &ForceModel,
        tolerance: f64,
    ) -> Result<Self> {
        let j2000 = match covariance.frame() {
            CovarianceFrame::J2000 => covariance.clone(),
            CovarianceFrame::Ric => covariance.to_j2000(state),
        };
        let factor = j2000
            .matrix()
            .cholesky()
            .ok_or(Error::SingularMatrix { operation: "cholesky" })?
            .l();
        let scale = (SIGMA_POINTS as f64 / 2.0).sqrt();

        let mean = compose_state(&state.position, &state.velocity);
        let mut samples = Vec::with_capacity(SIGMA_POINTS);
        for i in 0..6 {
            for sign in [1.0_f64, -1.0] {
                let offset: Vector6<f64> = factor.column(i) * (scale * sign);
                let perturbed = mean + offset;
                let sample_state = StateVector::new(
                    state.epoch,
                    Vector3::new(perturbed[0], perturbed[1], perturbed[2]),
                    Vector3::new(perturbed[3], perturbed[4], perturbed[5]),
                    state.frame,
                );
                samples.push(DormandPrince54Propagator::new(
                    sample_state,
                    force.clone(),
                    tolerance,
                ));
            }
        }
        Ok(Self {
            origin: DormandPrince54Propagator::new(*state, force.clone(), tolerance),
            samples,
        })
    }

    /// Advance the origin and every sample to `epoch` in lock-step.
    pub fn propagate(&mut self, epoch: &Epoch) -> Result<()> {
        self.origin.propagate(epoch)?;
        for sample in &mut self.samples {
            sample.propagate(epoch)?;
        }
        Ok(())
    }

    /// The propagated origin state.
    #[must_use]
    pub fn origin(&self) -> StateVector {
        self.origin.state()
    }

    /// Reconstruct the mean state and covariance in J2000.
    #[must_use]
    pub fn desample_j2000(&self) -> (StateVector, StateCovariance) {
        let states: Vec<Vector6<f64>> = self
            .samples
            .iter()
            .map(|p| {
                let s = p.state();
                compose_state(&s.position, &s.velocity)
            })
            .collect();
        let (mean, covariance) = ensemble_statistics(&states);
        let origin = self.origin.state();
        (
            StateVector::new(
                origin.epoch,
                Vector3::new(mean[0], mean[1], mean[2]),
                Vector3::new(mean[3], mean[4], mean[5]),
                origin.frame,
            ),
            StateCovariance::new(covariance, CovarianceFrame::J2000),
        )
    }

    /// Reconstruct the covariance in the RIC axes of the propagated
    /// origin.
    #[must_use]
    pub fn desample_ric(&self) -> StateCovariance {
        let origin = self.origin.state();
        let states: Vec<Vector6<f64>> = self
            .samples
            .iter()
            .map(|p| {
                let relative =
                    RelativeState::from_states(RelativeKind::Ric, &origin, &p.state());
                compose_state(&relative.position, &relative.velocity)
            })
            .collect();
        let (_, covariance) = ensemble_statistics(&states);
        StateCovariance::new(covariance, CovarianceFrame::Ric)
    }
}

/// Mean and `(1/n)·Σ(xᵢ−x̄)(xᵢ−x̄)ᵀ` of an ensemble.
fn ensemble_statistics(states: &[Vector6<f64>]) -> (Vector6<f64>, Matrix6<f64>) {
    let n = states.len() as f64;
    let mean = states.iter().fold(Vector6::zeros(), |acc, s| acc + s) / n;
    let mut covariance = Matrix6::zeros();
    for state in states {
        let deviation = state - mean;
        covariance += deviation * deviation.transpose();
    }
    (mean, covariance / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::constants::MU_EARTH;

    fn leo_state() -> StateVector {
        StateVector::j2000(
            Epoch::from_posix_seconds(950_000_000.0),
            Vector3::new(7000.0, 0.0, 0.0),
            Vector3::new(0.0, (MU_EARTH / 7000.0).sqrt(), 0.0),
        )
    }

    fn sigmas() -> Vector6<f64> {
        Vector6::new(0.1, 0.2, 0.05, 1e-4, 2e-4, 5e-5)
    }

    #[test]
    fn lower_triangle_constructor_is_symmetric() {
        let elements: Vec<f64> = (1..=21).map(f64::from).collect();
        let cov =
            StateCovariance::from_lower_triangle(&elements, CovarianceFrame::J2000).unwrap();
        let matrix = cov.matrix();
        assert_eq!(matrix[(3, 1)], matrix[(1, 3)]);
        assert_eq!(matrix[(5, 0)], matrix[(0, 5)]);
        assert!(StateCovariance::from_lower_triangle(&[1.0; 20], CovarianceFrame::J2000)
            .is_err());
    }

    #[test]
    fn ric_round_trip_preserves_the_matrix() {
        let cov = StateCovariance::from_sigmas(&sigmas(), CovarianceFrame::J2000);
        let origin = leo_state();
        let back = cov.to_ric(&origin).to_j2000(&origin);
        assert_abs_diff_eq!((back.matrix() - cov.matrix()).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rotation_preserves_total_variance() {
        let cov = StateCovariance::from_sigmas(&sigmas(), CovarianceFrame::J2000);
        let ric = cov.to_ric(&leo_state());
        assert_abs_diff_eq!(ric.matrix().trace(), cov.matrix().trace(), epsilon = 1e-12);
    }

    #[test]
    fn sigma_points_reconstruct_the_covariance_at_epoch() {
        let state = leo_state();
        let cov = StateCovariance::from_sigmas(&sigmas(), CovarianceFrame::J2000);
        let sample =
            SigmaPointSample::new(&state, &cov, &ForceModel::new(), 1e-9).unwrap();
        let (mean, reconstructed) = sample.desample_j2000();
        assert_abs_diff_eq!((mean.position - state.position).norm(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            (reconstructed.matrix() - cov.matrix()).norm(),
            0.0,
            epsilon = 1e-9 * cov.matrix().norm()
        );
    }

    #[test]
    fn propagation_keeps_samples_in_lock_step() {
        let state = leo_state();
        let cov = StateCovariance::from_sigmas(&sigmas(), CovarianceFrame::J2000);
        let mut sample =
            SigmaPointSample::new(&state, &cov, &ForceModel::new(), 1e-9).unwrap();
        let target = state.epoch.roll(1800.0);
        sample.propagate(&target).unwrap();
        assert_eq!(sample.origin().epoch, target);
        let (mean, _) = sample.desample_j2000();
        assert_eq!(mean.epoch, target);
        // The ensemble mean tracks the origin to first order.
        assert!((mean.position - sample.origin().position).norm() < 0.1);
    }

    #[test]
    fn measurement_projection_has_observable_shape() {
        use crate::geodetic::Geodetic;
        use crate::observations::{Observation, OpticalObservation};

        let state = leo_state();
        let cov = StateCovariance::from_sigmas(&sigmas(), CovarianceFrame::J2000);
        let site = StateVector::itrf(
            state.epoch,
            Geodetic::new(0.2, 0.4, 0.1).to_itrf(),
            Vector3::zeros(),
        );
        let observation =
            Observation::Optical(OpticalObservation::new(state.epoch, site, 1.0, 0.2));
        let projected = cov.project(&state, &observation).unwrap();
        assert_eq!((projected.nrows(), projected.ncols()), (2, 2));
        assert!(projected[(0, 0)] > 0.0);
        assert!(projected[(1, 1)] > 0.0);
        // Symmetric to numerical precision.
        assert_abs_diff_eq!(
            projected[(0, 1)],
            projected[(1, 0)],
            epsilon = 1e-12 * projected[(0, 0)].abs().max(1.0)
        );
    }

    #[test]
    fn uncertainty_grows_along_track() {
        let state = leo_state();
        let cov = StateCovariance::from_sigmas(&sigmas(), CovarianceFrame::J2000);
        let mut sample =
            SigmaPointSample::new(&state, &cov, &ForceModel::new(), 1e-9).unwrap();
        sample.propagate(&state.epoch.roll(3.0 * 5800.0)).unwrap();
        let ric = sample.desample_ric();
        let deviations = ric.sigmas();
        // In-track variance dominates after a few revolutions.
        assert!(deviations[1] > deviations[0]);
        assert!(deviations[1] > deviations[2]);
    }
}
