//! Batch differential correction.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Vector3};

use crate::covariance::{CovarianceFrame, StateCovariance};
use crate::error::Result;
use crate::force::ForceModel;
use crate::linalg::{pseudoinverse, solve};
use crate::observations::{Observation, PropagatorPairs};
use crate::propagators::{DormandPrince54Propagator, Propagator};
use crate::states::StateVector;

/// Default integrator tolerance for the solver-internal propagators.
const PROPAGATOR_TOLERANCE: f64 = 1e-9;

/// A converged differential-correction result.
#[derive(Clone, Debug)]
pub struct OdSolution {
    /// Estimated state at the solve epoch.
    pub state: StateVector,
    /// Formal covariance of the estimate (J2000), from the normal
    /// equations.
    pub covariance: StateCovariance,
    /// Weighted RMS of the final residuals.
    pub weighted_rms: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Estimated inverse ballistic coefficient, m²/kg (extended solves).
    pub inverse_ballistic_coeff: Option<f64>,
    /// Estimated inverse SRP coefficient, m²/kg (extended solves).
    pub inverse_srp_coeff: Option<f64>,
}

/// Gauss–Newton batch least squares over the six-dimensional state.
///
/// Each iteration stacks every observation's residual and
/// finite-difference Jacobian into the normal equations
/// `(AᵀWA)·δx = AᵀWb`, applies the correction to the nominal state, and
/// stops when the weighted RMS stops improving. Observations are sorted
/// by epoch internally; callers may pass them in any order.
pub struct BatchLeastSquares {
    observations: Vec<Observation>,
    nominal: StateVector,
    force: ForceModel,
    /// Relative change in weighted RMS that counts as converged.
    pub tolerance: f64,
    /// Iteration cap.
    pub max_iterations: usize,
}

impl BatchLeastSquares {
    /// Solver over `observations` starting from `initial`.
    #[must_use]
    pub fn new(
        observations: Vec<Observation>,
        initial: StateVector,
        force: ForceModel,
    ) -> Self {
        let mut observations = observations;
        observations.sort_by(|a, b| {
            a.epoch()
                .posix_seconds()
                .partial_cmp(&b.epoch().posix_seconds())
                .expect("observation epochs are finite")
        });
        Self {
            observations,
            nominal: initial,
            force,
            tolerance: 1e-3,
            max_iterations: 25,
        }
    }

    /// Residuals and measurement Jacobians accumulated into normal
    /// equations around `nominal`; returns `(AᵀWA, AᵀWb, weighted rms)`.
    fn normal_equations(
        &self,
        nominal: &StateVector,
        parameters: usize,
        force_step: f64,
    ) -> Result<(DMatrix<f64>, DVector<f64>, f64)> {
        let mut ata = DMatrix::zeros(parameters, parameters);
        let mut atb = DVector::zeros(parameters);
        let mut weighted_square_sum = 0.0;
        let mut measurement_count = 0usize;

        let mut nominal_prop =
            DormandPrince54Propagator::new(*nominal, self.force.clone(), PROPAGATOR_TOLERANCE);
        let force = self.force.clone();
        let mut pairs = PropagatorPairs::new(nominal, move |s| {
            Box::new(DormandPrince54Propagator::new(s, force.clone(), PROPAGATOR_TOLERANCE))
        });

        // Perturbed-coefficient propagators for the extended parameters.
        let mut coefficient_pairs: Vec<(
            DormandPrince54Propagator,
            DormandPrince54Propagator,
            f64,
        )> = Vec::new();
        if parameters > 6 {
            let configure = |invert: fn(ForceModel, f64) -> ForceModel, delta: f64| {
                (
                    DormandPrince54Propagator::new(
                        *nominal,
                        invert(self.force.clone(), delta),
                        PROPAGATOR_TOLERANCE,
                    ),
                    DormandPrince54Propagator::new(
                        *nominal,
                        invert(self.force.clone(), -delta),
                        PROPAGATOR_TOLERANCE,
                    ),
                    delta,
                )
            };
            coefficient_pairs.push(configure(
                |f, d| {
                    let current = f.inverse_ballistic_coeff();
                    f.with_atmospheric_drag(1.0, (current + d).max(0.0), 1.0)
                },
                force_step,
            ));
            coefficient_pairs.push(configure(
                |f, d| {
                    let current = f.inverse_srp_coeff();
                    f.with_solar_radiation_pressure(1.0, (current + d).max(0.0), 1.0)
                },
                force_step,
            ));
        }

        for observation in &self.observations {
            let residual = observation.residual(&mut nominal_prop)?;
            let mut jacobian = observation.jacobian(&mut pairs)?;
            if parameters > 6 {
                jacobian = jacobian.insert_columns(6, parameters - 6, 0.0);
                for (j, (high, low, delta)) in coefficient_pairs.iter_mut().enumerate() {
                    let high_res = observation.residual(high)?;
                    let low_res = observation.residual(low)?;
                    // Residual = observed − predicted, so ∂h/∂c flips sign.
                    let column = (low_res - high_res) / (2.0 * *delta);
                    jacobian.set_column(6 + j, &column);
                }
            }

            let weight = observation.noise();
            ata += jacobian.transpose() * weight * &jacobian;
            atb += jacobian.transpose() * weight * &residual;
            weighted_square_sum += (residual.transpose() * weight * &residual)[(0, 0)];
            measurement_count += observation.dimension();
        }

        let rms = (weighted_square_sum / measurement_count as f64).sqrt();
        Ok((ata, atb, rms))
    }

    fn iterate(&mut self, parameters: usize) -> Result<OdSolution> {
        let mut nominal = self.nominal;
        let mut inverse_bc = self.force.inverse_ballistic_coeff();
        let mut inverse_srp = self.force.inverse_srp_coeff();
        let mut previous_rms = f64::INFINITY;
        let mut last_ata = DMatrix::zeros(parameters, parameters);
        let mut rms = previous_rms;
        let mut iterations = 0;

        for iteration in 1..=self.max_iterations {
            iterations = iteration;
            let (ata, atb, current_rms) =
                self.normal_equations(&nominal, parameters, 1e-4)?;
            last_ata = ata.clone();
            rms = current_rms;
            debug!("batch iteration {iteration}: weighted rms {current_rms:.6e}");

            if (previous_rms - current_rms).abs() <= self.tolerance * previous_rms.min(1.0) {
                break;
            }
            previous_rms = current_rms;

            let correction = solve(&ata, &atb)?;
            nominal.position += Vector3::new(correction[0], correction[1], correction[2]);
            nominal.velocity += Vector3::new(correction[3], correction[4], correction[5]);
            if parameters > 6 {
                inverse_bc = (inverse_bc + correction[6]).max(0.0);
                inverse_srp = (inverse_srp + correction[7]).max(0.0);
                self.force = self
                    .force
                    .clone()
                    .with_atmospheric_drag(1.0, inverse_bc, 1.0)
                    .with_solar_radiation_pressure(1.0, inverse_srp, 1.0);
            }
            if iteration == self.max_iterations {
                warn!("batch solver hit the iteration cap at rms {current_rms:.6e}");
            }
        }

        let covariance_full = pseudoinverse(&last_ata)?;
        let mut covariance = nalgebra::Matrix6::zeros();
        for row in 0..6 {
            for col in 0..6 {
                covariance[(row, col)] = covariance_full[(row, col)];
            }
        }

        self.nominal = nominal;
        Ok(OdSolution {
            state: nominal,
            covariance: StateCovariance::new(covariance, CovarianceFrame::J2000),
            weighted_rms: rms,
            iterations,
            inverse_ballistic_coeff: (parameters > 6).then_some(inverse_bc),
            inverse_srp_coeff: (parameters > 6).then_some(inverse_srp),
        })
    }

    /// Solve for the six-dimensional state.
    ///
    /// # Errors
    ///
    /// Propagation failures and singular normal equations.
    pub fn solve(&mut self) -> Result<OdSolution> {
        self.iterate(6)
    }
}

/// Gauss–Newton solver over state plus inverse drag and SRP coefficients
/// (eight parameters).
///
/// The coefficients enter inverted (`Cd·A/m`, `Cr·A/m`) so that zero
/// cleanly means "force disabled" and the solver can switch a force off.
pub struct GaussNewtonSolver {
    inner: BatchLeastSquares,
}

impl GaussNewtonSolver {
    /// Solver over `observations` starting from `initial` and the force
    /// configuration in `force`.
    #[must_use]
    pub fn new(
        observations: Vec<Observation>,
        initial: StateVector,
        force: ForceModel,
    ) -> Self {
        Self { inner: BatchLeastSquares::new(observations, initial, force) }
    }

    /// Relative RMS-change convergence tolerance.
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.inner.tolerance = tolerance;
    }

    /// Solve the eight-parameter problem.
    ///
    /// # Errors
    ///
    /// Propagation failures and singular normal equations.
    pub fn solve(&mut self) -> Result<OdSolution> {
        self.inner.iterate(8)
    }
}
