//! Adaptive embedded Runge–Kutta propagation.
//!
//! A shared stepper drives any embedded Butcher tableau: evaluate the
//! stages, form the higher- and lower-order solutions, accept the step
//! when the difference is within tolerance, and rescale
//! `h ← h·clamp(0.9·(tol/err)^(1/order), 0.1, 5.0)`. A single step may be
//! rejected at most [`MAX_REJECTIONS`] times before the propagation fails.

use log::warn;
use nalgebra::Vector6;

use crate::error::{Error, Result};
use crate::force::ForceModel;
use crate::linalg::{compose_state, position_of, velocity_of};
use crate::maneuvers::Thrust;
use crate::propagators::{Checkpoint, Propagator};
use crate::states::StateVector;
use crate::time::Epoch;

/// Consecutive rejections tolerated on one step.
const MAX_REJECTIONS: usize = 16;

/// An embedded Runge–Kutta tableau.
///
/// `a` holds the stage coupling rows, `b_high`/`b_low` the two output
/// weight sets, `c` the stage nodes. `order` is the exponent order used in
/// the step-size controller.
struct Tableau {
    a: &'static [&'static [f64]],
    b_high: &'static [f64],
    b_low: &'static [f64],
    c: &'static [f64],
    order: f64,
}

// Dormand–Prince 5(4) (Dormand & Prince 1980). The first-same-as-last
// structure is not exploited; stages are evaluated plainly.
#[rustfmt::skip]
static DP54: Tableau = Tableau {
    a: &[
        &[],
        &[1.0 / 5.0],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
        &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
        &[9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0],
        &[35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
    ],
    b_high: &[35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0, 0.0],
    b_low: &[5179.0 / 57600.0, 0.0, 7571.0 / 16695.0, 393.0 / 640.0, -92097.0 / 339200.0, 187.0 / 2100.0, 1.0 / 40.0],
    c: &[0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0],
    order: 5.0,
};

// Fehlberg's 13-stage high-order pair (NASA TR R-287). The order-8
// solution is the one propagated; the order-7 companion provides the
// error estimate.
#[rustfmt::skip]
static RK89: Tableau = Tableau {
    a: &[
        &[],
        &[2.0 / 27.0],
        &[1.0 / 36.0, 1.0 / 12.0],
        &[1.0 / 24.0, 0.0, 1.0 / 8.0],
        &[5.0 / 12.0, 0.0, -25.0 / 16.0, 25.0 / 16.0],
        &[1.0 / 20.0, 0.0, 0.0, 1.0 / 4.0, 1.0 / 5.0],
        &[-25.0 / 108.0, 0.0, 0.0, 125.0 / 108.0, -65.0 / 27.0, 125.0 / 54.0],
        &[31.0 / 300.0, 0.0, 0.0, 0.0, 61.0 / 225.0, -2.0 / 9.0, 13.0 / 900.0],
        &[2.0, 0.0, 0.0, -53.0 / 6.0, 704.0 / 45.0, -107.0 / 9.0, 67.0 / 90.0, 3.0],
        &[-91.0 / 108.0, 0.0, 0.0, 23.0 / 108.0, -976.0 / 135.0, 311.0 / 54.0, -19.0 / 60.0, 17.0 / 6.0, -1.0 / 12.0],
        &[2383.0 / 4100.0, 0.0, 0.0, -341.0 / 164.0, 4496.0 / 1025.0, -301.0 / 82.0, 2133.0 / 4100.0, 45.0 / 82.0, 45.0 / 164.0, 18.0 / 41.0],
        &[3.0 / 205.0, 0.0, 0.0, 0.0, 0.0, -6.0 / 41.0, -3.0 / 205.0, -3.0 / 41.0, 3.0 / 41.0, 6.0 / 41.0, 0.0],
        &[-1777.0 / 4100.0, 0.0, 0.0, -341.0 / 164.0, 4496.0 / 1025.0, -289.0 / 82.0, 2193.0 / 4100.0, 51.0 / 82.0, 33.0 / 164.0, 12.0 / 41.0, 0.0, 1.0],
    ],
    b_high: &[0.0, 0.0, 0.0, 0.0, 0.0, 34.0 / 105.0, 9.0 / 35.0, 9.0 / 35.0, 9.0 / 280.0, 9.0 / 280.0, 0.0, 41.0 / 840.0, 41.0 / 840.0],
    b_low: &[41.0 / 840.0, 0.0, 0.0, 0.0, 0.0, 34.0 / 105.0, 9.0 / 35.0, 9.0 / 35.0, 9.0 / 280.0, 9.0 / 280.0, 41.0 / 840.0, 0.0, 0.0],
    c: &[0.0, 2.0 / 27.0, 1.0 / 9.0, 1.0 / 6.0, 5.0 / 12.0, 1.0 / 2.0, 5.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0, 1.0 / 3.0, 1.0, 0.0, 1.0],
    order: 8.0,
};

/// Shared adaptive stepper state.
#[derive(Clone, Debug)]
struct AdaptiveCore {
    initial: StateVector,
    state: StateVector,
    force: ForceModel,
    tolerance: f64,
    step: f64,
    checkpoints: Vec<StateVector>,
}

impl AdaptiveCore {
    fn new(state: StateVector, force: ForceModel, tolerance: f64) -> Self {
        Self {
            initial: state,
            state,
            force,
            tolerance,
            step: 60.0,
            checkpoints: Vec::new(),
        }
    }

    fn derivative_at(&self, offset: f64, y: &Vector6<f64>) -> Vector6<f64> {
        let state = StateVector::new(
            self.state.epoch.roll(offset),
            position_of(y),
            velocity_of(y),
            self.state.frame,
        );
        self.force.derivative(&state)
    }

    /// One accepted step of at most `|h_max|` seconds. Returns the
    /// signed step actually taken.
    fn step_once(&mut self, tableau: &Tableau, h_max: f64) -> Result<f64> {
        let y = compose_state(&self.state.position, &self.state.velocity);
        let stages = tableau.b_high.len();
        let mut h = self.step.min(h_max.abs()).copysign(h_max);

        for rejection in 0..=MAX_REJECTIONS {
            let mut k: Vec<Vector6<f64>> = Vec::with_capacity(stages);
            for stage in 0..stages {
                let mut y_stage = y;
                for (j, a) in tableau.a[stage].iter().enumerate() {
                    if *a != 0.0 {
                        y_stage += h * *a * k[j];
                    }
                }
                k.push(self.derivative_at(tableau.c[stage] * h, &y_stage));
            }

            let mut y_high = y;
            let mut y_low = y;
            for stage in 0..stages {
                if tableau.b_high[stage] != 0.0 {
                    y_high += h * tableau.b_high[stage] * k[stage];
                }
                if tableau.b_low[stage] != 0.0 {
                    y_low += h * tableau.b_low[stage] * k[stage];
                }
            }

            let error = (y_high - y_low).norm();
            if error <= self.tolerance {
                self.state = StateVector::new(
                    self.state.epoch.roll(h),
                    position_of(&y_high),
                    velocity_of(&y_high),
                    self.state.frame,
                );
                let growth = if error > 0.0 {
                    0.9 * (self.tolerance / error).powf(1.0 / tableau.order)
                } else {
                    5.0
                };
                self.step = (self.step * growth.clamp(0.1, 5.0)).max(1e-6);
                return Ok(h);
            }

            if rejection == MAX_REJECTIONS {
                break;
            }
            let shrink = 0.9 * (self.tolerance / error).powf(1.0 / tableau.order);
            h *= shrink.clamp(0.1, 5.0);
            self.step = h.abs().max(1e-6);
            if rejection + 1 == MAX_REJECTIONS {
                warn!(
                    "adaptive step at {} down to {:.3e} s after {} rejections",
                    self.state.epoch,
                    h.abs(),
                    rejection + 1
                );
            }
        }
        Err(Error::StepRejectionLimit { rejections: MAX_REJECTIONS })
    }

    fn propagate(&mut self, tableau: &Tableau, epoch: &Epoch) -> Result<StateVector> {
        loop {
            let delta = epoch.difference(&self.state.epoch);
            // Snap sub-nanosecond remainders: the final partial step can
            // miss the target by an ulp of the POSIX representation.
            if delta.abs() < 1e-9 {
                self.state.epoch = *epoch;
                return Ok(self.state);
            }
            self.step_once(tableau, delta)?;
        }
    }
}

macro_rules! adaptive_propagator {
    ($name:ident, $tableau:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Debug)]
        pub struct $name {
            core: AdaptiveCore,
        }

        impl $name {
            /// Propagator over `force` with a local-error `tolerance`
            /// (km-scale state norm).
            #[must_use]
            pub fn new(state: StateVector, force: ForceModel, tolerance: f64) -> Self {
                Self { core: AdaptiveCore::new(state, force, tolerance) }
            }

            /// The force model being integrated.
            #[must_use]
            pub fn force_model(&self) -> &ForceModel {
                &self.core.force
            }
        }

        impl Propagator for $name {
            fn propagate(&mut self, epoch: &Epoch) -> Result<StateVector> {
                self.core.propagate($tableau, epoch)
            }

            fn state(&self) -> StateVector {
                self.core.state
            }

            fn reset(&mut self) {
                self.core.state = self.core.initial;
            }

            fn set_state(&mut self, state: StateVector) {
                self.core.state = state;
            }

            fn checkpoint(&mut self) -> Checkpoint {
                self.core.checkpoints.push(self.core.state);
                self.core.checkpoints.len() - 1
            }

            fn restore(&mut self, handle: Checkpoint) {
                self.core.state = self.core.checkpoints[handle];
            }

            fn clear_checkpoints(&mut self) {
                self.core.checkpoints.clear();
            }

            /// Finite burns install the thrust on the force model and
            /// integrate through the window exactly.
            fn maneuver(
                &mut self,
                thrust: &Thrust,
                sample_interval: f64,
            ) -> Result<Vec<StateVector>> {
                if thrust.is_impulsive() {
                    let state = self.propagate(&thrust.center)?;
                    let burned = thrust.apply_to(&state);
                    self.set_state(burned);
                    return Ok(vec![burned]);
                }
                self.propagate(&thrust.start())?;
                self.core.force.load_maneuver(*thrust);
                let mut samples = Vec::new();
                let mut cursor = thrust.start();
                while cursor < thrust.stop() {
                    cursor = cursor.roll(sample_interval);
                    if cursor > thrust.stop() {
                        cursor = thrust.stop();
                    }
                    samples.push(self.propagate(&cursor)?);
                }
                self.core.force.clear_maneuver();
                Ok(samples)
            }
        }
    };
}

adaptive_propagator!(
    DormandPrince54Propagator,
    &DP54,
    "Adaptive Dormand–Prince 5(4) propagator, the workhorse integrator."
);
adaptive_propagator!(
    RungeKutta89Propagator,
    &RK89,
    "High-order adaptive propagator on Fehlberg's 13-stage embedded pair, \
     advancing the order-8 solution; preferred for long arcs at tight \
     tolerances."
);
