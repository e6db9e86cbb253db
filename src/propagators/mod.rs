//! Orbit propagators.
//!
//! A [`Propagator`] owns a cached state, a checkpoint stack, and whatever
//! model it advances with: analytic two-body ([`KeplerPropagator`]),
//! fixed-step numerical ([`Rk4Propagator`]), adaptive embedded
//! Runge–Kutta ([`DormandPrince54Propagator`],
//! [`RungeKutta89Propagator`]), or the TLE analytic model
//! ([`Sgp4Propagator`]).

mod adaptive;
mod kepler;
mod rk4;
mod sgp4prop;

pub use adaptive::{DormandPrince54Propagator, RungeKutta89Propagator};
pub use kepler::KeplerPropagator;
pub use rk4::Rk4Propagator;
pub use sgp4prop::Sgp4Propagator;

use crate::error::Result;
use crate::interpolators::VerletBlendInterpolator;
use crate::maneuvers::Thrust;
use crate::states::StateVector;
use crate::time::Epoch;

/// Opaque handle to a saved propagator state.
pub type Checkpoint = usize;

/// The common propagation contract.
///
/// Implementations cache their current state; `propagate` advances (or
/// rewinds) that cache and returns the new state. Checkpoints save and
/// restore the cache so that search algorithms can backtrack.
pub trait Propagator {
    /// Advance (or rewind) to `epoch` and return the state there.
    fn propagate(&mut self, epoch: &Epoch) -> Result<StateVector>;

    /// The currently cached state.
    fn state(&self) -> StateVector;

    /// Reset the cache to the state the propagator was built from.
    fn reset(&mut self);

    /// Replace the cached state (used by maneuver application).
    fn set_state(&mut self, state: StateVector);

    /// Push the cached state onto the checkpoint stack.
    fn checkpoint(&mut self) -> Checkpoint;

    /// Restore a previously saved checkpoint. Checkpoints taken after
    /// `handle` remain on the stack.
    fn restore(&mut self, handle: Checkpoint);

    /// Drop all checkpoints.
    fn clear_checkpoints(&mut self);

    /// Execute one maneuver and return the ephemeris it generates, sampled
    /// every `sample_interval` seconds across the burn window.
    ///
    /// Impulsive thrusts produce a single post-burn sample. Finite burns
    /// default to a train of impulsive slices at each sample interval,
    /// which any propagator can honor; force-model propagators override
    /// this with exact thrust integration.
    fn maneuver(&mut self, thrust: &Thrust, sample_interval: f64) -> Result<Vec<StateVector>> {
        if thrust.is_impulsive() {
            let state = self.propagate(&thrust.center)?;
            let burned = thrust.apply_to(&state);
            self.set_state(burned);
            return Ok(vec![burned]);
        }
        let mut samples = Vec::new();
        let slices = (thrust.duration / sample_interval).ceil().max(1.0) as usize;
        let slice_duration = thrust.duration / slices as f64;
        let slice_dv = thrust.delta_v() / slices as f64;
        for i in 0..slices {
            let center = thrust.start().roll((i as f64 + 0.5) * slice_duration);
            let state = self.propagate(&center)?;
            let slice = Thrust::impulsive(center, slice_dv.x, slice_dv.y, slice_dv.z);
            let burned = slice.apply_to(&state);
            self.set_state(burned);
            samples.push(burned);
        }
        let final_state = self.propagate(&thrust.stop())?;
        samples.push(final_state);
        Ok(samples)
    }

    /// Propagate from `start` to `finish`, applying every maneuver whose
    /// window intersects the span, sampling every `interval` seconds, and
    /// return the ephemeris wrapped in an interpolator.
    ///
    /// The returned ephemeris is strictly monotonic in epoch.
    fn ephemeris_maneuver(
        &mut self,
        start: &Epoch,
        finish: &Epoch,
        thrusts: &[Thrust],
        interval: f64,
    ) -> Result<VerletBlendInterpolator> {
        let mut maneuvers: Vec<Thrust> = thrusts.to_vec();
        maneuvers.sort_by(|a, b| {
            a.center
                .posix_seconds()
                .partial_cmp(&b.center.posix_seconds())
                .expect("maneuver epochs are finite")
        });

        let mut samples: Vec<StateVector> = Vec::new();
        let push = |state: StateVector, samples: &mut Vec<StateVector>| {
            if samples
                .last()
                .map_or(true, |last: &StateVector| state.epoch > last.epoch)
            {
                samples.push(state);
            }
        };

        let mut cursor = *start;
        let state = self.propagate(&cursor)?;
        push(state, &mut samples);
        for thrust in &maneuvers {
            let burn_start = if thrust.is_impulsive() { thrust.center } else { thrust.start() };
            if burn_start < *start || thrust.center > *finish {
                continue;
            }
            // Coast up to the burn.
            while cursor.roll(interval) < burn_start {
                cursor = cursor.roll(interval);
                let state = self.propagate(&cursor)?;
                push(state, &mut samples);
            }
            for state in self.maneuver(thrust, interval)? {
                push(state, &mut samples);
            }
            cursor = self.state().epoch;
        }
        // Coast to the end of the span.
        while cursor.roll(interval) < *finish {
            cursor = cursor.roll(interval);
            let state = self.propagate(&cursor)?;
            push(state, &mut samples);
        }
        let final_state = self.propagate(finish)?;
        push(final_state, &mut samples);

        Ok(VerletBlendInterpolator::new(samples))
    }
}
