//! Sensor observations and their residuals against propagated states.
//!
//! Three observable kinds share one interface: topocentric right
//! ascension / declination (optical), range / azimuth / elevation
//! (radar), and a full Earth-fixed state. Each carries its site, its
//! observed vector, and a noise information matrix `W = Σ⁻¹`; residuals
//! are angle-wrap aware, and measurement Jacobians come from
//! central-differenced propagator pairs rather than symbolic partials.

use nalgebra::{DMatrix, DVector, Vector3};
use rand::Rng;

use crate::constants::MAS_TO_RAD;
use crate::error::Result;
use crate::frames::Frame;
use crate::geodetic::Geodetic;
use crate::linalg::{rot_y, rot_z};
use crate::numerics::{angle_residual, gaussian, wrap_two_pi};
use crate::propagators::Propagator;
use crate::relative::{RelativeKind, RelativeState};
use crate::states::StateVector;
use crate::time::Epoch;

/// Default optical noise, 3 milliarcseconds per axis.
const OPTICAL_SIGMA: f64 = 3.0 * MAS_TO_RAD;
/// Default radar noise: 100 m in range, 0.02° in each angle.
const RADAR_RANGE_SIGMA: f64 = 0.1;
const RADAR_ANGLE_SIGMA: f64 = 3.5e-4;
/// Default state-observation noise: 10 m position, 1 mm/s velocity.
const STATE_POSITION_SIGMA: f64 = 0.01;
const STATE_VELOCITY_SIGMA: f64 = 1.0e-6;

/// A topocentric right ascension / declination measurement.
#[derive(Clone, Debug)]
pub struct OpticalObservation {
    /// Measurement epoch.
    pub epoch: Epoch,
    /// Observing site state (Earth-fixed).
    pub site: StateVector,
    /// Topocentric right ascension, radians.
    pub right_ascension: f64,
    /// Topocentric declination, radians.
    pub declination: f64,
    /// Information matrix `Σ⁻¹`, 2×2.
    pub noise: DMatrix<f64>,
}

/// A range / azimuth / elevation radar measurement.
#[derive(Clone, Debug)]
pub struct RadarObservation {
    /// Measurement epoch.
    pub epoch: Epoch,
    /// Observing site state (Earth-fixed).
    pub site: StateVector,
    /// Slant range, km.
    pub range: f64,
    /// Azimuth east of north, radians.
    pub azimuth: f64,
    /// Elevation above the horizon, radians.
    pub elevation: f64,
    /// Information matrix `Σ⁻¹`, 3×3.
    pub noise: DMatrix<f64>,
}

/// A direct Earth-fixed state measurement (e.g. GNSS).
#[derive(Clone, Debug)]
pub struct StateObservation {
    /// Measurement epoch.
    pub epoch: Epoch,
    /// Observed ITRF state.
    pub observed: StateVector,
    /// Information matrix `Σ⁻¹`, 6×6.
    pub noise: DMatrix<f64>,
}

/// Any supported observation kind.
#[derive(Clone, Debug)]
pub enum Observation {
    /// Topocentric RA/Dec.
    Optical(OpticalObservation),
    /// Range/azimuth/elevation.
    Radar(RadarObservation),
    /// Full Earth-fixed state.
    State(StateObservation),
}

/// Diagonal information matrix from per-component sigmas.
fn information_from_sigmas(sigmas: &[f64]) -> DMatrix<f64> {
    DMatrix::from_diagonal(&DVector::from_iterator(
        sigmas.len(),
        sigmas.iter().map(|s| 1.0 / (s * s)),
    ))
}

impl OpticalObservation {
    /// Observation with the default milliarcsecond-class noise.
    #[must_use]
    pub fn new(
        epoch: Epoch,
        site: StateVector,
        right_ascension: f64,
        declination: f64,
    ) -> Self {
        Self {
            epoch,
            site,
            right_ascension: wrap_two_pi(right_ascension),
            declination,
            noise: information_from_sigmas(&[OPTICAL_SIGMA, OPTICAL_SIGMA]),
        }
    }

    /// Topocentric RA/Dec of a propagated state as seen from this site.
    fn predict(&self, state: &StateVector) -> (f64, f64) {
        let site = self.site.in_frame(Frame::J2000);
        let slant = state.in_frame(Frame::J2000).position - site.position;
        let ra = wrap_two_pi(slant.y.atan2(slant.x));
        let dec = (slant.z / slant.norm()).asin();
        (ra, dec)
    }
}

impl RadarObservation {
    /// Observation with the default range/angle noise.
    #[must_use]
    pub fn new(
        epoch: Epoch,
        site: StateVector,
        range: f64,
        azimuth: f64,
        elevation: f64,
    ) -> Self {
        Self {
            epoch,
            site,
            range,
            azimuth: wrap_two_pi(azimuth),
            elevation,
            noise: information_from_sigmas(&[
                RADAR_RANGE_SIGMA,
                RADAR_ANGLE_SIGMA,
                RADAR_ANGLE_SIGMA,
            ]),
        }
    }

    /// Range/azimuth/elevation of a propagated state from this site.
    fn predict(&self, state: &StateVector) -> (f64, f64, f64) {
        let site_itrf = self.site.in_frame(Frame::Itrf);
        let slant_itrf =
            state.in_frame(Frame::Itrf).position - site_itrf.position;
        let geodetic = Geodetic::from_itrf(&site_itrf.position);
        // South-east-zenith components of the slant vector.
        let sez = rot_y(std::f64::consts::FRAC_PI_2 - geodetic.latitude)
            * rot_z(geodetic.longitude)
            * slant_itrf;
        let range = sez.norm();
        let azimuth = wrap_two_pi(sez.y.atan2(-sez.x));
        let elevation = (sez.z / range).asin();
        (range, azimuth, elevation)
    }

    /// The observed position implied by range/az/el, in ITRF.
    fn observed_position_itrf(&self) -> Vector3<f64> {
        let site_itrf = self.site.in_frame(Frame::Itrf);
        let geodetic = Geodetic::from_itrf(&site_itrf.position);
        let (sin_el, cos_el) = self.elevation.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let sez = Vector3::new(
            -self.range * cos_el * cos_az,
            self.range * cos_el * sin_az,
            self.range * sin_el,
        );
        let to_itrf = (rot_y(std::f64::consts::FRAC_PI_2 - geodetic.latitude)
            * rot_z(geodetic.longitude))
        .transpose();
        site_itrf.position + to_itrf * sez
    }
}

impl StateObservation {
    /// Observation with the default 10 m / 1 mm/s noise.
    #[must_use]
    pub fn new(epoch: Epoch, observed: StateVector) -> Self {
        Self {
            epoch,
            observed,
            noise: information_from_sigmas(&[
                STATE_POSITION_SIGMA,
                STATE_POSITION_SIGMA,
                STATE_POSITION_SIGMA,
                STATE_VELOCITY_SIGMA,
                STATE_VELOCITY_SIGMA,
                STATE_VELOCITY_SIGMA,
            ]),
        }
    }
}

impl Observation {
    /// Measurement epoch.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        match self {
            Self::Optical(o) => o.epoch,
            Self::Radar(o) => o.epoch,
            Self::State(o) => o.epoch,
        }
    }

    /// Observing site state; for state observations, the observed state
    /// itself.
    #[must_use]
    pub fn site(&self) -> &StateVector {
        match self {
            Self::Optical(o) => &o.site,
            Self::Radar(o) => &o.site,
            Self::State(o) => &o.observed,
        }
    }

    /// Noise information matrix `Σ⁻¹`.
    #[must_use]
    pub fn noise(&self) -> &DMatrix<f64> {
        match self {
            Self::Optical(o) => &o.noise,
            Self::Radar(o) => &o.noise,
            Self::State(o) => &o.noise,
        }
    }

    /// Measurement dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        match self {
            Self::Optical(_) => 2,
            Self::Radar(_) => 3,
            Self::State(_) => 6,
        }
    }

    /// The observed values as a vector.
    #[must_use]
    pub fn to_vector(&self) -> DVector<f64> {
        match self {
            Self::Optical(o) => {
                DVector::from_vec(vec![o.right_ascension, o.declination])
            }
            Self::Radar(o) => DVector::from_vec(vec![o.range, o.azimuth, o.elevation]),
            Self::State(o) => DVector::from_vec(vec![
                o.observed.position.x,
                o.observed.position.y,
                o.observed.position.z,
                o.observed.velocity.x,
                o.observed.velocity.y,
                o.observed.velocity.z,
            ]),
        }
    }

    /// Predicted observable for an arbitrary state.
    fn predict(&self, state: &StateVector) -> DVector<f64> {
        match self {
            Self::Optical(o) => {
                let (ra, dec) = o.predict(state);
                DVector::from_vec(vec![ra, dec])
            }
            Self::Radar(o) => {
                let (range, az, el) = o.predict(state);
                DVector::from_vec(vec![range, az, el])
            }
            Self::State(_) => {
                let fixed = state.in_frame(Frame::Itrf);
                DVector::from_vec(vec![
                    fixed.position.x,
                    fixed.position.y,
                    fixed.position.z,
                    fixed.velocity.x,
                    fixed.velocity.y,
                    fixed.velocity.z,
                ])
            }
        }
    }

    /// Which residual rows are angles and need seam-aware differencing.
    fn angular_rows(&self) -> &'static [usize] {
        match self {
            Self::Optical(_) => &[0, 1],
            Self::Radar(_) => &[1, 2],
            Self::State(_) => &[],
        }
    }

    /// Residual `observed − predicted` against a propagator, angle rows
    /// wrapped into `(−π, π]`.
    pub fn residual(&self, propagator: &mut dyn Propagator) -> Result<DVector<f64>> {
        let state = propagator.propagate(&self.epoch())?;
        let predicted = self.predict(&state);
        let observed = self.to_vector();
        let mut residual = observed - predicted;
        for &row in self.angular_rows() {
            residual[row] = angle_residual(residual[row], 0.0);
        }
        Ok(residual)
    }

    /// Measurement Jacobian `∂h/∂x` (m×6) by central differences over a
    /// perturbed propagator pair set.
    pub fn jacobian(&self, pairs: &mut PropagatorPairs) -> Result<DMatrix<f64>> {
        let epoch = self.epoch();
        let mut jacobian = DMatrix::zeros(self.dimension(), 6);
        for j in 0..6 {
            let (high, low) = pairs.propagate_pair(j, &epoch)?;
            let high_vec = self.predict(&high);
            let low_vec = self.predict(&low);
            let step = pairs.step(j);
            for row in 0..self.dimension() {
                let mut difference = high_vec[row] - low_vec[row];
                if self.angular_rows().contains(&row) {
                    difference = angle_residual(high_vec[row], low_vec[row]);
                }
                jacobian[(row, j)] = difference / (2.0 * step);
            }
        }
        Ok(jacobian)
    }

    /// Scalar gate metric: cross-line-of-sight distance for optical,
    /// absolute range error for radar, position error for state
    /// observations. Kilometres in all cases.
    pub fn clos(&self, propagator: &mut dyn Propagator) -> Result<f64> {
        let state = propagator.propagate(&self.epoch())?;
        Ok(match self {
            Self::Optical(o) => {
                let site = o.site.in_frame(Frame::J2000);
                let slant = state.in_frame(Frame::J2000).position - site.position;
                let observed_los = Vector3::new(
                    o.declination.cos() * o.right_ascension.cos(),
                    o.declination.cos() * o.right_ascension.sin(),
                    o.declination.sin(),
                );
                slant.cross(&observed_los).norm()
            }
            Self::Radar(o) => {
                let (range, _, _) = o.predict(&state);
                (o.range - range).abs()
            }
            Self::State(o) => {
                let fixed = state.in_frame(Frame::Itrf);
                (o.observed.position - fixed.position).norm()
            }
        })
    }

    /// RIC difference between the observation-implied position and the
    /// predicted state, km.
    ///
    /// Optical observations carry no range, so the observed position is
    /// synthesized at the predicted slant range along the observed line
    /// of sight.
    pub fn ric_diff(&self, propagator: &mut dyn Propagator) -> Result<Vector3<f64>> {
        let state = propagator.propagate(&self.epoch())?;
        let predicted = state.in_frame(Frame::J2000);
        let observed_position = match self {
            Self::Optical(o) => {
                let site = o.site.in_frame(Frame::J2000);
                let range = (predicted.position - site.position).norm();
                let los = Vector3::new(
                    o.declination.cos() * o.right_ascension.cos(),
                    o.declination.cos() * o.right_ascension.sin(),
                    o.declination.sin(),
                );
                site.position + range * los
            }
            Self::Radar(o) => {
                StateVector::itrf(self.epoch(), o.observed_position_itrf(), Vector3::zeros())
                    .in_frame(Frame::J2000)
                    .position
            }
            Self::State(o) => o.observed.in_frame(Frame::J2000).position,
        };
        let pseudo = StateVector::j2000(self.epoch(), observed_position, predicted.velocity);
        let relative = RelativeState::from_states(RelativeKind::Ric, &predicted, &pseudo);
        Ok(relative.position)
    }

    /// A Gaussian perturbation of this observation in observable space.
    ///
    /// `sigma_scale` multiplies the noise-implied standard deviations;
    /// `1.0` samples at the nominal noise level.
    #[must_use]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, sigma_scale: f64) -> Self {
        let noise = self.noise();
        let draw = |rng: &mut R, row: usize| {
            let sigma = (1.0 / noise[(row, row)]).sqrt() * sigma_scale;
            sigma * gaussian(rng)
        };
        match self {
            Self::Optical(o) => {
                let mut sampled = o.clone();
                sampled.right_ascension = wrap_two_pi(o.right_ascension + draw(rng, 0));
                sampled.declination += draw(rng, 1);
                Self::Optical(sampled)
            }
            Self::Radar(o) => {
                let mut sampled = o.clone();
                sampled.range += draw(rng, 0);
                sampled.azimuth = wrap_two_pi(o.azimuth + draw(rng, 1));
                sampled.elevation += draw(rng, 2);
                Self::Radar(sampled)
            }
            Self::State(o) => {
                let mut sampled = o.clone();
                for row in 0..3 {
                    sampled.observed.position[row] += draw(rng, row);
                    sampled.observed.velocity[row] += draw(rng, row + 3);
                }
                Self::State(sampled)
            }
        }
    }
}

/// Default position perturbation for Jacobian pairs, km.
pub const DEFAULT_POSITION_STEP: f64 = 1.0e-5;
/// Default velocity perturbation for Jacobian pairs, km/s.
pub const DEFAULT_VELOCITY_STEP: f64 = 1.0e-5;

/// Six propagator pairs, each perturbing one state component by ±step,
/// backing central-difference measurement Jacobians.
pub struct PropagatorPairs {
    pairs: Vec<(Box<dyn Propagator>, Box<dyn Propagator>)>,
    steps: [f64; 6],
}

impl PropagatorPairs {
    /// Build pairs around `state` with a propagator `factory` and the
    /// default perturbation steps.
    #[must_use]
    pub fn new<F>(state: &StateVector, factory: F) -> Self
    where
        F: Fn(StateVector) -> Box<dyn Propagator>,
    {
        Self::with_steps(state, DEFAULT_POSITION_STEP, DEFAULT_VELOCITY_STEP, factory)
    }

    /// Build pairs with explicit position/velocity steps.
    #[must_use]
    pub fn with_steps<F>(
        state: &StateVector,
        position_step: f64,
        velocity_step: f64,
        factory: F,
    ) -> Self
    where
        F: Fn(StateVector) -> Box<dyn Propagator>,
    {
        let steps = [
            position_step,
            position_step,
            position_step,
            velocity_step,
            velocity_step,
            velocity_step,
        ];
        let mut pairs = Vec::with_capacity(6);
        for (j, step) in steps.iter().enumerate() {
            let mut high = *state;
            let mut low = *state;
            if j < 3 {
                high.position[j] += step;
                low.position[j] -= step;
            } else {
                high.velocity[j - 3] += step;
                low.velocity[j - 3] -= step;
            }
            pairs.push((factory(high), factory(low)));
        }
        Self { pairs, steps }
    }

    /// The perturbation step of component `j`.
    #[must_use]
    pub fn step(&self, j: usize) -> f64 {
        self.steps[j]
    }

    /// Propagate both members of pair `j` to `epoch`.
    pub fn propagate_pair(
        &mut self,
        j: usize,
        epoch: &Epoch,
    ) -> Result<(StateVector, StateVector)> {
        let (high, low) = &mut self.pairs[j];
        Ok((high.propagate(epoch)?, low.propagate(epoch)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use crate::force::ForceModel;
    use crate::propagators::{DormandPrince54Propagator, KeplerPropagator};

    fn truth_state() -> StateVector {
        StateVector::j2000(
            Epoch::from_posix_seconds(1_483_767_060.0),
            Vector3::new(-5737.369_776, -3423.651_756, 364.099_770),
            Vector3::new(4.378_112_704, -6.646_623_519, 1.170_571_889),
        )
    }

    fn site() -> StateVector {
        let position = Geodetic::new(0.6, -1.8, 0.1).to_itrf();
        StateVector::itrf(truth_state().epoch, position, Vector3::zeros())
    }

    /// An optical observation synthesized from the truth state itself.
    fn synthetic_optical(at: Epoch) -> OpticalObservation {
        let mut prop = KeplerPropagator::from_state(&truth_state()).unwrap();
        let state = prop.propagate(&at).unwrap();
        let observation = OpticalObservation::new(at, site(), 0.0, 0.0);
        let (ra, dec) = observation.predict(&state);
        OpticalObservation { right_ascension: ra, declination: dec, ..observation }
    }

    #[test]
    fn residual_of_truth_is_zero() {
        let epoch = truth_state().epoch.roll(300.0);
        let observation = Observation::Optical(synthetic_optical(epoch));
        let mut prop = KeplerPropagator::from_state(&truth_state()).unwrap();
        let residual = observation.residual(&mut prop).unwrap();
        assert_abs_diff_eq!(residual.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn residual_wraps_across_the_ra_seam() {
        let epoch = truth_state().epoch.roll(300.0);
        let mut optical = synthetic_optical(epoch);
        // Push the observed RA just over the seam relative to predicted.
        optical.right_ascension = wrap_two_pi(optical.right_ascension + 0.01);
        let observation = Observation::Optical(optical);
        let mut prop = KeplerPropagator::from_state(&truth_state()).unwrap();
        let residual = observation.residual(&mut prop).unwrap();
        assert_abs_diff_eq!(residual[0], 0.01, epsilon = 1e-9);
    }

    #[test]
    fn jacobian_has_measurement_shape_and_signal() {
        let epoch = truth_state().epoch.roll(300.0);
        let observation = Observation::Optical(synthetic_optical(epoch));
        let mut pairs = PropagatorPairs::new(&truth_state(), |s| {
            Box::new(DormandPrince54Propagator::new(s, ForceModel::new(), 1e-9))
        });
        let jacobian = observation.jacobian(&mut pairs).unwrap();
        assert_eq!((jacobian.nrows(), jacobian.ncols()), (2, 6));
        assert!(jacobian.norm() > 0.0);
    }

    #[test]
    fn radar_prediction_round_trips_through_sez() {
        let epoch = truth_state().epoch;
        let observation = RadarObservation::new(epoch, site(), 0.0, 0.0, 0.0);
        let (range, az, el) = observation.predict(&truth_state());
        let reconstructed = RadarObservation {
            range,
            azimuth: az,
            elevation: el,
            ..observation
        };
        let implied = reconstructed.observed_position_itrf();
        let truth_itrf = truth_state().in_frame(Frame::Itrf).position;
        assert_abs_diff_eq!((implied - truth_itrf).norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn state_observation_residual_sees_position_error() {
        let epoch = truth_state().epoch.roll(600.0);
        let mut prop = KeplerPropagator::from_state(&truth_state()).unwrap();
        let state = prop.propagate(&epoch).unwrap().in_frame(Frame::Itrf);
        let mut shifted = state;
        shifted.position += Vector3::new(0.02, 0.0, 0.0);
        let observation = Observation::State(StateObservation::new(epoch, shifted));
        prop.reset();
        let residual = observation.residual(&mut prop).unwrap();
        assert_abs_diff_eq!(residual.norm(), 0.02, epsilon = 1e-9);
        let clos = observation.clos(&mut prop).unwrap();
        assert_abs_diff_eq!(clos, 0.02, epsilon = 1e-9);
    }

    #[test]
    fn sampling_scatters_at_the_noise_scale() {
        let epoch = truth_state().epoch.roll(300.0);
        let observation = Observation::Optical(synthetic_optical(epoch));
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut spread = 0.0_f64;
        for _ in 0..200 {
            let sampled = observation.sample(&mut rng, 1.0);
            if let (Observation::Optical(a), Observation::Optical(b)) =
                (&sampled, &observation)
            {
                spread = spread.max((a.declination - b.declination).abs());
            }
        }
        assert!(spread > 0.1 * OPTICAL_SIGMA);
        assert!(spread < 10.0 * OPTICAL_SIGMA);
    }

    #[test]
    fn ric_diff_of_truth_is_small() {
        let epoch = truth_state().epoch.roll(300.0);
        let observation = Observation::Optical(synthetic_optical(epoch));
        let mut prop = KeplerPropagator::from_state(&truth_state()).unwrap();
        let diff = observation.ric_diff(&mut prop).unwrap();
        assert_abs_diff_eq!(diff.norm(), 0.0, epsilon = 1e-9);
    }
}
