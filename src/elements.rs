//! Classical and equinoctial orbital elements.
//!
//! These six-element sets uniquely define a two-body orbit. The classical
//! set is singular for circular and equatorial orbits, so the conversion
//! from Cartesian states falls back to well-defined composite angles at
//! those geometries; the equinoctial set is non-singular everywhere except
//! exactly at `i = π` (prograde form) and carries a retrograde factor to
//! cover that, too.

use nalgebra::Vector3;

use crate::constants::{MU_EARTH, TWO_PI};
use crate::numerics::{kepler_equation, wrap_two_pi};
use crate::states::StateVector;
use crate::time::Epoch;

/// Geometry threshold below which eccentricity or inclination is treated
/// as exactly circular / equatorial.
const SINGULARITY_TOLERANCE: f64 = 1e-11;

/// Classical (Keplerian) orbital elements.
///
/// Angles are radians in `[0, 2π)`; the semi-major axis is km and positive
/// for bound orbits; `0 ≤ e`, `0 ≤ i ≤ π`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassicalElements {
    /// Epoch of validity.
    pub epoch: Epoch,
    /// Semi-major axis, km.
    pub semimajor_axis: f64,
    /// Eccentricity.
    pub eccentricity: f64,
    /// Inclination, radians.
    pub inclination: f64,
    /// Right ascension of the ascending node, radians.
    pub right_ascension: f64,
    /// Argument of perigee, radians.
    pub argument_of_perigee: f64,
    /// True anomaly, radians.
    pub true_anomaly: f64,
    /// Gravitational parameter, km³/s².
    pub mu: f64,
}

impl ClassicalElements {
    /// Create elements with Earth's gravitational parameter.
    #[must_use]
    pub fn new(
        epoch: Epoch,
        semimajor_axis: f64,
        eccentricity: f64,
        inclination: f64,
        right_ascension: f64,
        argument_of_perigee: f64,
        true_anomaly: f64,
    ) -> Self {
        Self {
            epoch,
            semimajor_axis,
            eccentricity,
            inclination,
            right_ascension: wrap_two_pi(right_ascension),
            argument_of_perigee: wrap_two_pi(argument_of_perigee),
            true_anomaly: wrap_two_pi(true_anomaly),
            mu: MU_EARTH,
        }
    }

    /// Replace the gravitational parameter.
    #[must_use]
    pub fn with_mu(mut self, mu: f64) -> Self {
        self.mu = mu;
        self
    }

    /// Elements of a Cartesian state (the `RV → COE` reduction).
    ///
    /// Circular and equatorial geometries collapse the undefined angles to
    /// zero and fold the physical angle into the next one down (true
    /// longitude, argument of latitude), following the standard reduction.
    #[must_use]
    pub fn from_cartesian(
        epoch: Epoch,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        mu: f64,
    ) -> Self {
        let r = position.norm();
        let v_squared = velocity.norm_squared();

        let h_vec = position.cross(velocity);
        let h = h_vec.norm();
        let node_vec = Vector3::z().cross(&h_vec);
        let node = node_vec.norm();

        let ecc_vec = ((v_squared - mu / r) * position
            - position.dot(velocity) * velocity)
            / mu;
        let eccentricity = ecc_vec.norm();

        let energy = 0.5 * v_squared - mu / r;
        let semimajor_axis = -mu / (2.0 * energy);

        let inclination = (h_vec.z / h).acos();
        let equatorial = inclination < SINGULARITY_TOLERANCE
            || (std::f64::consts::PI - inclination) < SINGULARITY_TOLERANCE;
        let circular = eccentricity < SINGULARITY_TOLERANCE;

        let (right_ascension, argument_of_perigee, true_anomaly) =
            if circular && equatorial {
                // True longitude measured from the x-axis.
                let mut l = (position.x / r).clamp(-1.0, 1.0).acos();
                if position.y < 0.0 {
                    l = TWO_PI - l;
                }
                (0.0, 0.0, l)
            } else if circular {
                // Argument of latitude measured from the node.
                let raan = node_angle(&node_vec, node);
                let mut u = (node_vec.dot(position) / (node * r)).clamp(-1.0, 1.0).acos();
                if position.z < 0.0 {
                    u = TWO_PI - u;
                }
                (raan, 0.0, u)
            } else if equatorial {
                // True longitude of periapsis measured from the x-axis.
                let mut lp = (ecc_vec.x / eccentricity).clamp(-1.0, 1.0).acos();
                if ecc_vec.y < 0.0 {
                    lp = TWO_PI - lp;
                }
                (0.0, lp, anomaly_from_periapsis(&ecc_vec, eccentricity, position, velocity, r))
            } else {
                let raan = node_angle(&node_vec, node);
                let mut argp =
                    (node_vec.dot(&ecc_vec) / (node * eccentricity)).clamp(-1.0, 1.0).acos();
                if ecc_vec.z < 0.0 {
                    argp = TWO_PI - argp;
                }
                (raan, argp, anomaly_from_periapsis(&ecc_vec, eccentricity, position, velocity, r))
            };

        Self {
            epoch,
            semimajor_axis,
            eccentricity,
            inclination,
            right_ascension,
            argument_of_perigee,
            true_anomaly,
            mu,
        }
    }

    /// Cartesian position and velocity: perifocal state rotated through
    /// the 3-1-3 sequence `(Ω, i, ω)`.
    #[must_use]
    pub fn to_cartesian(&self) -> (Vector3<f64>, Vector3<f64>) {
        let e = self.eccentricity;
        let nu = self.true_anomaly;
        let p = self.semi_latus_rectum();
        let r = p / (1.0 + e * nu.cos());

        let position_pqw = Vector3::new(r * nu.cos(), r * nu.sin(), 0.0);
        let velocity_pqw =
            Vector3::new(-(self.mu / p).sqrt() * nu.sin(), (self.mu / p).sqrt() * (e + nu.cos()), 0.0);

        let (sin_raan, cos_raan) = self.right_ascension.sin_cos();
        let (sin_incl, cos_incl) = self.inclination.sin_cos();
        let (sin_argp, cos_argp) = self.argument_of_perigee.sin_cos();

        let rotate = |pqw: &Vector3<f64>| {
            Vector3::new(
                (cos_raan * cos_argp - sin_raan * sin_argp * cos_incl) * pqw.x
                    + (-cos_raan * sin_argp - sin_raan * cos_argp * cos_incl) * pqw.y,
                (sin_raan * cos_argp + cos_raan * sin_argp * cos_incl) * pqw.x
                    + (-sin_raan * sin_argp + cos_raan * cos_argp * cos_incl) * pqw.y,
                (sin_argp * sin_incl) * pqw.x + (cos_argp * sin_incl) * pqw.y,
            )
        };

        (rotate(&position_pqw), rotate(&velocity_pqw))
    }

    /// As a J2000 state vector.
    #[must_use]
    pub fn to_state(&self) -> StateVector {
        let (position, velocity) = self.to_cartesian();
        StateVector::j2000(self.epoch, position, velocity)
    }

    /// Semi-latus rectum `a(1 − e²)`, km.
    #[must_use]
    pub fn semi_latus_rectum(&self) -> f64 {
        self.semimajor_axis * (1.0 - self.eccentricity * self.eccentricity)
    }

    /// Mean motion, rad/s.
    #[must_use]
    pub fn mean_motion(&self) -> f64 {
        (self.mu / self.semimajor_axis.powi(3)).sqrt()
    }

    /// Orbital period, seconds.
    #[must_use]
    pub fn period(&self) -> f64 {
        TWO_PI / self.mean_motion()
    }

    /// Apogee radius, km.
    #[must_use]
    pub fn apogee_radius(&self) -> f64 {
        self.semimajor_axis * (1.0 + self.eccentricity)
    }

    /// Perigee radius, km.
    #[must_use]
    pub fn perigee_radius(&self) -> f64 {
        self.semimajor_axis * (1.0 - self.eccentricity)
    }

    /// Flight-path angle `atan(e sin ν / (1 + e cos ν))`, radians.
    #[must_use]
    pub fn flight_path_angle(&self) -> f64 {
        let nu = self.true_anomaly;
        (self.eccentricity * nu.sin())
            .atan2(1.0 + self.eccentricity * nu.cos())
    }

    /// Eccentric anomaly, radians in `[0, 2π)`.
    #[must_use]
    pub fn eccentric_anomaly(&self) -> f64 {
        let e = self.eccentricity;
        let nu = self.true_anomaly;
        wrap_two_pi(((1.0 - e * e).sqrt() * nu.sin()).atan2(e + nu.cos()))
    }

    /// Mean anomaly via Kepler's equation, radians in `[0, 2π)`.
    #[must_use]
    pub fn mean_anomaly(&self) -> f64 {
        let big_e = self.eccentric_anomaly();
        wrap_two_pi(big_e - self.eccentricity * big_e.sin())
    }

    /// The same orbit with the true anomaly set from a mean anomaly.
    #[must_use]
    pub fn with_mean_anomaly(mut self, mean_anomaly: f64) -> Self {
        let e = self.eccentricity;
        let big_e = kepler_equation(mean_anomaly, e);
        self.true_anomaly =
            wrap_two_pi(((1.0 - e * e).sqrt() * big_e.sin()).atan2(big_e.cos() - e));
        self
    }

    /// Two-body propagation: advance the mean anomaly linearly to the
    /// target epoch, leaving every other element unchanged.
    #[must_use]
    pub fn propagate_to(&self, epoch: Epoch) -> Self {
        let dt = epoch.difference(&self.epoch);
        let mean = self.mean_anomaly() + self.mean_motion() * dt;
        let mut next = self.with_mean_anomaly(mean);
        next.epoch = epoch;
        next
    }

    /// The equivalent equinoctial element set.
    #[must_use]
    pub fn to_equinoctial(&self) -> EquinoctialElements {
        EquinoctialElements::from_classical(self)
    }
}

fn node_angle(node_vec: &Vector3<f64>, node: f64) -> f64 {
    let mut raan = (node_vec.x / node).clamp(-1.0, 1.0).acos();
    if node_vec.y < 0.0 {
        raan = TWO_PI - raan;
    }
    raan
}

fn anomaly_from_periapsis(
    ecc_vec: &Vector3<f64>,
    eccentricity: f64,
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
    r: f64,
) -> f64 {
    let mut nu = (ecc_vec.dot(position) / (eccentricity * r)).clamp(-1.0, 1.0).acos();
    if position.dot(velocity) < 0.0 {
        nu = TWO_PI - nu;
    }
    nu
}

/// Equinoctial orbital elements with a retrograde factor.
///
/// Non-singular for circular and equatorial orbits. `fr = +1` is the
/// direct (prograde) form, `fr = −1` the retrograde form that stays
/// regular at `i = π`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquinoctialElements {
    /// Epoch of validity.
    pub epoch: Epoch,
    /// `e·cos(ω + fr·Ω)`.
    pub af: f64,
    /// `e·sin(ω + fr·Ω)`.
    pub ag: f64,
    /// Mean longitude `M + ω + fr·Ω`, radians.
    pub mean_longitude: f64,
    /// Mean motion, rad/s.
    pub mean_motion: f64,
    /// `tan/cot(i/2)·sin Ω`.
    pub chi: f64,
    /// `tan/cot(i/2)·cos Ω`.
    pub psi: f64,
    /// Gravitational parameter, km³/s².
    pub mu: f64,
    /// Retrograde factor, `+1` or `−1`.
    pub retrograde_factor: i8,
}

impl EquinoctialElements {
    /// Convert from classical elements. Orbits with `i > 90°` use the
    /// retrograde form.
    #[must_use]
    pub fn from_classical(classical: &ClassicalElements) -> Self {
        let fr: i8 = if classical.inclination > std::f64::consts::FRAC_PI_2 { -1 } else { 1 };
        let f = f64::from(fr);
        let e = classical.eccentricity;
        let raan = classical.right_ascension;
        let argp = classical.argument_of_perigee;

        let half_incl = classical.inclination / 2.0;
        let shape = if fr == 1 { half_incl.tan() } else { 1.0 / half_incl.tan() };

        Self {
            epoch: classical.epoch,
            af: e * (argp + f * raan).cos(),
            ag: e * (argp + f * raan).sin(),
            mean_longitude: wrap_two_pi(classical.mean_anomaly() + argp + f * raan),
            mean_motion: classical.mean_motion(),
            chi: shape * raan.sin(),
            psi: shape * raan.cos(),
            mu: classical.mu,
            retrograde_factor: fr,
        }
    }

    /// Semi-major axis recovered from the mean motion, km.
    #[must_use]
    pub fn semimajor_axis(&self) -> f64 {
        (self.mu / (self.mean_motion * self.mean_motion)).cbrt()
    }

    /// Convert back to classical elements.
    #[must_use]
    pub fn to_classical(&self) -> ClassicalElements {
        let f = f64::from(self.retrograde_factor);
        let eccentricity = self.af.hypot(self.ag);
        let shape = self.chi.hypot(self.psi);
        let inclination = if self.retrograde_factor == 1 {
            2.0 * shape.atan()
        } else {
            std::f64::consts::PI - 2.0 * shape.atan()
        };
        let right_ascension = wrap_two_pi(self.chi.atan2(self.psi));
        let argument_of_perigee =
            wrap_two_pi(self.ag.atan2(self.af) - f * right_ascension);
        let mean_anomaly = wrap_two_pi(
            self.mean_longitude - argument_of_perigee - f * right_ascension,
        );

        ClassicalElements {
            epoch: self.epoch,
            semimajor_axis: self.semimajor_axis(),
            eccentricity,
            inclination,
            right_ascension,
            argument_of_perigee,
            true_anomaly: 0.0,
            mu: self.mu,
        }
        .with_mean_anomaly(mean_anomaly)
    }
}
