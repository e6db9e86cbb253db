//! Relative motion: RIC and curvilinear (EQCM) frames, Clohessy–Wiltshire
//! dynamics, and waypoint targeting.
//!
//! The RIC frame is radial / in-track / cross-track, built from a reference
//! ("origin") inertial state; EQCM is its curvilinear analogue, unwrapping
//! the in-track and cross-track displacements into arc lengths on the
//! origin's orbital sphere so that large along-track separations stay
//! meaningful.

use nalgebra::{Matrix3, Vector3};

use crate::constants::MU_EARTH;
use crate::error::{Error, Result};
use crate::states::StateVector;
use crate::time::Epoch;

/// Which relative-frame formulation a [`RelativeState`] uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelativeKind {
    /// Linear radial / in-track / cross-track rotation.
    Ric,
    /// Modified equidistant-cylindrical (curvilinear) coordinates.
    Eqcm,
}

/// A deputy state relative to an origin orbit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelativeState {
    /// Epoch of the origin state this is relative to.
    pub origin_epoch: Epoch,
    /// Relative position, km, in the frame named by `kind`.
    pub position: Vector3<f64>,
    /// Relative velocity, km/s, in the rotating frame.
    pub velocity: Vector3<f64>,
    /// Origin semi-major axis, km (sets the mean motion of the frame).
    pub origin_semimajor_axis: f64,
    /// Formulation tag.
    pub kind: RelativeKind,
}

/// Rotation taking inertial axes into the origin's RIC axes.
#[must_use]
pub fn ric_rotation(origin: &StateVector) -> Matrix3<f64> {
    let radial = origin.position.normalize();
    let cross = origin.angular_momentum().normalize();
    let intrack = cross.cross(&radial);
    Matrix3::from_rows(&[
        radial.transpose(),
        intrack.transpose(),
        cross.transpose(),
    ])
}

/// Angular velocity of the origin's RIC frame, expressed in RIC axes.
#[must_use]
pub fn ric_angular_velocity(origin: &StateVector) -> Vector3<f64> {
    let h = origin.angular_momentum().norm();
    Vector3::new(0.0, 0.0, h / origin.position.norm_squared())
}

impl RelativeState {
    /// Express a target state relative to an origin state.
    ///
    /// Both states must share an epoch and an inertial frame; the caller
    /// converts beforehand if necessary.
    #[must_use]
    pub fn from_states(kind: RelativeKind, origin: &StateVector, target: &StateVector) -> Self {
        let rotation = ric_rotation(origin);
        let omega = ric_angular_velocity(origin);
        let (position, velocity) = match kind {
            RelativeKind::Ric => {
                let dr = rotation * (target.position - origin.position);
                let dv = rotation * (target.velocity - origin.velocity) - omega.cross(&dr);
                (dr, dv)
            }
            RelativeKind::Eqcm => {
                // Deputy in the origin's rotating axes, full position. The
                // rotating frame absorbs the origin's angular motion; its
                // radial breathing rate is subtracted explicitly so the
                // origin maps to the zero relative state.
                let q = rotation * target.position;
                let q_dot = rotation * target.velocity - omega.cross(&q);
                let radial_rate = origin.position.dot(&origin.velocity) / origin.radius();
                let (position, mut velocity) =
                    curvilinear_from_rotating(origin.radius(), &q, &q_dot);
                velocity.x -= radial_rate;
                (position, velocity)
            }
        };
        Self {
            origin_epoch: origin.epoch,
            position,
            velocity,
            origin_semimajor_axis: origin.semimajor_axis(),
            kind,
        }
    }

    /// Reconstruct the inertial target state from this relative state and
    /// the origin it was built against.
    #[must_use]
    pub fn to_inertial(&self, origin: &StateVector) -> StateVector {
        let rotation = ric_rotation(origin);
        let omega = ric_angular_velocity(origin);
        match self.kind {
            RelativeKind::Ric => {
                let position = origin.position + rotation.transpose() * self.position;
                let velocity = origin.velocity
                    + rotation.transpose() * (self.velocity + omega.cross(&self.position));
                StateVector::new(origin.epoch, position, velocity, origin.frame)
            }
            RelativeKind::Eqcm => {
                let radial_rate = origin.position.dot(&origin.velocity) / origin.radius();
                let mut curvilinear_rate = self.velocity;
                curvilinear_rate.x += radial_rate;
                let (q, q_dot) = rotating_from_curvilinear(
                    origin.radius(),
                    &self.position,
                    &curvilinear_rate,
                );
                let position = rotation.transpose() * q;
                let velocity = rotation.transpose() * (q_dot + omega.cross(&q));
                StateVector::new(origin.epoch, position, velocity, origin.frame)
            }
        }
    }

    /// Separation distance, km.
    #[must_use]
    pub fn range(&self) -> f64 {
        self.position.norm()
    }

    /// Range rate, km/s.
    #[must_use]
    pub fn range_rate(&self) -> f64 {
        if self.position.norm() < f64::EPSILON {
            return self.velocity.norm();
        }
        self.position.dot(&self.velocity) / self.position.norm()
    }

    /// Mean motion of the origin orbit, rad/s.
    #[must_use]
    pub fn mean_motion(&self) -> f64 {
        (MU_EARTH / self.origin_semimajor_axis.powi(3)).sqrt()
    }
}

/// Map rotating-frame Cartesian coordinates to curvilinear (radial offset,
/// in-track arc, cross-track arc) and their rates.
fn curvilinear_from_rotating(
    origin_radius: f64,
    q: &Vector3<f64>,
    q_dot: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let rho = q.norm();
    let planar = (q.x * q.x + q.y * q.y).sqrt();
    let lambda = q.y.atan2(q.x);
    let phi = q.z.atan2(planar);

    let rho_dot = q.dot(q_dot) / rho;
    let lambda_dot = (q.x * q_dot.y - q.y * q_dot.x) / (planar * planar);
    let phi_dot =
        (q_dot.z * planar * planar - q.z * (q.x * q_dot.x + q.y * q_dot.y))
            / (rho * rho * planar);

    (
        Vector3::new(rho - origin_radius, origin_radius * lambda, origin_radius * phi),
        Vector3::new(rho_dot, origin_radius * lambda_dot, origin_radius * phi_dot),
    )
}

/// Inverse of [`curvilinear_from_rotating`].
fn rotating_from_curvilinear(
    origin_radius: f64,
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let rho = origin_radius + position.x;
    let lambda = position.y / origin_radius;
    let phi = position.z / origin_radius;
    let rho_dot = velocity.x;
    let lambda_dot = velocity.y / origin_radius;
    let phi_dot = velocity.z / origin_radius;

    let (sin_lambda, cos_lambda) = lambda.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();

    let q = Vector3::new(
        rho * cos_phi * cos_lambda,
        rho * cos_phi * sin_lambda,
        rho * sin_phi,
    );
    let q_dot = Vector3::new(
        rho_dot * cos_phi * cos_lambda
            - rho * sin_phi * phi_dot * cos_lambda
            - rho * cos_phi * sin_lambda * lambda_dot,
        rho_dot * cos_phi * sin_lambda - rho * sin_phi * phi_dot * sin_lambda
            + rho * cos_phi * cos_lambda * lambda_dot,
        rho_dot * sin_phi + rho * cos_phi * phi_dot,
    );
    (q, q_dot)
}

/// A relative-motion target: be at `position` (RIC, km) at `epoch`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    /// Arrival epoch.
    pub epoch: Epoch,
    /// Relative position to reach, km.
    pub position: Vector3<f64>,
}

/// Clohessy–Wiltshire state-transition blocks for mean motion `n` over
/// `t` seconds: `(Φ_rr, Φ_rv, Φ_vr, Φ_vv)`.
#[must_use]
pub fn cw_transition(n: f64, t: f64) -> (Matrix3<f64>, Matrix3<f64>, Matrix3<f64>, Matrix3<f64>) {
    let nt = n * t;
    let (s, c) = nt.sin_cos();

    let phi_rr = Matrix3::new(
        4.0 - 3.0 * c, 0.0, 0.0, //
        6.0 * (s - nt), 1.0, 0.0, //
        0.0, 0.0, c,
    );
    let phi_rv = Matrix3::new(
        s / n, 2.0 * (1.0 - c) / n, 0.0, //
        -2.0 * (1.0 - c) / n, (4.0 * s - 3.0 * nt) / n, 0.0, //
        0.0, 0.0, s / n,
    );
    let phi_vr = Matrix3::new(
        3.0 * n * s, 0.0, 0.0, //
        6.0 * n * (c - 1.0), 0.0, 0.0, //
        0.0, 0.0, -n * s,
    );
    let phi_vv = Matrix3::new(
        c, 2.0 * s, 0.0, //
        -2.0 * s, 4.0 * c - 3.0, 0.0, //
        0.0, 0.0, c,
    );
    (phi_rr, phi_rv, phi_vr, phi_vv)
}

/// Propagate a relative state under linearized (Clohessy–Wiltshire)
/// dynamics by `t` seconds.
#[must_use]
pub fn cw_propagate(state: &RelativeState, t: f64) -> RelativeState {
    let n = state.mean_motion();
    let (phi_rr, phi_rv, phi_vr, phi_vv) = cw_transition(n, t);
    RelativeState {
        origin_epoch: state.origin_epoch.roll(t),
        position: phi_rr * state.position + phi_rv * state.velocity,
        velocity: phi_vr * state.position + phi_vv * state.velocity,
        origin_semimajor_axis: state.origin_semimajor_axis,
        kind: state.kind,
    }
}

/// Impulse (km/s, RIC) that retargets `state` onto `waypoint`.
///
/// Solves the Clohessy–Wiltshire two-point boundary problem for the
/// departure velocity and returns the difference from the current
/// velocity.
///
/// # Errors
///
/// [`Error::SingularMatrix`] when the transfer time makes the
/// position-from-velocity block singular (e.g. a half-revolution
/// cross-track transfer).
pub fn waypoint_maneuver(state: &RelativeState, waypoint: &Waypoint) -> Result<Vector3<f64>> {
    let t = waypoint.epoch.difference(&state.origin_epoch);
    let n = state.mean_motion();
    let (phi_rr, phi_rv, _, _) = cw_transition(n, t);
    let required = phi_rv
        .try_inverse()
        .ok_or(Error::SingularMatrix { operation: "cw targeting" })?
        * (waypoint.position - phi_rr * state.position);
    Ok(required - state.velocity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::frames::Frame;

    fn geo_origin() -> StateVector {
        let radius = 42_164.154;
        let speed = (MU_EARTH / radius).sqrt();
        StateVector::j2000(
            Epoch::from_posix_seconds(950_000_000.0),
            Vector3::new(radius, 0.0, 0.0),
            Vector3::new(0.0, speed, 0.0),
        )
    }

    #[test]
    fn ric_of_origin_itself_is_zero() {
        let origin = geo_origin();
        let rel = RelativeState::from_states(RelativeKind::Ric, &origin, &origin);
        assert_abs_diff_eq!(rel.position.norm(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rel.velocity.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn ric_round_trip_reconstructs_target() {
        let origin = geo_origin();
        let target = StateVector::new(
            origin.epoch,
            origin.position + Vector3::new(1.0, -8.0, 2.0),
            origin.velocity + Vector3::new(0.002, 0.001, -0.003),
            Frame::J2000,
        );
        let rel = RelativeState::from_states(RelativeKind::Ric, &origin, &target);
        let back = rel.to_inertial(&origin);
        assert_abs_diff_eq!((back.position - target.position).norm(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!((back.velocity - target.velocity).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn eqcm_round_trip_reconstructs_target() {
        let origin = geo_origin();
        let target = StateVector::new(
            origin.epoch,
            origin.position + Vector3::new(0.5, -40.0, 5.0),
            origin.velocity + Vector3::new(0.001, 0.0005, -0.002),
            Frame::J2000,
        );
        let rel = RelativeState::from_states(RelativeKind::Eqcm, &origin, &target);
        let back = rel.to_inertial(&origin);
        assert_abs_diff_eq!((back.position - target.position).norm(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!((back.velocity - target.velocity).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn eqcm_intrack_is_arc_length() {
        // 40 km along-track at GEO: the chord and arc differ by millimetres,
        // but the curvilinear value must match r·λ exactly.
        let origin = geo_origin();
        let lambda: f64 = 40.0 / origin.radius();
        let target = StateVector::j2000(
            origin.epoch,
            Vector3::new(
                origin.radius() * lambda.cos(),
                origin.radius() * lambda.sin(),
                0.0,
            ),
            origin.velocity,
        );
        let rel = RelativeState::from_states(RelativeKind::Eqcm, &origin, &target);
        assert_abs_diff_eq!(rel.position.y, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rel.position.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn vbar_perch_is_a_cw_equilibrium() {
        let rel = RelativeState {
            origin_epoch: Epoch::from_posix_seconds(0.0),
            position: Vector3::new(0.0, -10.0, 0.0),
            velocity: Vector3::zeros(),
            origin_semimajor_axis: 42_164.154,
            kind: RelativeKind::Ric,
        };
        let later = cw_propagate(&rel, 3600.0);
        assert_abs_diff_eq!((later.position - rel.position).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn waypoint_maneuver_reaches_the_waypoint() {
        // Chaser perched 10 km behind a GEO target on the V-bar, drifting
        // cross-track at 5 m/s; command a return to the origin in 1200 s.
        let rel = RelativeState {
            origin_epoch: Epoch::from_posix_seconds(0.0),
            position: Vector3::new(0.0, -10.0, 0.0),
            velocity: Vector3::new(0.0, 0.0, 0.005),
            origin_semimajor_axis: 42_164.154,
            kind: RelativeKind::Ric,
        };
        let waypoint = Waypoint {
            epoch: rel.origin_epoch.roll(1200.0),
            position: Vector3::zeros(),
        };
        let dv = waypoint_maneuver(&rel, &waypoint).unwrap();

        // The cross-track impulse cancels the nodal drift exactly.
        assert_abs_diff_eq!(dv.z, -0.005, epsilon = 1e-6);

        // Applying the impulse and coasting lands on the waypoint.
        let mut burned = rel;
        burned.velocity += dv;
        let arrival = cw_propagate(&burned, 1200.0);
        assert_abs_diff_eq!(arrival.position.norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn half_period_crosstrack_transfer_is_singular() {
        let rel = RelativeState {
            origin_epoch: Epoch::from_posix_seconds(0.0),
            position: Vector3::new(0.0, 0.0, 1.0),
            velocity: Vector3::zeros(),
            origin_semimajor_axis: 42_164.154,
            kind: RelativeKind::Ric,
        };
        let n = rel.mean_motion();
        let waypoint = Waypoint {
            epoch: rel.origin_epoch.roll(std::f64::consts::PI / n),
            position: Vector3::zeros(),
        };
        assert!(matches!(
            waypoint_maneuver(&rel, &waypoint),
            Err(Error::SingularMatrix { .. })
        ));
    }
}
