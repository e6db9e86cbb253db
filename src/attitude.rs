//! Kinematic attitude helpers: quaternion construction, Euler sequences,
//! TRIAD, and the quaternion kinematic derivative.
//!
//! Attitude *dynamics* are out of scope; these utilities exist so that
//! frame rotations and relative-motion transforms can be expressed as
//! quaternion chains where that is clearer than matrix products.

use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};

/// Rotation axis order for an Euler angle triple.
///
/// Sequences are intrinsic and named outermost-first: `Zyx` applies the
/// first angle about z, the second about the rotated y, the third about the
/// twice-rotated x.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EulerSequence {
    /// Yaw-pitch-roll.
    Zyx,
    /// Roll-pitch-yaw.
    Xyz,
    /// Classical orbital 3-1-3.
    Zxz,
    /// 1-3-1.
    Xzx,
    /// 3-2-3.
    Zyz,
}

/// An Euler angle triple with its axis sequence, radians.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAngles {
    /// Rotation about the first axis.
    pub first: f64,
    /// Rotation about the second (rotated) axis.
    pub second: f64,
    /// Rotation about the third (twice-rotated) axis.
    pub third: f64,
    /// Axis order.
    #[cfg_attr(feature = "serde", serde(skip, default = "default_sequence"))]
    pub sequence: EulerSequence,
}

#[cfg(feature = "serde")]
fn default_sequence() -> EulerSequence {
    EulerSequence::Zyx
}

impl EulerAngles {
    /// Create an Euler angle triple.
    #[must_use]
    pub const fn new(sequence: EulerSequence, first: f64, second: f64, third: f64) -> Self {
        Self { first, second, third, sequence }
    }

    /// The equivalent unit quaternion.
    #[must_use]
    pub fn to_quaternion(&self) -> UnitQuaternion<f64> {
        let axis_rotation = |axis: char, angle: f64| match axis {
            'x' => UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle),
            'y' => UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle),
            _ => UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle),
        };
        let axes = match self.sequence {
            EulerSequence::Zyx => ['z', 'y', 'x'],
            EulerSequence::Xyz => ['x', 'y', 'z'],
            EulerSequence::Zxz => ['z', 'x', 'z'],
            EulerSequence::Xzx => ['x', 'z', 'x'],
            EulerSequence::Zyz => ['z', 'y', 'z'],
        };
        axis_rotation(axes[0], self.first)
            * axis_rotation(axes[1], self.second)
            * axis_rotation(axes[2], self.third)
    }

    /// The equivalent direction-cosine matrix.
    #[must_use]
    pub fn to_matrix(&self) -> Matrix3<f64> {
        *self.to_quaternion().to_rotation_matrix().matrix()
    }
}

/// TRIAD attitude determination from two vector pairs.
///
/// Builds the rotation taking the reference frame into the observed frame
/// from one primary and one secondary direction seen in both. The primary
/// pair is honored exactly; the secondary only fixes the rotation about it.
#[must_use]
pub fn triad(
    reference_primary: &Vector3<f64>,
    reference_secondary: &Vector3<f64>,
    observed_primary: &Vector3<f64>,
    observed_secondary: &Vector3<f64>,
) -> UnitQuaternion<f64> {
    let frame = |primary: &Vector3<f64>, secondary: &Vector3<f64>| {
        let t1 = primary.normalize();
        let t2 = primary.cross(secondary).normalize();
        let t3 = t1.cross(&t2);
        Matrix3::from_columns(&[t1, t2, t3])
    };
    let observed = frame(observed_primary, observed_secondary);
    let reference = frame(reference_primary, reference_secondary);
    let rotation = observed * reference.transpose();
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation))
}

/// Quaternion kinematic derivative `q̇ = ½ q ⊗ (0, ω)` for a body angular
/// velocity `ω` (rad/s).
///
/// The result is a raw (non-unit) quaternion rate suitable for numerical
/// attitude integration with periodic renormalization.
#[must_use]
pub fn kinematic_rate(
    attitude: &UnitQuaternion<f64>,
    angular_velocity: &Vector3<f64>,
) -> Quaternion<f64> {
    let omega = Quaternion::new(
        0.0,
        angular_velocity.x,
        angular_velocity.y,
        angular_velocity.z,
    );
    (attitude.quaternion() * omega) * 0.5
}

/// Spherical linear interpolation between two attitudes.
#[must_use]
pub fn slerp(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    a.slerp(b, t)
}

/// Normalized linear interpolation, cheaper than [`slerp`] and adequate for
/// small separations.
#[must_use]
pub fn lerp(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    let blended = a.lerp(b, t);
    UnitQuaternion::from_quaternion(blended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn zxz_sequence_matches_axis_chain() {
        let e = EulerAngles::new(EulerSequence::Zxz, 0.3, -0.8, 1.2);
        let direct = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.3)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -0.8)
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.2);
        assert_abs_diff_eq!(e.to_quaternion().angle_to(&direct), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn triad_recovers_a_known_rotation() {
        let truth = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_4)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.2);
        let r1 = Vector3::new(1.0, 0.2, -0.3);
        let r2 = Vector3::new(0.1, 1.0, 0.4);
        let o1 = truth * r1;
        let o2 = truth * r2;
        let estimated = triad(&r1, &r2, &o1, &o2);
        assert_abs_diff_eq!(estimated.angle_to(&truth), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn kinematic_rate_of_identity_is_half_omega() {
        let q = UnitQuaternion::identity();
        let omega = Vector3::new(0.02, -0.01, 0.005);
        let rate = kinematic_rate(&q, &omega);
        assert_abs_diff_eq!(rate.vector()[0], 0.01);
        assert_abs_diff_eq!(rate.w, 0.0);
    }

    #[test]
    fn slerp_endpoints_and_midpoint() {
        let a = UnitQuaternion::identity();
        let b = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        assert_abs_diff_eq!(slerp(&a, &b, 0.0).angle_to(&a), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(slerp(&a, &b, 1.0).angle_to(&b), 0.0, epsilon = 1e-14);
        let mid = slerp(&a, &b, 0.5);
        assert_abs_diff_eq!(mid.angle(), FRAC_PI_4, epsilon = 1e-12);
        // nlerp agrees with slerp to first order at the midpoint.
        assert!(lerp(&a, &b, 0.5).angle_to(&mid) < 1e-2);
    }
}
