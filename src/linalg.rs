//! Linear-algebra helpers layered over nalgebra.
//!
//! The numeric core works in raw `nalgebra` types: `Vector3<f64>` for
//! positions and velocities, `Vector6<f64>` for stacked states, `DMatrix`
//! for the normal equations of orbit determination. This module adds the
//! handful of operations those call sites need beyond what nalgebra exposes
//! directly, and maps factorization failures onto the crate error type.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector6};

use crate::error::{Error, Result};

/// Outer product `a bᵀ` of two 3-vectors.
#[must_use]
pub fn outer(a: &Vector3<f64>, b: &Vector3<f64>) -> Matrix3<f64> {
    a * b.transpose()
}

/// Coordinate rotation about the x-axis (Vallado's `ROT1`).
#[must_use]
pub fn rot_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, s, //
        0.0, -s, c,
    )
}

/// Coordinate rotation about the y-axis (`ROT2`).
#[must_use]
pub fn rot_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, -s, //
        0.0, 1.0, 0.0, //
        s, 0.0, c,
    )
}

/// Coordinate rotation about the z-axis (`ROT3`).
#[must_use]
pub fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, s, 0.0, //
        -s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// Line-of-sight visibility between two positions past a central body of
/// the given radius (Vallado's `SIGHT` algorithm).
///
/// Returns `true` when the segment from `r1` to `r2` does not pass through
/// the body.
#[must_use]
pub fn line_of_sight(r1: &Vector3<f64>, r2: &Vector3<f64>, radius: f64) -> bool {
    let r1_mag_sq = r1.norm_squared();
    let r2_mag_sq = r2.norm_squared();
    let r1_dot_r2 = r1.dot(r2);
    let denom = r1_mag_sq + r2_mag_sq - 2.0 * r1_dot_r2;
    if denom.abs() < f64::EPSILON {
        // Coincident endpoints; visible iff outside the body.
        return r1_mag_sq >= radius * radius;
    }
    let tau = (r1_mag_sq - r1_dot_r2) / denom;
    if !(0.0..=1.0).contains(&tau) {
        return true;
    }
    let closest_sq = (1.0 - tau) * r1_mag_sq + r1_dot_r2 * tau;
    closest_sq >= radius * radius
}

/// Stack a position and velocity into a 6-vector.
#[must_use]
pub fn compose_state(position: &Vector3<f64>, velocity: &Vector3<f64>) -> Vector6<f64> {
    Vector6::new(
        position.x, position.y, position.z, velocity.x, velocity.y, velocity.z,
    )
}

/// Position half of a stacked state.
#[must_use]
pub fn position_of(state: &Vector6<f64>) -> Vector3<f64> {
    state.fixed_rows::<3>(0).into()
}

/// Velocity half of a stacked state.
#[must_use]
pub fn velocity_of(state: &Vector6<f64>) -> Vector3<f64> {
    state.fixed_rows::<3>(3).into()
}

/// Invert a square matrix, failing on singularity.
pub fn inverse(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if matrix.nrows() != matrix.ncols() {
        return Err(Error::DimensionMismatch {
            expected: matrix.nrows(),
            actual: matrix.ncols(),
        });
    }
    matrix
        .clone()
        .try_inverse()
        .ok_or(Error::SingularMatrix { operation: "inverse" })
}

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
pub fn cholesky_lower(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    matrix
        .clone()
        .cholesky()
        .map(|c| c.l())
        .ok_or(Error::SingularMatrix { operation: "cholesky" })
}

/// Solve `A x = b` by LU decomposition with partial pivoting.
pub fn solve(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>> {
    if matrix.nrows() != rhs.len() {
        return Err(Error::DimensionMismatch {
            expected: matrix.nrows(),
            actual: rhs.len(),
        });
    }
    matrix
        .clone()
        .lu()
        .solve(rhs)
        .ok_or(Error::SingularMatrix { operation: "lu solve" })
}

/// Moore–Penrose pseudoinverse via singular value decomposition.
pub fn pseudoinverse(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    matrix
        .clone()
        .pseudo_inverse(1e-12)
        .map_err(|_| Error::SingularMatrix { operation: "pseudoinverse" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn rotations_are_orthonormal() {
        for rot in [rot_x(0.3), rot_y(-1.1), rot_z(2.4)] {
            let should_be_identity = rot * rot.transpose();
            assert_abs_diff_eq!(
                (should_be_identity - Matrix3::identity()).norm(),
                0.0,
                epsilon = 1e-14
            );
        }
    }

    #[test]
    fn rot_z_quarter_turn_maps_x_to_minus_y() {
        // Passive convention: coordinates of a fixed vector in the rotated
        // frame.
        let v = rot_z(FRAC_PI_2) * Vector3::x();
        assert_abs_diff_eq!((v - (-Vector3::y())).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn outer_product_has_rank_one_structure() {
        let m = outer(&Vector3::new(1.0, 2.0, 3.0), &Vector3::new(4.0, 5.0, 6.0));
        assert_abs_diff_eq!(m[(1, 2)], 12.0);
        assert_abs_diff_eq!(m[(2, 0)], 12.0);
    }

    #[test]
    fn earth_blocks_antipodal_satellites() {
        let r1 = Vector3::new(7000.0, 0.0, 0.0);
        let r2 = Vector3::new(-7000.0, 0.0, 0.0);
        assert!(!line_of_sight(&r1, &r2, 6378.0));

        let r3 = Vector3::new(0.0, 42_164.0, 0.0);
        assert!(line_of_sight(&r1, &r3, 6378.0));
    }

    #[test]
    fn solve_recovers_known_solution() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let x_true = DVector::from_vec(vec![1.0, -2.0]);
        let b = &a * &x_true;
        let x = solve(&a, &b).unwrap();
        assert_abs_diff_eq!((x - x_true).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_matrix_is_reported() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(matches!(
            inverse(&a),
            Err(Error::SingularMatrix { .. })
        ));
    }

    #[test]
    fn pseudoinverse_of_tall_matrix_is_left_inverse() {
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let pinv = pseudoinverse(&a).unwrap();
        let should_be_identity = &pinv * &a;
        assert_abs_diff_eq!(
            (should_be_identity - DMatrix::identity(2, 2)).norm(),
            0.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn cholesky_factor_reconstructs_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        let l = cholesky_lower(&m).unwrap();
        assert_abs_diff_eq!((&l * l.transpose() - m).norm(), 0.0, epsilon = 1e-12);
    }
}
