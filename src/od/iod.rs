//! Initial orbit determination from minimal observation sets.

use log::debug;
use nalgebra::{Matrix2, Vector2, Vector3};

use crate::constants::MU_EARTH;
use crate::error::{Error, Result};
use crate::frames::Frame;
use crate::observations::OpticalObservation;
use crate::od::lambert::{lambert, LambertBranch};
use crate::propagators::{KeplerPropagator, Propagator};
use crate::states::StateVector;
use crate::time::Epoch;

/// Coplanarity limit for Gibbs, degrees.
const COPLANARITY_LIMIT_DEG: f64 = 5.0;

/// Gibbs initial orbit determination: the velocity at the middle of three
/// position fixes on a common orbit (Vallado algorithm 54).
///
/// Suited to fixes separated by tens of degrees; for closely spaced fixes
/// use [`herrick_gibbs`].
///
/// # Errors
///
/// [`Error::NotCoplanar`] when the three positions deviate more than 5°
/// from a common plane.
pub fn gibbs(
    epochs: [Epoch; 3],
    positions: [Vector3<f64>; 3],
) -> Result<StateVector> {
    let [r1, r2, r3] = positions;
    let z12 = r1.cross(&r2);
    let z23 = r2.cross(&r3);
    let z31 = r3.cross(&r1);

    // Angle between r1 and the plane of r2/r3.
    let deviation =
        (z23.dot(&r1) / (z23.norm() * r1.norm())).clamp(-1.0, 1.0).asin().abs();
    if deviation.to_degrees() > COPLANARITY_LIMIT_DEG {
        return Err(Error::NotCoplanar {
            deviation_deg: deviation.to_degrees(),
            limit_deg: COPLANARITY_LIMIT_DEG,
        });
    }

    let n = r1.norm() * z23 + r2.norm() * z31 + r3.norm() * z12;
    let d = z12 + z23 + z31;
    let s = (r2.norm() - r3.norm()) * r1
        + (r3.norm() - r1.norm()) * r2
        + (r1.norm() - r2.norm()) * r3;
    let b = d.cross(&r2);
    let lg = (MU_EARTH / (n.norm() * d.norm())).sqrt();
    let v2 = lg / r2.norm() * b + lg * s;

    Ok(StateVector::j2000(epochs[1], r2, v2))
}

/// Herrick–Gibbs initial orbit determination: a Taylor-series velocity at
/// the middle of three closely spaced position fixes (Vallado algorithm
/// 55).
///
/// # Errors
///
/// [`Error::NotCoplanar`] under the same 5° test as [`gibbs`].
pub fn herrick_gibbs(
    epochs: [Epoch; 3],
    positions: [Vector3<f64>; 3],
) -> Result<StateVector> {
    let [r1, r2, r3] = positions;
    let z23 = r2.cross(&r3);
    let deviation =
        (z23.dot(&r1) / (z23.norm() * r1.norm())).clamp(-1.0, 1.0).asin().abs();
    if deviation.to_degrees() > COPLANARITY_LIMIT_DEG {
        return Err(Error::NotCoplanar {
            deviation_deg: deviation.to_degrees(),
            limit_deg: COPLANARITY_LIMIT_DEG,
        });
    }

    let dt21 = epochs[1].difference(&epochs[0]);
    let dt32 = epochs[2].difference(&epochs[1]);
    let dt31 = epochs[2].difference(&epochs[0]);

    let v2 = -dt32 * (1.0 / (dt21 * dt31) + MU_EARTH / (12.0 * r1.norm().powi(3))) * r1
        + (dt32 - dt21)
            * (1.0 / (dt21 * dt32) + MU_EARTH / (12.0 * r2.norm().powi(3)))
            * r2
        + dt21 * (1.0 / (dt32 * dt31) + MU_EARTH / (12.0 * r3.norm().powi(3))) * r3;

    Ok(StateVector::j2000(epochs[1], r2, v2))
}

/// Configuration for [`gooding`] angles-only initial orbit determination.
#[derive(Clone, Copy, Debug)]
pub struct GoodingConfig {
    /// Range guess at the first observation, km.
    pub range_first: f64,
    /// Range guess at the last observation, km.
    pub range_last: f64,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Convergence tolerance on the middle-observation miss, km.
    pub tolerance: f64,
    /// Lambert branch for the connecting arc.
    pub branch: LambertBranch,
    /// Complete revolutions on the connecting arc.
    pub revolutions: usize,
}

impl Default for GoodingConfig {
    fn default() -> Self {
        Self {
            range_first: 12_000.0,
            range_last: 12_000.0,
            max_iterations: 60,
            tolerance: 1e-6,
            branch: LambertBranch::Short,
            revolutions: 0,
        }
    }
}

/// Line-of-sight unit vector of an optical observation, J2000.
fn line_of_sight(observation: &OpticalObservation) -> Vector3<f64> {
    Vector3::new(
        observation.declination.cos() * observation.right_ascension.cos(),
        observation.declination.cos() * observation.right_ascension.sin(),
        observation.declination.sin(),
    )
}

/// Gooding angles-only initial orbit determination.
///
/// Iterates on the ranges at the first and last of three optical
/// observations: candidate end positions define a Lambert arc, and the
/// miss distance of the middle observation's line of sight steers a
/// Newton update with numerical partials. Returns the J2000 state at the
/// middle epoch.
///
/// # Errors
///
/// [`Error::LambertNoConvergence`] when the iteration budget is exhausted;
/// propagates Lambert failures for unreachable geometries.
pub fn gooding(
    observations: &[OpticalObservation; 3],
    config: &GoodingConfig,
) -> Result<StateVector> {
    let sites: Vec<StateVector> = observations
        .iter()
        .map(|o| o.site.in_frame(Frame::J2000))
        .collect();
    let los: Vec<Vector3<f64>> = observations.iter().map(line_of_sight).collect();
    let middle_epoch = observations[1].epoch;
    let tof = observations[2].epoch.difference(&observations[0].epoch);

    // Middle-observation miss (cross-LOS components) for a range pair.
    let miss = |ranges: &Vector2<f64>| -> Result<(Vector2<f64>, StateVector)> {
        let p1 = sites[0].position + ranges[0] * los[0];
        let p3 = sites[2].position + ranges[1] * los[2];
        let (v1, _) = lambert(
            &p1,
            &p3,
            tof,
            MU_EARTH,
            config.revolutions,
            config.branch,
        )?;
        let mut arc =
            KeplerPropagator::from_state(&StateVector::j2000(observations[0].epoch, p1, v1))?;
        let at_middle = arc.propagate(&middle_epoch)?;
        let slant = at_middle.position - sites[1].position;
        // Miss components in a fixed basis orthogonal to the line of
        // sight.
        let reference = if los[1].x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
        let u = los[1].cross(&reference).normalize();
        let w = los[1].cross(&u);
        let perpendicular = slant - slant.dot(&los[1]) * los[1];
        Ok((
            Vector2::new(perpendicular.dot(&u), perpendicular.dot(&w)),
            at_middle,
        ))
    };

    let mut ranges = Vector2::new(config.range_first, config.range_last);
    for iteration in 0..config.max_iterations {
        let (residual, at_middle) = miss(&ranges)?;
        debug!(
            "gooding iteration {iteration}: ranges ({:.3}, {:.3}) km, miss {:.6} km",
            ranges[0],
            ranges[1],
            residual.norm()
        );
        if residual.norm() < config.tolerance {
            return Ok(at_middle);
        }

        // Numerical Jacobian of the miss with respect to the two ranges.
        let step = (1e-5 * ranges.norm()).max(1e-4);
        let mut jacobian = Matrix2::zeros();
        for column in 0..2 {
            let mut perturbed = ranges;
            perturbed[column] += step;
            let (high, _) = miss(&perturbed)?;
            perturbed[column] -= 2.0 * step;
            let (low, _) = miss(&perturbed)?;
            jacobian.set_column(column, &((high - low) / (2.0 * step)));
        }
        let update = jacobian
            .try_inverse()
            .ok_or(Error::SingularMatrix { operation: "gooding update" })?
            * residual;
        ranges -= update;
        if !(ranges[0].is_finite() && ranges[1].is_finite()) || ranges.min() < 0.0 {
            return Err(Error::LambertNoConvergence { iterations: iteration + 1 });
        }
    }
    Err(Error::LambertNoConvergence { iterations: config.max_iterations })
}
