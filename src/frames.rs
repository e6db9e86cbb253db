//! Reference frames and the conversions between them.
//!
//! Frames are a runtime tag ([`Frame`]); conversions are free functions
//! dispatching on `(from, to)` pairs through the mean-of-J2000 hub. The
//! Earth-fixed chain is the classical GMST-based reduction: IAU 1976
//! precession, IAU 1980 nutation, sidereal rotation by GMST plus the
//! equation of the equinoxes, then polar motion from the installed EOP
//! provider.
//!
//! With the zero EOP record, GCRF coincides with J2000 and polar motion
//! vanishes; the reduction then degrades gracefully to the classic FK5
//! chain.

use nalgebra::{Matrix3, Vector3};

use crate::constants::{EARTH_ROTATION_RATE, SECONDS_PER_DAY};
use crate::eop::{self, EopRecord};
use crate::iau1980::{self, Nutation};
use crate::linalg::{rot_x, rot_y, rot_z};
use crate::time::Epoch;

/// A reference frame tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Frame {
    /// Mean equator and equinox of J2000.0.
    J2000,
    /// Geocentric Celestial Reference Frame (J2000 plus the EOP-derived
    /// celestial-pole corrections).
    Gcrf,
    /// True equator, mean equinox; the SGP4 output frame.
    Teme,
    /// International Terrestrial Reference Frame; Earth-fixed.
    Itrf,
}

impl Frame {
    /// Whether states in this frame are inertial (classical elements are
    /// only defined for inertial frames).
    #[must_use]
    pub fn is_inertial(&self) -> bool {
        !matches!(self, Frame::Itrf)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Frame::J2000 => "J2000",
            Frame::Gcrf => "GCRF",
            Frame::Teme => "TEME",
            Frame::Itrf => "ITRF",
        };
        f.write_str(name)
    }
}

/// Precession matrix, mean J2000 to mean of date.
fn precession_matrix(t_tt: f64) -> Matrix3<f64> {
    let (zeta, theta, z) = iau1980::precession_angles(t_tt);
    rot_z(-z) * rot_y(theta) * rot_z(-zeta)
}

/// Nutation matrix, mean of date to true of date.
fn nutation_matrix(n: &Nutation) -> Matrix3<f64> {
    rot_x(-n.true_obliquity()) * rot_z(-n.dpsi) * rot_x(n.mean_obliquity)
}

/// Nutation with the EOP celestial-pole corrections folded in.
fn corrected_nutation(n: &Nutation, eop: &EopRecord) -> Nutation {
    Nutation {
        dpsi: n.dpsi + eop.dpsi,
        deps: n.deps + eop.deps,
        mean_obliquity: n.mean_obliquity,
    }
}

/// Everything needed for one epoch's reductions, computed once per call.
struct ReductionAngles {
    /// J2000 → true-of-date, uncorrected nutation.
    j2000_to_tod: Matrix3<f64>,
    /// J2000 → true-of-date, EOP-corrected nutation (the GCRF chain).
    gcrf_to_tod: Matrix3<f64>,
    /// Greenwich apparent sidereal time.
    gast: f64,
    /// Equation of the equinoxes.
    equation_of_equinoxes: f64,
    /// Polar-motion matrix, pseudo-Earth-fixed → ITRF.
    polar_motion: Matrix3<f64>,
    /// Earth rotation rate adjusted for excess length of day, rad/s.
    omega_earth: f64,
}

impl ReductionAngles {
    fn at(epoch: &Epoch) -> Self {
        let t_tt = epoch.julian_centuries_tt();
        let eop = eop::provider().eop_at(epoch);

        let precession = precession_matrix(t_tt);
        let nutation = iau1980::nutation(t_tt);
        let corrected = corrected_nutation(&nutation, &eop);

        let equation_of_equinoxes = iau1980::equation_of_equinoxes(t_tt, &nutation);
        let gast = epoch.gmst() + equation_of_equinoxes;

        Self {
            j2000_to_tod: nutation_matrix(&nutation) * precession,
            gcrf_to_tod: nutation_matrix(&corrected) * precession,
            gast,
            equation_of_equinoxes,
            polar_motion: rot_x(eop.yp) * rot_y(eop.xp),
            omega_earth: EARTH_ROTATION_RATE * (1.0 - eop.lod / SECONDS_PER_DAY),
        }
    }
}

/// Convert a position/velocity pair between any two frames at an epoch.
#[must_use]
pub fn transform(
    from: Frame,
    to: Frame,
    epoch: &Epoch,
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    if from == to {
        return (*position, *velocity);
    }
    let angles = ReductionAngles::at(epoch);
    let (r, v) = to_j2000(from, &angles, position, velocity);
    from_j2000(to, &angles, &r, &v)
}

fn from_j2000(
    to: Frame,
    angles: &ReductionAngles,
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    match to {
        Frame::J2000 => (*position, *velocity),
        Frame::Gcrf => {
            let bias = angles.gcrf_to_tod.transpose() * angles.j2000_to_tod;
            (bias * position, bias * velocity)
        }
        Frame::Teme => {
            let teme_from_tod = rot_z(angles.equation_of_equinoxes);
            let m = teme_from_tod * angles.j2000_to_tod;
            (m * position, m * velocity)
        }
        Frame::Itrf => {
            let r_tod = angles.j2000_to_tod * position;
            let v_tod = angles.j2000_to_tod * velocity;
            let sidereal = rot_z(angles.gast);
            let r_pef = sidereal * r_tod;
            let omega = Vector3::new(0.0, 0.0, angles.omega_earth);
            let v_pef = sidereal * v_tod - omega.cross(&r_pef);
            (angles.polar_motion * r_pef, angles.polar_motion * v_pef)
        }
    }
}

fn to_j2000(
    from: Frame,
    angles: &ReductionAngles,
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    match from {
        Frame::J2000 => (*position, *velocity),
        Frame::Gcrf => {
            let bias = angles.j2000_to_tod.transpose() * angles.gcrf_to_tod;
            (bias * position, bias * velocity)
        }
        Frame::Teme => {
            let tod_from_teme = rot_z(-angles.equation_of_equinoxes);
            let m = angles.j2000_to_tod.transpose() * tod_from_teme;
            (m * position, m * velocity)
        }
        Frame::Itrf => {
            let r_pef = angles.polar_motion.transpose() * position;
            let v_pef = angles.polar_motion.transpose() * velocity;
            let omega = Vector3::new(0.0, 0.0, angles.omega_earth);
            let sidereal_inverse = rot_z(-angles.gast);
            let r_tod = sidereal_inverse * r_pef;
            let v_tod = sidereal_inverse * (v_pef + omega.cross(&r_pef));
            (
                angles.j2000_to_tod.transpose() * r_tod,
                angles.j2000_to_tod.transpose() * v_tod,
            )
        }
    }
}
