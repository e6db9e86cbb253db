//! Orbital state propagation, reference frames, uncertainty, and orbit
//! determination for near-Earth satellites.
//!
//! The crate covers the numerical core of satellite flight dynamics:
//!
//! - [`states`] / [`elements`]: Cartesian states with runtime frame tags,
//!   classical and equinoctial orbital elements, and the conversions
//!   between them
//! - [`frames`]: GCRF / J2000 / TEME / ITRF transformations through the
//!   classical IAU 1976/1980 reduction with EOP corrections
//! - [`propagators`]: analytic two-body, fixed-step RK4, adaptive
//!   embedded Runge–Kutta, and SGP4 behind one [`propagators::Propagator`]
//!   contract with checkpoints and maneuver support
//! - [`interpolators`]: Verlet-blend, cubic Hermite, Lagrange, and
//!   compressed Chebyshev ephemeris caches
//! - [`observations`] / [`covariance`] / [`od`]: optical, radar, and
//!   state measurements, sigma-point uncertainty propagation, batch
//!   least-squares and angles-only initial orbit determination
//!
//! # Units
//!
//! Kilometres, kilometres per second, radians, seconds, kilograms, m²,
//! kg/m². Angle-valued accessors return radians unless their name says
//! otherwise; user-facing constructors also accept `uom` quantities where
//! that reads better.
//!
//! # Example
//!
//! Propagate a state and read it back in another frame:
//!
//! ```
//! use nalgebra::Vector3;
//! use sidereal::prelude::*;
//!
//! let epoch = Epoch::from_posix_seconds(1_483_767_060.243);
//! let state = StateVector::j2000(
//!     epoch,
//!     Vector3::new(-5737.369_776, -3423.651_756, 364.099_770),
//!     Vector3::new(4.378_112_704, -6.646_623_519, 1.170_571_889),
//! );
//!
//! let mut propagator = KeplerPropagator::from_state(&state)?;
//! let later = propagator.propagate(&epoch.roll(3600.0))?;
//! let fixed = later.in_frame(Frame::Itrf);
//! assert!(fixed.radius() > 6500.0);
//! # Ok::<(), sidereal::Error>(())
//! ```

pub mod attitude;
pub mod constants;
pub mod covariance;
pub mod elements;
pub mod eop;
mod error;
pub mod force;
pub mod frames;
pub mod geodetic;
pub mod gravity;
mod iau1980;
pub mod interpolators;
pub mod linalg;
pub mod maneuvers;
pub mod numerics;
pub mod observations;
pub mod od;
pub mod propagators;
pub mod relative;
pub mod sgp4;
pub mod smoothing;
pub mod states;
pub mod thirdbody;
pub mod time;
pub mod tle;

pub use error::{Error, Result, Sgp4Error};

/// The common imports for working with the crate.
pub mod prelude {
    pub use crate::covariance::{CovarianceFrame, SigmaPointSample, StateCovariance};
    pub use crate::elements::{ClassicalElements, EquinoctialElements};
    pub use crate::eop::{EopProvider, EopRecord, FixedEop};
    pub use crate::error::{Error, Result};
    pub use crate::force::{AtmosphereModel, ExponentialAtmosphere, ForceModel};
    pub use crate::frames::Frame;
    pub use crate::geodetic::Geodetic;
    pub use crate::interpolators::{
        ChebyshevInterpolator, CubicSplineInterpolator, LagrangeInterpolator,
        StateInterpolator, VerletBlendInterpolator,
    };
    pub use crate::maneuvers::Thrust;
    pub use crate::observations::{
        Observation, OpticalObservation, PropagatorPairs, RadarObservation,
        StateObservation,
    };
    pub use crate::od::{
        gibbs, gooding, herrick_gibbs, lambert, BatchLeastSquares, GaussNewtonSolver,
        GoodingConfig, LambertBranch,
    };
    pub use crate::propagators::{
        DormandPrince54Propagator, KeplerPropagator, Propagator, Rk4Propagator,
        RungeKutta89Propagator, Sgp4Propagator,
    };
    pub use crate::relative::{RelativeKind, RelativeState, Waypoint};
    pub use crate::states::StateVector;
    pub use crate::time::Epoch;
    pub use crate::tle::Tle;
}
