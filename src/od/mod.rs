//! Orbit determination: batch differential correction and initial orbit
//! determination.

mod batch;
mod iod;
mod lambert;

pub use batch::{BatchLeastSquares, GaussNewtonSolver, OdSolution};
pub use iod::{gibbs, gooding, herrick_gibbs, GoodingConfig};
pub use lambert::{lambert, LambertBranch};
