//! Reference optimal-control problems shipped with the solver.
use crate::numerical::BVP_DAE::BVP_DAE_traits::{BoundaryJacobian, BvpDaeProblem, NodeJacobians};
use crate::numerical::BVP_DAE::trajectory::Trajectory;
use enum_dispatch::enum_dispatch;
use nalgebra::{DMatrix, DVector};
use strum_macros::{Display, EnumIter, EnumString};

/// double integrator with a control box
pub mod double_integrator;
/// minimum-time river crossing around an elliptic obstacle
pub mod zermelo;

pub use double_integrator::DoubleIntegrator;
pub use zermelo::Zermelo;

#[enum_dispatch(BvpDaeProblem)]
#[derive(Debug, Clone, PartialEq, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OCProblemEnum {
    DoubleIntegrator,
    Zermelo,
}
