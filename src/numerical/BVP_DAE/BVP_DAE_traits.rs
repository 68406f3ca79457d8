#![allow(non_camel_case_types)]
/*
The problem contract. Every optimal-control problem (after Pontryagin's principle has been applied by hand)
hands the solver seven pure functions:
 - residual_dynamics    d(xp)/dt = f(t, xp, z; eps)                     -> (n_x, N)
 - jac_dynamics         (df/dxp, df/dz) node by node                    -> N x (n_x, n_x), N x (n_x, n_z)
 - residual_algebraic   g(t, xp, z; eps) = 0  (stationarity of the Hamiltonian) -> (n_z, N)
 - jac_algebraic        (dg/dxp, dg/dz) node by node                    -> N x (n_z, n_x), N x (n_z, n_z)
 - residual_boundary    bc(xp(0), xp(T), z(0), z(T); eps) = 0           -> (n_x)
 - jac_boundary         four dense blocks
 - initialize           first guess for the continuation
The barrier weight eps is an explicit argument of every callback. ProblemContract keeps the current value
and is only borrowed immutably by the Newton solver, so eps cannot change in the middle of a solve.
*/
use crate::numerical::BVP_DAE::trajectory::Trajectory;
use enum_dispatch::enum_dispatch;
use nalgebra::{DMatrix, DVector};

/// Jacobian of the boundary conditions with respect to xp(0), xp(T), z(0), z(T).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryJacobian {
    pub d_xp0: DMatrix<f64>,
    pub d_xp_end: DMatrix<f64>,
    pub d_z0: DMatrix<f64>,
    pub d_z_end: DMatrix<f64>,
}

impl BoundaryJacobian {
    pub fn zeros(n_x: usize, n_z: usize) -> Self {
        BoundaryJacobian {
            d_xp0: DMatrix::zeros(n_x, n_x),
            d_xp_end: DMatrix::zeros(n_x, n_x),
            d_z0: DMatrix::zeros(n_x, n_z),
            d_z_end: DMatrix::zeros(n_x, n_z),
        }
    }
}

/// Per-node Jacobian blocks: `wrt_xp[j]` and `wrt_z[j]` belong to grid node j.
pub type NodeJacobians = (Vec<DMatrix<f64>>, Vec<DMatrix<f64>>);

#[enum_dispatch]
pub trait BvpDaeProblem {
    /// number of states + adjoints
    fn n_x(&self) -> usize;
    /// number of algebraic variables (controls, multipliers)
    fn n_z(&self) -> usize;
    fn residual_dynamics(&self, t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> DMatrix<f64>;
    fn jac_dynamics(&self, t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> NodeJacobians;
    fn residual_algebraic(&self, t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> DMatrix<f64>;
    fn jac_algebraic(&self, t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> NodeJacobians;
    fn residual_boundary(
        &self,
        xp0: &DVector<f64>,
        xp_end: &DVector<f64>,
        z0: &DVector<f64>,
        z_end: &DVector<f64>,
        eps: f64,
    ) -> DVector<f64>;
    fn jac_boundary(
        &self,
        xp0: &DVector<f64>,
        xp_end: &DVector<f64>,
        z0: &DVector<f64>,
        z_end: &DVector<f64>,
        eps: f64,
    ) -> BoundaryJacobian;
    /// initial guess for the first continuation step
    fn initialize(&self) -> Trajectory;
    fn name(&self) -> String {
        "unnamed problem".to_string()
    }
}

/// A problem together with the current value of the continuation parameter.
#[derive(Debug, Clone)]
pub struct ProblemContract<P: BvpDaeProblem> {
    problem: P,
    eps: f64,
}

impl<P: BvpDaeProblem> ProblemContract<P> {
    pub fn new(problem: P, eps: f64) -> Self {
        ProblemContract { problem, eps }
    }
    pub fn set_continuation_parameter(&mut self, eps: f64) {
        self.eps = eps;
    }
    pub fn continuation_parameter(&self) -> f64 {
        self.eps
    }
    pub fn problem(&self) -> &P {
        &self.problem
    }
    pub fn into_problem(self) -> P {
        self.problem
    }
    pub fn n_x(&self) -> usize {
        self.problem.n_x()
    }
    pub fn n_z(&self) -> usize {
        self.problem.n_z()
    }
    pub fn initialize(&self) -> Trajectory {
        self.problem.initialize()
    }
    pub fn residual_dynamics(&self, traj: &Trajectory) -> DMatrix<f64> {
        self.problem
            .residual_dynamics(traj.time(), traj.xp(), traj.z(), self.eps)
    }
    pub fn jac_dynamics(&self, traj: &Trajectory) -> NodeJacobians {
        self.problem.jac_dynamics(traj.time(), traj.xp(), traj.z(), self.eps)
    }
    pub fn residual_algebraic(&self, traj: &Trajectory) -> DMatrix<f64> {
        self.problem
            .residual_algebraic(traj.time(), traj.xp(), traj.z(), self.eps)
    }
    pub fn jac_algebraic(&self, traj: &Trajectory) -> NodeJacobians {
        self.problem.jac_algebraic(traj.time(), traj.xp(), traj.z(), self.eps)
    }
    pub fn residual_boundary(&self, traj: &Trajectory) -> DVector<f64> {
        self.problem.residual_boundary(
            &traj.xp0(),
            &traj.xp_end(),
            &traj.z0(),
            &traj.z_end(),
            self.eps,
        )
    }
    pub fn jac_boundary(&self, traj: &Trajectory) -> BoundaryJacobian {
        self.problem.jac_boundary(
            &traj.xp0(),
            &traj.xp_end(),
            &traj.z0(),
            &traj.z_end(),
            self.eps,
        )
    }
}
