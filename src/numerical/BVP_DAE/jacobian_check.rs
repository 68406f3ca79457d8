//! Central-difference verification of the analytic derivative callbacks of a problem.
//!
//! Dynamics and algebraic callbacks are pointwise in time, so variable i is perturbed at
//! all nodes at once and column j of the difference quotient belongs to node j.
use crate::numerical::BVP_DAE::BVP_DAE_errors::ModelError;
use crate::numerical::BVP_DAE::BVP_DAE_traits::{BvpDaeProblem, ProblemContract};
use crate::numerical::BVP_DAE::trajectory::Trajectory;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, PartialEq)]
pub struct JacobianDiscrepancy {
    pub callback: &'static str,
    /// grid node, 0 for boundary blocks
    pub node: usize,
    pub row: usize,
    pub col: usize,
    pub analytic: f64,
    pub numeric: f64,
    pub rel_error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JacobianCheckReport {
    pub n_checked: usize,
    pub max_rel_error: f64,
    pub worst: Option<JacobianDiscrepancy>,
}

impl JacobianCheckReport {
    fn new() -> Self {
        JacobianCheckReport {
            n_checked: 0,
            max_rel_error: 0.0,
            worst: None,
        }
    }
    fn record(&mut self, callback: &'static str, node: usize, row: usize, col: usize, analytic: f64, numeric: f64) {
        self.n_checked += 1;
        let rel_error = (analytic - numeric).abs() / analytic.abs().max(numeric.abs()).max(1.0);
        if !(rel_error <= self.max_rel_error) {
            self.max_rel_error = rel_error;
            self.worst = Some(JacobianDiscrepancy {
                callback,
                node,
                row,
                col,
                analytic,
                numeric,
                rel_error,
            });
        }
    }
    pub fn passed(&self, tol: f64) -> bool {
        self.max_rel_error <= tol
    }
}

enum Var {
    Xp(usize),
    Z(usize),
}

fn perturbed(traj: &Trajectory, var: &Var, delta: f64) -> Trajectory {
    let mut t = traj.clone();
    match *var {
        Var::Xp(i) => t.xp_mut().row_mut(i).add_scalar_mut(delta),
        Var::Z(i) => t.z_mut().row_mut(i).add_scalar_mut(delta),
    }
    t
}

/// step for a central difference around x
fn fd_step(x: f64, step: f64) -> f64 {
    step * x.abs().max(1.0)
}

/// Analytic derivative of a pointwise callback with respect to one variable group.
struct PointwiseBlocks<'a> {
    callback: &'static str,
    var_of: fn(usize) -> Var,
    n_var: usize,
    /// one (rows, n_var) block per node
    blocks: &'a [DMatrix<f64>],
}

impl<'a> PointwiseBlocks<'a> {
    fn xp(callback: &'static str, n_x: usize, blocks: &'a [DMatrix<f64>]) -> Self {
        PointwiseBlocks { callback, var_of: Var::Xp, n_var: n_x, blocks }
    }
    fn z(callback: &'static str, n_z: usize, blocks: &'a [DMatrix<f64>]) -> Self {
        PointwiseBlocks { callback, var_of: Var::Z, n_var: n_z, blocks }
    }
}

/// Pointwise callback: `eval` is (rows, N).
fn check_pointwise<F>(report: &mut JacobianCheckReport, traj: &Trajectory, jac: PointwiseBlocks, step: f64, eval: F)
where
    F: Fn(&Trajectory) -> DMatrix<f64>,
{
    for k in 0..jac.n_var {
        let var = (jac.var_of)(k);
        // one step for all nodes: the largest magnitude of that variable sets the scale
        let scale = match var {
            Var::Xp(i) => traj.xp().row(i).amax(),
            Var::Z(i) => traj.z().row(i).amax(),
        };
        let h = fd_step(scale, step);
        let plus = eval(&perturbed(traj, &var, h));
        let minus = eval(&perturbed(traj, &var, -h));
        let quotient = (plus - minus) / (2.0 * h);
        for (j, block) in jac.blocks.iter().enumerate() {
            for r in 0..block.nrows() {
                report.record(jac.callback, j, r, k, block[(r, k)], quotient[(r, j)]);
            }
        }
    }
}

fn check_boundary_block<F>(
    report: &mut JacobianCheckReport,
    callback: &'static str,
    point: &DVector<f64>,
    block: &DMatrix<f64>,
    step: f64,
    eval: F,
) where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    for k in 0..point.len() {
        let h = fd_step(point[k], step);
        let mut plus = point.clone();
        plus[k] += h;
        let mut minus = point.clone();
        minus[k] -= h;
        let quotient = (eval(&plus) - eval(&minus)) / (2.0 * h);
        for r in 0..block.nrows() {
            report.record(callback, 0, r, k, block[(r, k)], quotient[r]);
        }
    }
}

/// Compares every analytic Jacobian block at `traj` with central differences of the
/// residual callbacks. `traj` must lie strictly inside the barrier domain.
pub fn check_jacobians<P: BvpDaeProblem>(
    contract: &ProblemContract<P>,
    traj: &Trajectory,
    step: f64,
) -> Result<JacobianCheckReport, ModelError> {
    let (n_x, n_z) = (contract.n_x(), contract.n_z());
    let mut report = JacobianCheckReport::new();
    for (name, values) in [
        ("residual_dynamics", contract.residual_dynamics(traj)),
        ("residual_algebraic", contract.residual_algebraic(traj)),
    ] {
        for (j, col) in values.column_iter().enumerate() {
            if let Some(i) = col.iter().position(|v| !v.is_finite()) {
                return Err(ModelError::NonFinite { callback: name, row: i, col: j });
            }
        }
    }

    let (fx, fz) = contract.jac_dynamics(traj);
    let dynamics = |t: &Trajectory| contract.residual_dynamics(t);
    check_pointwise(&mut report, traj, PointwiseBlocks::xp("jac_dynamics (wrt xp)", n_x, &fx), step, dynamics);
    check_pointwise(&mut report, traj, PointwiseBlocks::z("jac_dynamics (wrt z)", n_z, &fz), step, dynamics);

    let (gx, gz) = contract.jac_algebraic(traj);
    let algebraic = |t: &Trajectory| contract.residual_algebraic(t);
    check_pointwise(&mut report, traj, PointwiseBlocks::xp("jac_algebraic (wrt xp)", n_x, &gx), step, algebraic);
    check_pointwise(&mut report, traj, PointwiseBlocks::z("jac_algebraic (wrt z)", n_z, &gz), step, algebraic);

    let eps = contract.continuation_parameter();
    let problem = contract.problem();
    let (xp0, xp_end, z0, z_end) = (traj.xp0(), traj.xp_end(), traj.z0(), traj.z_end());
    let bcj = contract.jac_boundary(traj);
    check_boundary_block(&mut report, "jac_boundary (wrt xp0)", &xp0, &bcj.d_xp0, step, |v| {
        problem.residual_boundary(v, &xp_end, &z0, &z_end, eps)
    });
    check_boundary_block(&mut report, "jac_boundary (wrt xpT)", &xp_end, &bcj.d_xp_end, step, |v| {
        problem.residual_boundary(&xp0, v, &z0, &z_end, eps)
    });
    check_boundary_block(&mut report, "jac_boundary (wrt z0)", &z0, &bcj.d_z0, step, |v| {
        problem.residual_boundary(&xp0, &xp_end, v, &z_end, eps)
    });
    check_boundary_block(&mut report, "jac_boundary (wrt zT)", &z_end, &bcj.d_z_end, step, |v| {
        problem.residual_boundary(&xp0, &xp_end, &z0, v, eps)
    });

    match &report.worst {
        Some(w) if w.rel_error > 1e-5 => warn!(
            "{}: largest discrepancy {:.3e} at node {}, entry ({}, {}): analytic {:.6e}, numeric {:.6e}",
            w.callback, w.rel_error, w.node, w.row, w.col, w.analytic, w.numeric
        ),
        _ => info!(
            "{} Jacobian entries checked, max relative error {:.3e}",
            report.n_checked, report.max_rel_error
        ),
    }
    Ok(report)
}
