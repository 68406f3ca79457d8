//! Minimum-energy double integrator with a control box.
//!
//! min ∫ u²/2 dt, x0' = x1, x1' = u, x(0) = (0, 0), x(T) = (1, 0), lower < u < upper.
//! With the barrier eps * (log_pen(u - upper) + log_pen(lower - u)) in the Hamiltonian
//!   H = u²/2 + barrier(u) + p0 x1 + p1 u
//! the optimality system has xp = (x0, x1, p0, p1), z = (u) and
//!   p0' = 0, p1' = -p0, u + barrier'(u) + p1 = 0.
//! On [0, 1] and without an active box the solution is u = 6 - 12t.
use crate::numerical::BVP_DAE::BVP_DAE_errors::BvpDaeError;
use crate::numerical::BVP_DAE::BVP_DAE_traits::{BoundaryJacobian, BvpDaeProblem, NodeJacobians};
use crate::numerical::BVP_DAE::penalty::BoxBarrier;
use crate::numerical::BVP_DAE::trajectory::{Trajectory, linspace};
use nalgebra::{DMatrix, DVector};

/// Fields are public for struct-update construction; `initialize` requires `t_end > 0`
/// and `lower < upper`, `DoubleIntegrator::new` checks both.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleIntegrator {
    pub t_end: f64,
    /// grid size of the initial guess, raised to 2 if smaller
    pub n_nodes: usize,
    pub x_end: (f64, f64),
    pub control_box: BoxBarrier,
}

impl Default for DoubleIntegrator {
    fn default() -> Self {
        DoubleIntegrator {
            t_end: 1.0,
            n_nodes: 101,
            x_end: (1.0, 0.0),
            control_box: BoxBarrier::new(-8.0, 8.0),
        }
    }
}

impl DoubleIntegrator {
    pub fn new(t_end: f64, n_nodes: usize, x_end: (f64, f64), control_box: BoxBarrier) -> Result<Self, BvpDaeError> {
        if !(t_end > 0.0) || !t_end.is_finite() {
            return Err(BvpDaeError::Config(format!("final time must be positive, got {}", t_end)));
        }
        if n_nodes < 2 {
            return Err(BvpDaeError::Config(format!("at least 2 nodes are required, got {}", n_nodes)));
        }
        if !(control_box.lower < control_box.upper) {
            return Err(BvpDaeError::Config(format!(
                "empty control box [{}, {}]",
                control_box.lower, control_box.upper
            )));
        }
        Ok(DoubleIntegrator {
            t_end,
            n_nodes,
            x_end,
            control_box,
        })
    }

    pub fn with_box(lower: f64, upper: f64) -> Self {
        DoubleIntegrator {
            control_box: BoxBarrier::new(lower, upper),
            ..Default::default()
        }
    }

    /// unconstrained optimum on [0, 1] for x(1) = (1, 0): (x0, x1, p0, p1, u)
    pub fn exact_solution(t: f64) -> [f64; 5] {
        [
            3.0 * t * t - 2.0 * t * t * t,
            6.0 * t - 6.0 * t * t,
            -12.0,
            12.0 * t - 6.0,
            6.0 - 12.0 * t,
        ]
    }
}

impl BvpDaeProblem for DoubleIntegrator {
    fn n_x(&self) -> usize {
        4
    }
    fn n_z(&self) -> usize {
        1
    }

    fn residual_dynamics(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, _eps: f64) -> DMatrix<f64> {
        let mut dxp = DMatrix::zeros(4, xp.ncols());
        for j in 0..xp.ncols() {
            dxp[(0, j)] = xp[(1, j)];
            dxp[(1, j)] = z[(0, j)];
            dxp[(3, j)] = -xp[(2, j)];
        }
        dxp
    }

    fn jac_dynamics(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, _z: &DMatrix<f64>, _eps: f64) -> NodeJacobians {
        let mut fx = DMatrix::zeros(4, 4);
        fx[(0, 1)] = 1.0;
        fx[(3, 2)] = -1.0;
        let mut fz = DMatrix::zeros(4, 1);
        fz[(1, 0)] = 1.0;
        let n = xp.ncols();
        (vec![fx; n], vec![fz; n])
    }

    fn residual_algebraic(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> DMatrix<f64> {
        DMatrix::from_fn(1, xp.ncols(), |_, j| {
            let u = z[(0, j)];
            u + self.control_box.gradient(u, eps) + xp[(3, j)]
        })
    }

    fn jac_algebraic(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> NodeJacobians {
        let mut gx = DMatrix::zeros(1, 4);
        gx[(0, 3)] = 1.0;
        let gz = (0..xp.ncols())
            .map(|j| DMatrix::from_element(1, 1, 1.0 + self.control_box.hessian(z[(0, j)], eps)))
            .collect();
        (vec![gx; xp.ncols()], gz)
    }

    fn residual_boundary(
        &self,
        xp0: &DVector<f64>,
        xp_end: &DVector<f64>,
        _z0: &DVector<f64>,
        _z_end: &DVector<f64>,
        _eps: f64,
    ) -> DVector<f64> {
        DVector::from_vec(vec![
            xp0[0],
            xp0[1],
            xp_end[0] - self.x_end.0,
            xp_end[1] - self.x_end.1,
        ])
    }

    fn jac_boundary(
        &self,
        _xp0: &DVector<f64>,
        _xp_end: &DVector<f64>,
        _z0: &DVector<f64>,
        _z_end: &DVector<f64>,
        _eps: f64,
    ) -> BoundaryJacobian {
        let mut bcj = BoundaryJacobian::zeros(4, 1);
        bcj.d_xp0[(0, 0)] = 1.0;
        bcj.d_xp0[(1, 1)] = 1.0;
        bcj.d_xp_end[(2, 0)] = 1.0;
        bcj.d_xp_end[(3, 1)] = 1.0;
        bcj
    }

    /// zero states and adjoints, control at the middle of the box
    ///
    /// # Panics
    /// if `t_end <= 0`
    fn initialize(&self) -> Trajectory {
        let n = self.n_nodes.max(2);
        let time = linspace(0.0, self.t_end, n);
        let u_mid = 0.5 * (self.control_box.lower + self.control_box.upper);
        Trajectory::from_grid(time, DMatrix::zeros(4, n), DMatrix::from_element(1, n, u_mid))
    }

    fn name(&self) -> String {
        "double integrator".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_rejects_degenerate_horizon() {
        let control_box = BoxBarrier::new(-8.0, 8.0);
        for t_end in [0.0, -1.0, f64::NAN] {
            let err = DoubleIntegrator::new(t_end, 11, (1.0, 0.0), control_box).unwrap_err();
            assert!(matches!(err, BvpDaeError::Config(_)), "t_end = {}", t_end);
        }
        assert!(DoubleIntegrator::new(1.0, 1, (1.0, 0.0), control_box).is_err());
        assert!(DoubleIntegrator::new(1.0, 11, (1.0, 0.0), BoxBarrier::new(2.0, -2.0)).is_err());

        let problem = DoubleIntegrator::new(2.0, 11, (1.0, 0.0), control_box).unwrap();
        let traj = problem.initialize();
        assert_eq!(traj.n_nodes(), 11);
        assert_eq!(traj.time()[10], 2.0);
        assert!(traj.z().iter().all(|&u| u == 0.0));
    }

    #[test]
    #[should_panic(expected = "invalid initial trajectory")]
    fn initialize_panics_on_zero_horizon() {
        let problem = DoubleIntegrator {
            t_end: 0.0,
            ..Default::default()
        };
        problem.initialize();
    }
}
