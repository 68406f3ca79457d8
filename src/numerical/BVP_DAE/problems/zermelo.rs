//! Zermelo navigation problem in minimum time around an elliptic obstacle.
//!
//! A boat with heading u0 and speed u1 crosses a river with current h(x1) from (0, 0) to
//! `x_final`. The free final time is the scaling state x2 on the normalized interval [0, 1].
//! The obstacle is the interior of the ellipse
//!   c(x0, x1) = r² - (x0 - c0)²/a1² - (x1 - c1)²/a2² < 0 (admissible outside),
//! both the obstacle and the control boxes are handled with log barriers.
//! The heading box (-pi, pi) is centred on the downstream direction u0 = 0; the optimal
//! headings stay well inside it, so the barrier only removes the 2 pi ambiguity of u0.
//!
//! xp = (x0, x1, x2, p0, p1, p2), z = (u0, u1).
use crate::numerical::BVP_DAE::BVP_DAE_traits::{BoundaryJacobian, BvpDaeProblem, NodeJacobians};
use crate::numerical::BVP_DAE::penalty::{BoxBarrier, log_pen};
use crate::numerical::BVP_DAE::trajectory::{Trajectory, linspace};
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct Zermelo {
    pub a1: f64,
    pub a2: f64,
    pub r: f64,
    pub x_start: (f64, f64),
    pub x_final: (f64, f64),
    pub center: (f64, f64),
    pub heading_box: BoxBarrier,
    pub speed_box: BoxBarrier,
    pub n_nodes: usize,
}

impl Default for Zermelo {
    fn default() -> Self {
        let x_final = (20.0, 1.0);
        Zermelo {
            a1: 2.0,
            a2: 0.1,
            r: 2.0,
            x_start: (0.0, 0.0),
            x_final,
            center: (x_final.0 / 2.0, x_final.1 / 2.5),
            heading_box: BoxBarrier::new(-PI, PI),
            speed_box: BoxBarrier::new(0.0, 1.0),
            n_nodes: 101,
        }
    }
}

/// values of the obstacle function and its derivatives at one point
struct Obstacle {
    c: f64,
    c_x0: f64,
    c_x1: f64,
    c_x0x0: f64,
    c_x1x1: f64,
}

impl Zermelo {
    /// river current
    fn h(&self, x1: f64) -> f64 {
        3.0 + 0.2 * x1 * (1.0 - x1)
    }
    fn dh(&self, x1: f64) -> f64 {
        0.2 - 0.4 * x1
    }
    fn d2h(&self, _x1: f64) -> f64 {
        -0.4
    }

    fn obstacle(&self, x0: f64, x1: f64) -> Obstacle {
        let (a1_2, a2_2) = (self.a1 * self.a1, self.a2 * self.a2);
        let (d0, d1) = (x0 - self.center.0, x1 - self.center.1);
        Obstacle {
            c: self.r * self.r - d0 * d0 / a1_2 - d1 * d1 / a2_2,
            c_x0: -2.0 * d0 / a1_2,
            c_x1: -2.0 * d1 / a2_2,
            c_x0x0: -2.0 / a1_2,
            c_x1x1: -2.0 / a2_2,
        }
    }
}

impl BvpDaeProblem for Zermelo {
    fn n_x(&self) -> usize {
        6
    }
    fn n_z(&self) -> usize {
        2
    }

    fn residual_dynamics(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> DMatrix<f64> {
        let mut dxp = DMatrix::zeros(6, xp.ncols());
        for j in 0..xp.ncols() {
            let (x0, x1, x2, p0, p1) = (xp[(0, j)], xp[(1, j)], xp[(2, j)], xp[(3, j)], xp[(4, j)]);
            let (u0, u1) = (z[(0, j)], z[(1, j)]);
            let (s, c) = u0.sin_cos();
            let obs = self.obstacle(x0, x1);
            let lg = eps * log_pen(obs.c, 1);
            dxp[(0, j)] = x2 * (u1 * c + self.h(x1));
            dxp[(1, j)] = x2 * u1 * s;
            dxp[(3, j)] = -lg * obs.c_x0;
            dxp[(4, j)] = -p0 * x2 * self.dh(x1) - lg * obs.c_x1;
            dxp[(5, j)] = -p0 * (u1 * c + self.h(x1)) - p1 * u1 * s;
        }
        dxp
    }

    fn jac_dynamics(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> NodeJacobians {
        let n = xp.ncols();
        let mut fx = Vec::with_capacity(n);
        let mut fz = Vec::with_capacity(n);
        for j in 0..n {
            let (x0, x1, x2, p0, p1) = (xp[(0, j)], xp[(1, j)], xp[(2, j)], xp[(3, j)], xp[(4, j)]);
            let (u0, u1) = (z[(0, j)], z[(1, j)]);
            let (s, c) = u0.sin_cos();
            let obs = self.obstacle(x0, x1);
            let lg = eps * log_pen(obs.c, 1);
            let dlg = eps * log_pen(obs.c, 2);

            let mut jx = DMatrix::zeros(6, 6);
            jx[(0, 1)] = x2 * self.dh(x1);
            jx[(0, 2)] = u1 * c + self.h(x1);
            jx[(1, 2)] = u1 * s;
            jx[(3, 0)] = -(dlg * obs.c_x0 * obs.c_x0 + lg * obs.c_x0x0);
            jx[(3, 1)] = -dlg * obs.c_x0 * obs.c_x1;
            jx[(4, 0)] = jx[(3, 1)];
            jx[(4, 1)] = -p0 * x2 * self.d2h(x1) - (dlg * obs.c_x1 * obs.c_x1 + lg * obs.c_x1x1);
            jx[(4, 2)] = -p0 * self.dh(x1);
            jx[(4, 3)] = -x2 * self.dh(x1);
            jx[(5, 1)] = -p0 * self.dh(x1);
            jx[(5, 3)] = -(u1 * c + self.h(x1));
            jx[(5, 4)] = -u1 * s;

            let mut jz = DMatrix::zeros(6, 2);
            jz[(0, 0)] = -x2 * u1 * s;
            jz[(0, 1)] = x2 * c;
            jz[(1, 0)] = x2 * u1 * c;
            jz[(1, 1)] = x2 * s;
            jz[(5, 0)] = p0 * u1 * s - p1 * u1 * c;
            jz[(5, 1)] = -p0 * c - p1 * s;
            fx.push(jx);
            fz.push(jz);
        }
        (fx, fz)
    }

    /// stationarity of the Hamiltonian in (u0, u1)
    fn residual_algebraic(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> DMatrix<f64> {
        let mut dhdu = DMatrix::zeros(2, xp.ncols());
        for j in 0..xp.ncols() {
            let (x2, p0, p1) = (xp[(2, j)], xp[(3, j)], xp[(4, j)]);
            let (u0, u1) = (z[(0, j)], z[(1, j)]);
            let (s, c) = u0.sin_cos();
            dhdu[(0, j)] = -p0 * x2 * u1 * s + p1 * x2 * u1 * c + self.heading_box.gradient(u0, eps);
            dhdu[(1, j)] = p0 * x2 * c + p1 * x2 * s + self.speed_box.gradient(u1, eps);
        }
        dhdu
    }

    fn jac_algebraic(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> NodeJacobians {
        let n = xp.ncols();
        let mut gx = Vec::with_capacity(n);
        let mut gz = Vec::with_capacity(n);
        for j in 0..n {
            let (x2, p0, p1) = (xp[(2, j)], xp[(3, j)], xp[(4, j)]);
            let (u0, u1) = (z[(0, j)], z[(1, j)]);
            let (s, c) = u0.sin_cos();

            let mut jx = DMatrix::zeros(2, 6);
            jx[(0, 2)] = -p0 * u1 * s + p1 * u1 * c;
            jx[(0, 3)] = -x2 * u1 * s;
            jx[(0, 4)] = x2 * u1 * c;
            jx[(1, 2)] = p0 * c + p1 * s;
            jx[(1, 3)] = x2 * c;
            jx[(1, 4)] = x2 * s;

            let mut jz = DMatrix::zeros(2, 2);
            jz[(0, 0)] = -p0 * x2 * u1 * c - p1 * x2 * u1 * s + self.heading_box.hessian(u0, eps);
            jz[(0, 1)] = -p0 * x2 * s + p1 * x2 * c;
            jz[(1, 0)] = jz[(0, 1)];
            jz[(1, 1)] = self.speed_box.hessian(u1, eps);
            gx.push(jx);
            gz.push(jz);
        }
        (gx, gz)
    }

    /// start and target positions, p2(0) = 0 and p2(1) = 1 for the minimum-time cost
    fn residual_boundary(
        &self,
        xp0: &DVector<f64>,
        xp_end: &DVector<f64>,
        _z0: &DVector<f64>,
        _z_end: &DVector<f64>,
        _eps: f64,
    ) -> DVector<f64> {
        DVector::from_vec(vec![
            xp0[0] - self.x_start.0,
            xp0[1] - self.x_start.1,
            xp_end[0] - self.x_final.0,
            xp_end[1] - self.x_final.1,
            xp0[5],
            xp_end[5] - 1.0,
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
        let mut bcj = BoundaryJacobian::zeros(6, 2);
        bcj.d_xp0[(0, 0)] = 1.0;
        bcj.d_xp0[(1, 1)] = 1.0;
        bcj.d_xp0[(4, 5)] = 1.0;
        bcj.d_xp_end[(2, 0)] = 1.0;
        bcj.d_xp_end[(3, 1)] = 1.0;
        bcj.d_xp_end[(5, 5)] = 1.0;
        bcj
    }

    /// straight crossing that passes above the obstacle, time scaling 10
    fn initialize(&self) -> Trajectory {
        let n = self.n_nodes.max(4);
        let time = linspace(0.0, 1.0, n);
        let mut xp = DMatrix::zeros(6, n);
        let x0 = linspace(self.x_start.0, self.x_final.0, n);
        // x1 climbs to 0.6 over the first quarter, then to the target
        let n_climb = n / 4;
        let climb = linspace(self.x_start.1, 0.6, n_climb);
        let rest = linspace(0.6, self.x_final.1, n - n_climb);
        for j in 0..n {
            xp[(0, j)] = x0[j];
            xp[(1, j)] = if j < n_climb { climb[j] } else { rest[j - n_climb] };
            xp[(2, j)] = 10.0;
            xp[(5, j)] = 1.0;
        }
        let mut z = DMatrix::zeros(2, n);
        z.row_mut(0).fill(PI / 2.0);
        z.row_mut(1).fill(0.5);
        Trajectory::from_grid(time, xp, z)
    }

    fn name(&self) -> String {
        "Zermelo navigation".to_string()
    }
}
