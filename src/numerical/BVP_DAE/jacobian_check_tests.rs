#[cfg(test)]
mod tests {
    use crate::numerical::BVP_DAE::BVP_DAE_traits::{
        BoundaryJacobian, BvpDaeProblem, NodeJacobians, ProblemContract,
    };
    use crate::numerical::BVP_DAE::jacobian_check::check_jacobians;
    use crate::numerical::BVP_DAE::problems::{DoubleIntegrator, OCProblemEnum, Zermelo};
    use crate::numerical::BVP_DAE::trajectory::Trajectory;
    use nalgebra::{DMatrix, DVector};
    use rand::Rng;
    use std::f64::consts::PI;
    use strum::IntoEnumIterator;

    const TOL: f64 = 1e-5;

    fn random_double_integrator_point(problem: &DoubleIntegrator) -> Trajectory {
        let mut rng = rand::rng();
        let mut traj = problem.initialize();
        traj.xp_mut().iter_mut().for_each(|v| *v = rng.random_range(-2.0..2.0));
        traj.z_mut().iter_mut().for_each(|v| *v = rng.random_range(-7.0..7.0));
        traj
    }

    fn random_zermelo_point(problem: &Zermelo) -> Trajectory {
        let mut rng = rand::rng();
        let mut traj = problem.initialize();
        let n = traj.n_nodes();
        let xp = traj.xp_mut();
        for j in 0..n {
            xp[(0, j)] += rng.random_range(-0.05..0.05);
            xp[(1, j)] += rng.random_range(-0.05..0.05);
            xp[(2, j)] = rng.random_range(5.0..15.0);
            for i in 3..6 {
                xp[(i, j)] = rng.random_range(-1.0..1.0);
            }
        }
        let z = traj.z_mut();
        for j in 0..n {
            z[(0, j)] = rng.random_range(-PI + 0.3..PI - 0.3);
            z[(1, j)] = rng.random_range(0.1..0.9);
        }
        traj
    }

    #[test]
    fn double_integrator_jacobians_are_consistent() {
        let problem = DoubleIntegrator {
            n_nodes: 11,
            ..Default::default()
        };
        for &eps in &[1.0, 1e-3] {
            let traj = random_double_integrator_point(&problem);
            let contract = ProblemContract::new(problem.clone(), eps);
            let report = check_jacobians(&contract, &traj, 1e-6).unwrap();
            assert!(report.passed(TOL), "{:?}", report.worst);
            assert!(report.n_checked > 0);
        }
    }

    #[test]
    fn zermelo_jacobians_are_consistent() {
        let problem = Zermelo {
            n_nodes: 21,
            ..Default::default()
        };
        for &eps in &[1.0, 0.1, 1e-4] {
            for _ in 0..3 {
                let traj = random_zermelo_point(&problem);
                let contract = ProblemContract::new(problem.clone(), eps);
                let report = check_jacobians(&contract, &traj, 1e-6).unwrap();
                assert!(report.passed(TOL), "eps = {}: {:?}", eps, report.worst);
            }
        }
    }

    #[test]
    fn every_shipped_problem_passes_at_its_initial_guess() {
        for problem in OCProblemEnum::iter() {
            let contract = ProblemContract::new(problem, 0.5);
            let traj = contract.initialize();
            let report = check_jacobians(&contract, &traj, 1e-6).unwrap();
            assert!(report.passed(TOL), "{}: {:?}", contract.problem(), report.worst);
        }
    }

    /// double integrator with d(x1')/du reported as 2 instead of 1
    #[derive(Debug, Clone)]
    struct WrongControlGain(DoubleIntegrator);

    impl BvpDaeProblem for WrongControlGain {
        fn n_x(&self) -> usize {
            self.0.n_x()
        }
        fn n_z(&self) -> usize {
            self.0.n_z()
        }
        fn residual_dynamics(&self, t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> DMatrix<f64> {
            self.0.residual_dynamics(t, xp, z, eps)
        }
        fn jac_dynamics(&self, t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> NodeJacobians {
            let (fx, mut fz) = self.0.jac_dynamics(t, xp, z, eps);
            fz.iter_mut().for_each(|b| b[(1, 0)] = 2.0);
            (fx, fz)
        }
        fn residual_algebraic(&self, t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> DMatrix<f64> {
            self.0.residual_algebraic(t, xp, z, eps)
        }
        fn jac_algebraic(&self, t: &DVector<f64>, xp: &DMatrix<f64>, z: &DMatrix<f64>, eps: f64) -> NodeJacobians {
            self.0.jac_algebraic(t, xp, z, eps)
        }
        fn residual_boundary(
            &self,
            xp0: &DVector<f64>,
            xp_end: &DVector<f64>,
            z0: &DVector<f64>,
            z_end: &DVector<f64>,
            eps: f64,
        ) -> DVector<f64> {
            self.0.residual_boundary(xp0, xp_end, z0, z_end, eps)
        }
        fn jac_boundary(
            &self,
            xp0: &DVector<f64>,
            xp_end: &DVector<f64>,
            z0: &DVector<f64>,
            z_end: &DVector<f64>,
            eps: f64,
        ) -> BoundaryJacobian {
            self.0.jac_boundary(xp0, xp_end, z0, z_end, eps)
        }
        fn initialize(&self) -> Trajectory {
            self.0.initialize()
        }
    }

    #[test]
    fn wrong_derivative_is_reported() {
        let problem = WrongControlGain(DoubleIntegrator {
            n_nodes: 5,
            ..Default::default()
        });
        let contract = ProblemContract::new(problem, 1.0);
        let report = check_jacobians(&contract, &contract.initialize(), 1e-6).unwrap();
        assert!(!report.passed(TOL));
        let worst = report.worst.unwrap();
        assert_eq!(worst.callback, "jac_dynamics (wrt z)");
        assert_eq!((worst.row, worst.col), (1, 0));
        assert!((worst.analytic - 2.0).abs() < 1e-12);
        assert!((worst.numeric - 1.0).abs() < 1e-6);
    }
}
