#[cfg(test)]
mod tests {
    use crate::numerical::BVP_DAE::BVP_DAE_errors::ModelError;
    use crate::numerical::BVP_DAE::BVP_DAE_traits::{
        BoundaryJacobian, BvpDaeProblem, NodeJacobians, ProblemContract,
    };
    use crate::numerical::BVP_DAE::collocation::{SystemLayout, assemble_jacobian, assemble_residual};
    use crate::numerical::BVP_DAE::problems::{DoubleIntegrator, Zermelo};
    use crate::numerical::BVP_DAE::trajectory::{Trajectory, linspace};
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    fn small_double_integrator(n_nodes: usize) -> ProblemContract<DoubleIntegrator> {
        let problem = DoubleIntegrator {
            n_nodes,
            ..Default::default()
        };
        ProblemContract::new(problem, 0.1)
    }

    fn exact_trajectory(n_nodes: usize) -> Trajectory {
        let time = linspace(0.0, 1.0, n_nodes);
        let xp = DMatrix::from_fn(4, n_nodes, |i, j| DoubleIntegrator::exact_solution(time[j])[i]);
        let z = DMatrix::from_fn(1, n_nodes, |_, j| DoubleIntegrator::exact_solution(time[j])[4]);
        Trajectory::new(time, xp, z).unwrap()
    }

    #[test]
    fn layout_counts_match() {
        let layout = SystemLayout::new(4, 1, 11);
        assert_eq!(layout.n_unknowns(), 55);
        assert_eq!(layout.n_equations(), 55);
        assert_eq!(layout.row_algebraic(0), 40);
        assert_eq!(layout.row_boundary(), 51);
        assert_eq!(layout.col_z(3), 19);
        let layout = SystemLayout::new(6, 2, 101);
        assert_eq!(layout.n_unknowns(), layout.n_equations());
    }

    #[test]
    fn residual_groups_have_expected_shapes() {
        let contract = small_double_integrator(7);
        let traj = contract.initialize();
        let res = assemble_residual(&contract, &traj).unwrap();
        assert_eq!(res.defects.shape(), (4, 6));
        assert_eq!(res.algebraic.shape(), (1, 7));
        assert_eq!(res.boundary.len(), 4);
        assert_eq!(res.to_vector().len(), SystemLayout::of(&traj).n_equations());
        // zero states satisfy x(0) = 0 but not x(1) = (1, 0)
        assert_eq!(res.boundary[0], 0.0);
        assert_eq!(res.boundary[2], -1.0);
    }

    #[test]
    fn exact_solution_has_small_defects() {
        // x1 is quadratic, so the trapezoidal rule for x0' = x1 has an O(h^3) local error
        let n = 201;
        let contract = ProblemContract::new(DoubleIntegrator::default(), 0.0);
        let res = assemble_residual(&contract, &exact_trajectory(n)).unwrap();
        let h: f64 = 1.0 / (n - 1) as f64;
        assert!(res.defect_norm() < 2.0 * h.powi(3));
        assert!(res.boundary_norm() < 1e-12);
        assert!(res.algebraic.amax() < 1e-12);
    }

    #[test]
    fn jacobian_matches_finite_differences_of_residual() {
        let contract = ProblemContract::new(Zermelo { n_nodes: 6, ..Default::default() }, 0.3);
        let traj = contract.initialize();
        let jac = assemble_jacobian(&contract, &traj).unwrap().to_dense();
        let y = traj.to_unknowns();
        let f = |y: &DVector<f64>| assemble_residual(&contract, &traj.with_unknowns(y)).unwrap().to_vector();
        let h = 1e-6;
        for k in 0..y.len() {
            let mut yp = y.clone();
            yp[k] += h;
            let mut ym = y.clone();
            ym[k] -= h;
            let column = (f(&yp) - f(&ym)) / (2.0 * h);
            for i in 0..column.len() {
                assert_relative_eq!(jac[(i, k)], column[i], epsilon = 1e-5, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn sparsity_pattern_is_banded_with_boundary_rows() {
        let n = 5;
        let contract = small_double_integrator(n);
        let traj = contract.initialize();
        let layout = SystemLayout::of(&traj);
        let jac = assemble_jacobian(&contract, &traj).unwrap();
        assert_eq!(jac.shape(), (layout.n_equations(), layout.n_unknowns()));

        for block in jac.blocks() {
            let (rows, cols) = block.values.shape();
            let first_node = block.col / layout.node_width();
            let last_node = (block.col + cols - 1) / layout.node_width();
            assert_eq!(first_node, last_node, "a block never spans two nodes");
            if block.row < layout.n_defect_rows() {
                // segment j couples nodes j and j+1 only
                let segment = block.row / layout.n_x;
                assert_eq!(rows, layout.n_x);
                assert!(first_node == segment || first_node == segment + 1);
            } else if block.row < layout.row_boundary() {
                let node = (block.row - layout.n_defect_rows()) / layout.n_z;
                assert_eq!(first_node, node);
            } else {
                assert!(first_node == 0 || first_node == n - 1);
            }
        }
        // two xp blocks and two z blocks per segment, two per node, four boundary blocks
        assert_eq!(jac.n_blocks(), 4 * (n - 1) + 2 * n + 4);
        assert!(jac.block(layout.row_defect(1), layout.col_xp(3)).is_none());
        assert!(jac.block(layout.row_boundary(), layout.col_xp(2)).is_none());
        assert!(jac.block(layout.row_algebraic(2), layout.col_z(2)).is_some());
        assert!(jac.block(layout.row_algebraic(2), layout.col_z(1)).is_none());
    }

    #[test]
    fn defect_blocks_are_identity_minus_scaled_jacobian() {
        let contract = small_double_integrator(3);
        let traj = contract.initialize();
        let layout = SystemLayout::of(&traj);
        let jac = assemble_jacobian(&contract, &traj).unwrap();
        let left = jac.block(layout.row_defect(0), layout.col_xp(0)).unwrap();
        let right = jac.block(layout.row_defect(0), layout.col_xp(1)).unwrap();
        // h = 0.5, fx[(0,1)] = 1, fx[(3,2)] = -1
        assert_eq!(left[(0, 0)], -1.0);
        assert_eq!(left[(0, 1)], -0.25);
        assert_eq!(left[(3, 2)], 0.25);
        assert_eq!(right[(0, 0)], 1.0);
        assert_eq!(right[(0, 1)], -0.25);
    }

    /// returns a residual with the wrong number of rows, or NaN dynamics
    #[derive(Debug, Clone)]
    struct Faulty {
        nan: bool,
    }

    impl BvpDaeProblem for Faulty {
        fn n_x(&self) -> usize {
            2
        }
        fn n_z(&self) -> usize {
            0
        }
        fn residual_dynamics(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, _z: &DMatrix<f64>, _eps: f64) -> DMatrix<f64> {
            if self.nan {
                DMatrix::from_element(2, xp.ncols(), f64::NAN)
            } else {
                DMatrix::zeros(3, xp.ncols())
            }
        }
        fn jac_dynamics(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, _z: &DMatrix<f64>, _eps: f64) -> NodeJacobians {
            (vec![DMatrix::zeros(2, 2); xp.ncols()], vec![DMatrix::zeros(2, 0); xp.ncols()])
        }
        fn residual_algebraic(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, _z: &DMatrix<f64>, _eps: f64) -> DMatrix<f64> {
            DMatrix::zeros(0, xp.ncols())
        }
        fn jac_algebraic(&self, _t: &DVector<f64>, xp: &DMatrix<f64>, _z: &DMatrix<f64>, _eps: f64) -> NodeJacobians {
            (vec![DMatrix::zeros(0, 2); xp.ncols()], vec![DMatrix::zeros(0, 0); xp.ncols()])
        }
        fn residual_boundary(
            &self,
            xp0: &DVector<f64>,
            xp_end: &DVector<f64>,
            _z0: &DVector<f64>,
            _z_end: &DVector<f64>,
            _eps: f64,
        ) -> DVector<f64> {
            DVector::from_vec(vec![xp0[0], xp_end[0]])
        }
        fn jac_boundary(
            &self,
            _xp0: &DVector<f64>,
            _xp_end: &DVector<f64>,
            _z0: &DVector<f64>,
            _z_end: &DVector<f64>,
            _eps: f64,
        ) -> BoundaryJacobian {
            BoundaryJacobian::zeros(2, 0)
        }
        fn initialize(&self) -> Trajectory {
            Trajectory::zeros(0.0, 1.0, 4, 2, 0).unwrap()
        }
    }

    #[test]
    fn wrong_shape_is_a_model_error() {
        let contract = ProblemContract::new(Faulty { nan: false }, 1.0);
        let err = assemble_residual(&contract, &contract.initialize()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::ShapeMismatch { callback: "residual_dynamics", got_rows: 3, .. }
        ));
    }

    #[test]
    fn non_finite_dynamics_is_a_model_error() {
        let contract = ProblemContract::new(Faulty { nan: true }, 1.0);
        let err = assemble_residual(&contract, &contract.initialize()).unwrap_err();
        assert_eq!(
            err,
            ModelError::NonFinite { callback: "residual_dynamics", row: 0, col: 0 }
        );
    }

    #[test]
    fn problem_without_algebraic_variables_assembles() {
        let contract = ProblemContract::new(Faulty { nan: false }, 1.0);
        let jac = assemble_jacobian(&contract, &contract.initialize()).unwrap();
        // 3 segments x 2 blocks + 2 boundary blocks, no z blocks
        assert_eq!(jac.n_blocks(), 8);
        assert_eq!(jac.shape(), (8, 8));
    }
}
