//! Discretization of the BVP-DAE on a fixed time grid.
//!
//! Unknowns are stacked node by node, `[xp_0, z_0, xp_1, z_1, ...]`. Equations are
//! stacked in three groups:
//! - trapezoidal collocation defects of every segment,
//!   `xp_{j+1} - xp_j - h_j/2 * (f_j + f_{j+1})`, rows `[0, (N-1)*n_x)`;
//! - algebraic equations `g(t_j, xp_j, z_j) = 0` at every node, next `N*n_z` rows;
//! - boundary conditions `bc(xp_0, xp_{N-1}, z_0, z_{N-1}) = 0`, last `n_x` rows.
//!
//! The Jacobian therefore has two n_x-row blocks per segment (node j and node j+1),
//! one block-diagonal entry per node for the algebraic rows and dense boundary rows
//! touching only the first and the last node. All blocks come from the analytic
//! derivative callbacks of the problem.
use crate::numerical::BVP_DAE::BVP_DAE_errors::ModelError;
use crate::numerical::BVP_DAE::BVP_DAE_traits::{BvpDaeProblem, ProblemContract};
use crate::numerical::BVP_DAE::sparse_blocks::BlockSparseMatrix;
use crate::numerical::BVP_DAE::trajectory::Trajectory;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemLayout {
    pub n_x: usize,
    pub n_z: usize,
    pub n_nodes: usize,
}

impl SystemLayout {
    pub fn new(n_x: usize, n_z: usize, n_nodes: usize) -> Self {
        SystemLayout { n_x, n_z, n_nodes }
    }
    pub fn of(traj: &Trajectory) -> Self {
        SystemLayout::new(traj.n_x(), traj.n_z(), traj.n_nodes())
    }
    pub fn node_width(&self) -> usize {
        self.n_x + self.n_z
    }
    pub fn n_unknowns(&self) -> usize {
        self.n_nodes * self.node_width()
    }
    pub fn n_defect_rows(&self) -> usize {
        (self.n_nodes - 1) * self.n_x
    }
    pub fn n_algebraic_rows(&self) -> usize {
        self.n_nodes * self.n_z
    }
    pub fn n_equations(&self) -> usize {
        self.n_defect_rows() + self.n_algebraic_rows() + self.n_x
    }
    pub fn col_xp(&self, node: usize) -> usize {
        node * self.node_width()
    }
    pub fn col_z(&self, node: usize) -> usize {
        node * self.node_width() + self.n_x
    }
    pub fn row_defect(&self, segment: usize) -> usize {
        segment * self.n_x
    }
    pub fn row_algebraic(&self, node: usize) -> usize {
        self.n_defect_rows() + node * self.n_z
    }
    pub fn row_boundary(&self) -> usize {
        self.n_defect_rows() + self.n_algebraic_rows()
    }
}

/// Residual of the discretized system, kept in its three groups.
#[derive(Debug, Clone, PartialEq)]
pub struct CollocationResidual {
    /// (n_x, N-1), column j is the defect of segment j
    pub defects: DMatrix<f64>,
    /// (n_z, N)
    pub algebraic: DMatrix<f64>,
    /// (n_x)
    pub boundary: DVector<f64>,
}

impl CollocationResidual {
    /// stacked in equation order (see module docs)
    pub fn to_vector(&self) -> DVector<f64> {
        let n = self.defects.len() + self.algebraic.len() + self.boundary.len();
        DVector::from_iterator(
            n,
            self.defects
                .iter()
                .chain(self.algebraic.iter())
                .chain(self.boundary.iter())
                .copied(),
        )
    }
    pub fn defect_norm(&self) -> f64 {
        self.defects.amax()
    }
    pub fn algebraic_boundary_norm(&self) -> f64 {
        self.algebraic.amax().max(self.boundary.amax())
    }
    pub fn boundary_norm(&self) -> f64 {
        self.boundary.amax()
    }
    /// infinity norm of the whole residual
    pub fn norm_inf(&self) -> f64 {
        self.defect_norm().max(self.algebraic_boundary_norm())
    }
    /// Euclidean norm: combined convergence test and residual-norm step acceptance
    pub fn norm_l2(&self) -> f64 {
        (self.defects.norm_squared() + self.algebraic.norm_squared() + self.boundary.norm_squared()).sqrt()
    }
    pub fn is_finite(&self) -> bool {
        self.defects.iter().chain(self.algebraic.iter()).chain(self.boundary.iter()).all(|v| v.is_finite())
    }
}

fn check_shape(callback: &'static str, m: &DMatrix<f64>, rows: usize, cols: usize) -> Result<(), ModelError> {
    if m.shape() != (rows, cols) {
        return Err(ModelError::ShapeMismatch {
            callback,
            expected_rows: rows,
            expected_cols: cols,
            got_rows: m.nrows(),
            got_cols: m.ncols(),
        });
    }
    Ok(())
}

fn check_finite(callback: &'static str, m: &DMatrix<f64>) -> Result<(), ModelError> {
    for (j, col) in m.column_iter().enumerate() {
        if let Some(i) = col.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite { callback, row: i, col: j });
        }
    }
    Ok(())
}

fn check_matrix(callback: &'static str, m: &DMatrix<f64>, rows: usize, cols: usize) -> Result<(), ModelError> {
    check_shape(callback, m, rows, cols)?;
    check_finite(callback, m)
}

fn check_node_blocks(
    callback: &'static str,
    blocks: &[DMatrix<f64>],
    n_nodes: usize,
    rows: usize,
    cols: usize,
) -> Result<(), ModelError> {
    if blocks.len() != n_nodes {
        return Err(ModelError::BlockCountMismatch {
            callback,
            expected: n_nodes,
            got: blocks.len(),
        });
    }
    for block in blocks {
        check_matrix(callback, block, rows, cols)?;
    }
    Ok(())
}

/// Evaluates the discretized system at `traj`.
///
/// Callback output of the wrong shape or with non-finite entries is a [`ModelError`].
pub fn assemble_residual<P: BvpDaeProblem>(
    contract: &ProblemContract<P>,
    traj: &Trajectory,
) -> Result<CollocationResidual, ModelError> {
    let layout = SystemLayout::of(traj);
    let (n_x, n_z, n) = (layout.n_x, layout.n_z, layout.n_nodes);

    let f = contract.residual_dynamics(traj);
    check_matrix("residual_dynamics", &f, n_x, n)?;
    let g = contract.residual_algebraic(traj);
    check_matrix("residual_algebraic", &g, n_z, n)?;
    let bc = contract.residual_boundary(traj);
    let bc = DMatrix::from_column_slice(bc.len(), 1, bc.as_slice());
    check_matrix("residual_boundary", &bc, n_x, 1)?;

    let h = traj.steps();
    let xp = traj.xp();
    let mut defects = DMatrix::zeros(n_x, n - 1);
    for j in 0..n - 1 {
        let half_h = 0.5 * h[j];
        for i in 0..n_x {
            defects[(i, j)] = xp[(i, j + 1)] - xp[(i, j)] - half_h * (f[(i, j)] + f[(i, j + 1)]);
        }
    }
    Ok(CollocationResidual {
        defects,
        algebraic: g,
        boundary: bc.column(0).into_owned(),
    })
}

/// Builds the block-sparse Jacobian of [`assemble_residual`] at `traj`.
pub fn assemble_jacobian<P: BvpDaeProblem>(
    contract: &ProblemContract<P>,
    traj: &Trajectory,
) -> Result<BlockSparseMatrix, ModelError> {
    let layout = SystemLayout::of(traj);
    let (n_x, n_z, n) = (layout.n_x, layout.n_z, layout.n_nodes);

    let (fx, fz) = contract.jac_dynamics(traj);
    check_node_blocks("jac_dynamics (wrt xp)", &fx, n, n_x, n_x)?;
    check_node_blocks("jac_dynamics (wrt z)", &fz, n, n_x, n_z)?;
    let (gx, gz) = contract.jac_algebraic(traj);
    check_node_blocks("jac_algebraic (wrt xp)", &gx, n, n_z, n_x)?;
    check_node_blocks("jac_algebraic (wrt z)", &gz, n, n_z, n_z)?;
    let bcj = contract.jac_boundary(traj);
    check_matrix("jac_boundary (wrt xp0)", &bcj.d_xp0, n_x, n_x)?;
    check_matrix("jac_boundary (wrt xpT)", &bcj.d_xp_end, n_x, n_x)?;
    check_matrix("jac_boundary (wrt z0)", &bcj.d_z0, n_x, n_z)?;
    check_matrix("jac_boundary (wrt zT)", &bcj.d_z_end, n_x, n_z)?;

    let h = traj.steps();
    let mut jac = BlockSparseMatrix::new(layout.n_equations(), layout.n_unknowns());

    // collocation defects: d/dxp_j = -I - h/2 fx_j, d/dxp_{j+1} = I - h/2 fx_{j+1}
    for j in 0..n - 1 {
        let row = layout.row_defect(j);
        let half_h = 0.5 * h[j];
        jac.add_identity(row, layout.col_xp(j), n_x, -1.0);
        jac.add_block(row, layout.col_xp(j), &fx[j], -half_h);
        jac.add_identity(row, layout.col_xp(j + 1), n_x, 1.0);
        jac.add_block(row, layout.col_xp(j + 1), &fx[j + 1], -half_h);
        if n_z > 0 {
            jac.add_block(row, layout.col_z(j), &fz[j], -half_h);
            jac.add_block(row, layout.col_z(j + 1), &fz[j + 1], -half_h);
        }
    }

    // algebraic equations couple a node only with itself
    if n_z > 0 {
        for j in 0..n {
            let row = layout.row_algebraic(j);
            jac.add_block(row, layout.col_xp(j), &gx[j], 1.0);
            jac.add_block(row, layout.col_z(j), &gz[j], 1.0);
        }
    }

    // boundary rows: first and last node only
    let row = layout.row_boundary();
    jac.add_block(row, layout.col_xp(0), &bcj.d_xp0, 1.0);
    jac.add_block(row, layout.col_xp(n - 1), &bcj.d_xp_end, 1.0);
    if n_z > 0 {
        jac.add_block(row, layout.col_z(0), &bcj.d_z0, 1.0);
        jac.add_block(row, layout.col_z(n - 1), &bcj.d_z_end, 1.0);
    }
    Ok(jac)
}
