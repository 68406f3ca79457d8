use crate::numerical::BVP_DAE::sparse_blocks::BlockSparseMatrix;
use log::{info, warn};
use nalgebra::DMatrix;

/// Jacobians with more unknowns than this are not converted to dense form for diagnostics
pub const MAX_DENSE_DIAGNOSTICS: usize = 2000;

/// Ratio of the largest to the smallest singular value; +inf for an exactly singular matrix.
pub fn condition_number(A: &DMatrix<f64>) -> f64 {
    let singular_values = A.singular_values();
    if singular_values.is_empty() {
        return f64::INFINITY;
    }
    let max_sigma = singular_values.max();
    let min_sigma = singular_values.min();
    if min_sigma == 0.0 {
        return f64::INFINITY;
    }
    max_sigma / min_sigma
}

pub fn poorly_conditioned(A: &DMatrix<f64>, threshold: f64) -> bool {
    let condition_number = condition_number(A);
    let poorly_conditioned = condition_number > threshold;
    if poorly_conditioned {
        warn!(
            "The system of linear equations is poorly conditioned. Condition number = {:.3e}",
            condition_number
        );
    }
    poorly_conditioned
}

/// numerical rank deficiency of a square matrix: n - rank(A)
pub fn rank_deficiency(A: &DMatrix<f64>) -> usize {
    let tol = f64::EPSILON * A.nrows().max(A.ncols()) as f64 * A.amax().max(1.0);
    A.nrows().min(A.ncols()) - A.rank(tol)
}

/// Logs what is known about a Jacobian the sparse LU could not handle: its rank
/// deficiency, condition number and zero rows/columns (a variable that no equation
/// depends on). Large systems only get the cheap zero row/column check.
pub fn diagnose_singular_jacobian(jac: &BlockSparseMatrix) {
    let (nrows, ncols) = jac.shape();
    let mut row_used = vec![false; nrows];
    let mut col_used = vec![false; ncols];
    for block in jac.blocks() {
        for (j, column) in block.values.column_iter().enumerate() {
            for (i, &v) in column.iter().enumerate() {
                if v != 0.0 {
                    row_used[block.row + i] = true;
                    col_used[block.col + j] = true;
                }
            }
        }
    }
    let empty_rows: Vec<usize> = (0..nrows).filter(|&i| !row_used[i]).collect();
    let empty_cols: Vec<usize> = (0..ncols).filter(|&j| !col_used[j]).collect();
    if !empty_rows.is_empty() {
        warn!("Jacobian rows without nonzeros: {:?}", empty_rows);
    }
    if !empty_cols.is_empty() {
        warn!("Jacobian columns without nonzeros: {:?}", empty_cols);
    }
    if ncols > MAX_DENSE_DIAGNOSTICS {
        info!("Jacobian of size {} is too large for dense diagnostics", ncols);
        return;
    }
    let dense = jac.to_dense();
    let deficiency = rank_deficiency(&dense);
    let cond = condition_number(&dense);
    warn!(
        "Jacobian {}x{}: rank deficiency {}, condition number {:.3e}",
        nrows, ncols, deficiency, cond
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    /// famous example of ill-conditioned matrix
    fn hilbert_matrix(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, n, |i, j| 1.0 / (i as f64 + j as f64 + 1.0))
    }

    #[test]
    fn test_poorly_conditioned() {
        let A = DMatrix::from_vec(2, 2, vec![1.0, 1.0, 1.00001, 1.0]);
        assert!(poorly_conditioned(&A, 1e5));
        assert!(!poorly_conditioned(&DMatrix::identity(3, 3), 1e5));
    }

    #[test]
    fn test_poorly_conditioned_hilbert() {
        let A = hilbert_matrix(6);
        assert!(condition_number(&A) > 1e6);
    }

    #[test]
    fn singular_matrix_has_rank_deficiency() {
        let A = DMatrix::from_vec(3, 3, vec![1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0]);
        assert_eq!(rank_deficiency(&A), 1);
        assert_eq!(rank_deficiency(&DMatrix::identity(4, 4)), 0);
    }

    #[test]
    fn diagnostics_of_block_matrix_run() {
        let mut jac = BlockSparseMatrix::new(3, 3);
        jac.add_identity(0, 0, 2, 1.0);
        diagnose_singular_jacobian(&jac);
        assert_eq!(rank_deficiency(&jac.to_dense()), 1);
    }
}
