use crate::numerical::BVP_DAE::BVP_DAE_errors::BvpDaeError;
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};

/// Sampled trajectory of a BVP-DAE: time grid, state/adjoint block `xp` (n_x, N)
/// and algebraic (control) block `z` (n_z, N).
///
/// Ownership moves from the continuation driver into the Newton solver and back;
/// nothing in the crate keeps a second handle to a trajectory being solved.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    time: DVector<f64>,
    xp: DMatrix<f64>,
    z: DMatrix<f64>,
}

impl Trajectory {
    /// checks `xp.ncols() == z.ncols() == time.len()`, `N >= 2` and strictly increasing time
    pub fn new(time: DVector<f64>, xp: DMatrix<f64>, z: DMatrix<f64>) -> Result<Self, BvpDaeError> {
        let n = time.len();
        if n < 2 {
            return Err(BvpDaeError::InvalidTrajectory(format!(
                "time grid must contain at least 2 points, got {}",
                n
            )));
        }
        if xp.ncols() != n || z.ncols() != n {
            return Err(BvpDaeError::InvalidTrajectory(format!(
                "xp has {} columns and z has {} columns, time grid has {} points",
                xp.ncols(),
                z.ncols(),
                n
            )));
        }
        if xp.nrows() == 0 {
            return Err(BvpDaeError::InvalidTrajectory(
                "state/adjoint block must have at least one row".to_string(),
            ));
        }
        if let Some((i, _)) = time
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (a, b))| !(*b > *a))
        {
            return Err(BvpDaeError::InvalidTrajectory(format!(
                "time grid is not strictly increasing at index {}: {} -> {}",
                i,
                time[i],
                time[i + 1]
            )));
        }
        Ok(Trajectory { time, xp, z })
    }

    /// Infallible constructor for problem initializers that build their own grid.
    ///
    /// # Panics
    /// if the blocks do not match the grid or the grid is not strictly increasing
    pub fn from_grid(time: DVector<f64>, xp: DMatrix<f64>, z: DMatrix<f64>) -> Self {
        match Trajectory::new(time, xp, z) {
            Ok(traj) => traj,
            Err(e) => panic!("invalid initial trajectory: {}", e),
        }
    }

    /// uniform grid on [t0, t_end] with `n_nodes` points and zero-filled blocks
    pub fn zeros(t0: f64, t_end: f64, n_nodes: usize, n_x: usize, n_z: usize) -> Result<Self, BvpDaeError> {
        let time = linspace(t0, t_end, n_nodes);
        Trajectory::new(time, DMatrix::zeros(n_x, n_nodes), DMatrix::zeros(n_z, n_nodes))
    }

    pub fn time(&self) -> &DVector<f64> {
        &self.time
    }
    pub fn xp(&self) -> &DMatrix<f64> {
        &self.xp
    }
    pub fn z(&self) -> &DMatrix<f64> {
        &self.z
    }
    pub fn xp_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.xp
    }
    pub fn z_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.z
    }
    pub fn n_nodes(&self) -> usize {
        self.time.len()
    }
    pub fn n_x(&self) -> usize {
        self.xp.nrows()
    }
    pub fn n_z(&self) -> usize {
        self.z.nrows()
    }
    /// mesh intervals h_j = t_{j+1} - t_j
    pub fn steps(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.n_nodes() - 1,
            self.time.iter().tuple_windows().map(|(a, b)| b - a),
        )
    }

    pub fn xp0(&self) -> DVector<f64> {
        self.xp.column(0).into_owned()
    }
    pub fn xp_end(&self) -> DVector<f64> {
        self.xp.column(self.n_nodes() - 1).into_owned()
    }
    pub fn z0(&self) -> DVector<f64> {
        self.z.column(0).into_owned()
    }
    pub fn z_end(&self) -> DVector<f64> {
        self.z.column(self.n_nodes() - 1).into_owned()
    }

    /// node-major stacking [xp_0, z_0, xp_1, z_1, ...]
    pub fn to_unknowns(&self) -> DVector<f64> {
        let (n_x, n_z, n) = (self.n_x(), self.n_z(), self.n_nodes());
        let block = n_x + n_z;
        let mut y = DVector::zeros(n * block);
        for j in 0..n {
            for i in 0..n_x {
                y[j * block + i] = self.xp[(i, j)];
            }
            for i in 0..n_z {
                y[j * block + n_x + i] = self.z[(i, j)];
            }
        }
        y
    }

    /// inverse of [`Trajectory::to_unknowns`] on the same time grid
    pub fn with_unknowns(&self, y: &DVector<f64>) -> Trajectory {
        let (n_x, n_z, n) = (self.n_x(), self.n_z(), self.n_nodes());
        let block = n_x + n_z;
        assert_eq!(y.len(), n * block, "unknown vector length must be N*(n_x+n_z)");
        let xp = DMatrix::from_fn(n_x, n, |i, j| y[j * block + i]);
        let z = DMatrix::from_fn(n_z, n, |i, j| y[j * block + n_x + i]);
        Trajectory {
            time: self.time.clone(),
            xp,
            z,
        }
    }

    pub fn into_parts(self) -> (DVector<f64>, DMatrix<f64>, DMatrix<f64>) {
        (self.time, self.xp, self.z)
    }
}

pub fn linspace(start: f64, end: f64, n: usize) -> DVector<f64> {
    if n == 1 {
        return DVector::from_element(1, start);
    }
    let h = (end - start) / (n - 1) as f64;
    DVector::from_fn(n, |i, _| if i == n - 1 { end } else { start + i as f64 * h })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_shapes_and_non_monotone_time() {
        let t = DVector::from_vec(vec![0.0, 0.5, 1.0]);
        assert!(Trajectory::new(t.clone(), DMatrix::zeros(2, 3), DMatrix::zeros(1, 2)).is_err());
        assert!(Trajectory::new(t.clone(), DMatrix::zeros(2, 4), DMatrix::zeros(1, 3)).is_err());
        let bad = DVector::from_vec(vec![0.0, 0.5, 0.5]);
        assert!(Trajectory::new(bad, DMatrix::zeros(2, 3), DMatrix::zeros(1, 3)).is_err());
        let single = DVector::from_vec(vec![0.0]);
        assert!(Trajectory::new(single, DMatrix::zeros(2, 1), DMatrix::zeros(1, 1)).is_err());
        assert!(Trajectory::new(t, DMatrix::zeros(2, 3), DMatrix::zeros(0, 3)).is_ok());
    }

    #[test]
    fn unknown_vector_is_node_major() {
        let t = DVector::from_vec(vec![0.0, 0.3, 1.0]);
        let xp = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let z = DMatrix::from_row_slice(1, 3, &[7.0, 8.0, 9.0]);
        let traj = Trajectory::new(t, xp, z).unwrap();
        let y = traj.to_unknowns();
        assert_eq!(y.as_slice(), &[1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]);
        assert_eq!(traj.with_unknowns(&y), traj);
        let h = traj.steps();
        assert!((h[0] - 0.3).abs() < 1e-15 && (h[1] - 0.7).abs() < 1e-15);
    }

    #[test]
    fn linspace_hits_both_ends() {
        let t = linspace(0.0, 1.0, 11);
        assert_eq!(t[0], 0.0);
        assert_eq!(t[10], 1.0);
        assert!((t[5] - 0.5).abs() < 1e-15);
    }
}
