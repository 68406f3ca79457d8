//! Saving and loading of continuation results.
//!
//! - binary snapshot (bincode): initial guess and optimal solution with eps, alpha,
//!   cumulative solve time and total Newton iterations
//! - JSON document `{ "t": [...], "xp": [[...], ...], "z": [[...], ...] }`, one inner
//!   array per variable
//! - csv/txt tables through [`crate::Utils::logger`]
use crate::Utils::logger::{load_matrix_from_csv, save_matrix_to_csv, save_matrix_to_file};
use crate::numerical::BVP_DAE::continuation::ContinuationReport;
use crate::numerical::BVP_DAE::trajectory::Trajectory;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("binary encoding error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored data is inconsistent: {0}")]
    Invalid(String),
}

/// Trajectory as nested arrays: `xp[i]` is the time history of variable i.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    #[serde(rename = "t")]
    pub time: Vec<f64>,
    pub xp: Vec<Vec<f64>>,
    pub z: Vec<Vec<f64>>,
}

fn rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}

fn from_rows(rows: &[Vec<f64>], n_cols: usize, what: &str) -> Result<DMatrix<f64>, PersistError> {
    if let Some(k) = rows.iter().position(|r| r.len() != n_cols) {
        return Err(PersistError::Invalid(format!(
            "{} row {} has {} values, time grid has {}",
            what,
            k,
            rows[k].len(),
            n_cols
        )));
    }
    Ok(DMatrix::from_fn(rows.len(), n_cols, |i, j| rows[i][j]))
}

impl From<&Trajectory> for TrajectoryRecord {
    fn from(traj: &Trajectory) -> Self {
        TrajectoryRecord {
            time: traj.time().iter().copied().collect(),
            xp: rows(traj.xp()),
            z: rows(traj.z()),
        }
    }
}

impl TrajectoryRecord {
    pub fn to_trajectory(&self) -> Result<Trajectory, PersistError> {
        let n = self.time.len();
        let xp = from_rows(&self.xp, n, "xp")?;
        let z = from_rows(&self.z, n, "z")?;
        Trajectory::new(DVector::from_vec(self.time.clone()), xp, z)
            .map_err(|e| PersistError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalSolution {
    pub time: Vec<f64>,
    pub xp: Vec<Vec<f64>>,
    pub z: Vec<Vec<f64>>,
    /// last eps of the continuation
    pub eps: f64,
    pub alpha: f64,
    /// cumulative Newton solve time, s
    pub exec_time: f64,
    /// number of continuation steps (eps values solved for)
    pub iter: usize,
    /// Newton iterations summed over all continuation steps
    pub newton_iterations: usize,
}

impl OptimalSolution {
    pub fn to_trajectory(&self) -> Result<Trajectory, PersistError> {
        TrajectoryRecord {
            time: self.time.clone(),
            xp: self.xp.clone(),
            z: self.z.clone(),
        }
        .to_trajectory()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsRecord {
    pub initial_solution: TrajectoryRecord,
    pub optimal_solution: OptimalSolution,
}

impl ResultsRecord {
    pub fn from_report(report: &ContinuationReport, alpha: f64) -> Self {
        let optimal = TrajectoryRecord::from(&report.trajectory);
        ResultsRecord {
            initial_solution: TrajectoryRecord::from(&report.initial),
            optimal_solution: OptimalSolution {
                time: optimal.time,
                xp: optimal.xp,
                z: optimal.z,
                eps: report.final_eps,
                alpha,
                exec_time: report.elapsed.as_secs_f64(),
                iter: report.n_steps(),
                newton_iterations: report.total_iterations(),
            },
        }
    }
}

pub fn save_results_bincode(record: &ResultsRecord, path: &Path) -> Result<(), PersistError> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, record)?;
    writer.flush()?;
    Ok(())
}

pub fn load_results_bincode(path: &Path) -> Result<ResultsRecord, PersistError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

pub fn save_solution_json(traj: &Trajectory, path: &Path) -> Result<(), PersistError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &TrajectoryRecord::from(traj))?;
    writer.flush()?;
    Ok(())
}

pub fn load_solution_json(path: &Path) -> Result<Trajectory, PersistError> {
    let reader = BufReader::new(File::open(path)?);
    let record: TrajectoryRecord = serde_json::from_reader(reader)?;
    record.to_trajectory()
}

/// generic column names xp_0.., z_0..
fn variable_names(traj: &Trajectory) -> Vec<String> {
    (0..traj.n_x())
        .map(|i| format!("xp_{}", i))
        .chain((0..traj.n_z()).map(|i| format!("z_{}", i)))
        .collect()
}

fn stacked(traj: &Trajectory) -> DMatrix<f64> {
    let (n_x, n_z, n) = (traj.n_x(), traj.n_z(), traj.n_nodes());
    DMatrix::from_fn(n_x + n_z, n, |i, j| {
        if i < n_x { traj.xp()[(i, j)] } else { traj.z()[(i - n_x, j)] }
    })
}

/// table `t, xp_0.., z_0..`; `.csv` is comma separated, anything else tab separated
pub fn save_solution_table(traj: &Trajectory, path: &Path) -> Result<(), PersistError> {
    let names = variable_names(traj);
    let data = stacked(traj);
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => save_matrix_to_csv(&data, &names, path, traj.time(), "t")?,
        _ => save_matrix_to_file(&data, &names, path, traj.time(), "t")?,
    }
    Ok(())
}

/// reads a csv table written by [`save_solution_table`]
pub fn load_solution_table(path: &Path) -> Result<Trajectory, PersistError> {
    let (headers, time, data) = load_matrix_from_csv(path)?;
    let n_x = headers.iter().filter(|h| h.starts_with("xp_")).count();
    let n_z = headers.iter().filter(|h| h.starts_with("z_")).count();
    if n_x + n_z != data.nrows() {
        return Err(PersistError::Invalid(format!(
            "table has {} columns but {} named variables",
            data.nrows(),
            n_x + n_z
        )));
    }
    let xp = data.rows(0, n_x).into_owned();
    let z = data.rows(n_x, n_z).into_owned();
    Trajectory::new(time, xp, z).map_err(|e| PersistError::Invalid(e.to_string()))
}
