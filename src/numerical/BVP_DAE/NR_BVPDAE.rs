/*
Damped Newton-Raphson for the collocation system of a BVP-DAE at one fixed value of the barrier weight eps.

  Init     - residual at the initial trajectory; if it already meets the tolerance no linear system is solved
  Iterate  - J(y_k) * dy = F(y_k) is solved by sparse LU, then y_{k+1} = y_k - lambda * dy where lambda starts at 1
             and is multiplied by damp_factor until the trial point passes the acceptance test: decrease of
             ||F||_2, decrease of the natural level ||J(y_k)^-1 F||_2 (Deuflhard's monotonicity test, the LU of
             J(y_k) is reused), or either of them
  Converged  - with control_odes_error: ||defects||_inf and ||algebraic, boundary||_inf below res_tol,
               otherwise ||F||_2 below res_tol
  Diverged   - model error, singular Jacobian, iteration budget exhausted or stagnation (no admissible damping
               coefficient or no relative progress)
Failures are returned inside ConvergenceInfo; the caller (continuation driver) decides what is fatal.
*/
use crate::numerical::BVP_DAE::BVP_DAE_errors::{BvpDaeError, ModelError};
use crate::numerical::BVP_DAE::BVP_DAE_traits::{BvpDaeProblem, ProblemContract};
use crate::numerical::BVP_DAE::collocation::{
    CollocationResidual, SystemLayout, assemble_jacobian, assemble_residual,
};
use crate::numerical::BVP_DAE::solver_options::{SolverOptions, StepAcceptance};
use crate::numerical::BVP_DAE::sparse_blocks::{BlockSparseMatrix, check_jacobian_memory};
use crate::numerical::BVP_DAE::trajectory::Trajectory;
use crate::somelinalg::linear_sys_diagnostics::diagnose_singular_jacobian;
use faer::col::Col;
use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::Lu;
use log::{debug, info, warn};
use nalgebra::DVector;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tabled::{builder::Builder, settings::Style};

type faer_col = Col<f64>;
type faer_lu = Lu<usize, f64>;

/// Why a Newton solve stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationReason {
    Converged,
    /// the solve was not started
    InvalidOptions(String),
    /// a problem callback returned a bad shape or non-finite values at the current iterate
    ModelError(ModelError),
    /// sparse LU failed or produced a non-finite step
    SingularJacobian(String),
    MaxIterations,
    /// no damping coefficient reduced the residual, or the reduction was negligible
    Stagnation { step_length: f64 },
}

impl TerminationReason {
    pub fn is_success(&self) -> bool {
        matches!(self, TerminationReason::Converged)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Converged => write!(f, "converged"),
            TerminationReason::InvalidOptions(msg) => write!(f, "invalid options: {}", msg),
            TerminationReason::ModelError(e) => write!(f, "model error: {}", e),
            TerminationReason::SingularJacobian(msg) => write!(f, "singular Jacobian: {}", msg),
            TerminationReason::MaxIterations => write!(f, "maximum number of iterations reached"),
            TerminationReason::Stagnation { step_length } => {
                write!(f, "residual stagnates (last step length {:.3e})", step_length)
            }
        }
    }
}

/// Outcome of one Newton solve. Created once per solve and never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceInfo {
    pub success: bool,
    /// number of Newton iterations (linear solves with an accepted or rejected step)
    pub iterations: usize,
    /// infinity norm of the residual at the initial and at every accepted iterate
    pub residual_history: Vec<f64>,
    /// damping coefficient of every accepted step
    pub step_lengths: Vec<f64>,
    pub termination: TerminationReason,
    /// infinity norm of the collocation defects at the returned trajectory
    pub defect_norm: f64,
    /// infinity norm of algebraic and boundary residuals at the returned trajectory
    pub algebraic_boundary_norm: f64,
    pub eps: f64,
    pub elapsed: Duration,
    pub statistics: HashMap<String, usize>,
}

impl ConvergenceInfo {
    /// outcome of a solve that was refused before the first residual evaluation
    pub fn not_started(termination: TerminationReason, eps: f64) -> Self {
        ConvergenceInfo {
            success: false,
            iterations: 0,
            residual_history: Vec::new(),
            step_lengths: Vec::new(),
            termination,
            defect_norm: f64::NAN,
            algebraic_boundary_norm: f64::NAN,
            eps,
            elapsed: Duration::ZERO,
            statistics: HashMap::new(),
        }
    }

    /// classification of a failed solve; `None` on success
    pub fn error(&self) -> Option<BvpDaeError> {
        match &self.termination {
            TerminationReason::Converged => None,
            TerminationReason::InvalidOptions(msg) => Some(BvpDaeError::Config(msg.clone())),
            TerminationReason::ModelError(e) => Some(BvpDaeError::Model(e.clone())),
            TerminationReason::SingularJacobian(msg) => Some(BvpDaeError::LinearAlgebra(msg.clone())),
            reason => Some(BvpDaeError::Convergence {
                iterations: self.iterations,
                reason: reason.to_string(),
                residual_history: self.residual_history.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct IterationRecord {
    iteration: usize,
    residual: f64,
    defect: f64,
    algebraic: f64,
    step_length: f64,
    damping_trials: usize,
}

/// Solves the collocation system at the contract's current eps, starting from `trajectory`.
pub fn solve<P: BvpDaeProblem>(
    trajectory: Trajectory,
    contract: &ProblemContract<P>,
    options: &SolverOptions,
) -> (Trajectory, ConvergenceInfo) {
    NRBVPDAE::new(contract, options).solve(trajectory)
}

pub struct NRBVPDAE<'a, P: BvpDaeProblem> {
    contract: &'a ProblemContract<P>,
    options: &'a SolverOptions,
    calc_statistics: HashMap<String, usize>,
    records: Vec<IterationRecord>,
}

impl<'a, P: BvpDaeProblem> NRBVPDAE<'a, P> {
    pub fn new(contract: &'a ProblemContract<P>, options: &'a SolverOptions) -> Self {
        let vec_of_tuples = vec![
            ("number of iterations".to_string(), 0),
            ("number of solving linear systems".to_string(), 0),
            ("number of jacobians recalculations".to_string(), 0),
            ("number of residual evaluations".to_string(), 0),
        ];
        NRBVPDAE {
            contract,
            options,
            calc_statistics: vec_of_tuples.into_iter().collect(),
            records: Vec::new(),
        }
    }

    fn count(&mut self, key: &str) {
        *self.calc_statistics.entry(key.to_string()).or_insert(0) += 1;
    }

    fn converged(&self, res: &CollocationResidual) -> bool {
        let tol = self.options.res_tol;
        if self.options.control_odes_error {
            res.defect_norm() <= tol && res.algebraic_boundary_norm() <= tol
        } else {
            res.norm_l2() <= tol
        }
    }

    fn residual(&mut self, traj: &Trajectory) -> Result<CollocationResidual, ModelError> {
        self.count("number of residual evaluations");
        assemble_residual(self.contract, traj)
    }

    fn factorize(&mut self, jac: &BlockSparseMatrix) -> Result<faer_lu, String> {
        let jac_faer = jac.to_faer().map_err(|e| e.to_string())?;
        jac_faer
            .sp_lu()
            .map_err(|e| format!("sparse LU factorization failed: {:?}", e))
    }

    /// J^-1 * rhs with an existing factorization
    fn lu_solve(&mut self, lu: &faer_lu, rhs: &DVector<f64>) -> DVector<f64> {
        self.count("number of solving linear systems");
        let rhs_faer = faer_col::from_fn(rhs.len(), |i| rhs[i]);
        let sol = lu.solve(rhs_faer.as_mat());
        DVector::from_fn(rhs.len(), |i, _| *sol.get(i, 0))
    }

    /// undamped Newton step: solution of J * dy = F
    fn newton_step(&mut self, lu: &faer_lu, res: &CollocationResidual) -> Result<DVector<f64>, String> {
        let step = self.lu_solve(lu, &res.to_vector());
        if step.iter().any(|v| !v.is_finite()) {
            return Err("Newton step contains non-finite values".to_string());
        }
        Ok(step)
    }

    /// Relative decrease achieved by a trial point, measured the way `step_acceptance`
    /// prescribes; the trial is acceptable iff the result is positive.
    fn relative_decrease(
        &mut self,
        lu: &faer_lu,
        merit: f64,
        natural_level: f64,
        trial_res: &CollocationResidual,
    ) -> f64 {
        let by_residual = || (merit - trial_res.norm_l2()) / merit.max(f64::MIN_POSITIVE);
        match self.options.step_acceptance {
            StepAcceptance::ResidualNorm => by_residual(),
            StepAcceptance::NaturalLevel => {
                let level = self.lu_solve(lu, &trial_res.to_vector()).norm();
                (natural_level - level) / natural_level.max(f64::MIN_POSITIVE)
            }
            StepAcceptance::Either => {
                let level = self.lu_solve(lu, &trial_res.to_vector()).norm();
                let by_level = (natural_level - level) / natural_level.max(f64::MIN_POSITIVE);
                by_residual().max(by_level)
            }
        }
    }

    fn finish(
        &self,
        traj: Trajectory,
        res: Option<&CollocationResidual>,
        termination: TerminationReason,
        iterations: usize,
        residual_history: Vec<f64>,
        begin: Instant,
    ) -> (Trajectory, ConvergenceInfo) {
        let (defect_norm, algebraic_boundary_norm) = match res {
            Some(r) => (r.defect_norm(), r.algebraic_boundary_norm()),
            None => (f64::NAN, f64::NAN),
        };
        let eps = self.contract.continuation_parameter();
        let info = ConvergenceInfo {
            success: termination.is_success(),
            iterations,
            residual_history,
            step_lengths: self.records.iter().map(|r| r.step_length).collect(),
            termination,
            defect_norm,
            algebraic_boundary_norm,
            eps,
            elapsed: begin.elapsed(),
            statistics: self.calc_statistics.clone(),
        };
        if info.success {
            if self.options.display >= 1 {
                info!(
                    "eps = {:.3e}: converged in {} iterations, defects {:.3e}, algebraic+bc {:.3e}",
                    eps, iterations, defect_norm, algebraic_boundary_norm
                );
            }
        } else {
            warn!(
                "eps = {:.3e}: Newton solve failed after {} iterations: {}",
                eps, iterations, info.termination
            );
        }
        if self.options.display >= 2 {
            self.iteration_table();
            self.statistics_table();
        }
        (traj, info)
    }

    pub fn solve(mut self, trajectory: Trajectory) -> (Trajectory, ConvergenceInfo) {
        let begin = Instant::now();
        let opts = self.options;
        if let Err(e) = opts.validate() {
            let reason = TerminationReason::InvalidOptions(e.to_string());
            return self.finish(trajectory, None, reason, 0, Vec::new(), begin);
        }
        let layout = SystemLayout::of(&trajectory);
        if layout.n_x != self.contract.n_x() || layout.n_z != self.contract.n_z() {
            let err = ModelError::ShapeMismatch {
                callback: "trajectory",
                expected_rows: self.contract.n_x(),
                expected_cols: self.contract.n_z(),
                got_rows: layout.n_x,
                got_cols: layout.n_z,
            };
            return self.finish(trajectory, None, TerminationReason::ModelError(err), 0, Vec::new(), begin);
        }
        debug!(
            "solving collocation system: {} unknowns, {} nodes, eps = {:.3e}",
            layout.n_unknowns(),
            layout.n_nodes,
            self.contract.continuation_parameter()
        );
        let mut traj = trajectory;
        let mut res = match self.residual(&traj) {
            Ok(res) => res,
            Err(e) => {
                return self.finish(traj, None, TerminationReason::ModelError(e), 0, Vec::new(), begin);
            }
        };
        let mut history = vec![res.norm_inf()];
        let mut iterations = 0;
        let mut memory_checked = false;

        loop {
            if self.converged(&res) {
                return self.finish(traj, Some(&res), TerminationReason::Converged, iterations, history, begin);
            }
            if iterations >= opts.max_iter {
                return self.finish(traj, Some(&res), TerminationReason::MaxIterations, iterations, history, begin);
            }
            iterations += 1;
            self.count("number of iterations");

            let jac = match assemble_jacobian(self.contract, &traj) {
                Ok(jac) => jac,
                Err(e) => {
                    return self.finish(traj, Some(&res), TerminationReason::ModelError(e), iterations, history, begin);
                }
            };
            self.count("number of jacobians recalculations");
            if !memory_checked {
                check_jacobian_memory(jac.stored_entries());
                memory_checked = true;
            }
            let factorized = match self.factorize(&jac) {
                Ok(lu) => self.newton_step(&lu, &res).map(|step| (lu, step)),
                Err(msg) => Err(msg),
            };
            let (lu, step) = match factorized {
                Ok(pair) => pair,
                Err(msg) => {
                    diagnose_singular_jacobian(&jac);
                    return self.finish(
                        traj,
                        Some(&res),
                        TerminationReason::SingularJacobian(msg),
                        iterations,
                        history,
                        begin,
                    );
                }
            };

            // damping: accept the first trial that passes the acceptance test
            let merit = res.norm_l2();
            let natural_level = step.norm();
            let y = traj.to_unknowns();
            let mut lambda = 1.0;
            let mut trials = 0;
            let mut accepted: Option<(Trajectory, CollocationResidual, f64)> = None;
            while trials <= opts.max_damp_iter && lambda >= opts.min_step {
                trials += 1;
                let trial = traj.with_unknowns(&(&y - &step * lambda));
                match self.residual(&trial) {
                    Ok(trial_res) => {
                        let decrease = self.relative_decrease(&lu, merit, natural_level, &trial_res);
                        if decrease > 0.0 {
                            accepted = Some((trial, trial_res, decrease));
                            break;
                        }
                        debug!(
                            "damping coefficient {:.3e} rejected: |F|2 {:.3e} vs {:.3e}",
                            lambda,
                            trial_res.norm_l2(),
                            merit
                        );
                    }
                    Err(e) => {
                        debug!("damping coefficient {:.3e} rejected: {}", lambda, e);
                    }
                }
                lambda *= opts.damp_factor;
            }

            let (new_traj, new_res, relative_decrease) = match accepted {
                Some(pair) => pair,
                None => {
                    return self.finish(
                        traj,
                        Some(&res),
                        TerminationReason::Stagnation { step_length: lambda },
                        iterations,
                        history,
                        begin,
                    );
                }
            };
            traj = new_traj;
            res = new_res;
            history.push(res.norm_inf());
            debug!(
                "iteration {}: |F|inf = {:.3e}, damping coefficient {:.3e}",
                iterations,
                res.norm_inf(),
                lambda
            );
            self.records.push(IterationRecord {
                iteration: iterations,
                residual: res.norm_inf(),
                defect: res.defect_norm(),
                algebraic: res.algebraic_boundary_norm(),
                step_length: lambda,
                damping_trials: trials,
            });
            if relative_decrease < opts.stagnation_tol && !self.converged(&res) {
                return self.finish(
                    traj,
                    Some(&res),
                    TerminationReason::Stagnation { step_length: lambda },
                    iterations,
                    history,
                    begin,
                );
            }
        }
    }

    fn iteration_table(&self) {
        if self.records.is_empty() {
            return;
        }
        let mut builder = Builder::default();
        builder.push_record([
            "iteration",
            "|F|inf",
            "|defects|inf",
            "|alg+bc|inf",
            "step length",
            "trials",
        ]);
        for r in &self.records {
            builder.push_record([
                r.iteration.to_string(),
                format!("{:.3e}", r.residual),
                format!("{:.3e}", r.defect),
                format!("{:.3e}", r.algebraic),
                format!("{:.3e}", r.step_length),
                r.damping_trials.to_string(),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        info!("\n{}", table);
    }

    fn statistics_table(&self) {
        let mut table = Builder::from(self.calc_statistics.clone()).build();
        table.with(Style::modern_rounded());
        info!("\n CALC STATISTICS \n{}", table);
    }
}
