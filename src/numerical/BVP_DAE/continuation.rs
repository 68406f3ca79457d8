//! Barrier continuation: the interior-point outer loop.
//!
//! eps_k = eps0 * alpha^k is driven toward zero. At every value the collocation system
//! is solved by Newton, warm-started from the previous converged trajectory. A failed
//! inner solve aborts the whole continuation: there is no step-size backoff.
use crate::numerical::BVP_DAE::BVP_DAE_traits::{BvpDaeProblem, ProblemContract};
use crate::numerical::BVP_DAE::NR_BVPDAE::{ConvergenceInfo, TerminationReason, solve};
use crate::numerical::BVP_DAE::solver_options::{ContinuationOptions, SolverOptions};
use crate::numerical::BVP_DAE::trajectory::Trajectory;
use log::{error, info};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tabled::{builder::Builder, settings::Style};
use thiserror::Error;

/// Successful continuation.
#[derive(Debug, Clone)]
pub struct ContinuationReport {
    /// converged trajectory at the last eps
    pub trajectory: Trajectory,
    /// the initial guess the continuation started from
    pub initial: Trajectory,
    pub final_eps: f64,
    pub eps_history: Vec<f64>,
    pub infos: Vec<ConvergenceInfo>,
    /// converged trajectory of every step, only with `keep_iterates`
    pub iterates: Vec<Trajectory>,
    /// sum of the Newton solve times
    pub elapsed: Duration,
}

impl ContinuationReport {
    pub fn total_iterations(&self) -> usize {
        self.infos.iter().map(|i| i.iterations).sum()
    }
    pub fn n_steps(&self) -> usize {
        self.infos.len()
    }

    pub fn summary_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["step", "eps", "iterations", "|defects|inf", "|alg+bc|inf", "time, ms"]);
        for (k, info) in self.infos.iter().enumerate() {
            builder.push_record([
                k.to_string(),
                format!("{:.3e}", info.eps),
                info.iterations.to_string(),
                format!("{:.3e}", info.defect_norm),
                format!("{:.3e}", info.algebraic_boundary_norm),
                info.elapsed.as_millis().to_string(),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

/// An inner Newton solve failed; everything known up to that point is kept.
#[derive(Debug, Clone, Error)]
#[error("continuation failed at eps = {eps:.3e}: {}", .info.termination)]
pub struct ContinuationFailure {
    /// eps of the failed solve
    pub eps: f64,
    pub info: ConvergenceInfo,
    /// last successfully converged trajectory, `None` if the first step failed
    pub last_converged: Option<Box<Trajectory>>,
    pub last_converged_eps: Option<f64>,
    /// eps values of all attempted solves, the failing one included
    pub eps_history: Vec<f64>,
    pub infos: Vec<ConvergenceInfo>,
}

/// Runs the continuation. `initial` overrides the problem's own initial guess.
///
/// Invalid options fail at eps0 before anything is solved. Otherwise the contract's eps is
/// left at the value of the last attempted solve.
pub fn run<P: BvpDaeProblem>(
    contract: &mut ProblemContract<P>,
    initial: Option<Trajectory>,
    solver_options: &SolverOptions,
    options: &ContinuationOptions,
) -> Result<ContinuationReport, ContinuationFailure> {
    if let Err(e) = options.validate().and_then(|_| solver_options.validate()) {
        error!("continuation of '{}' not started: {}", contract.problem().name(), e);
        let info = ConvergenceInfo::not_started(TerminationReason::InvalidOptions(e.to_string()), options.eps0);
        return Err(ContinuationFailure {
            eps: options.eps0,
            info,
            last_converged: None,
            last_converged_eps: None,
            eps_history: Vec::new(),
            infos: Vec::new(),
        });
    }
    let initial = initial.unwrap_or_else(|| contract.initialize());
    let mut trajectory = initial.clone();
    let mut eps = options.eps0;
    let mut eps_history = Vec::new();
    let mut infos: Vec<ConvergenceInfo> = Vec::new();
    let mut iterates = Vec::new();
    let mut elapsed = Duration::ZERO;
    let mut last_converged: Option<(Trajectory, f64)> = None;
    info!(
        "continuation of '{}': eps0 = {:.3e}, alpha = {}, tol = {:.3e}, at most {} contractions",
        contract.problem().name(),
        options.eps0,
        options.alpha,
        options.tol,
        options.max_contractions()
    );
    let begin = Instant::now();
    loop {
        contract.set_continuation_parameter(eps);
        eps_history.push(eps);
        let (solution, info) = solve(trajectory, contract, solver_options);
        elapsed += info.elapsed;
        if !info.success {
            error!("continuation aborted at eps = {:.3e}: {}", eps, info.termination);
            let (last_converged, last_converged_eps) = match last_converged {
                Some((traj, e)) => (Some(Box::new(traj)), Some(e)),
                None => (None, None),
            };
            return Err(ContinuationFailure {
                eps,
                info,
                last_converged,
                last_converged_eps,
                eps_history,
                infos,
            });
        }
        infos.push(info);
        if options.keep_iterates {
            iterates.push(solution.clone());
        }
        if eps <= options.tol {
            info!(
                "continuation finished: eps = {:.3e}, {} steps, {} Newton iterations, {:?} (wall {:?})",
                eps,
                infos.len(),
                infos.iter().map(|i| i.iterations).sum::<usize>(),
                elapsed,
                begin.elapsed()
            );
            let report = ContinuationReport {
                trajectory: solution,
                initial,
                final_eps: eps,
                eps_history,
                infos,
                iterates,
                elapsed,
            };
            if solver_options.display >= 1 {
                info!("\n{}", report.summary_table());
            }
            return Ok(report);
        }
        last_converged = Some((solution.clone(), eps));
        trajectory = solution;
        eps *= options.alpha;
    }
}

/// Runs independent continuations in parallel, one per contract. Results keep the input order.
pub fn run_batch<P: BvpDaeProblem + Send>(
    contracts: &mut [ProblemContract<P>],
    solver_options: &SolverOptions,
    options: &ContinuationOptions,
) -> Vec<Result<ContinuationReport, ContinuationFailure>> {
    contracts
        .par_iter_mut()
        .map(|contract| run(contract, None, solver_options, options))
        .collect()
}
