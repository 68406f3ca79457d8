//! Runs a shipped optimal-control problem through the barrier continuation and stores the results.
use crate::Utils::persistence::{
    PersistError, ResultsRecord, save_results_bincode, save_solution_json, save_solution_table,
};
use crate::numerical::BVP_DAE::BVP_DAE_traits::{BvpDaeProblem, ProblemContract};
use crate::numerical::BVP_DAE::continuation::{ContinuationFailure, ContinuationReport, run, run_batch};
use crate::numerical::BVP_DAE::problems::OCProblemEnum;
use crate::numerical::BVP_DAE::solver_options::TaskConfig;
use log::{error, info};
use std::path::Path;
use strum::IntoEnumIterator;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExampleError {
    #[error(transparent)]
    Continuation(#[from] ContinuationFailure),
    #[error("failed to save results: {0}")]
    Persist(#[from] PersistError),
}

/// Solves `problem` with the options of `config`. With `out_dir` the binary snapshot,
/// the JSON document and a csv table are written there.
pub fn run_example(
    problem: OCProblemEnum,
    config: &TaskConfig,
    out_dir: Option<&Path>,
) -> Result<ContinuationReport, ExampleError> {
    let name = problem.to_string();
    info!("solving '{}' ({})", name, problem.name());
    let mut contract = ProblemContract::new(problem, config.continuation.eps0);
    let report = run(&mut contract, None, &config.solver, &config.continuation)?;
    println!("{}", report.summary_table());
    println!(
        "{}: eps = {:.3e}, {} Newton iterations, solve time {:.3} s",
        name,
        report.final_eps,
        report.total_iterations(),
        report.elapsed.as_secs_f64()
    );
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir).map_err(PersistError::from)?;
        let record = ResultsRecord::from_report(&report, config.continuation.alpha);
        save_results_bincode(&record, &dir.join(format!("{}_results.bin", name)))?;
        save_solution_json(&report.trajectory, &dir.join(format!("{}_solution.json", name)))?;
        save_solution_table(&report.trajectory, &dir.join(format!("{}_solution.csv", name)))?;
        info!("results saved to {}", dir.display());
    }
    Ok(report)
}

/// Solves every shipped problem in parallel and reports which of them converged.
pub fn run_all_examples(config: &TaskConfig) -> Vec<(String, bool)> {
    let mut contracts: Vec<ProblemContract<OCProblemEnum>> = OCProblemEnum::iter()
        .map(|p| ProblemContract::new(p, config.continuation.eps0))
        .collect();
    let results = run_batch(&mut contracts, &config.solver, &config.continuation);
    contracts
        .iter()
        .zip(results)
        .map(|(contract, result)| {
            let name = contract.problem().to_string();
            match result {
                Ok(report) => {
                    info!("{}: eps = {:.3e}", name, report.final_eps);
                    (name, true)
                }
                Err(failure) => {
                    error!("{}: {}", name, failure);
                    (name, false)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Utils::persistence::{load_results_bincode, load_solution_json, load_solution_table};
    use crate::numerical::BVP_DAE::problems::DoubleIntegrator;
    use std::str::FromStr;

    #[test]
    fn problems_are_selected_by_name() {
        assert!(matches!(
            OCProblemEnum::from_str("double_integrator"),
            Ok(OCProblemEnum::DoubleIntegrator(_))
        ));
        assert!(matches!(OCProblemEnum::from_str("zermelo"), Ok(OCProblemEnum::Zermelo(_))));
        assert!(OCProblemEnum::from_str("brachistochrone").is_err());
        assert_eq!(OCProblemEnum::iter().count(), 2);
    }

    #[test]
    fn example_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = TaskConfig::from_toml_str("[continuation]\nalpha = 0.1\ntol = 1e-4\n").unwrap();
        let problem = OCProblemEnum::DoubleIntegrator(DoubleIntegrator {
            n_nodes: 21,
            ..Default::default()
        });
        let report = run_example(problem, &config, Some(dir.path())).unwrap();
        let record = load_results_bincode(&dir.path().join("double_integrator_results.bin")).unwrap();
        assert_eq!(record.optimal_solution.alpha, 0.1);
        assert_eq!(record.optimal_solution.to_trajectory().unwrap(), report.trajectory);
        let json = load_solution_json(&dir.path().join("double_integrator_solution.json")).unwrap();
        assert_eq!(json, report.trajectory);
        let table = load_solution_table(&dir.path().join("double_integrator_solution.csv")).unwrap();
        assert_eq!(table, report.trajectory);
    }
}
