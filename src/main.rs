#![allow(non_snake_case)]
use RustedIPOC::Examples::ocp_examples::{run_all_examples, run_example};
use RustedIPOC::Utils::logger::{init_logger, log_file_name};
use RustedIPOC::numerical::BVP_DAE::problems::OCProblemEnum;
use RustedIPOC::numerical::BVP_DAE::solver_options::{SolverOptions, TaskConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

const USAGE: &str = "usage: RustedIPOC <double_integrator|zermelo|all> [task.toml] [output dir]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(example) = args.first() else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };
    let config = match args.get(1) {
        Some(path) => match TaskConfig::from_file(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        // the settings of the reference runs: both residual groups checked, summary per step
        None => TaskConfig {
            solver: SolverOptions::new(true, 1, 1e-6),
            ..Default::default()
        },
    };
    let out_dir = args.get(2).map(PathBuf::from);
    let log_file = out_dir.as_deref().map(log_file_name);
    if let Some(dir) = out_dir.as_deref() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("cannot create {}: {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }
    init_logger(config.solver.log_level(), log_file.as_deref());

    if example == "all" {
        let results = run_all_examples(&config);
        for (name, ok) in &results {
            println!("{:<20} {}", name, if *ok { "converged" } else { "failed" });
        }
        return if results.iter().all(|(_, ok)| *ok) { ExitCode::SUCCESS } else { ExitCode::FAILURE };
    }
    let problem = match OCProblemEnum::from_str(example) {
        Ok(problem) => problem,
        Err(_) => {
            eprintln!("unknown example '{}'\n{}", example, USAGE);
            return ExitCode::FAILURE;
        }
    };
    match run_example(problem, &config, out_dir.as_deref()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
