//! numerical solvers
/// Interior-point solver for optimal control: BVP-DAE collocation, damped Newton, barrier continuation
///
/// Example
/// ```no_run
/// use RustedIPOC::numerical::BVP_DAE::BVP_DAE_traits::ProblemContract;
/// use RustedIPOC::numerical::BVP_DAE::continuation::run;
/// use RustedIPOC::numerical::BVP_DAE::problems::Zermelo;
/// use RustedIPOC::numerical::BVP_DAE::solver_options::{ContinuationOptions, SolverOptions};
///
/// let mut contract = ProblemContract::new(Zermelo::default(), 1.0);
/// let solver_options = SolverOptions::new(true, 1, 1e-6);
/// let report = run(&mut contract, None, &solver_options, &ContinuationOptions::default());
/// ```
pub mod BVP_DAE;
