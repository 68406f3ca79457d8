//!
//! # BVP_DAE - interior-point solver for constrained optimal control
//!
//! Solves optimal-control problems with inequality constraints through the necessary
//! conditions of Pontryagin's principle, written as a boundary value problem for a
//! differential-algebraic system. Constraints are moved into the Hamiltonian as
//! logarithmic barriers weighted by eps, and eps is driven to zero by continuation.
//!
//! ## Pipeline
//! - `collocation`: trapezoidal discretization, residual and block-sparse Jacobian
//! - `NR_BVPDAE`: damped Newton on the discretized system (faer sparse LU)
//! - `continuation`: eps_k = eps0 * alpha^k, warm starts, abort on the first failure
//!
//! ## Example
//! ```no_run
//! use RustedIPOC::numerical::BVP_DAE::BVP_DAE_traits::ProblemContract;
//! use RustedIPOC::numerical::BVP_DAE::continuation::run;
//! use RustedIPOC::numerical::BVP_DAE::problems::DoubleIntegrator;
//! use RustedIPOC::numerical::BVP_DAE::solver_options::{ContinuationOptions, SolverOptions};
//!
//! let mut contract = ProblemContract::new(DoubleIntegrator::default(), 1.0);
//! let solver_options = SolverOptions::new(true, 1, 1e-6);
//! let options = ContinuationOptions::new(1.0, 0.5, 1e-8);
//! match run(&mut contract, None, &solver_options, &options) {
//!     Ok(report) => println!("{}", report.summary_table()),
//!     Err(failure) => println!("{}", failure),
//! }
//! ```
/// error types of the solver
pub mod BVP_DAE_errors;
/// problem contract: the trait every optimal-control problem implements
pub mod BVP_DAE_traits;
/// Newton-Raphson with damping for the collocation system
pub mod NR_BVPDAE;
pub mod collocation;
mod collocation_tests;
pub mod continuation;
/// finite-difference verification of analytic Jacobians
pub mod jacobian_check;
mod jacobian_check_tests;
/// logarithmic barrier functions
pub mod penalty;
pub mod problems;
pub mod solver_options;
pub mod sparse_blocks;
pub mod trajectory;
