//! Error taxonomy of the BVP-DAE solver.
//!
//! Newton-level failures never escape as panics: they are turned into a
//! [`TerminationReason`](crate::numerical::BVP_DAE::NR_BVPDAE::TerminationReason) inside
//! `ConvergenceInfo`. The continuation driver lifts a failed inner solve into
//! [`ContinuationFailure`](crate::numerical::BVP_DAE::continuation::ContinuationFailure).
use thiserror::Error;

/// Problem callback returned something the assembler cannot use.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{callback} returned shape ({got_rows}, {got_cols}), expected ({expected_rows}, {expected_cols})")]
    ShapeMismatch {
        callback: &'static str,
        expected_rows: usize,
        expected_cols: usize,
        got_rows: usize,
        got_cols: usize,
    },
    #[error("{callback} returned {got} Jacobian blocks, expected one per grid node ({expected})")]
    BlockCountMismatch {
        callback: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{callback} returned a non-finite value at row {row}, column {col}")]
    NonFinite {
        callback: &'static str,
        row: usize,
        col: usize,
    },
}

/// Everything the core can fail with.
#[derive(Debug, Error)]
pub enum BvpDaeError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("linear algebra failure: {0}")]
    LinearAlgebra(String),
    #[error("convergence failure after {iterations} iterations: {reason}")]
    Convergence {
        iterations: usize,
        reason: String,
        residual_history: Vec<f64>,
    },
    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
