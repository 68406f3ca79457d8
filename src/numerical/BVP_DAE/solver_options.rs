use crate::numerical::BVP_DAE::BVP_DAE_errors::BvpDaeError;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Test a damped trial point y - lambda * dy has to pass to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAcceptance {
    /// ||F(y - lambda dy)||_2 < ||F(y)||_2
    ResidualNorm,
    /// natural monotonicity test with the current Jacobian: ||J(y)^-1 F(y - lambda dy)||_2 < ||dy||_2
    NaturalLevel,
    /// either of the two decreases
    #[default]
    Either,
}

/// Options of one Newton solve. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// check collocation defects and algebraic+boundary residuals against `res_tol` separately
    pub control_odes_error: bool,
    /// 0 - warnings only, 1 - summary per solve, 2 - table per iteration
    pub display: u8,
    /// residual tolerance: infinity norm of each group with `control_odes_error`, Euclidean norm of
    /// the whole residual otherwise
    pub res_tol: f64,
    pub max_iter: usize,
    /// maximal number of step halvings per Newton iteration
    pub max_damp_iter: usize,
    /// factor applied to the step length on every rejected trial
    pub damp_factor: f64,
    /// smallest admissible step length
    pub min_step: f64,
    /// relative decrease (by the measure of `step_acceptance`) below which the iteration is stagnating
    pub stagnation_tol: f64,
    pub step_acceptance: StepAcceptance,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            control_odes_error: false,
            display: 0,
            res_tol: 1e-6,
            max_iter: 50,
            max_damp_iter: 10,
            damp_factor: 0.5,
            min_step: 1e-8,
            stagnation_tol: 1e-12,
            step_acceptance: StepAcceptance::default(),
        }
    }
}

impl SolverOptions {
    pub fn new(control_odes_error: bool, display: u8, res_tol: f64) -> Self {
        SolverOptions {
            control_odes_error,
            display,
            res_tol,
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, BvpDaeError> {
        let options: SolverOptions =
            toml::from_str(s).map_err(|e| BvpDaeError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), BvpDaeError> {
        if !(self.res_tol > 0.0) {
            return Err(BvpDaeError::Config(format!("res_tol must be positive, got {}", self.res_tol)));
        }
        if self.max_iter == 0 {
            return Err(BvpDaeError::Config("max_iter must be at least 1".to_string()));
        }
        if !(self.damp_factor > 0.0 && self.damp_factor < 1.0) {
            return Err(BvpDaeError::Config(format!(
                "damp_factor must lie in (0, 1), got {}",
                self.damp_factor
            )));
        }
        if !(self.min_step > 0.0 && self.min_step <= 1.0) {
            return Err(BvpDaeError::Config(format!("min_step must lie in (0, 1], got {}", self.min_step)));
        }
        Ok(())
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.display {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

/// Parameters of the barrier continuation: eps_k = eps0 * alpha^k until eps_k <= tol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuationOptions {
    pub eps0: f64,
    pub alpha: f64,
    pub tol: f64,
    /// keep the converged trajectory of every continuation step in the report
    pub keep_iterates: bool,
}

impl Default for ContinuationOptions {
    fn default() -> Self {
        ContinuationOptions {
            eps0: 1.0,
            alpha: 0.5,
            tol: 1e-8,
            keep_iterates: false,
        }
    }
}

impl ContinuationOptions {
    pub fn new(eps0: f64, alpha: f64, tol: f64) -> Self {
        ContinuationOptions {
            eps0,
            alpha,
            tol,
            keep_iterates: false,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, BvpDaeError> {
        let options: ContinuationOptions =
            toml::from_str(s).map_err(|e| BvpDaeError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), BvpDaeError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(BvpDaeError::Config(format!("alpha must lie in (0, 1), got {}", self.alpha)));
        }
        if !(self.eps0 > 0.0) || !self.eps0.is_finite() {
            return Err(BvpDaeError::Config(format!("eps0 must be positive, got {}", self.eps0)));
        }
        if !(self.tol > 0.0) {
            return Err(BvpDaeError::Config(format!("tol must be positive, got {}", self.tol)));
        }
        Ok(())
    }

    /// upper bound on the number of contractions eps <- alpha*eps
    pub fn max_contractions(&self) -> usize {
        if self.eps0 <= self.tol {
            return 0;
        }
        ((self.tol / self.eps0).ln() / self.alpha.ln()).ceil() as usize
    }
}

/// Both option sets, as they appear in a task file:
/// ```toml
/// [solver]
/// control_odes_error = true
/// res_tol = 1e-6
/// [continuation]
/// alpha = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub solver: SolverOptions,
    pub continuation: ContinuationOptions,
}

impl TaskConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, BvpDaeError> {
        let config: TaskConfig = toml::from_str(s).map_err(|e| BvpDaeError::Config(e.to_string()))?;
        config.solver.validate()?;
        config.continuation.validate()?;
        Ok(config)
    }
    pub fn from_file(path: &std::path::Path) -> Result<Self, BvpDaeError> {
        let content = std::fs::read_to_string(path)?;
        TaskConfig::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let opts = SolverOptions::from_toml_str("control_odes_error = true\nres_tol = 1e-9\n").unwrap();
        assert!(opts.control_odes_error);
        assert_eq!(opts.res_tol, 1e-9);
        assert_eq!(opts.max_iter, SolverOptions::default().max_iter);
        assert_eq!(opts.display, 0);
        assert_eq!(opts.step_acceptance, StepAcceptance::Either);
        let opts = SolverOptions::from_toml_str("step_acceptance = \"natural_level\"").unwrap();
        assert_eq!(opts.step_acceptance, StepAcceptance::NaturalLevel);
        assert!(SolverOptions::from_toml_str("step_acceptance = \"armijo\"").is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SolverOptions::from_toml_str("res_tol = -1.0").is_err());
        assert!(ContinuationOptions::from_toml_str("alpha = 1.0").is_err());
        assert!(ContinuationOptions::from_toml_str("alpha = 0.0").is_err());
        assert!(ContinuationOptions::from_toml_str("eps0 = 0.0").is_err());
        assert!(SolverOptions::from_toml_str("res_tol = \"small\"").is_err());
    }

    #[test]
    fn task_config_sections() {
        let cfg = TaskConfig::from_toml_str(
            "[solver]\ndisplay = 2\n[continuation]\nalpha = 0.25\ntol = 1e-6\n",
        )
        .unwrap();
        assert_eq!(cfg.solver.display, 2);
        assert_eq!(cfg.solver.log_level(), LevelFilter::Debug);
        assert_eq!(cfg.continuation.alpha, 0.25);
        assert_eq!(cfg.continuation.eps0, 1.0);
    }

    #[test]
    fn contraction_bound() {
        let c = ContinuationOptions::new(1.0, 0.5, 1e-8);
        assert_eq!(c.max_contractions(), 27);
        let c = ContinuationOptions::new(1e-9, 0.5, 1e-8);
        assert_eq!(c.max_contractions(), 0);
    }
}
