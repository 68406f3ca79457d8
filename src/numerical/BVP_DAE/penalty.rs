//! Logarithmic barrier for inequality constraints written as `c(x) < 0`.

/// Value (`d = 0`), first (`d = 1`) or second (`d = 2`) derivative of `-ln(-x)`.
///
/// Outside the admissible domain (`x >= 0`) every mode returns `+inf`, so the
/// caller sees a non-finite residual instead of a silently wrong number.
/// Derivative orders above 2 are identically zero.
pub fn log_pen(x: f64, d: u8) -> f64 {
    if !(x < 0.0) {
        return f64::INFINITY;
    }
    match d {
        0 => -(-x).ln(),
        1 => -1.0 / x,
        2 => 1.0 / (x * x),
        _ => 0.0,
    }
}

/// Box constraint `lower < u < upper` penalised by `eps * (log_pen(u - upper) + log_pen(lower - u))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxBarrier {
    pub lower: f64,
    pub upper: f64,
}

impl BoxBarrier {
    pub fn new(lower: f64, upper: f64) -> Self {
        BoxBarrier { lower, upper }
    }
    /// d/du of the weighted barrier
    pub fn gradient(&self, u: f64, eps: f64) -> f64 {
        eps * log_pen(u - self.upper, 1) - eps * log_pen(self.lower - u, 1)
    }
    /// d²/du² of the weighted barrier
    pub fn hessian(&self, u: f64, eps: f64) -> f64 {
        eps * log_pen(u - self.upper, 2) + eps * log_pen(self.lower - u, 2)
    }
    pub fn contains(&self, u: f64) -> bool {
        u > self.lower && u < self.upper
    }
}
