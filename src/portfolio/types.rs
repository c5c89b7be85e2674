//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]}{\sigma_p}
//! $$
//!
//! Shared enums and result containers for portfolio evaluation and optimization.

/// Annualized performance of one weight vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Performance {
  /// `252 * sum_i(w_i * mean_i)`.
  pub annual_return: f64,
  /// `sqrt(w^T (252 * Sigma) w)`.
  pub annual_volatility: f64,
  /// `annual_return / annual_volatility`, no risk-free rate.
  pub sharpe_ratio: f64,
}

impl Performance {
  /// True when the Sharpe ratio or volatility is not a finite number
  /// (zero-variance portfolio or round-off below zero variance).
  pub fn is_degenerate(&self) -> bool {
    !self.sharpe_ratio.is_finite() || !self.annual_volatility.is_finite()
  }
}

/// Supported max-Sharpe solvers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverMethod {
  /// Sequential quadratic programming with bound and equality constraints.
  #[default]
  Slsqp,
  /// Softmax-reparameterized weights with a sum penalty, minimized by Nelder-Mead.
  ///
  /// Every weight stays strictly positive, so on a flat Sharpe ridge the
  /// result keeps a share of assets the objective is indifferent to.
  PenaltyNelderMead,
}

impl SolverMethod {
  /// Parse a string into a [`SolverMethod`]. Unknown names select
  /// [`SolverMethod::Slsqp`].
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "penalty" | "nelder-mead" | "neldermead" | "softmax" => Self::PenaltyNelderMead,
      _ => Self::Slsqp,
    }
  }
}

/// Why the solver stopped.
#[derive(Clone, Debug, PartialEq)]
pub enum SolverStatus {
  /// Step or objective change fell below tolerance.
  Converged,
  /// Iteration budget exhausted.
  MaxIterations,
  /// No step along the search direction decreased the objective.
  LineSearchFailed,
  /// The objective is not finite at the returned point.
  NonFiniteObjective,
  /// The underlying optimizer returned an error.
  Failed(String),
}

/// Raw solver output. The weights are surfaced as found, even when the solver
/// did not converge.
#[derive(Clone, Debug)]
pub struct SolverResult {
  /// Weights at the returned point.
  pub weights: Vec<f64>,
  /// Objective value `-sharpe` at `weights`.
  pub objective: f64,
  /// Outer iterations performed.
  pub iterations: usize,
  /// Objective evaluations, finite-difference probes included.
  pub evaluations: usize,
  /// Whether the solver met its convergence criterion.
  pub converged: bool,
  pub status: SolverStatus,
  /// `|sum(w) - 1| + sum(max(0, -w_i)) + sum(max(0, w_i - 1))`.
  pub constraint_violation: f64,
}

impl SolverResult {
  /// Sharpe ratio implied by the objective.
  pub fn sharpe_ratio(&self) -> f64 {
    -self.objective
  }
}

pub(crate) fn constraint_violation(w: &[f64]) -> f64 {
  let sum: f64 = w.iter().sum();
  let bounds: f64 = w
    .iter()
    .map(|&wi| (-wi).max(0.0) + (wi - 1.0).max(0.0))
    .sum();
  (sum - 1.0).abs() + bounds
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn method_names_are_case_insensitive() {
    assert_eq!(SolverMethod::from_str("penalty"), SolverMethod::PenaltyNelderMead);
    assert_eq!(SolverMethod::from_str("Nelder-Mead"), SolverMethod::PenaltyNelderMead);
    assert_eq!(SolverMethod::from_str("SLSQP"), SolverMethod::Slsqp);
    assert_eq!(SolverMethod::from_str("unknown"), SolverMethod::Slsqp);
  }

  #[test]
  fn violation_sums_equality_and_bound_breaches() {
    assert_eq!(constraint_violation(&[0.5, 0.5]), 0.0);
    assert!((constraint_violation(&[1.2, -0.1]) - 0.4).abs() < 1e-12);
  }
}
