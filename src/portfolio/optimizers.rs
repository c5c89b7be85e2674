//! # Portfolio Optimizers
//!
//! $$
//! \mathbf w^\* = \arg\min_{\mathbf w}\ -\frac{\mu_p(\mathbf w)}{\sigma_p(\mathbf w)}
//! \quad\text{s.t.}\quad \sum_i w_i = 1,\ 0 \le w_i \le 1
//! $$
//!
//! Long-only maximum Sharpe ratio allocation.

mod qp;
mod sqp;

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::solver::neldermead::NelderMead;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::PortfolioError;
use crate::error::Result;
use self::sqp::SqpOptions;
use self::sqp::minimize_on_simplex;
use super::data::ReturnSeries;
use super::metrics::PortfolioMoments;
use super::types::SolverMethod;
use super::types::SolverResult;
use super::types::SolverStatus;
use super::types::constraint_violation;

/// Runtime configuration for [`optimize_max_sharpe`].
#[derive(Clone, Debug)]
pub struct SolverConfig {
  pub method: SolverMethod,
  /// Outer iteration budget.
  pub max_iters: usize,
  /// Stop when the objective changes by less than this.
  pub ftol: f64,
  /// Stop when the step infinity-norm is below this.
  pub xtol: f64,
  /// Central finite-difference step for the gradient.
  pub fd_step: f64,
  /// Weight of `(sum(w) - 1)^2` for [`SolverMethod::PenaltyNelderMead`].
  pub penalty: f64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      method: SolverMethod::Slsqp,
      max_iters: 100,
      ftol: 1e-10,
      xtol: 1e-10,
      fd_step: 1e-8,
      penalty: 1e3,
    }
  }
}

impl SolverConfig {
  fn validate(&self) -> Result<()> {
    if self.max_iters == 0 {
      return Err(PortfolioError::InvalidInput(
        "max_iters must be > 0".to_string(),
      ));
    }
    if !(self.fd_step.is_finite() && self.fd_step > 0.0) {
      return Err(PortfolioError::InvalidInput(format!(
        "fd_step must be positive, got {}",
        self.fd_step
      )));
    }
    for (name, v) in [
      ("ftol", self.ftol),
      ("xtol", self.xtol),
      ("penalty", self.penalty),
    ] {
      if !(v.is_finite() && v >= 0.0) {
        return Err(PortfolioError::InvalidInput(format!(
          "{name} must be non-negative, got {v}"
        )));
      }
    }
    Ok(())
  }
}

/// Maximize the Sharpe ratio of a long-only portfolio over `returns`,
/// starting from uniform weights.
pub fn optimize_max_sharpe(returns: &ReturnSeries, config: &SolverConfig) -> Result<SolverResult> {
  let moments = PortfolioMoments::from_returns(returns)?;
  optimize_with_moments(&moments, config)
}

/// Same as [`optimize_max_sharpe`] over precomputed moments.
pub fn optimize_with_moments(
  moments: &PortfolioMoments,
  config: &SolverConfig,
) -> Result<SolverResult> {
  config.validate()?;
  let n = moments.n_assets();
  if n == 0 {
    return Err(PortfolioError::InvalidInput(
      "at least one asset is required".to_string(),
    ));
  }

  let result = match config.method {
    SolverMethod::Slsqp => solve_sqp(moments, config),
    SolverMethod::PenaltyNelderMead => solve_penalty(moments, config),
  };

  if result.converged {
    info!(
      method = ?config.method,
      iterations = result.iterations,
      evaluations = result.evaluations,
      sharpe = result.sharpe_ratio(),
      "max-sharpe solver converged"
    );
  } else {
    warn!(
      method = ?config.method,
      status = ?result.status,
      iterations = result.iterations,
      constraint_violation = result.constraint_violation,
      "max-sharpe solver stopped without converging"
    );
  }

  Ok(result)
}

fn solve_sqp(moments: &PortfolioMoments, config: &SolverConfig) -> SolverResult {
  let n = moments.n_assets();
  let objective = |w: &[f64]| -moments.evaluate(w).sharpe_ratio;
  let opts = SqpOptions {
    max_iters: config.max_iters,
    ftol: config.ftol,
    xtol: config.xtol,
    fd_step: config.fd_step,
    qp_max_iters: None,
  };

  let out = minimize_on_simplex(objective, vec![1.0 / n as f64; n], opts);
  debug!(
    iterations = out.iterations,
    qp_capped = out.qp_capped,
    "sqp finished"
  );

  SolverResult {
    constraint_violation: constraint_violation(&out.x),
    weights: out.x,
    objective: out.fx,
    iterations: out.iterations,
    evaluations: out.evaluations,
    converged: out.status == SolverStatus::Converged,
    status: out.status,
  }
}

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if !sum.is_finite() || sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

struct PenaltySharpeCost {
  moments: PortfolioMoments,
  penalty: f64,
}

impl CostFunction for PenaltySharpeCost {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = softmax(x);
    let sum: f64 = w.iter().sum();
    let c = -self.moments.evaluate(&w).sharpe_ratio + self.penalty * (sum - 1.0).powi(2);
    Ok(if c.is_finite() { c } else { f64::INFINITY })
  }
}

fn solve_penalty(moments: &PortfolioMoments, config: &SolverConfig) -> SolverResult {
  let n = moments.n_assets();
  let cost = PenaltySharpeCost {
    moments: moments.clone(),
    penalty: config.penalty,
  };

  let x0 = vec![0.0; n];
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] = 1.0;
    simplex.push(point);
  }

  let max_iters = (config.max_iters as u64).max(5000);
  let run = NelderMead::new(simplex)
    .with_sd_tolerance(1e-8)
    .and_then(|solver| {
      Executor::new(cost, solver)
        .configure(|state| state.max_iters(max_iters))
        .run()
    });

  let (x, iterations, evaluations, status) = match run {
    Ok(res) => {
      let status = match res.state.get_termination_reason() {
        Some(TerminationReason::SolverConverged) => SolverStatus::Converged,
        Some(TerminationReason::MaxItersReached) => SolverStatus::MaxIterations,
        Some(other) => SolverStatus::Failed(format!("{other:?}")),
        None => SolverStatus::Failed("solver did not terminate".to_string()),
      };
      let evaluations = res
        .state
        .get_func_counts()
        .get("cost_count")
        .copied()
        .unwrap_or(0) as usize;
      let iterations = res.state.get_iter() as usize;
      let best = res.state.best_param.clone().unwrap_or_else(|| x0.clone());
      (best, iterations, evaluations, status)
    }
    Err(e) => (x0, 0, 0, SolverStatus::Failed(e.to_string())),
  };

  let weights = softmax(&x);
  let perf = moments.evaluate(&weights);
  let status = if perf.sharpe_ratio.is_finite() {
    status
  } else {
    SolverStatus::NonFiniteObjective
  };

  SolverResult {
    constraint_violation: constraint_violation(&weights),
    objective: -perf.sharpe_ratio,
    weights,
    iterations,
    evaluations,
    converged: status == SolverStatus::Converged,
    status,
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;
  use chrono::Duration;
  use chrono::NaiveDate;
  use ndarray::Array2;
  use rand::Rng;
  use rand::SeedableRng;
  use rand::rngs::StdRng;
  use tracing_test::traced_test;

  use crate::portfolio::frontier::SimulationConfig;
  use crate::portfolio::frontier::simulate_portfolios;
  use crate::portfolio::metrics::portfolio_performance;
  use super::*;

  fn dates(rows: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    (0..rows).map(|i| start + Duration::days(i as i64)).collect()
  }

  fn well_posed() -> ReturnSeries {
    let mut rng = StdRng::seed_from_u64(2024);
    let drift = [0.0008, 0.0003, 0.0005];
    let scale = [0.02, 0.006, 0.012];
    let rows = 250;
    let values = Array2::from_shape_fn((rows, 3), |(_, i)| {
      drift[i] + scale[i] * rng.random_range(-1.0..1.0)
    });
    ReturnSeries::new(
      vec!["AAA".into(), "BBB".into(), "CCC".into()],
      dates(rows),
      values,
    )
    .unwrap()
  }

  fn hedged_scenario() -> ReturnSeries {
    let pattern = [0.01, 0.02, -0.01, 0.015];
    let rows = 40;
    let values = Array2::from_shape_fn((rows, 3), |(t, i)| {
      let a = pattern[t % 4];
      match i {
        0 => a,
        1 => -a,
        _ => 0.0,
      }
    });
    ReturnSeries::new(
      vec!["A".into(), "B".into(), "C".into()],
      dates(rows),
      values,
    )
    .unwrap()
  }

  #[test]
  fn sqp_beats_sampled_frontier() {
    let returns = well_posed();
    let result = optimize_max_sharpe(&returns, &SolverConfig::default()).unwrap();
    let sim = simulate_portfolios(
      &returns,
      &SimulationConfig {
        num_simulations: 5000,
        seed: Some(9),
      },
    )
    .unwrap();
    let best_sampled = sim
      .sharpes()
      .into_iter()
      .filter(|s| s.is_finite())
      .fold(f64::NEG_INFINITY, f64::max);

    assert!(result.converged, "{:?}", result.status);
    assert!(result.constraint_violation < 1e-9);
    assert!(result.weights.iter().all(|&w| w >= -1e-12 && w <= 1.0 + 1e-12));
    assert!(result.sharpe_ratio() >= best_sampled - 1e-6);
  }

  #[test]
  fn objective_is_negated_recomputed_sharpe() {
    let returns = well_posed();
    let result = optimize_max_sharpe(&returns, &SolverConfig::default()).unwrap();
    let perf = portfolio_performance(&result.weights, &returns).unwrap();

    assert_eq!(result.objective.to_bits(), (-perf.sharpe_ratio).to_bits());
  }

  #[test]
  fn single_asset_gets_full_weight() {
    let returns = ReturnSeries::new(
      vec!["ONLY".into()],
      dates(4),
      Array2::from_shape_vec((4, 1), vec![0.01, -0.02, 0.015, 0.004]).unwrap(),
    )
    .unwrap();

    let result = optimize_max_sharpe(&returns, &SolverConfig::default()).unwrap();

    assert_eq!(result.weights, vec![1.0]);
    assert!(result.converged);
    assert_eq!(result.constraint_violation, 0.0);
  }

  #[test]
  fn hedged_scenario_avoids_zero_asset() {
    let returns = hedged_scenario();
    let result = optimize_max_sharpe(&returns, &SolverConfig::default()).unwrap();
    let single_a = portfolio_performance(&[1.0, 0.0, 0.0], &returns).unwrap();

    assert!(result.converged, "{:?}", result.status);
    assert!(result.weights[2] < 1e-6, "{:?}", result.weights);
    assert!(result.weights[0] > result.weights[1]);
    assert_relative_eq!(
      result.sharpe_ratio(),
      single_a.sharpe_ratio,
      max_relative = 1e-6
    );

    let sim = simulate_portfolios(
      &returns,
      &SimulationConfig {
        num_simulations: 2000,
        seed: Some(5),
      },
    )
    .unwrap();
    for s in sim.sharpes().into_iter().filter(|s| s.is_finite()) {
      assert!(result.sharpe_ratio() >= s - 1e-9);
    }
  }

  #[test]
  fn penalty_method_on_hedged_scenario() {
    let returns = hedged_scenario();
    let single_a = portfolio_performance(&[1.0, 0.0, 0.0], &returns).unwrap();

    let result = optimize_max_sharpe(
      &returns,
      &SolverConfig {
        method: SolverMethod::PenaltyNelderMead,
        ..SolverConfig::default()
      },
    )
    .unwrap();

    // Sharpe is flat in C once wA > wB, softmax keeps every weight positive.
    assert_abs_diff_eq!(result.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert!(result.weights[0] > result.weights[1], "{:?}", result.weights);
    assert!(result.weights.iter().all(|&w| w > 0.0));
    assert_relative_eq!(
      result.sharpe_ratio(),
      single_a.sharpe_ratio,
      max_relative = 1e-6
    );
  }

  #[test]
  fn penalty_method_agrees_with_sqp() {
    let returns = well_posed();
    let sqp = optimize_max_sharpe(&returns, &SolverConfig::default()).unwrap();
    let penalty = optimize_max_sharpe(
      &returns,
      &SolverConfig {
        method: SolverMethod::PenaltyNelderMead,
        ..SolverConfig::default()
      },
    )
    .unwrap();

    assert_abs_diff_eq!(penalty.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(
      penalty.sharpe_ratio(),
      sqp.sharpe_ratio(),
      max_relative = 1e-2
    );
  }

  #[test]
  fn invalid_config_is_rejected() {
    let returns = well_posed();
    for config in [
      SolverConfig {
        max_iters: 0,
        ..SolverConfig::default()
      },
      SolverConfig {
        fd_step: 0.0,
        ..SolverConfig::default()
      },
      SolverConfig {
        ftol: f64::NAN,
        ..SolverConfig::default()
      },
    ] {
      assert!(matches!(
        optimize_max_sharpe(&returns, &config),
        Err(PortfolioError::InvalidInput(_))
      ));
    }
  }

  #[test]
  #[traced_test]
  fn budget_exhaustion_is_logged_not_raised() {
    let returns = well_posed();
    let result = optimize_max_sharpe(
      &returns,
      &SolverConfig {
        max_iters: 1,
        ftol: 0.0,
        xtol: 0.0,
        ..SolverConfig::default()
      },
    )
    .unwrap();

    assert!(matches!(
      result.status,
      SolverStatus::MaxIterations | SolverStatus::LineSearchFailed
    ));
    assert!(!result.converged);
    assert_eq!(result.iterations, 1);
    assert!(logs_contain("stopped without converging"));
  }
}
