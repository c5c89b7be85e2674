//! # Optimal Portfolio Report
//!
//! Final composition of the max-Sharpe solver output with a fresh metrics
//! evaluation, rendered as a text table.

use std::fmt;

use prettytable::Table;
use prettytable::format;
use prettytable::row;
use tracing::warn;

use crate::error::PortfolioError;
use crate::error::Result;
use super::data::ReturnSeries;
use super::metrics::portfolio_performance;
use super::types::Performance;
use super::types::SolverResult;

#[derive(Clone, Debug)]
pub struct OptimalPortfolio {
  pub tickers: Vec<String>,
  pub weights: Vec<f64>,
  /// Metrics recomputed at `weights`.
  pub performance: Performance,
  pub solver: SolverResult,
}

impl OptimalPortfolio {
  /// Recompute the metrics at the solver's weights.
  pub fn from_solver(solver: SolverResult, returns: &ReturnSeries) -> Result<Self> {
    if solver.weights.len() != returns.n_assets() {
      return Err(PortfolioError::InvalidWeights(format!(
        "solver returned {} weights for {} assets",
        solver.weights.len(),
        returns.n_assets()
      )));
    }

    let performance = portfolio_performance(&solver.weights, returns)?;
    if performance.is_degenerate() {
      warn!(
        volatility = performance.annual_volatility,
        "optimal portfolio has an undefined sharpe ratio"
      );
    }

    Ok(Self {
      tickers: returns.tickers().to_vec(),
      weights: solver.weights.clone(),
      performance,
      solver,
    })
  }

  pub fn sharpe_ratio(&self) -> f64 {
    self.performance.sharpe_ratio
  }

  /// `(ticker, weight)` pairs in input order.
  pub fn allocations(&self) -> impl Iterator<Item = (&str, f64)> {
    self
      .tickers
      .iter()
      .map(String::as_str)
      .zip(self.weights.iter().copied())
  }

  pub fn table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row!["Asset", "Weight"]);
    for (ticker, w) in self.allocations() {
      table.add_row(row![ticker, r->format!("{:.1}%", w * 100.0)]);
    }
    table.add_row(row![
      "Expected Annual Return",
      r->format!("{:.2}%", self.performance.annual_return * 100.0)
    ]);
    table.add_row(row![
      "Expected Annual Volatility",
      r->format!("{:.2}%", self.performance.annual_volatility * 100.0)
    ]);
    table.add_row(row![
      "Sharpe Ratio",
      r->format!("{:.2}", self.performance.sharpe_ratio)
    ]);
    table
  }
}

impl fmt::Display for OptimalPortfolio {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "--- Optimal Portfolio ---")?;
    write!(f, "{}", self.table())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use chrono::NaiveDate;
  use ndarray::array;

  use crate::portfolio::optimizers::SolverConfig;
  use crate::portfolio::optimizers::optimize_max_sharpe;
  use crate::portfolio::types::SolverStatus;
  use super::*;

  fn returns() -> ReturnSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    ReturnSeries::new(
      vec!["AAPL".into(), "GLD".into()],
      (0..5).map(|i| start + Duration::days(i)).collect(),
      array![
        [0.012, 0.001],
        [-0.006, 0.003],
        [0.009, -0.002],
        [0.004, 0.002],
        [-0.002, 0.001]
      ],
    )
    .unwrap()
  }

  fn fixed_solver(weights: Vec<f64>) -> SolverResult {
    SolverResult {
      weights,
      objective: 0.0,
      iterations: 3,
      evaluations: 21,
      converged: true,
      status: SolverStatus::Converged,
      constraint_violation: 0.0,
    }
  }

  #[test]
  fn recomputed_sharpe_matches_solver_objective() {
    let returns = returns();
    let solver = optimize_max_sharpe(&returns, &SolverConfig::default()).unwrap();
    let objective = solver.objective;

    let report = OptimalPortfolio::from_solver(solver, &returns).unwrap();

    assert_eq!(report.sharpe_ratio().to_bits(), (-objective).to_bits());
    assert_eq!(report.tickers, vec!["AAPL".to_string(), "GLD".to_string()]);
  }

  #[test]
  fn table_uses_report_precision() {
    let report = OptimalPortfolio::from_solver(fixed_solver(vec![0.25, 0.75]), &returns()).unwrap();
    let table = report.table();

    assert_eq!(table.len(), 5);
    let cell = |r: usize, c: usize| table.get_row(r).unwrap().get_cell(c).unwrap().get_content();
    assert_eq!(cell(0, 0), "AAPL");
    assert_eq!(cell(0, 1), "25.0%");
    assert_eq!(cell(1, 1), "75.0%");
    assert_eq!(cell(2, 0), "Expected Annual Return");
    assert_eq!(
      cell(2, 1),
      format!("{:.2}%", report.performance.annual_return * 100.0)
    );
    assert_eq!(cell(3, 0), "Expected Annual Volatility");
    assert_eq!(
      cell(3, 1),
      format!("{:.2}%", report.performance.annual_volatility * 100.0)
    );
    assert_eq!(cell(4, 0), "Sharpe Ratio");
    assert_eq!(cell(4, 1), format!("{:.2}", report.sharpe_ratio()));
  }

  #[test]
  fn display_renders_table() {
    let report = OptimalPortfolio::from_solver(fixed_solver(vec![0.5, 0.5]), &returns()).unwrap();
    let text = report.to_string();

    assert!(text.starts_with("--- Optimal Portfolio ---"));
    assert!(text.contains("AAPL"));
    assert!(text.contains("50.0%"));
    assert!(text.contains("Expected Annual Volatility"));
    assert!(text.contains("Sharpe Ratio"));
  }

  #[test]
  fn infeasible_solver_weights_are_rejected() {
    let err = OptimalPortfolio::from_solver(fixed_solver(vec![0.9, 0.3]), &returns()).unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidWeights(_)));

    let err = OptimalPortfolio::from_solver(fixed_solver(vec![1.0]), &returns()).unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidWeights(_)));
  }
}
