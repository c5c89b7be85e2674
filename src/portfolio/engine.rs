//! # Portfolio Analyzer
//!
//! $$
//! \text{prices} \to \mathbf r_t \to (\text{frontier cloud},\ \mathbf w^\*)
//! $$
//!
//! High-level orchestration API: sampling, optimization and reporting over one
//! return series.

use anyhow::Context;
use chrono::NaiveDate;
use tracing::info;

use crate::error::Result;
use crate::provider::PriceProvider;
use crate::provider::fetch_returns;
use super::data::ReturnSeries;
use super::frontier::SimulationConfig;
use super::frontier::SimulationResult;
use super::frontier::simulate_portfolios;
use super::optimizers::SolverConfig;
use super::optimizers::optimize_max_sharpe;
use super::report::OptimalPortfolio;
use super::types::SolverResult;

/// Runtime configuration for [`PortfolioAnalyzer`].
#[derive(Clone, Debug, Default)]
pub struct AnalysisConfig {
  /// Frontier sampler settings.
  pub simulation: SimulationConfig,
  /// Max-Sharpe solver settings.
  pub solver: SolverConfig,
}

/// Frontier cloud and optimal portfolio of one run.
#[derive(Clone, Debug)]
pub struct PortfolioAnalysis {
  pub simulation: SimulationResult,
  pub optimal: OptimalPortfolio,
}

/// Single entry-point for frontier analysis workflows.
#[derive(Clone, Debug, Default)]
pub struct PortfolioAnalyzer {
  config: AnalysisConfig,
}

impl PortfolioAnalyzer {
  /// Construct a new analyzer with explicit configuration.
  pub fn new(config: AnalysisConfig) -> Self {
    Self { config }
  }

  /// Borrow analyzer configuration.
  pub fn config(&self) -> &AnalysisConfig {
    &self.config
  }

  /// Sample random long-only portfolios.
  pub fn simulate(&self, returns: &ReturnSeries) -> Result<SimulationResult> {
    simulate_portfolios(returns, &self.config.simulation)
  }

  /// Run the max-Sharpe solver from uniform weights.
  pub fn optimize(&self, returns: &ReturnSeries) -> Result<SolverResult> {
    optimize_max_sharpe(returns, &self.config.solver)
  }

  /// Solve and recompute the metrics of the optimum.
  pub fn optimal_portfolio(&self, returns: &ReturnSeries) -> Result<OptimalPortfolio> {
    OptimalPortfolio::from_solver(self.optimize(returns)?, returns)
  }

  /// Sampler and solver over the same returns.
  pub fn analyze(&self, returns: &ReturnSeries) -> Result<PortfolioAnalysis> {
    let simulation = self.simulate(returns)?;
    let optimal = self.optimal_portfolio(returns)?;

    info!(
      assets = returns.n_assets(),
      rows = returns.len(),
      samples = simulation.len(),
      sharpe = optimal.sharpe_ratio(),
      "portfolio analysis finished"
    );

    Ok(PortfolioAnalysis {
      simulation,
      optimal,
    })
  }

  /// Fetch prices for `tickers` over `[start, end]`, then [`Self::analyze`].
  pub fn analyze_from_provider<P: PriceProvider + ?Sized>(
    &self,
    provider: &P,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
  ) -> anyhow::Result<PortfolioAnalysis> {
    let returns = fetch_returns(provider, tickers, start, end)?;
    self
      .analyze(&returns)
      .with_context(|| format!("portfolio analysis failed for {tickers:?}"))
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use ndarray::Array2;

  use crate::portfolio::metrics::portfolio_performance;
  use super::*;

  fn returns() -> ReturnSeries {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let rows = 60;
    let values = Array2::from_shape_fn((rows, 3), |(t, i)| {
      let phase = (t as f64 * (0.7 + i as f64)).sin();
      0.0004 * (i as f64 + 1.0) + 0.01 * phase / (i as f64 + 1.0)
    });
    ReturnSeries::new(
      vec!["X".into(), "Y".into(), "Z".into()],
      (0..rows).map(|i| start + Duration::days(i as i64)).collect(),
      values,
    )
    .unwrap()
  }

  #[test]
  fn analyze_combines_sampler_and_solver() {
    let analyzer = PortfolioAnalyzer::new(AnalysisConfig {
      simulation: SimulationConfig {
        num_simulations: 500,
        seed: Some(1),
      },
      ..AnalysisConfig::default()
    });
    let returns = returns();

    let analysis = analyzer.analyze(&returns).unwrap();

    assert_eq!(analysis.simulation.len(), 500);
    assert_eq!(analysis.optimal.tickers.len(), 3);
    let direct = portfolio_performance(&analysis.optimal.weights, &returns).unwrap();
    assert_eq!(direct, analysis.optimal.performance);
  }

  #[test]
  fn default_config_matches_script_settings() {
    let analyzer = PortfolioAnalyzer::default();
    assert_eq!(analyzer.config().simulation.num_simulations, 5000);
    assert_eq!(analyzer.config().solver.max_iters, 100);
  }
}
