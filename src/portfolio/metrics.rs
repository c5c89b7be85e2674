//! # Portfolio Metrics
//!
//! $$
//! \mu_p = 252\,\mathbf{w}^\top \bar{\mathbf r},\qquad
//! \sigma_p = \sqrt{\mathbf{w}^\top (252\,\Sigma)\,\mathbf{w}},\qquad
//! S = \frac{\mu_p}{\sigma_p}
//! $$
//!
//! Annualized return, volatility and Sharpe ratio of a weight vector.
//! The sampler, the solver and the report all evaluate through
//! [`PortfolioMoments::evaluate`], so identical inputs give bit-identical output.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use tracing::debug;

use crate::error::PortfolioError;
use crate::error::Result;
use super::data::ReturnSeries;
use super::types::Performance;
use super::weights::validate_weights;

/// Trading days per year.
pub const TRADING_DAYS: f64 = 252.0;

/// Mean daily returns and annualized sample covariance of a return series.
#[derive(Clone, Debug)]
pub struct PortfolioMoments {
  mean: Array1<f64>,
  annual_cov: Array2<f64>,
}

impl PortfolioMoments {
  pub fn from_returns(returns: &ReturnSeries) -> Result<Self> {
    returns.ensure_sufficient()?;
    let mean = returns.mean_returns();
    let annual_cov = returns.covariance()? * TRADING_DAYS;

    debug!(
      assets = returns.n_assets(),
      rows = returns.len(),
      "portfolio moments computed"
    );

    Ok(Self { mean, annual_cov })
  }

  pub fn n_assets(&self) -> usize {
    self.mean.len()
  }

  /// Mean daily return per asset.
  pub fn mean_returns(&self) -> ArrayView1<'_, f64> {
    self.mean.view()
  }

  /// `252 * Sigma`.
  pub fn annual_covariance(&self) -> ArrayView2<'_, f64> {
    self.annual_cov.view()
  }

  /// Unchecked evaluation, `weights.len()` must equal [`Self::n_assets`].
  /// A zero-variance portfolio yields `NaN` (or `±inf`) Sharpe, see
  /// [`Performance::is_degenerate`].
  pub(crate) fn evaluate(&self, weights: &[f64]) -> Performance {
    let w = ArrayView1::from(weights);
    let annual_return = (&self.mean * &w).sum() * TRADING_DAYS;
    let annual_volatility = w.dot(&self.annual_cov.dot(&w)).sqrt();

    Performance {
      annual_return,
      annual_volatility,
      sharpe_ratio: annual_return / annual_volatility,
    }
  }

  /// Validate `weights` against the simplex, then evaluate.
  pub fn performance(&self, weights: &[f64]) -> Result<Performance> {
    validate_weights(weights, self.n_assets())?;
    Ok(self.evaluate(weights))
  }
}

/// Annualized return, volatility and Sharpe ratio of `weights` over `returns`.
pub fn portfolio_performance(weights: &[f64], returns: &ReturnSeries) -> Result<Performance> {
  validate_weights(weights, returns.n_assets())?;
  Ok(PortfolioMoments::from_returns(returns)?.evaluate(weights))
}

/// Like [`portfolio_performance`], but an undefined Sharpe ratio is an error.
pub fn portfolio_performance_checked(
  weights: &[f64],
  returns: &ReturnSeries,
) -> Result<Performance> {
  let perf = portfolio_performance(weights, returns)?;
  if perf.is_degenerate() {
    return Err(PortfolioError::DegeneratePortfolio {
      volatility: perf.annual_volatility,
    });
  }
  Ok(perf)
}
