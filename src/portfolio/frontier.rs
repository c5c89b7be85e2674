//! # Frontier Sampler
//!
//! $$
//! u_i \sim \mathcal U[0,1),\qquad w_i = \frac{u_i}{\sum_j u_j}
//! $$
//!
//! Monte-Carlo cloud of random long-only portfolios approximating the
//! risk/return frontier.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::error::PortfolioError;
use crate::error::Result;
use super::data::ReturnSeries;
use super::metrics::PortfolioMoments;
use super::types::Performance;
use super::weights::WeightVector;

/// Runtime configuration for [`simulate_portfolios`].
#[derive(Clone, Debug)]
pub struct SimulationConfig {
  /// Number of random portfolios.
  pub num_simulations: usize,
  /// Seed for a reproducible cloud. `None` draws from the thread RNG.
  pub seed: Option<u64>,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      num_simulations: 5000,
      seed: None,
    }
  }
}

/// Sampled portfolios and their performance, index-aligned.
#[derive(Clone, Debug, Default)]
pub struct SimulationResult {
  performances: Vec<Performance>,
  weights: Vec<WeightVector>,
}

impl SimulationResult {
  pub fn len(&self) -> usize {
    self.performances.len()
  }

  pub fn is_empty(&self) -> bool {
    self.performances.is_empty()
  }

  pub fn performances(&self) -> &[Performance] {
    &self.performances
  }

  pub fn weights(&self) -> &[WeightVector] {
    &self.weights
  }

  pub fn get(&self, idx: usize) -> Option<(&Performance, &WeightVector)> {
    Some((self.performances.get(idx)?, self.weights.get(idx)?))
  }

  pub fn iter(&self) -> impl Iterator<Item = (&Performance, &WeightVector)> {
    self.performances.iter().zip(self.weights.iter())
  }

  pub fn returns(&self) -> Vec<f64> {
    self.performances.iter().map(|p| p.annual_return).collect()
  }

  pub fn volatilities(&self) -> Vec<f64> {
    self.performances.iter().map(|p| p.annual_volatility).collect()
  }

  pub fn sharpes(&self) -> Vec<f64> {
    self.performances.iter().map(|p| p.sharpe_ratio).collect()
  }

  /// Index of the highest sampled Sharpe ratio. `NaN` never wins.
  pub fn max_sharpe_index(&self) -> Option<usize> {
    self
      .performances
      .iter()
      .enumerate()
      .filter(|(_, p)| !p.sharpe_ratio.is_nan())
      .max_by(|(_, a), (_, b)| a.sharpe_ratio.total_cmp(&b.sharpe_ratio))
      .map(|(i, _)| i)
  }

  /// Index of the lowest sampled volatility. `NaN` never wins.
  pub fn min_volatility_index(&self) -> Option<usize> {
    self
      .performances
      .iter()
      .enumerate()
      .filter(|(_, p)| !p.annual_volatility.is_nan())
      .min_by(|(_, a), (_, b)| a.annual_volatility.total_cmp(&b.annual_volatility))
      .map(|(i, _)| i)
  }

  /// Best sampled point by Sharpe ratio.
  pub fn max_sharpe(&self) -> Option<(usize, &Performance, &WeightVector)> {
    let idx = self.max_sharpe_index()?;
    Some((idx, &self.performances[idx], &self.weights[idx]))
  }

  /// Sampled point with the lowest volatility.
  pub fn min_volatility(&self) -> Option<(usize, &Performance, &WeightVector)> {
    let idx = self.min_volatility_index()?;
    Some((idx, &self.performances[idx], &self.weights[idx]))
  }
}

/// Sample `config.num_simulations` random portfolios over `returns`.
pub fn simulate_portfolios(
  returns: &ReturnSeries,
  config: &SimulationConfig,
) -> Result<SimulationResult> {
  if config.num_simulations == 0 {
    return Err(PortfolioError::InvalidInput(
      "num_simulations must be > 0".to_string(),
    ));
  }

  let moments = PortfolioMoments::from_returns(returns)?;
  match config.seed {
    Some(seed) => {
      let mut rng = StdRng::seed_from_u64(seed);
      simulate_with_rng(&moments, config.num_simulations, &mut rng)
    }
    None => simulate_with_rng(&moments, config.num_simulations, &mut rand::rng()),
  }
}

/// Sampling loop over precomputed moments with a caller-supplied RNG.
pub fn simulate_with_rng<R: Rng + ?Sized>(
  moments: &PortfolioMoments,
  num_simulations: usize,
  rng: &mut R,
) -> Result<SimulationResult> {
  if num_simulations == 0 {
    return Err(PortfolioError::InvalidInput(
      "num_simulations must be > 0".to_string(),
    ));
  }

  let n = moments.n_assets();
  let mut performances = Vec::with_capacity(num_simulations);
  let mut weights = Vec::with_capacity(num_simulations);
  let mut raw = vec![0.0; n];

  for _ in 0..num_simulations {
    let w = loop {
      for u in raw.iter_mut() {
        *u = rng.random::<f64>();
      }
      if raw.iter().any(|&u| u > 0.0) {
        break WeightVector::normalize(&raw)?;
      }
    };

    performances.push(moments.evaluate(w.as_slice()));
    weights.push(w);
  }

  let result = SimulationResult {
    performances,
    weights,
  };

  debug!(
    num_simulations,
    best_sharpe = result.max_sharpe().map(|(_, p, _)| p.sharpe_ratio),
    "frontier simulation finished"
  );

  Ok(result)
}
