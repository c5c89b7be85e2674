//! # Weight Vectors
//!
//! $$
//! \mathbf{w} \in \Delta^{N-1} = \{ w_i \ge 0,\ \textstyle\sum_i w_i = 1 \}
//! $$
//!
//! Validated long-only allocations on the unit simplex.

use crate::error::PortfolioError;
use crate::error::Result;

/// Allowed distance of `sum(w)` from 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Round-off allowed outside `[0, 1]` per component.
const COMPONENT_TOLERANCE: f64 = 1e-12;

/// Check `weights` against the simplex for `n_assets` assets.
pub fn validate_weights(weights: &[f64], n_assets: usize) -> Result<()> {
  if weights.len() != n_assets {
    return Err(PortfolioError::InvalidWeights(format!(
      "expected {n_assets} weights, got {}",
      weights.len()
    )));
  }
  validate_components(weights)
}

fn validate_components(weights: &[f64]) -> Result<()> {
  if weights.is_empty() {
    return Err(PortfolioError::InvalidWeights(
      "weight vector is empty".to_string(),
    ));
  }

  for (i, &w) in weights.iter().enumerate() {
    if !w.is_finite() {
      return Err(PortfolioError::InvalidWeights(format!(
        "weight {i} is not finite ({w})"
      )));
    }
    if w < -COMPONENT_TOLERANCE || w > 1.0 + COMPONENT_TOLERANCE {
      return Err(PortfolioError::InvalidWeights(format!(
        "weight {i} is outside [0, 1] ({w})"
      )));
    }
  }

  let sum: f64 = weights.iter().sum();
  if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
    return Err(PortfolioError::InvalidWeights(format!(
      "weights sum to {sum}, expected 1"
    )));
  }

  Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
  pub fn new(weights: Vec<f64>) -> Result<Self> {
    validate_components(&weights)?;
    Ok(Self(weights))
  }

  /// `1/n` in every component.
  pub fn uniform(n: usize) -> Result<Self> {
    if n == 0 {
      return Err(PortfolioError::InvalidWeights(
        "weight vector is empty".to_string(),
      ));
    }
    Ok(Self(vec![1.0 / n as f64; n]))
  }

  /// Divide non-negative raw values by their sum.
  pub fn normalize(raw: &[f64]) -> Result<Self> {
    if raw.is_empty() {
      return Err(PortfolioError::InvalidWeights(
        "weight vector is empty".to_string(),
      ));
    }
    if raw.iter().any(|v| !v.is_finite() || *v < 0.0) {
      return Err(PortfolioError::InvalidWeights(
        "raw weights must be finite and non-negative".to_string(),
      ));
    }

    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
      return Err(PortfolioError::InvalidWeights(
        "raw weights sum to zero".to_string(),
      ));
    }

    Ok(Self(raw.iter().map(|&v| v / sum).collect()))
  }

  pub fn as_slice(&self) -> &[f64] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn sum(&self) -> f64 {
    self.0.iter().sum()
  }
}

impl AsRef<[f64]> for WeightVector {
  fn as_ref(&self) -> &[f64] {
    &self.0
  }
}
