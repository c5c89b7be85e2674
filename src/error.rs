//! # Errors
//!
//! $$
//! \text{input} \mapsto \text{Ok}(\cdot) \mid \text{Err}(\text{PortfolioError})
//! $$
//!
//! Validation failures of the portfolio core. Solver non-convergence is not an
//! error, it is reported through [`crate::portfolio::SolverResult`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Insufficient data: {rows} usable return rows, at least {required} required")]
  InsufficientData { rows: usize, required: usize },

  #[error("Invalid weights: {0}")]
  InvalidWeights(String),

  #[error("Degenerate portfolio: annualized volatility is {volatility}, Sharpe ratio is undefined")]
  DegeneratePortfolio { volatility: f64 },
}

pub type Result<T> = std::result::Result<T, PortfolioError>;
