//! # frontier-rs
//!
//! $$
//! \max_{\mathbf w \in \Delta^{N-1}} \frac{\mathbf w^\top \mu}{\sqrt{\mathbf w^\top \Sigma \mathbf w}}
//! $$
//!
//! Modern Portfolio Theory toolkit: annualized portfolio metrics, a Monte-Carlo
//! efficient-frontier sampler, a long-only max-Sharpe solver and plotting.

pub mod error;
pub mod portfolio;
pub mod provider;
pub mod visualization;

pub use error::PortfolioError;
pub use error::Result;
