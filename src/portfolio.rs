//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Return statistics, efficient-frontier sampling and max-Sharpe allocation.

pub mod data;
pub mod engine;
pub mod frontier;
pub mod metrics;
pub mod optimizers;
pub mod report;
pub mod types;
pub mod weights;

pub use data::PriceTable;
pub use data::ReturnSeries;
pub use engine::AnalysisConfig;
pub use engine::PortfolioAnalysis;
pub use engine::PortfolioAnalyzer;
pub use frontier::SimulationConfig;
pub use frontier::SimulationResult;
pub use frontier::simulate_portfolios;
pub use metrics::PortfolioMoments;
pub use metrics::TRADING_DAYS;
pub use metrics::portfolio_performance;
pub use metrics::portfolio_performance_checked;
pub use optimizers::SolverConfig;
pub use optimizers::optimize_max_sharpe;
pub use optimizers::optimize_with_moments;
pub use report::OptimalPortfolio;
pub use types::Performance;
pub use types::SolverMethod;
pub use types::SolverResult;
pub use types::SolverStatus;
pub use weights::WeightVector;
pub use weights::validate_weights;
