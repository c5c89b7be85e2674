use anyhow::Result;
use chrono::Duration;
use chrono::Utc;
use clap::Parser;
use frontier_rs::portfolio::AnalysisConfig;
use frontier_rs::portfolio::PortfolioAnalyzer;
use frontier_rs::portfolio::SimulationConfig;
use frontier_rs::portfolio::SolverConfig;
use frontier_rs::portfolio::SolverMethod;
use frontier_rs::provider::YahooProvider;
use frontier_rs::visualization::FrontierPlot;
use tracing::info;

/// Efficient frontier and max-Sharpe portfolio from Yahoo Finance closes
#[derive(Parser)]
#[clap(name = "frontier")]
struct Cli {
  /// Tickers to analyze
  #[clap(default_values = ["AAPL", "GLD", "AGG"])]
  tickers: Vec<String>,

  /// Optimizer: `slsqp` or `penalty`
  #[clap(long, default_value = "slsqp")]
  method: String,

  /// Random portfolios in the frontier cloud
  #[clap(long, default_value = "5000")]
  simulations: usize,

  /// Seed for a reproducible cloud
  #[clap(long)]
  seed: Option<u64>,

  /// Years of history ending today
  #[clap(long, default_value = "5")]
  years: i64,

  /// Chart output path
  #[clap(long, short = 'o', default_value = "efficient_frontier.html")]
  output: String,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  let cli = Cli::parse();
  let method = SolverMethod::from_str(&cli.method);
  info!(?method, tickers = ?cli.tickers, "starting analysis");

  let end = Utc::now().date_naive();
  let start = end - Duration::days(cli.years * 365);

  let provider = YahooProvider::new()?;
  let analyzer = PortfolioAnalyzer::new(AnalysisConfig {
    simulation: SimulationConfig {
      num_simulations: cli.simulations,
      seed: cli.seed,
    },
    solver: SolverConfig {
      method,
      ..SolverConfig::default()
    },
  });
  let analysis = analyzer.analyze_from_provider(&provider, &cli.tickers, start, end)?;

  println!("{}", analysis.optimal);

  FrontierPlot::new(&analysis.simulation)
    .optimal(&analysis.optimal)
    .write_html(&cli.output)?;
  info!("Efficient frontier written to {}", cli.output);

  Ok(())
}
