use approx::assert_abs_diff_eq;
use chrono::Duration;
use chrono::NaiveDate;
use frontier_rs::portfolio::AnalysisConfig;
use frontier_rs::portfolio::PortfolioAnalyzer;
use frontier_rs::portfolio::PriceTable;
use frontier_rs::portfolio::SimulationConfig;
use frontier_rs::portfolio::portfolio_performance;
use frontier_rs::provider::InMemoryProvider;
use frontier_rs::provider::fetch_returns;
use frontier_rs::visualization::FrontierPlot;
use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn day(offset: usize) -> NaiveDate {
  NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset as i64)
}

fn random_walk_prices(tickers: &[&str], rows: usize) -> PriceTable {
  let mut rng = StdRng::seed_from_u64(99);
  let drift = [0.0006, 0.0002, 0.0001];
  let vol = [0.018, 0.009, 0.004];
  let mut closes = Array2::<f64>::zeros((rows, tickers.len()));
  for i in 0..tickers.len() {
    closes[[0, i]] = 100.0;
    for t in 1..rows {
      let r = drift[i] + vol[i] * rng.random_range(-1.0..1.0);
      closes[[t, i]] = closes[[t - 1, i]] * (1.0 + r);
    }
  }
  // One missing quote for the second ticker.
  closes[[10, 1]] = f64::NAN;

  PriceTable::new(
    tickers.iter().map(|t| t.to_string()).collect(),
    (0..rows).map(day).collect(),
    closes,
  )
  .unwrap()
}

fn tickers() -> Vec<String> {
  ["AAPL", "GLD", "AGG"].iter().map(|t| t.to_string()).collect()
}

#[test]
fn provider_to_report_end_to_end() {
  let provider = InMemoryProvider::new(random_walk_prices(&["AAPL", "GLD", "AGG"], 400));
  let analyzer = PortfolioAnalyzer::new(AnalysisConfig {
    simulation: SimulationConfig {
      num_simulations: 1000,
      seed: Some(2),
    },
    ..AnalysisConfig::default()
  });

  let analysis = analyzer
    .analyze_from_provider(&provider, &tickers(), day(0), day(399))
    .unwrap();

  assert_eq!(analysis.simulation.len(), 1000);
  assert_abs_diff_eq!(analysis.optimal.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
  assert!(analysis.optimal.weights.iter().all(|&w| w > -1e-9));

  let best_sampled = analysis
    .simulation
    .max_sharpe()
    .map(|(_, p, _)| p.sharpe_ratio)
    .unwrap();
  assert!(analysis.optimal.sharpe_ratio() >= best_sampled - 1e-6);

  let report = analysis.optimal.to_string();
  assert!(report.contains("--- Optimal Portfolio ---"));
  for ticker in tickers() {
    assert!(report.contains(&ticker));
  }
}

#[test]
fn report_values_match_direct_metrics() {
  let provider = InMemoryProvider::new(random_walk_prices(&["AAPL", "GLD", "AGG"], 200));
  let returns = fetch_returns(&provider, &tickers(), day(0), day(199)).unwrap();

  // Rows touching the missing quote are gone.
  assert_eq!(returns.len(), 197);

  let optimal = PortfolioAnalyzer::default().optimal_portfolio(&returns).unwrap();
  let direct = portfolio_performance(&optimal.weights, &returns).unwrap();

  assert_eq!(optimal.performance, direct);
  assert_eq!(
    optimal.sharpe_ratio().to_bits(),
    (-optimal.solver.objective).to_bits()
  );
}

#[test]
fn frontier_chart_is_written() {
  let provider = InMemoryProvider::new(random_walk_prices(&["AAPL", "GLD", "AGG"], 120));
  let analyzer = PortfolioAnalyzer::new(AnalysisConfig {
    simulation: SimulationConfig {
      num_simulations: 200,
      seed: Some(8),
    },
    ..AnalysisConfig::default()
  });
  let analysis = analyzer
    .analyze_from_provider(&provider, &tickers(), day(0), day(119))
    .unwrap();

  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("efficient_frontier.html");
  FrontierPlot::new(&analysis.simulation)
    .optimal(&analysis.optimal)
    .write_html(&path)
    .unwrap();

  assert!(path.exists());
}

#[test]
fn short_window_fails_with_context() {
  let provider = InMemoryProvider::new(random_walk_prices(&["AAPL", "GLD", "AGG"], 50));
  let err = PortfolioAnalyzer::default()
    .analyze_from_provider(&provider, &tickers(), day(5), day(6))
    .unwrap_err();

  assert!(format!("{err:#}").contains("not enough data"));
}
