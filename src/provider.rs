//! # Price Providers
//!
//! $$
//! \{P_{t,i}\}_{t \in [t_0, t_1]} \to r_{t,i}
//! $$
//!
//! Sources of daily close prices for the analysis pipeline.

#[cfg(feature = "yahoo")]
mod yahoo;

use anyhow::Context;
use anyhow::bail;
use chrono::NaiveDate;
use tracing::debug;
use tracing::info;

use crate::portfolio::data::PriceTable;
use crate::portfolio::data::ReturnSeries;
#[cfg(feature = "yahoo")]
pub use yahoo::YahooProvider;

/// Daily close prices for a set of tickers over a date window.
pub trait PriceProvider {
  /// Close prices for `tickers` with `start <= date <= end`, columns in the
  /// requested order. Missing quotes are non-finite cells.
  fn close_prices(
    &self,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
  ) -> anyhow::Result<PriceTable>;
}

/// Download prices and convert them to daily returns.
pub fn fetch_returns<P: PriceProvider + ?Sized>(
  provider: &P,
  tickers: &[String],
  start: NaiveDate,
  end: NaiveDate,
) -> anyhow::Result<ReturnSeries> {
  if tickers.is_empty() {
    bail!("no tickers requested");
  }

  let prices = provider
    .close_prices(tickers, start, end)
    .with_context(|| format!("failed to load prices for {tickers:?}"))?;
  debug!(rows = prices.len(), "price table loaded");

  let returns = ReturnSeries::from_prices(&prices)
    .with_context(|| format!("failed to build returns for {tickers:?}"))?;
  info!("Downloaded {} days of data for {:?}", returns.len(), tickers);
  returns
    .ensure_sufficient()
    .with_context(|| format!("not enough data between {start} and {end}"))?;

  Ok(returns)
}

/// Serves a prepared price table.
#[derive(Clone, Debug)]
pub struct InMemoryProvider {
  prices: PriceTable,
}

impl InMemoryProvider {
  pub fn new(prices: PriceTable) -> Self {
    Self { prices }
  }
}

impl PriceProvider for InMemoryProvider {
  fn close_prices(
    &self,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
  ) -> anyhow::Result<PriceTable> {
    let table = self.prices.select(tickers)?.slice_dates(start, end)?;
    Ok(table)
  }
}
