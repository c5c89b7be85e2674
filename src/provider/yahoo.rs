//! # Yahoo Provider
//!
//! $$
//! P_{t,i} = \text{adjclose}_i(t),\qquad t \in \bigcup_i \mathcal T_i
//! $$
//!
//! Daily adjusted closes downloaded per ticker and aligned on the union of
//! trading dates.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use anyhow::Context;
use anyhow::anyhow;
use chrono::DateTime;
use chrono::NaiveDate;
use ndarray::Array2;
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

use crate::portfolio::data::PriceTable;
use super::PriceProvider;

/// Adjusted daily closes from Yahoo Finance.
pub struct YahooProvider {
  connector: yahoo::YahooConnector,
}

impl YahooProvider {
  pub fn new() -> anyhow::Result<Self> {
    let connector = yahoo::YahooConnector::new().context("failed to create yahoo connector")?;
    Ok(Self { connector })
  }

  fn history(
    &self,
    ticker: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
  ) -> anyhow::Result<BTreeMap<NaiveDate, f64>> {
    let response = tokio_test::block_on(self.connector.get_quote_history(ticker, start, end))
      .with_context(|| format!("failed to download quotes for {ticker}"))?;
    let quotes = response
      .quotes()
      .with_context(|| format!("no quotes in response for {ticker}"))?;

    let mut series = BTreeMap::new();
    for quote in quotes {
      let date = DateTime::from_timestamp(quote.timestamp as i64, 0)
        .ok_or_else(|| anyhow!("invalid quote timestamp {} for {ticker}", quote.timestamp))?
        .date_naive();
      series.insert(date, quote.adjclose);
    }

    debug!(ticker, quotes = series.len(), "quote history downloaded");
    Ok(series)
  }
}

fn to_offset(date: NaiveDate, end_of_day: bool) -> anyhow::Result<OffsetDateTime> {
  let (h, m, s) = if end_of_day { (23, 59, 59) } else { (0, 0, 0) };
  let ts = date
    .and_hms_opt(h, m, s)
    .ok_or_else(|| anyhow!("invalid date {date}"))?
    .and_utc()
    .timestamp();
  OffsetDateTime::from_unix_timestamp(ts).with_context(|| format!("date {date} out of range"))
}

/// Align per-ticker series on the union of dates. Missing cells are `NaN`.
fn align(tickers: &[String], series: &[BTreeMap<NaiveDate, f64>]) -> anyhow::Result<PriceTable> {
  let dates: Vec<NaiveDate> = series
    .iter()
    .flat_map(|s| s.keys().copied())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();

  let closes = Array2::from_shape_fn((dates.len(), tickers.len()), |(t, i)| {
    series[i].get(&dates[t]).copied().unwrap_or(f64::NAN)
  });

  Ok(PriceTable::new(tickers.to_vec(), dates, closes)?)
}

impl PriceProvider for YahooProvider {
  fn close_prices(
    &self,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
  ) -> anyhow::Result<PriceTable> {
    let from = to_offset(start, false)?;
    let to = to_offset(end, true)?;

    let series = tickers
      .iter()
      .map(|ticker| self.history(ticker, from, to))
      .collect::<anyhow::Result<Vec<_>>>()?;

    align(tickers, &series)
  }
}
