//! # Portfolio Data
//!
//! $$
//! r_{t,i} = \frac{P_{t,i}}{P_{t-1,i}} - 1
//! $$
//!
//! Close-price tables and the date-aligned daily return series derived from them.

use std::collections::HashSet;

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;

use crate::error::PortfolioError;
use crate::error::Result;

/// Minimum number of return rows for a sample covariance.
pub const MIN_RETURN_ROWS: usize = 2;

fn validate_tickers(tickers: &[String]) -> Result<()> {
  if tickers.is_empty() {
    return Err(PortfolioError::InvalidInput(
      "ticker list is empty".to_string(),
    ));
  }

  let mut seen = HashSet::with_capacity(tickers.len());
  for ticker in tickers {
    if !seen.insert(ticker.as_str()) {
      return Err(PortfolioError::InvalidInput(format!(
        "duplicate ticker {ticker}"
      )));
    }
  }

  Ok(())
}

fn validate_dates(dates: &[NaiveDate]) -> Result<()> {
  for pair in dates.windows(2) {
    if pair[0] >= pair[1] {
      return Err(PortfolioError::InvalidInput(format!(
        "dates must be strictly increasing ({} followed by {})",
        pair[0], pair[1]
      )));
    }
  }
  Ok(())
}

fn validate_shape(what: &str, rows: usize, cols: usize, dates: usize, tickers: usize) -> Result<()> {
  if cols != tickers {
    return Err(PortfolioError::InvalidInput(format!(
      "{what} has {cols} columns for {tickers} tickers"
    )));
  }
  if rows != dates {
    return Err(PortfolioError::InvalidInput(format!(
      "{what} has {rows} rows for {dates} dates"
    )));
  }
  Ok(())
}

/// Close prices per ticker, one row per date. Non-finite cells are missing quotes.
#[derive(Clone, Debug)]
pub struct PriceTable {
  tickers: Vec<String>,
  dates: Vec<NaiveDate>,
  closes: Array2<f64>,
}

impl PriceTable {
  pub fn new(tickers: Vec<String>, dates: Vec<NaiveDate>, closes: Array2<f64>) -> Result<Self> {
    validate_tickers(&tickers)?;
    validate_shape(
      "price table",
      closes.nrows(),
      closes.ncols(),
      dates.len(),
      tickers.len(),
    )?;
    validate_dates(&dates)?;

    Ok(Self {
      tickers,
      dates,
      closes,
    })
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn closes(&self) -> ArrayView2<'_, f64> {
    self.closes.view()
  }

  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  /// Column subset in the requested ticker order.
  pub fn select(&self, tickers: &[String]) -> Result<Self> {
    validate_tickers(tickers)?;

    let mut columns = Vec::with_capacity(tickers.len());
    for ticker in tickers {
      let idx = self
        .tickers
        .iter()
        .position(|t| t == ticker)
        .ok_or_else(|| PortfolioError::InvalidInput(format!("unknown ticker {ticker}")))?;
      columns.push(idx);
    }

    Ok(Self {
      tickers: tickers.to_vec(),
      dates: self.dates.clone(),
      closes: self.closes.select(Axis(1), &columns),
    })
  }

  /// Rows with `start <= date <= end`.
  pub fn slice_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if start > end {
      return Err(PortfolioError::InvalidInput(format!(
        "window start {start} is after end {end}"
      )));
    }

    let rows: Vec<usize> = self
      .dates
      .iter()
      .enumerate()
      .filter(|(_, d)| **d >= start && **d <= end)
      .map(|(i, _)| i)
      .collect();

    Ok(Self {
      tickers: self.tickers.clone(),
      dates: rows.iter().map(|&i| self.dates[i]).collect(),
      closes: self.closes.select(Axis(0), &rows),
    })
  }
}

/// Daily fractional returns, one column per asset, no missing values.
#[derive(Clone, Debug)]
pub struct ReturnSeries {
  tickers: Vec<String>,
  dates: Vec<NaiveDate>,
  returns: Array2<f64>,
}

impl ReturnSeries {
  pub fn new(tickers: Vec<String>, dates: Vec<NaiveDate>, returns: Array2<f64>) -> Result<Self> {
    validate_tickers(&tickers)?;
    validate_shape(
      "return series",
      returns.nrows(),
      returns.ncols(),
      dates.len(),
      tickers.len(),
    )?;
    validate_dates(&dates)?;

    if let Some((row, _)) = returns
      .outer_iter()
      .enumerate()
      .find(|(_, r)| r.iter().any(|v| !v.is_finite()))
    {
      return Err(PortfolioError::InvalidInput(format!(
        "return series contains a missing value at row {row}"
      )));
    }

    Ok(Self {
      tickers,
      dates,
      returns,
    })
  }

  /// Percentage change between consecutive dates. The first row has no prior
  /// day and is dropped, as is every row with a missing value on either side.
  pub fn from_prices(prices: &PriceTable) -> Result<Self> {
    let closes = prices.closes();
    let n_assets = prices.n_assets();
    let mut dates = Vec::with_capacity(prices.len().saturating_sub(1));
    let mut flat = Vec::with_capacity(prices.len().saturating_sub(1) * n_assets);

    for t in 1..prices.len() {
      let row: Vec<f64> = closes
        .row(t - 1)
        .iter()
        .zip(closes.row(t).iter())
        .map(|(&prev, &cur)| cur / prev - 1.0)
        .collect();

      if row.iter().all(|r| r.is_finite()) {
        dates.push(prices.dates()[t]);
        flat.extend(row);
      }
    }

    let returns = Array2::from_shape_vec((dates.len(), n_assets), flat)
      .map_err(|e| PortfolioError::InvalidInput(e.to_string()))?;

    Self::new(prices.tickers().to_vec(), dates, returns)
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  /// `rows x assets` return matrix.
  pub fn values(&self) -> ArrayView2<'_, f64> {
    self.returns.view()
  }

  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  /// Number of return rows.
  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  pub fn ensure_sufficient(&self) -> Result<()> {
    if self.len() < MIN_RETURN_ROWS {
      return Err(PortfolioError::InsufficientData {
        rows: self.len(),
        required: MIN_RETURN_ROWS,
      });
    }
    Ok(())
  }

  /// Per-asset mean daily return.
  pub fn mean_returns(&self) -> Array1<f64> {
    self
      .returns
      .mean_axis(Axis(0))
      .unwrap_or_else(|| Array1::from_elem(self.n_assets(), f64::NAN))
  }

  /// Sample covariance (`ddof = 1`) of daily returns.
  pub fn covariance(&self) -> Result<Array2<f64>> {
    self.ensure_sufficient()?;
    self.returns.t().cov(1.0).map_err(|_| PortfolioError::InsufficientData {
      rows: self.len(),
      required: MIN_RETURN_ROWS,
    })
  }
}
