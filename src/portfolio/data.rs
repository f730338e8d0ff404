//! # Portfolio Data Utilities
//!
//! $$
//! r_t = \frac{p_t}{p_{t-1}} - 1
//! $$
//!
//! Price table construction, cleaning of gappy raw columns and conversion of
//! closing prices to simple period returns.

use chrono::NaiveDate;
use tracing::debug;

use super::types::check_unique;
use crate::error::FrontierError;
use crate::error::Result;

/// Default fraction of dates an asset must be observed on to be retained.
pub const DEFAULT_MIN_COMPLETENESS: f64 = 0.95;

/// Clean closing prices: dates in strictly increasing order, one fully
/// populated column per asset.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceTable {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  columns: Vec<Vec<f64>>,
}

impl PriceTable {
  /// Build a table from already clean columns.
  pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
    if assets.len() != columns.len() {
      return Err(FrontierError::InvalidArgument(format!(
        "{} asset identifiers but {} price columns",
        assets.len(),
        columns.len()
      )));
    }
    check_unique(&assets)?;

    if dates.windows(2).any(|w| w[0] >= w[1]) {
      return Err(FrontierError::InvalidArgument(
        "dates must be strictly increasing".into(),
      ));
    }

    for (asset, column) in assets.iter().zip(columns.iter()) {
      if column.len() != dates.len() {
        return Err(FrontierError::InvalidArgument(format!(
          "column '{asset}' has {} prices for {} dates",
          column.len(),
          dates.len()
        )));
      }
      if let Some(p) = column.iter().find(|p| !p.is_finite() || **p <= 0.0) {
        return Err(FrontierError::InvalidArgument(format!(
          "column '{asset}' contains invalid price {p}"
        )));
      }
    }

    Ok(Self {
      dates,
      assets,
      columns,
    })
  }

  /// Build a table from raw columns with gaps.
  ///
  /// Columns observed on fewer than `ceil(min_completeness * n_dates)` dates
  /// are dropped first; survivors are then forward-filled and back-filled.
  pub fn from_raw(
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    raw_columns: Vec<Vec<Option<f64>>>,
    min_completeness: f64,
  ) -> Result<Self> {
    if !(0.0..=1.0).contains(&min_completeness) {
      return Err(FrontierError::InvalidArgument(format!(
        "min_completeness must be in [0, 1], got {min_completeness}"
      )));
    }
    if assets.len() != raw_columns.len() {
      return Err(FrontierError::InvalidArgument(format!(
        "{} asset identifiers but {} price columns",
        assets.len(),
        raw_columns.len()
      )));
    }

    let n_dates = dates.len();
    let required = (min_completeness * n_dates as f64).ceil() as usize;

    let mut kept_assets = Vec::with_capacity(assets.len());
    let mut kept_columns = Vec::with_capacity(raw_columns.len());

    for (asset, raw) in assets.into_iter().zip(raw_columns) {
      let raw: Vec<Option<f64>> = raw
        .into_iter()
        .map(|p| p.filter(|v| v.is_finite()))
        .collect();
      let observed = raw.iter().filter(|p| p.is_some()).count();

      if observed < required || observed == 0 {
        debug!(asset = %asset, observed, required, "dropping sparse column");
        continue;
      }

      match fill_column(&raw) {
        Some(column) => {
          kept_assets.push(asset);
          kept_columns.push(column);
        }
        None => debug!(asset = %asset, "dropping unfillable column"),
      }
    }

    if kept_assets.is_empty() {
      return Err(FrontierError::EmptyUniverse);
    }

    Self::new(dates, kept_assets, kept_columns)
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn n_dates(&self) -> usize {
    self.dates.len()
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  pub fn column(&self, asset: &str) -> Option<&[f64]> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|i| self.columns[i].as_slice())
  }

  pub fn columns(&self) -> &[Vec<f64>] {
    &self.columns
  }

  /// Simple period returns per asset, one observation fewer than dates.
  pub fn returns(&self) -> Vec<Vec<f64>> {
    self
      .columns
      .iter()
      .map(|c| simple_returns_series(c))
      .collect()
  }
}

/// Forward-fill then back-fill. `None` if the column has no observation.
fn fill_column(raw: &[Option<f64>]) -> Option<Vec<f64>> {
  let first = raw.iter().flatten().next().copied()?;

  let mut last = first;
  let column = raw
    .iter()
    .map(|p| {
      if let Some(v) = p {
        last = *v;
      }
      last
    })
    .collect();

  Some(column)
}

/// Convert close prices to simple period returns.
pub fn simple_returns_series(closes: &[f64]) -> Vec<f64> {
  closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}
