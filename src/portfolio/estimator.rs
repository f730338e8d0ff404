//! # Return/Risk Estimator
//!
//! $$
//! \hat\mu_i = P\,\bar r_i,\qquad
//! \hat\Sigma_{ij} = \frac{P}{T-1}\sum_{t=1}^{T}(r_{it}-\bar r_i)(r_{jt}-\bar r_j)
//! $$
//!
//! Annualized historical mean returns and sample covariance. Annualization
//! is simple scaling by the number of periods per year `P`.

use nalgebra::DMatrix;
use tracing::debug;

use super::data::PriceTable;
use super::types::CovarianceEstimate;
use super::types::ReturnEstimate;
use crate::error::FrontierError;
use crate::error::Result;

/// Trading days per year.
pub const DEFAULT_PERIODS_PER_YEAR: u32 = 252;

/// Minimum number of return observations for a sample covariance.
const MIN_RETURN_ROWS: usize = 2;

fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

fn validated_returns(prices: &PriceTable, periods_per_year: u32) -> Result<Vec<Vec<f64>>> {
  if periods_per_year == 0 {
    return Err(FrontierError::InvalidArgument(
      "periods_per_year must be positive".into(),
    ));
  }
  if prices.n_assets() == 0 {
    return Err(FrontierError::EmptyUniverse);
  }

  let rows = prices.n_dates().saturating_sub(1);
  if rows < MIN_RETURN_ROWS {
    return Err(FrontierError::InsufficientData {
      rows,
      required: MIN_RETURN_ROWS,
    });
  }

  Ok(prices.returns())
}

fn mean_of(returns: &[Vec<f64>], periods_per_year: u32) -> Vec<f64> {
  returns
    .iter()
    .map(|r| sample_mean(r) * periods_per_year as f64)
    .collect()
}

fn cov_of(returns: &[Vec<f64>], periods_per_year: u32) -> DMatrix<f64> {
  let n = returns.len();
  let t = returns.first().map(|r| r.len()).unwrap_or(0);
  let means: Vec<f64> = returns.iter().map(|r| sample_mean(r)).collect();
  let scale = periods_per_year as f64 / (t as f64 - 1.0);

  let mut cov = DMatrix::zeros(n, n);
  for i in 0..n {
    for j in i..n {
      let acc: f64 = returns[i]
        .iter()
        .zip(returns[j].iter())
        .map(|(x, y)| (x - means[i]) * (y - means[j]))
        .sum();
      let c = acc * scale;
      cov[(i, j)] = c;
      cov[(j, i)] = c;
    }
  }

  cov
}

/// Annualized historical mean of simple period returns.
pub fn mean_historical_return(prices: &PriceTable, periods_per_year: u32) -> Result<ReturnEstimate> {
  let returns = validated_returns(prices, periods_per_year)?;
  ReturnEstimate::new(
    prices.assets().to_vec(),
    mean_of(&returns, periods_per_year),
  )
}

/// Annualized sample covariance of simple period returns.
pub fn sample_cov(prices: &PriceTable, periods_per_year: u32) -> Result<CovarianceEstimate> {
  let returns = validated_returns(prices, periods_per_year)?;
  CovarianceEstimate::new(prices.assets().to_vec(), cov_of(&returns, periods_per_year))
}

/// Expected returns and covariance in a single pass over the returns.
pub fn estimate(
  prices: &PriceTable,
  periods_per_year: u32,
) -> Result<(ReturnEstimate, CovarianceEstimate)> {
  let returns = validated_returns(prices, periods_per_year)?;
  debug!(
    assets = prices.n_assets(),
    rows = returns[0].len(),
    periods_per_year,
    "estimating mean and covariance"
  );

  let mu = ReturnEstimate::new(
    prices.assets().to_vec(),
    mean_of(&returns, periods_per_year),
  )?;
  let cov = CovarianceEstimate::new(prices.assets().to_vec(), cov_of(&returns, periods_per_year))?;

  Ok((mu, cov))
}
