//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Value objects exchanged between the estimator, the optimizer and the
//! frontier tracer. All of them are immutable once built.

use impl_new_derive::ImplNew;
use nalgebra::DMatrix;
use nalgebra::DVector;

use crate::error::FrontierError;
use crate::error::Result;

/// Relative tolerance used when checking covariance symmetry.
const SYMMETRY_TOL: f64 = 1e-9;

pub(crate) fn check_unique(assets: &[String]) -> Result<()> {
  for (i, a) in assets.iter().enumerate() {
    if assets[..i].contains(a) {
      return Err(FrontierError::InvalidArgument(format!(
        "duplicate asset identifier '{a}'"
      )));
    }
  }
  Ok(())
}

/// Annualized expected return per asset.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnEstimate {
  assets: Vec<String>,
  values: DVector<f64>,
}

impl ReturnEstimate {
  pub fn new(assets: Vec<String>, values: Vec<f64>) -> Result<Self> {
    if assets.len() != values.len() {
      return Err(FrontierError::InvalidArgument(format!(
        "{} assets but {} expected returns",
        assets.len(),
        values.len()
      )));
    }
    check_unique(&assets)?;

    Ok(Self {
      assets,
      values: DVector::from_vec(values),
    })
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn values(&self) -> &DVector<f64> {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  /// Expected return of a single asset.
  pub fn get(&self, asset: &str) -> Option<f64> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|i| self.values[i])
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
    self
      .assets
      .iter()
      .zip(self.values.iter())
      .map(|(a, &v)| (a.as_str(), v))
  }

  /// Smallest expected return, `None` for an empty universe.
  pub fn min(&self) -> Option<f64> {
    self.values.iter().copied().reduce(f64::min)
  }

  /// Largest expected return, `None` for an empty universe.
  pub fn max(&self) -> Option<f64> {
    self.values.iter().copied().reduce(f64::max)
  }
}

/// Annualized covariance matrix indexed by asset pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct CovarianceEstimate {
  assets: Vec<String>,
  matrix: DMatrix<f64>,
}

impl CovarianceEstimate {
  /// Build from a square, symmetric matrix whose order follows `assets`.
  pub fn new(assets: Vec<String>, matrix: DMatrix<f64>) -> Result<Self> {
    let n = assets.len();
    if matrix.nrows() != n || matrix.ncols() != n {
      return Err(FrontierError::InvalidArgument(format!(
        "covariance is {}x{} but there are {n} assets",
        matrix.nrows(),
        matrix.ncols()
      )));
    }
    check_unique(&assets)?;

    let cov = Self { assets, matrix };
    if !cov.is_symmetric(SYMMETRY_TOL) {
      return Err(FrontierError::InvalidArgument(
        "covariance matrix is not symmetric".into(),
      ));
    }

    Ok(cov)
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn matrix(&self) -> &DMatrix<f64> {
    &self.matrix
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  /// Covariance between two assets.
  pub fn get(&self, a: &str, b: &str) -> Option<f64> {
    let i = self.assets.iter().position(|x| x == a)?;
    let j = self.assets.iter().position(|x| x == b)?;
    Some(self.matrix[(i, j)])
  }

  pub fn variance(&self, asset: &str) -> Option<f64> {
    self.get(asset, asset)
  }

  /// Per-asset volatility `sqrt(S_ii)`, in asset order.
  pub fn volatilities(&self) -> Vec<f64> {
    self
      .matrix
      .diagonal()
      .iter()
      .map(|&v| v.max(0.0).sqrt())
      .collect()
  }

  pub fn is_symmetric(&self, tol: f64) -> bool {
    let n = self.matrix.nrows();
    for i in 0..n {
      for j in (i + 1)..n {
        let (a, b) = (self.matrix[(i, j)], self.matrix[(j, i)]);
        let scale = a.abs().max(b.abs()).max(1.0);
        if (a - b).abs() > tol * scale {
          return false;
        }
      }
    }
    true
  }
}

/// Portfolio weights keyed by asset identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioWeights {
  assets: Vec<String>,
  values: Vec<f64>,
}

impl PortfolioWeights {
  /// Wrap user-supplied weights. No budget check is applied, so arbitrary
  /// vectors (e.g. all cash) can be evaluated with `portfolio_performance`.
  pub fn new(assets: Vec<String>, values: Vec<f64>) -> Result<Self> {
    if assets.len() != values.len() {
      return Err(FrontierError::InvalidArgument(format!(
        "{} assets but {} weights",
        assets.len(),
        values.len()
      )));
    }
    check_unique(&assets)?;
    Ok(Self { assets, values })
  }

  pub(crate) fn from_solution(assets: &[String], values: Vec<f64>) -> Self {
    Self {
      assets: assets.to_vec(),
      values,
    }
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn get(&self, asset: &str) -> Option<f64> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|i| self.values[i])
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
    self
      .assets
      .iter()
      .zip(self.values.iter())
      .map(|(a, &v)| (a.as_str(), v))
  }

  pub fn sum(&self) -> f64 {
    self.values.iter().sum()
  }

  /// Zero out weights with `|w| < cutoff`, optionally round to `rounding`
  /// decimals, and rescale so the remaining weights keep their previous sum.
  pub fn clean(&self, cutoff: f64, rounding: Option<u32>) -> Self {
    let total = self.sum();
    let mut values: Vec<f64> = self
      .values
      .iter()
      .map(|&w| if w.abs() < cutoff { 0.0 } else { w })
      .collect();

    let kept: f64 = values.iter().sum();
    if kept.abs() > 1e-15 {
      for w in &mut values {
        *w *= total / kept;
      }
    }

    if let Some(decimals) = rounding {
      let scale = 10f64.powi(decimals as i32);
      for w in &mut values {
        *w = (*w * scale).round() / scale;
      }
    }

    Self {
      assets: self.assets.clone(),
      values,
    }
  }
}

/// Expected return, volatility and Sharpe ratio of a portfolio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PortfolioPerformance {
  /// Model expected portfolio return (annualized if inputs are annualized).
  pub expected_return: f64,
  /// Model portfolio volatility.
  pub volatility: f64,
  /// Sharpe ratio computed as `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
}

/// One feasible solve of the frontier sweep.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq)]
pub struct FrontierPoint {
  /// Target return the point was solved for.
  pub target: f64,
  pub volatility: f64,
  pub expected_return: f64,
}

/// Frontier points in target-grid order. May hold fewer points than were
/// requested, including none.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frontier {
  pub points: Vec<FrontierPoint>,
  /// Size of the target grid the sweep ran over.
  pub requested: usize,
}

impl Frontier {
  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Number of grid targets that were skipped.
  pub fn skipped(&self) -> usize {
    self.requested.saturating_sub(self.points.len())
  }

  pub fn volatilities(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.volatility).collect()
  }

  pub fn returns(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.expected_return).collect()
  }
}

/// A single asset placed in (volatility, return) space.
#[derive(ImplNew, Clone, Debug, PartialEq)]
pub struct AssetPoint {
  pub asset: String,
  pub volatility: f64,
  pub expected_return: f64,
}

/// Everything a presentation layer needs to draw the frontier chart.
#[derive(Clone, Debug)]
pub struct FrontierReport {
  pub mu: ReturnEstimate,
  pub cov: CovarianceEstimate,
  pub assets: Vec<AssetPoint>,
  pub max_sharpe: PortfolioWeights,
  pub max_sharpe_performance: PortfolioPerformance,
  pub min_volatility: PortfolioWeights,
  pub min_volatility_performance: PortfolioPerformance,
  pub frontier: Frontier,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn names(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn return_estimate_rejects_length_mismatch() {
    let err = ReturnEstimate::new(names(&["A", "B"]), vec![0.1]).unwrap_err();
    assert!(matches!(err, FrontierError::InvalidArgument(_)));
  }

  #[test]
  fn duplicate_assets_are_rejected() {
    let err = ReturnEstimate::new(names(&["A", "A"]), vec![0.1, 0.2]).unwrap_err();
    assert!(matches!(err, FrontierError::InvalidArgument(_)));
  }

  #[test]
  fn covariance_lookup_by_asset_pair() {
    let m = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]);
    let cov = CovarianceEstimate::new(names(&["A", "B"]), m).unwrap();

    assert_eq!(cov.get("A", "B"), Some(0.01));
    assert_eq!(cov.variance("B"), Some(0.09));
    assert_eq!(cov.get("A", "Z"), None);
    assert!((cov.volatilities()[0] - 0.2).abs() < 1e-12);
  }

  #[test]
  fn covariance_must_be_symmetric() {
    let m = DMatrix::from_row_slice(2, 2, &[0.04, 0.02, 0.01, 0.09]);
    let err = CovarianceEstimate::new(names(&["A", "B"]), m).unwrap_err();
    assert!(matches!(err, FrontierError::InvalidArgument(_)));
  }

  #[test]
  fn clean_drops_dust_and_keeps_budget() {
    let w = PortfolioWeights::new(names(&["A", "B", "C"]), vec![0.6, 0.39995, 0.00005]).unwrap();
    let cleaned = w.clean(1e-4, Some(5));

    assert_eq!(cleaned.get("C"), Some(0.0));
    assert!((cleaned.sum() - 1.0).abs() < 1e-5);
  }

  #[test]
  fn frontier_counts_skipped_targets() {
    let frontier = Frontier {
      points: vec![FrontierPoint::new(0.1, 0.2, 0.1)],
      requested: 5,
    };
    assert_eq!(frontier.skipped(), 4);
    assert_eq!(frontier.returns(), vec![0.1]);
  }
}
