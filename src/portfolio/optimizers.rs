//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf{w}} \mathbf{w}^\top\Sigma\mathbf{w}
//! \quad\text{s.t.}\quad \mathbf 1^\top\mathbf w = 1,\;
//! \mu^\top\mathbf w = r^\*,\; \mathbf w \ge 0
//! $$
//!
//! Mean-variance optimizers solved as convex QPs.
//!
//! The tangency portfolio uses the Charnes-Cooper transform: with
//! `y = w / k`, maximizing `(mu'w - r_f) / sqrt(w'Sw)` over the budget set
//! is equivalent to
//!
//! ```text
//! min y'Sy  s.t.  (mu - r_f)'y = 1,  1'y >= 0,  y >= 0 (long-only)
//! ```
//!
//! and the weights are recovered as `w = y / 1'y`.

use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::debug;

use super::qp;
use super::qp::QuadraticProgram;
use super::qp::SolverSettings;
use super::types::CovarianceEstimate;
use super::types::PortfolioPerformance;
use super::types::PortfolioWeights;
use super::types::ReturnEstimate;
use crate::error::FrontierError;
use crate::error::Result;

/// Volatility below which a portfolio is treated as riskless.
pub const DEGENERATE_VOLATILITY: f64 = 1e-12;

/// Slack allowed when checking a target against `[min(mu), max(mu)]`.
const TARGET_TOL: f64 = 1e-12;

/// Constraint and solver configuration for [`Optimizer`].
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
  /// Forbid short positions.
  pub long_only: bool,
  /// Risk-free rate used in Sharpe computations.
  pub risk_free_rate: f64,
  /// Multiple of the identity added to the covariance before solving.
  pub regularization: f64,
  /// Interior-point solver settings.
  pub solver: SolverSettings,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      long_only: true,
      risk_free_rate: 0.0,
      regularization: 0.0,
      solver: SolverSettings::default(),
    }
  }
}

/// Mean-variance optimizer over a fixed constraint set.
#[derive(Clone, Debug, Default)]
pub struct Optimizer {
  config: OptimizerConfig,
}

impl Optimizer {
  pub fn new(config: OptimizerConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &OptimizerConfig {
    &self.config
  }

  /// Same optimizer with a different diagonal loading.
  pub fn with_regularization(&self, regularization: f64) -> Self {
    let mut config = self.config.clone();
    config.regularization = regularization;
    Self { config }
  }

  /// Tangency portfolio maximizing `(mu'w - r_f) / sqrt(w'Sw)`.
  pub fn max_sharpe(&self, mu: &ReturnEstimate, cov: &CovarianceEstimate) -> Result<PortfolioWeights> {
    let s = self.prepare(mu, cov)?;
    let n = mu.len();
    let rf = self.config.risk_free_rate;
    let excess: Vec<f64> = mu.values().iter().map(|&m| m - rf).collect();

    if self.config.long_only && excess.iter().all(|&e| e <= 0.0) {
      return Err(FrontierError::Infeasible(format!(
        "no asset has an expected return above the risk-free rate {rf}"
      )));
    }
    if excess.iter().all(|&e| e == 0.0) {
      return Err(FrontierError::Infeasible(format!(
        "every asset earns exactly the risk-free rate {rf}"
      )));
    }

    let mut problem = QuadraticProgram::quadratic(s * 2.0)
      .equal(&excess, 1.0)
      .at_most(&vec![-1.0; n], 0.0);
    if self.config.long_only {
      problem = problem.non_negative();
    }

    let y = qp::solve(&problem, &self.config.solver)?;
    let kappa = y.sum();
    if kappa <= DEGENERATE_VOLATILITY {
      return Err(FrontierError::IllConditioned(format!(
        "tangency scale {kappa:e} is not positive"
      )));
    }
    debug!(kappa, "max sharpe solved");

    self.finalize(mu.assets(), y / kappa)
  }

  /// Minimum-variance weights whose expected return equals `target`.
  pub fn min_variance_for_return(
    &self,
    mu: &ReturnEstimate,
    cov: &CovarianceEstimate,
    target: f64,
  ) -> Result<PortfolioWeights> {
    if !target.is_finite() {
      return Err(FrontierError::InvalidArgument(format!(
        "target return must be finite, got {target}"
      )));
    }
    let s = self.prepare(mu, cov)?;
    let n = mu.len();

    if self.config.long_only {
      let (lo, hi) = (mu.min().unwrap_or(0.0), mu.max().unwrap_or(0.0));
      let tol = TARGET_TOL * lo.abs().max(hi.abs()).max(1.0);
      if target > hi + tol {
        return Err(FrontierError::Infeasible(format!(
          "target {target} exceeds the largest expected return {hi}"
        )));
      }
      if target < lo - tol {
        return Err(FrontierError::Infeasible(format!(
          "target {target} is below the smallest expected return {lo}"
        )));
      }
    }

    let mut problem = QuadraticProgram::quadratic(s * 2.0)
      .equal(mu.values().as_slice(), target)
      .equal(&vec![1.0; n], 1.0);
    if self.config.long_only {
      problem = problem.non_negative();
    }

    let w = qp::solve(&problem, &self.config.solver)?;
    debug!(target, "min variance for return solved");

    self.finalize(mu.assets(), w)
  }

  /// Global minimum-variance portfolio.
  pub fn min_volatility(&self, mu: &ReturnEstimate, cov: &CovarianceEstimate) -> Result<PortfolioWeights> {
    let s = self.prepare(mu, cov)?;
    let n = mu.len();

    let mut problem = QuadraticProgram::quadratic(s * 2.0).equal(&vec![1.0; n], 1.0);
    if self.config.long_only {
      problem = problem.non_negative();
    }

    let w = qp::solve(&problem, &self.config.solver)?;
    self.finalize(mu.assets(), w)
  }

  /// Performance under this optimizer's risk-free rate.
  pub fn portfolio_performance(
    &self,
    weights: &PortfolioWeights,
    mu: &ReturnEstimate,
    cov: &CovarianceEstimate,
  ) -> Result<PortfolioPerformance> {
    portfolio_performance(weights, mu, cov, self.config.risk_free_rate)
  }

  /// Validate inputs and return the (regularized) covariance matrix.
  fn prepare(&self, mu: &ReturnEstimate, cov: &CovarianceEstimate) -> Result<DMatrix<f64>> {
    if mu.assets() != cov.assets() {
      return Err(FrontierError::InvalidArgument(
        "expected returns and covariance cover different assets".into(),
      ));
    }
    if mu.is_empty() {
      return Err(FrontierError::EmptyUniverse);
    }

    let reg = self.config.regularization;
    if !reg.is_finite() || reg < 0.0 {
      return Err(FrontierError::InvalidArgument(format!(
        "regularization must be a finite non-negative number, got {reg}"
      )));
    }
    if !self.config.risk_free_rate.is_finite() {
      return Err(FrontierError::InvalidArgument(
        "risk-free rate must be finite".into(),
      ));
    }

    if mu.values().iter().any(|v| !v.is_finite()) {
      return Err(FrontierError::InvalidArgument(
        "expected returns contain non-finite values".into(),
      ));
    }
    if cov.matrix().iter().any(|v| !v.is_finite()) {
      return Err(FrontierError::InvalidArgument(
        "covariance contains non-finite values".into(),
      ));
    }

    let n = mu.len();
    Ok(cov.matrix() + DMatrix::<f64>::identity(n, n) * reg)
  }

  /// Clip solver noise below zero (long-only) and renormalize to the budget.
  fn finalize(&self, assets: &[String], w: DVector<f64>) -> Result<PortfolioWeights> {
    let mut values: Vec<f64> = w.iter().copied().collect();
    if self.config.long_only {
      for v in &mut values {
        *v = v.max(0.0);
      }
    }

    let total: f64 = values.iter().sum();
    if total.abs() <= DEGENERATE_VOLATILITY {
      return Err(FrontierError::IllConditioned(
        "solver weights do not sum to a usable budget".into(),
      ));
    }
    for v in &mut values {
      *v /= total;
    }

    Ok(PortfolioWeights::from_solution(assets, values))
  }
}

/// `mu'w` and `sqrt(w'Sw)` for weights already aligned with `mu` and `cov`.
/// A riskless portfolio yields zero volatility here rather than an error.
pub(crate) fn return_and_volatility(
  weights: &PortfolioWeights,
  mu: &ReturnEstimate,
  cov: &CovarianceEstimate,
) -> (f64, f64) {
  let w = DVector::from_column_slice(weights.values());
  let sigma_w = cov.matrix() * &w;
  (mu.values().dot(&w), w.dot(&sigma_w).max(0.0).sqrt())
}

/// Expected return, volatility and Sharpe ratio of `weights`.
pub fn portfolio_performance(
  weights: &PortfolioWeights,
  mu: &ReturnEstimate,
  cov: &CovarianceEstimate,
  risk_free_rate: f64,
) -> Result<PortfolioPerformance> {
  if weights.assets() != mu.assets() || weights.assets() != cov.assets() {
    return Err(FrontierError::InvalidArgument(
      "weights, expected returns and covariance cover different assets".into(),
    ));
  }

  let (expected_return, volatility) = return_and_volatility(weights, mu, cov);
  if volatility.is_nan() || volatility < DEGENERATE_VOLATILITY {
    return Err(FrontierError::Degenerate { volatility });
  }

  Ok(PortfolioPerformance {
    expected_return,
    volatility,
    sharpe: (expected_return - risk_free_rate) / volatility,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("A{i}")).collect()
  }

  fn inputs(mu: Vec<f64>, cov: &[f64]) -> (ReturnEstimate, CovarianceEstimate) {
    let n = mu.len();
    (
      ReturnEstimate::new(names(n), mu).unwrap(),
      CovarianceEstimate::new(names(n), DMatrix::from_row_slice(n, n, cov)).unwrap(),
    )
  }

  fn two_uncorrelated() -> (ReturnEstimate, CovarianceEstimate) {
    inputs(vec![0.10, 0.06], &[0.04, 0.0, 0.0, 0.01])
  }

  fn three_assets() -> (ReturnEstimate, CovarianceEstimate) {
    inputs(
      vec![0.08, 0.1, 0.12],
      &[0.04, 0.01, 0.0, 0.01, 0.09, 0.02, 0.0, 0.02, 0.16],
    )
  }

  #[test]
  fn tangency_matches_closed_form() {
    let (mu, cov) = two_uncorrelated();
    let w = Optimizer::default().max_sharpe(&mu, &cov).unwrap();

    // w ∝ S^-1 mu = (2.5, 6.0)
    assert_abs_diff_eq!(w.values()[0], 2.5 / 8.5, epsilon = 1e-4);
    assert_abs_diff_eq!(w.values()[1], 6.0 / 8.5, epsilon = 1e-4);

    let perf = Optimizer::default().portfolio_performance(&w, &mu, &cov).unwrap();
    assert_abs_diff_eq!(perf.sharpe, 0.61f64.sqrt(), epsilon = 1e-4);
  }

  #[test]
  fn max_sharpe_weights_are_a_long_only_budget() {
    let (mu, cov) = three_assets();
    let w = Optimizer::default().max_sharpe(&mu, &cov).unwrap();

    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-6);
    assert!(w.values().iter().all(|&x| x >= -1e-9));
  }

  #[test]
  fn max_sharpe_with_risk_free_rate_above_all_returns_is_infeasible() {
    let (mu, cov) = three_assets();
    let optimizer = Optimizer::new(OptimizerConfig {
      risk_free_rate: 0.2,
      ..OptimizerConfig::default()
    });
    let err = optimizer.max_sharpe(&mu, &cov).unwrap_err();
    assert!(matches!(err, FrontierError::Infeasible(_)));
  }

  #[test]
  fn long_short_tangency_can_short() {
    // Asset 1 is a noisy copy of asset 0 with lower return.
    let (mu, cov) = inputs(vec![0.10, 0.02], &[0.04, 0.038, 0.038, 0.04]);
    let optimizer = Optimizer::new(OptimizerConfig {
      long_only: false,
      ..OptimizerConfig::default()
    });
    let w = optimizer.max_sharpe(&mu, &cov).unwrap();

    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-6);
    assert!(w.values()[1] < 0.0);
  }

  #[test]
  fn target_above_max_return_is_infeasible() {
    let (mu, cov) = three_assets();
    let err = Optimizer::default()
      .min_variance_for_return(&mu, &cov, 0.13)
      .unwrap_err();
    assert!(matches!(err, FrontierError::Infeasible(_)));
  }

  #[test]
  fn target_below_min_return_is_infeasible() {
    let (mu, cov) = three_assets();
    let err = Optimizer::default()
      .min_variance_for_return(&mu, &cov, 0.05)
      .unwrap_err();
    assert!(matches!(err, FrontierError::Infeasible(_)));
  }

  #[test]
  fn min_variance_hits_the_target() {
    let (mu, cov) = three_assets();
    let optimizer = Optimizer::default();
    let w = optimizer.min_variance_for_return(&mu, &cov, 0.1).unwrap();
    let perf = optimizer.portfolio_performance(&w, &mu, &cov).unwrap();

    assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(perf.expected_return, 0.1, epsilon = 1e-6);
  }

  #[test]
  fn min_variance_is_idempotent_at_the_gmv_return() {
    let (mu, cov) = three_assets();
    let optimizer = Optimizer::default();
    let gmv = optimizer.min_volatility(&mu, &cov).unwrap();
    let target = optimizer
      .portfolio_performance(&gmv, &mu, &cov)
      .unwrap()
      .expected_return;

    let again = optimizer.min_variance_for_return(&mu, &cov, target).unwrap();
    for (a, b) in gmv.values().iter().zip(again.values()) {
      assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
  }

  #[test]
  fn singular_covariance_still_solves_with_regularization() {
    let (mu, cov) = inputs(vec![0.1, 0.1], &[0.04, 0.04, 0.04, 0.04]);
    let optimizer = Optimizer::default().with_regularization(1e-6);
    let w = optimizer.min_volatility(&mu, &cov).unwrap();

    assert_abs_diff_eq!(w.values()[0], 0.5, epsilon = 1e-4);
  }

  #[test]
  fn non_finite_inputs_are_invalid() {
    let (mu, cov) = inputs(vec![0.1, 0.05], &[f64::NAN, 0.0, 0.0, 0.01]);
    let err = Optimizer::default().min_volatility(&mu, &cov).unwrap_err();
    assert!(matches!(err, FrontierError::InvalidArgument(_)));

    let (mu, cov) = inputs(vec![f64::INFINITY, 0.05], &[0.04, 0.0, 0.0, 0.01]);
    let err = Optimizer::default().max_sharpe(&mu, &cov).unwrap_err();
    assert!(matches!(err, FrontierError::InvalidArgument(_)));
  }

  #[test]
  fn mismatched_assets_are_rejected() {
    let (mu, _) = two_uncorrelated();
    let (_, cov) = three_assets();
    let err = Optimizer::default().max_sharpe(&mu, &cov).unwrap_err();
    assert!(matches!(err, FrontierError::InvalidArgument(_)));
  }

  #[test]
  fn all_cash_portfolio_is_degenerate() {
    let (mu, cov) = two_uncorrelated();
    let cash = PortfolioWeights::new(names(2), vec![0.0, 0.0]).unwrap();
    let err = portfolio_performance(&cash, &mu, &cov, 0.0).unwrap_err();
    assert!(matches!(err, FrontierError::Degenerate { .. }));
  }

  #[test]
  fn performance_uses_the_risk_free_rate() {
    let (mu, cov) = two_uncorrelated();
    let w = PortfolioWeights::new(names(2), vec![1.0, 0.0]).unwrap();
    let perf = portfolio_performance(&w, &mu, &cov, 0.02).unwrap();

    assert_abs_diff_eq!(perf.expected_return, 0.10, epsilon = 1e-12);
    assert_abs_diff_eq!(perf.volatility, 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(perf.sharpe, 0.4, epsilon = 1e-12);
  }
}
