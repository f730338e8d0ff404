//! # Portfolio Engine
//!
//! $$
//! p \mapsto (\hat\mu, \hat\Sigma) \mapsto \left(\mathbf w_{\text{tan}},\,
//! \{(\sigma^\*(r), r)\}_{r}\right)
//! $$
//!
//! High-level orchestration: estimation, tangency and minimum-variance
//! portfolios, and the frontier sweep, all driven by one configuration.

use tracing::info;
use tracing::warn;

use super::data::PriceTable;
use super::data::DEFAULT_MIN_COMPLETENESS;
use super::estimator;
use super::estimator::DEFAULT_PERIODS_PER_YEAR;
use super::frontier;
use super::optimizers::Optimizer;
use super::optimizers::OptimizerConfig;
use super::qp::SolverSettings;
use super::types::AssetPoint;
use super::types::CovarianceEstimate;
use super::types::FrontierReport;
use super::types::PortfolioWeights;
use super::types::ReturnEstimate;
use crate::error::FrontierError;
use crate::error::Result;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug)]
pub struct PortfolioEngineConfig {
  /// Annualization factor for means and covariances.
  pub periods_per_year: u32,
  /// Size of the frontier target grid.
  pub num_frontier_points: usize,
  /// Forbid short positions.
  pub long_only: bool,
  /// Risk-free rate used in Sharpe computations.
  pub risk_free_rate: f64,
  /// Fraction of dates an asset must be observed on to be retained.
  pub min_completeness: f64,
  /// Run the frontier sweep on the rayon pool.
  pub parallel: bool,
  /// Diagonal loading applied to every solve.
  pub regularization: f64,
  /// Extra diagonal loading for a single retry of an ill-conditioned
  /// tangency or minimum-variance solve. Zero disables the retry.
  pub fallback_regularization: f64,
  /// Interior-point solver settings.
  pub solver: SolverSettings,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      periods_per_year: DEFAULT_PERIODS_PER_YEAR,
      num_frontier_points: 100,
      long_only: true,
      risk_free_rate: 0.0,
      min_completeness: DEFAULT_MIN_COMPLETENESS,
      parallel: false,
      regularization: 0.0,
      fallback_regularization: 1e-8,
      solver: SolverSettings::default(),
    }
  }
}

impl PortfolioEngineConfig {
  /// Check every option before any data is touched.
  pub fn validate(&self) -> Result<()> {
    let invalid = |msg: String| Err(FrontierError::InvalidArgument(msg));

    if self.periods_per_year == 0 {
      return invalid("periods_per_year must be positive".into());
    }
    if self.num_frontier_points < 2 {
      return invalid(format!(
        "num_frontier_points must be at least 2, got {}",
        self.num_frontier_points
      ));
    }
    if !self.risk_free_rate.is_finite() {
      return invalid(format!(
        "risk_free_rate must be finite, got {}",
        self.risk_free_rate
      ));
    }
    if !(0.0..=1.0).contains(&self.min_completeness) {
      return invalid(format!(
        "min_completeness must be in [0, 1], got {}",
        self.min_completeness
      ));
    }
    for (name, value) in [
      ("regularization", self.regularization),
      ("fallback_regularization", self.fallback_regularization),
    ] {
      if !value.is_finite() || value < 0.0 {
        return invalid(format!("{name} must be finite and non-negative, got {value}"));
      }
    }
    if self.solver.max_iter == 0 {
      return invalid("solver max_iter must be positive".into());
    }

    Ok(())
  }
}

/// Single entry-point engine for the efficient frontier workflow.
#[derive(Clone, Debug)]
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
}

impl PortfolioEngine {
  /// Construct a new engine, validating the configuration eagerly.
  pub fn new(config: PortfolioEngineConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { config })
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  /// Optimizer configured from the engine options.
  pub fn optimizer(&self) -> Optimizer {
    Optimizer::new(OptimizerConfig {
      long_only: self.config.long_only,
      risk_free_rate: self.config.risk_free_rate,
      regularization: self.config.regularization,
      solver: self.config.solver.clone(),
    })
  }

  /// Annualized expected returns and covariance.
  pub fn estimate(&self, prices: &PriceTable) -> Result<(ReturnEstimate, CovarianceEstimate)> {
    estimator::estimate(prices, self.config.periods_per_year)
  }

  /// Run a single-shot solve, retrying once with extra diagonal loading if
  /// the first attempt is ill-conditioned.
  fn solve_once<F>(&self, label: &str, solve: F) -> Result<PortfolioWeights>
  where
    F: Fn(&Optimizer) -> Result<PortfolioWeights>,
  {
    let optimizer = self.optimizer();
    match solve(&optimizer) {
      Err(FrontierError::IllConditioned(reason)) if self.config.fallback_regularization > 0.0 => {
        let regularization = self.config.regularization + self.config.fallback_regularization;
        warn!(label, %reason, regularization, "retrying with regularized covariance");
        solve(&optimizer.with_regularization(regularization))
      }
      other => other,
    }
  }

  /// Full pipeline from prices to everything a frontier chart needs.
  pub fn run(&self, prices: &PriceTable) -> Result<FrontierReport> {
    let (mu, cov) = self.estimate(prices)?;
    info!(
      assets = prices.n_assets(),
      dates = prices.n_dates(),
      "estimated expected returns and covariance"
    );

    let optimizer = self.optimizer();

    let max_sharpe = self.solve_once("max_sharpe", |o| o.max_sharpe(&mu, &cov))?;
    let max_sharpe_performance = optimizer.portfolio_performance(&max_sharpe, &mu, &cov)?;
    info!(
      expected_return = max_sharpe_performance.expected_return,
      volatility = max_sharpe_performance.volatility,
      sharpe = max_sharpe_performance.sharpe,
      "tangency portfolio"
    );

    let min_volatility = self.solve_once("min_volatility", |o| o.min_volatility(&mu, &cov))?;
    let min_volatility_performance = optimizer.portfolio_performance(&min_volatility, &mu, &cov)?;

    let frontier = if self.config.parallel {
      frontier::trace_parallel(&optimizer, &mu, &cov, self.config.num_frontier_points)?
    } else {
      frontier::trace(&optimizer, &mu, &cov, self.config.num_frontier_points)?
    };
    info!(
      points = frontier.len(),
      skipped = frontier.skipped(),
      "efficient frontier"
    );

    let assets = mu
      .iter()
      .zip(cov.volatilities())
      .map(|((asset, ret), vol)| AssetPoint::new(asset.to_string(), vol, ret))
      .collect();

    Ok(FrontierReport {
      mu,
      cov,
      assets,
      max_sharpe,
      max_sharpe_performance,
      min_volatility,
      min_volatility_performance,
      frontier,
    })
  }
}
