//! # Errors
//!
//! Error taxonomy shared by the estimator, optimizer and frontier tracer.

use thiserror::Error;

/// Error type for frontier computations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrontierError {
  /// Fewer than two usable return observations after cleaning.
  #[error("insufficient data: {rows} usable return rows, at least {required} required")]
  InsufficientData { rows: usize, required: usize },

  /// No asset column survived cleaning.
  #[error("empty universe: no asset survived cleaning")]
  EmptyUniverse,

  /// No weight vector satisfies the constraints.
  #[error("infeasible: {0}")]
  Infeasible(String),

  /// Covariance is singular or the solver did not converge.
  #[error("ill-conditioned: {0}")]
  IllConditioned(String),

  /// Portfolio volatility is numerically zero.
  #[error("degenerate portfolio: volatility {volatility:e} is too close to zero")]
  Degenerate { volatility: f64 },

  /// Bad configuration or mismatched inputs.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),
}

impl FrontierError {
  /// Per-solve failures that a caller may skip or retry with regularization.
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      FrontierError::Infeasible(_) | FrontierError::IllConditioned(_)
    )
  }
}

/// Result type for frontier computations.
pub type Result<T> = std::result::Result<T, FrontierError>;
