//! # Frontier Tracer
//!
//! $$
//! \sigma^\*(r) = \min_{\mathbf w}\left\{\sqrt{\mathbf w^\top\Sigma\mathbf w}
//! : \mu^\top\mathbf w = r\right\},\quad r \in [\min\mu, \max\mu]
//! $$
//!
//! Sweeps a grid of target returns through
//! [`Optimizer::min_variance_for_return`]. A target whose solve is
//! infeasible or ill-conditioned is skipped, so a frontier may be shorter
//! than its grid or empty; neither case is an error. Any other failure is
//! returned to the caller.

use rayon::prelude::*;
use tracing::debug;

use super::optimizers::return_and_volatility;
use super::optimizers::Optimizer;
use super::types::CovarianceEstimate;
use super::types::Frontier;
use super::types::FrontierPoint;
use super::types::ReturnEstimate;
use crate::error::FrontierError;
use crate::error::Result;

/// `n` evenly spaced values from `start` to `end`, both inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
  match n {
    0 => Vec::new(),
    1 => vec![start],
    _ => {
      let step = (end - start) / (n - 1) as f64;
      (0..n)
        .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
        .collect()
    }
  }
}

fn target_grid(mu: &ReturnEstimate, num_points: usize) -> Result<Vec<f64>> {
  if num_points < 2 {
    return Err(FrontierError::InvalidArgument(format!(
      "a frontier needs at least 2 points, got {num_points}"
    )));
  }
  match (mu.min(), mu.max()) {
    (Some(lo), Some(hi)) => Ok(linspace(lo, hi, num_points)),
    _ => Err(FrontierError::EmptyUniverse),
  }
}

/// Solve one grid target. `Ok(None)` marks a skipped target.
fn solve_point(
  optimizer: &Optimizer,
  mu: &ReturnEstimate,
  cov: &CovarianceEstimate,
  target: f64,
) -> Result<Option<FrontierPoint>> {
  match optimizer.min_variance_for_return(mu, cov, target) {
    Ok(w) => {
      let (expected_return, volatility) = return_and_volatility(&w, mu, cov);
      Ok(Some(FrontierPoint::new(target, volatility, expected_return)))
    }
    Err(err @ (FrontierError::Infeasible(_) | FrontierError::IllConditioned(_))) => {
      debug!(target, %err, "skipping frontier target");
      Ok(None)
    }
    Err(err) => Err(err),
  }
}

fn collect(requested: usize, solved: Vec<Result<Option<FrontierPoint>>>) -> Result<Frontier> {
  let mut points = Vec::with_capacity(requested);
  for point in solved {
    if let Some(p) = point? {
      points.push(p);
    }
  }

  debug!(requested, traced = points.len(), "frontier traced");
  Ok(Frontier { points, requested })
}

/// Trace the frontier over `num_points` targets between `min(mu)` and
/// `max(mu)`, in grid order.
pub fn trace(
  optimizer: &Optimizer,
  mu: &ReturnEstimate,
  cov: &CovarianceEstimate,
  num_points: usize,
) -> Result<Frontier> {
  let grid = target_grid(mu, num_points)?;
  let solved = grid
    .iter()
    .map(|&target| solve_point(optimizer, mu, cov, target))
    .collect();

  collect(num_points, solved)
}

/// [`trace`] with the independent solves spread over the rayon pool.
pub fn trace_parallel(
  optimizer: &Optimizer,
  mu: &ReturnEstimate,
  cov: &CovarianceEstimate,
  num_points: usize,
) -> Result<Frontier> {
  let grid = target_grid(mu, num_points)?;
  let solved = grid
    .par_iter()
    .map(|&target| solve_point(optimizer, mu, cov, target))
    .collect();

  collect(num_points, solved)
}
