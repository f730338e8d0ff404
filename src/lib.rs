//! # frontier-rs
//!
//! $$
//! \max_{\mathbf w}\ \frac{\mu^\top\mathbf w - r_f}{\sqrt{\mathbf w^\top\Sigma\mathbf w}}
//! \quad\text{s.t.}\quad \mathbf 1^\top\mathbf w = 1
//! $$
//!
//! Mean-variance efficient frontier for a basket of assets: estimate
//! expected returns and covariance from a price table, find the
//! maximum-Sharpe portfolio and trace the frontier of minimum-variance
//! portfolios over a grid of target returns.
//!
//! ```ignore
//! use frontier_rs::portfolio::PortfolioEngine;
//! use frontier_rs::portfolio::PortfolioEngineConfig;
//!
//! let engine = PortfolioEngine::new(PortfolioEngineConfig::default())?;
//! let report = engine.run(&prices)?;
//! println!("{:?}", report.max_sharpe_performance);
//! ```

pub mod error;
pub mod io;
pub mod portfolio;

pub use error::FrontierError;
pub use error::Result;
