//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Mean-variance estimation, tangency portfolio and efficient frontier.

pub mod data;
pub mod engine;
pub mod estimator;
pub mod frontier;
pub mod optimizers;
pub mod qp;
pub mod types;

pub use data::simple_returns_series;
pub use data::PriceTable;
pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use estimator::estimate;
pub use estimator::mean_historical_return;
pub use estimator::sample_cov;
pub use frontier::linspace;
pub use frontier::trace;
pub use frontier::trace_parallel;
pub use optimizers::portfolio_performance;
pub use optimizers::Optimizer;
pub use optimizers::OptimizerConfig;
pub use qp::SolverSettings;
pub use types::AssetPoint;
pub use types::CovarianceEstimate;
pub use types::Frontier;
pub use types::FrontierPoint;
pub use types::FrontierReport;
pub use types::PortfolioPerformance;
pub use types::PortfolioWeights;
pub use types::ReturnEstimate;
