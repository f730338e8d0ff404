use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use frontier_rs::io::read_prices;
use frontier_rs::portfolio::estimate;
use frontier_rs::portfolio::portfolio_performance;
use frontier_rs::portfolio::trace;
use frontier_rs::portfolio::trace_parallel;
use frontier_rs::portfolio::CovarianceEstimate;
use frontier_rs::portfolio::Optimizer;
use frontier_rs::portfolio::PortfolioEngine;
use frontier_rs::portfolio::PortfolioEngineConfig;
use frontier_rs::portfolio::PortfolioWeights;
use frontier_rs::portfolio::PriceTable;
use frontier_rs::portfolio::ReturnEstimate;
use frontier_rs::FrontierError;
use nalgebra::DMatrix;

/// Deterministic price paths with distinct drifts and partly shared shocks.
fn synthetic_prices(n_dates: usize) -> PriceTable {
  let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
  let dates: Vec<NaiveDate> = (0..n_dates)
    .map(|i| start + chrono::Duration::days(i as i64))
    .collect();

  let specs = [(0.0008, 0.012, 1.0), (0.0004, 0.008, 2.0), (0.0002, 0.005, 3.0), (0.0006, 0.015, 5.0)];
  let columns: Vec<Vec<f64>> = specs
    .iter()
    .map(|&(drift, amp, freq)| {
      let mut p = 50.0;
      (0..n_dates)
        .map(|t| {
          let t = t as f64;
          let common = 0.004 * (0.7 * t).sin();
          let own = amp * (freq * t + freq).sin();
          p *= 1.0 + drift + common + own;
          p
        })
        .collect::<Vec<f64>>()
    })
    .collect();

  let assets = ["AAA", "BBB", "CCC", "DDD"].iter().map(|s| s.to_string()).collect();
  PriceTable::new(dates, assets, columns).unwrap()
}

#[test]
fn pipeline_report_satisfies_frontier_properties() {
  let engine = PortfolioEngine::new(PortfolioEngineConfig::default()).unwrap();
  let report = engine.run(&synthetic_prices(250)).unwrap();

  assert!(report.cov.is_symmetric(1e-12));
  for v in report.cov.matrix().diagonal().iter() {
    assert!(*v >= 0.0);
  }

  assert_abs_diff_eq!(report.max_sharpe.sum(), 1.0, epsilon = 1e-6);
  assert!(report.max_sharpe.values().iter().all(|&w| w >= -1e-9));

  let gmv_vol = report.min_volatility_performance.volatility;
  assert_eq!(report.frontier.requested, 100);
  for pair in report.frontier.points.windows(2) {
    assert!(pair[0].target <= pair[1].target);
  }
  for p in &report.frontier.points {
    assert!(p.volatility >= gmv_vol - 1e-6);
    // No frontier portfolio beats the tangency Sharpe ratio.
    assert!(p.expected_return / p.volatility <= report.max_sharpe_performance.sharpe + 1e-4);
  }
}

#[test]
fn parallel_engine_matches_sequential_engine() {
  let prices = synthetic_prices(120);
  let seq = PortfolioEngine::new(PortfolioEngineConfig {
    num_frontier_points: 40,
    ..PortfolioEngineConfig::default()
  })
  .unwrap()
  .run(&prices)
  .unwrap();
  let par = PortfolioEngine::new(PortfolioEngineConfig {
    num_frontier_points: 40,
    parallel: true,
    ..PortfolioEngineConfig::default()
  })
  .unwrap()
  .run(&prices)
  .unwrap();

  assert_eq!(seq.frontier.len(), par.frontier.len());
  for (a, b) in seq.frontier.points.iter().zip(&par.frontier.points) {
    assert_abs_diff_eq!(a.volatility, b.volatility, epsilon = 1e-9);
  }
}

#[test]
fn two_asset_tangency_matches_closed_form() {
  let assets = vec!["X".to_string(), "Y".to_string()];
  let mu = ReturnEstimate::new(assets.clone(), vec![0.10, 0.06]).unwrap();
  let cov = CovarianceEstimate::new(
    assets,
    DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.01]),
  )
  .unwrap();

  let w = Optimizer::default().max_sharpe(&mu, &cov).unwrap();
  assert_abs_diff_eq!(w.get("X").unwrap(), 5.0 / 17.0, epsilon = 1e-4);
  assert_abs_diff_eq!(w.get("Y").unwrap(), 12.0 / 17.0, epsilon = 1e-4);

  let frontier = trace(&Optimizer::default(), &mu, &cov, 50).unwrap();
  let best = frontier
    .points
    .iter()
    .map(|p| p.expected_return / p.volatility)
    .fold(f64::NEG_INFINITY, f64::max);
  let tangency = portfolio_performance(&w, &mu, &cov, 0.0).unwrap();
  assert!(best <= tangency.sharpe + 1e-6);
}

#[test]
fn long_short_frontier_extends_between_asset_returns() {
  let prices = synthetic_prices(200);
  let (mu, cov) = estimate(&prices, 252).unwrap();
  let optimizer = Optimizer::new(frontier_rs::portfolio::OptimizerConfig {
    long_only: false,
    ..Default::default()
  });

  let frontier = trace_parallel(&optimizer, &mu, &cov, 20).unwrap();
  assert_eq!(frontier.len(), 20);
}

#[test]
fn estimator_errors_surface_through_the_engine() {
  let csv = "Date,AAA,BBB\n2024-01-02,10,20\n";
  let prices = read_prices(csv.as_bytes(), 0.95).unwrap();
  let engine = PortfolioEngine::new(PortfolioEngineConfig::default()).unwrap();

  assert!(matches!(
    engine.run(&prices).unwrap_err(),
    FrontierError::InsufficientData { .. }
  ));
}

#[test]
fn all_cash_weights_are_degenerate() {
  let (mu, cov) = estimate(&synthetic_prices(30), 252).unwrap();
  let cash = PortfolioWeights::new(mu.assets().to_vec(), vec![0.0; mu.len()]).unwrap();

  assert!(matches!(
    portfolio_performance(&cash, &mu, &cov, 0.0).unwrap_err(),
    FrontierError::Degenerate { .. }
  ));
}
