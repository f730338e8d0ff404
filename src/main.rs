use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use prettytable::row;
use prettytable::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

use frontier_rs::io::read_price_csv;
use frontier_rs::io::write_frontier_csv;
use frontier_rs::portfolio::FrontierReport;
use frontier_rs::portfolio::PortfolioEngine;
use frontier_rs::portfolio::PortfolioEngineConfig;

#[derive(Parser, Debug)]
#[command(
  author,
  version,
  about = "Efficient frontier and maximum-Sharpe portfolio from historical prices"
)]
struct Args {
  /// CSV of closing prices: a date column followed by one column per asset
  #[arg(long)]
  prices: PathBuf,

  /// Periods per year used for annualization
  #[arg(long, default_value_t = 252)]
  periods_per_year: u32,

  /// Number of target returns on the frontier grid
  #[arg(long, default_value_t = 100)]
  points: usize,

  /// Risk-free rate used for the Sharpe ratio
  #[arg(long, default_value_t = 0.0)]
  risk_free: f64,

  /// Fraction of dates an asset must be observed on to be kept
  #[arg(long, default_value_t = 0.95)]
  min_completeness: f64,

  /// Allow short positions
  #[arg(long)]
  allow_short: bool,

  /// Solve frontier points in parallel
  #[arg(long)]
  parallel: bool,

  /// Write the frontier series to this CSV
  #[arg(long)]
  frontier_out: Option<PathBuf>,
}

impl Args {
  fn engine_config(&self) -> PortfolioEngineConfig {
    PortfolioEngineConfig {
      periods_per_year: self.periods_per_year,
      num_frontier_points: self.points,
      long_only: !self.allow_short,
      risk_free_rate: self.risk_free,
      min_completeness: self.min_completeness,
      parallel: self.parallel,
      ..PortfolioEngineConfig::default()
    }
  }
}

fn pct(x: f64) -> String {
  format!("{:.2}%", x * 100.0)
}

fn print_report(report: &FrontierReport) {
  let mut assets = Table::new();
  assets.add_row(row!["Asset", "Exp. return", "Volatility", "Tangency weight"]);
  let weights = report.max_sharpe.clean(1e-4, Some(5));
  for point in &report.assets {
    let w = weights.get(&point.asset).unwrap_or(0.0);
    assets.add_row(row![
      point.asset,
      pct(point.expected_return),
      pct(point.volatility),
      pct(w)
    ]);
  }
  assets.printstd();

  let mut summary = Table::new();
  summary.add_row(row!["Portfolio", "Exp. return", "Volatility", "Sharpe"]);
  for (name, perf) in [
    ("Max Sharpe", &report.max_sharpe_performance),
    ("Min volatility", &report.min_volatility_performance),
  ] {
    summary.add_row(row![
      name,
      pct(perf.expected_return),
      pct(perf.volatility),
      format!("{:.3}", perf.sharpe)
    ]);
  }
  summary.printstd();

  let frontier = &report.frontier;
  println!(
    "Efficient frontier: {} of {} targets solved",
    frontier.len(),
    frontier.requested
  );
  if let (Some(first), Some(last)) = (frontier.points.first(), frontier.points.last()) {
    println!(
      "  from {} @ {} to {} @ {}",
      pct(first.expected_return),
      pct(first.volatility),
      pct(last.expected_return),
      pct(last.volatility)
    );
  }
}

fn main() -> Result<()> {
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("frontier_rs=info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  let args = Args::parse();
  let engine = PortfolioEngine::new(args.engine_config()).context("invalid configuration")?;

  let prices = read_price_csv(&args.prices, engine.config().min_completeness)?;
  info!(
    assets = prices.n_assets(),
    dates = prices.n_dates(),
    "loaded {}",
    args.prices.display()
  );

  let report = engine.run(&prices)?;
  print_report(&report);

  if let Some(path) = &args.frontier_out {
    write_frontier_csv(&report.frontier, path)?;
    info!("frontier written to {}", path.display());
  }

  Ok(())
}
