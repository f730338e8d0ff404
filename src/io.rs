//! # Price and Frontier Files
//!
//! $$
//! \text{date}, p_{1}, \dots, p_{N}
//! $$
//!
//! CSV loading of a wide price table (one date column, one column per
//! asset, empty cells for missing prices) and CSV export of frontier series.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use csv::Writer;

use crate::portfolio::Frontier;
use crate::portfolio::PriceTable;

const MISSING: [&str; 5] = ["", "nan", "na", "null", "none"];

fn parse_date(field: &str) -> Result<NaiveDate> {
  let day = field
    .trim()
    .split(|c: char| c == ' ' || c == 'T')
    .next()
    .unwrap_or_default();
  NaiveDate::parse_from_str(day, "%Y-%m-%d").with_context(|| format!("invalid date '{field}'"))
}

fn parse_price(field: &str) -> Result<Option<f64>> {
  let field = field.trim();
  if MISSING.contains(&field.to_ascii_lowercase().as_str()) {
    return Ok(None);
  }
  let value: f64 = field
    .parse()
    .with_context(|| format!("invalid price '{field}'"))?;
  Ok(Some(value))
}

/// Load a price table from any CSV reader.
pub fn read_prices<R: Read>(reader: R, min_completeness: f64) -> Result<PriceTable> {
  let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
  let headers = reader.headers().context("failed to read CSV header")?.clone();
  if headers.len() < 2 {
    bail!("price CSV needs a date column and at least one asset column");
  }
  let assets: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

  let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
  for (line, record) in reader.records().enumerate() {
    let record = record.with_context(|| format!("failed to read CSV row {}", line + 2))?;
    let date = parse_date(record.get(0).unwrap_or_default())?;
    let prices = (1..headers.len())
      .map(|j| parse_price(record.get(j).unwrap_or_default()))
      .collect::<Result<Vec<_>>>()
      .with_context(|| format!("row {} ({date})", line + 2))?;
    rows.push((date, prices));
  }
  rows.sort_by_key(|(date, _)| *date);

  let dates: Vec<NaiveDate> = rows.iter().map(|(d, _)| *d).collect();
  let columns: Vec<Vec<Option<f64>>> = (0..assets.len())
    .map(|j| rows.iter().map(|(_, p)| p[j]).collect())
    .collect();

  Ok(PriceTable::from_raw(dates, assets, columns, min_completeness)?)
}

/// Load a price table from a CSV file.
pub fn read_price_csv<P: AsRef<Path>>(path: P, min_completeness: f64) -> Result<PriceTable> {
  let file = File::open(&path)
    .with_context(|| format!("Failed to open file: {:?}", path.as_ref()))?;
  read_prices(file, min_completeness)
}

/// Write `target,volatility,expected_return` rows for a renderer.
pub fn write_frontier_csv<P: AsRef<Path>>(frontier: &Frontier, path: P) -> Result<()> {
  let file = File::create(&path)
    .with_context(|| format!("Failed to create file: {:?}", path.as_ref()))?;
  let mut writer = Writer::from_writer(file);

  writer.write_record(["target", "volatility", "expected_return"])?;
  for p in &frontier.points {
    writer.write_record([
      p.target.to_string(),
      p.volatility.to_string(),
      p.expected_return.to_string(),
    ])?;
  }

  writer.flush()?;
  Ok(())
}
