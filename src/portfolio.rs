use crate::universe::{dedup_universe, normalize_ticker_symbol};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PortfolioRow {
    #[serde(rename = "Ticker")]
    ticker: Option<String>,
}

/// Reads the `Ticker` column of a portfolio CSV. Other columns are ignored.
pub fn load_portfolio<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open portfolio file {}", path.display()))?;

    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?;
    if !headers.iter().any(|h| h == "Ticker") {
        anyhow::bail!("Portfolio file {} has no 'Ticker' column", path.display());
    }

    let mut tickers = Vec::new();
    for (index, result) in reader.deserialize::<PortfolioRow>().enumerate() {
        let row = result.with_context(|| {
            format!("Failed to parse row {} of {}", index + 2, path.display())
        })?;
        if let Some(symbol) = row.ticker.as_deref().and_then(normalize_ticker_symbol) {
            tickers.push(symbol);
        }
    }

    Ok(dedup_universe(tickers))
}
