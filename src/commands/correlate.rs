use crate::analytics::correlation_matrix;
use crate::commands::analyze::default_analyze_start;
use crate::commands::print_json;
use crate::context::AppContext;
use crate::portfolio::load_portfolio;
use crate::scanner::fetch_all;
use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::path::Path;

pub async fn run(
    app: &AppContext,
    portfolio: &Path,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<()> {
    let tickers = load_portfolio(portfolio)?;
    if tickers.is_empty() {
        bail!("Portfolio {} lists no tickers", portfolio.display());
    }
    let config = app.scan_config()?;
    let source = app.market_data()?;
    let start = start.unwrap_or_else(default_analyze_start);
    let end = end.unwrap_or_else(|| Local::now().date_naive());

    info!(
        "Correlating {} portfolio ticker(s) ({} - {})",
        tickers.len(),
        start,
        end
    );
    let mut series = Vec::with_capacity(tickers.len());
    for (ticker, result) in fetch_all(&source, &config, &tickers, start, end).await {
        match result {
            Ok(fetched) if fetched.is_empty() => warn!("No data available for {}", ticker),
            Ok(fetched) => series.push(fetched),
            Err(err) => warn!("Skipping {}: {}", ticker, err),
        }
    }

    let matrix = correlation_matrix(&series);
    print_json(&matrix)
}
