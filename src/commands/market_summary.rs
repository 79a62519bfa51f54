use crate::analytics::{last_change_percent, market_summary, MarketSummary, PriceChange};
use crate::commands::print_json;
use crate::config::ScanConfig;
use crate::context::AppContext;
use crate::market_data::MarketDataSource;
use crate::scanner::fetch_all;
use crate::universe::MARKET_SUMMARY_TICKERS;
use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use log::{info, warn};

pub const DEFAULT_SUMMARY_COUNT: usize = 5;
const DEFAULT_LOOKBACK_DAYS: i64 = 14;

/// Last-bar price changes for each ticker that could be fetched. Failed or
/// too-short tickers are left out.
pub async fn collect_price_changes(
    source: &dyn MarketDataSource,
    config: &ScanConfig,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<PriceChange> {
    let mut changes = Vec::new();
    for (ticker, result) in fetch_all(source, config, tickers, start, end).await {
        match result {
            Ok(series) => match last_change_percent(&series) {
                Some(change_percent) => changes.push(PriceChange {
                    ticker,
                    change_percent,
                }),
                None => info!("Skipping {}: fewer than two bars", ticker),
            },
            Err(err) => warn!("Skipping {}: {}", ticker, err),
        }
    }
    changes
}

pub async fn build_summary(
    source: &dyn MarketDataSource,
    config: &ScanConfig,
    start: NaiveDate,
    end: NaiveDate,
    count: usize,
) -> MarketSummary {
    let tickers: Vec<String> = MARKET_SUMMARY_TICKERS
        .iter()
        .map(|ticker| ticker.to_string())
        .collect();
    let changes = collect_price_changes(source, config, &tickers, start, end).await;
    market_summary(changes, count)
}

pub async fn run(
    app: &AppContext,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    count: usize,
) -> Result<()> {
    let config = app.scan_config()?;
    let source = app.market_data()?;
    let end = end.unwrap_or_else(|| Local::now().date_naive());
    let start = start.unwrap_or(end - Duration::days(DEFAULT_LOOKBACK_DAYS));

    info!("Building market summary ({} - {})", start, end);
    let summary = build_summary(&source, &config, start, end, count).await;
    if summary.gainers.is_empty() {
        warn!("No price changes available for the market summary.");
    }
    print_json(&summary)
}
