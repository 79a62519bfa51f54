use crate::analytics::{cumulative_returns, daily_returns, moving_averages};
use crate::commands::print_json;
use crate::context::AppContext;
use crate::indicators::{IndicatorFrame, IndicatorParams, IndicatorRow};
use crate::models::PriceSeries;
use crate::scanner::fetch_series;
use crate::universe::normalize_ticker_symbol;
use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_ANALYZE_TICKER: &str = "RELIANCE.NS";
pub const DEFAULT_MOVING_AVERAGE_WINDOWS: [usize; 2] = [20, 50];
pub const DEFAULT_TAIL_ROWS: usize = 5;

pub fn default_analyze_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub ticker: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub windows: Vec<usize>,
    pub tail: usize,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            ticker: DEFAULT_ANALYZE_TICKER.to_string(),
            start: None,
            end: None,
            windows: DEFAULT_MOVING_AVERAGE_WINDOWS.to_vec(),
            tail: DEFAULT_TAIL_ROWS,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TickerAnalysis {
    pub ticker: String,
    pub bars: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub recent: Vec<IndicatorRow>,
    pub last_daily_return_percent: Option<f64>,
    pub cumulative_return: Option<f64>,
    /// Latest value of each requested simple moving average.
    pub moving_averages: BTreeMap<usize, Option<f64>>,
}

pub fn analyze_series(
    series: &PriceSeries,
    params: &IndicatorParams,
    windows: &[usize],
    tail: usize,
) -> TickerAnalysis {
    let frame = IndicatorFrame::compute(series, params);
    let closes = series.closes();

    let latest = |values: Vec<Option<f64>>| values.last().copied().flatten();
    let averages = moving_averages(&closes, windows)
        .into_iter()
        .map(|(window, values)| (window, latest(values)))
        .collect();

    TickerAnalysis {
        ticker: series.ticker().to_string(),
        bars: series.len(),
        first_date: series.bars().first().map(|bar| bar.date),
        last_date: series.last().map(|bar| bar.date),
        recent: frame.tail(tail),
        last_daily_return_percent: latest(daily_returns(&closes)),
        cumulative_return: latest(cumulative_returns(&closes)),
        moving_averages: averages,
    }
}

pub async fn run(app: &AppContext, args: &AnalyzeArgs) -> Result<()> {
    let config = app.scan_config()?;
    let source = app.market_data()?;
    let start = args.start.unwrap_or_else(default_analyze_start);
    let end = args.end.unwrap_or_else(|| Local::now().date_naive());
    let ticker = normalize_ticker_symbol(&args.ticker)
        .ok_or_else(|| anyhow!("ticker must not be blank"))?;

    info!("Analyzing {} ({} - {})", ticker, start, end);
    let series = fetch_series(&source, &config, &ticker, start, end)
        .await
        .with_context(|| format!("failed to load price history for {}", ticker))?;
    if series.is_empty() {
        warn!("No data available for {} in {} - {}", ticker, start, end);
        return Ok(());
    }

    let analysis = analyze_series(&series, &config.indicators, &args.windows, args.tail);
    print_json(&analysis)
}
