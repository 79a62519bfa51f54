use crate::commands::history::{load_history, print_history};
use crate::commands::print_json;
use crate::config::ScanConfig;
use crate::context::AppContext;
use crate::market_data::MarketDataSource;
use crate::scan_status::ScanStatus;
use crate::scanner::{BreakoutScanner, ScanReport};
use crate::store::BreakoutStore;
use crate::universe::{default_universe, load_universe_file};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default)]
pub struct ScanArgs {
    pub universe_file: Option<PathBuf>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Runs a scan while an `indicatif` bar follows the shared [`ScanStatus`].
pub async fn scan_with_progress(
    source: &dyn MarketDataSource,
    store: &mut BreakoutStore,
    config: &ScanConfig,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ScanReport> {
    let status = ScanStatus::new();
    let pb = ProgressBar::new(tickers.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("#>-"),
    );

    let poll_status = status.clone();
    let poll_pb = pb.clone();
    let poller = tokio::spawn(async move {
        loop {
            let snapshot = poll_status.snapshot();
            if snapshot.total_tickers > 0 {
                poll_pb.set_length(snapshot.total_tickers as u64);
            }
            poll_pb.set_position(snapshot.completed_tickers as u64);
            if let Some(ticker) = snapshot.last_ticker {
                poll_pb.set_message(ticker);
            }
            tokio::time::sleep(PROGRESS_POLL_INTERVAL).await;
        }
    });

    let result = BreakoutScanner::new(source, store, &status, config)
        .scan(tickers, start, end)
        .await;
    poller.abort();

    let snapshot = status.snapshot();
    pb.set_position(snapshot.completed_tickers as u64);
    match &result {
        Ok(_) => pb.finish_with_message(format!(
            "{} breakout(s), {} failed",
            snapshot.breakouts_found, snapshot.failed_tickers
        )),
        Err(_) => pb.abandon_with_message("Scan aborted"),
    }

    Ok(result?)
}

pub async fn run(app: &AppContext, args: &ScanArgs) -> Result<()> {
    let config = app.scan_config()?;
    let tickers = match &args.universe_file {
        Some(path) => load_universe_file(path)?,
        None => default_universe(),
    };
    let start = args.start.unwrap_or(config.window_start);
    let end = args.end.unwrap_or_else(|| Local::now().date_naive());

    let source = app.market_data()?;
    let mut store = app.store()?;
    info!(
        "Scanning {} universe ticker(s) against {}",
        tickers.len(),
        app.store_path().display()
    );
    let report = scan_with_progress(&source, &mut store, &config, &tickers, start, end).await?;

    if report.candidates.is_empty() {
        warn!("No bullish breakout stocks found.");
    } else {
        println!("Bullish breakout candidates");
        print_json(&report.candidates)?;
    }
    if !report.errors.is_empty() {
        warn!("{} ticker(s) could not be processed", report.errors.len());
    }

    let history = load_history(&store);
    print_history(&history)
}
