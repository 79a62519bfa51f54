use anyhow::Result;
use async_trait::async_trait;
use breakout_scanner::commands::market_summary::collect_price_changes;
use breakout_scanner::commands::scan::scan_with_progress;
use breakout_scanner::config::ScanConfig;
use breakout_scanner::context::AppContext;
use breakout_scanner::market_data::{FetchError, MarketDataSource};
use breakout_scanner::models::{PriceBar, PriceSeries, TickerErrorKind};
use breakout_scanner::scan_status::ScanStatus;
use breakout_scanner::scanner::{BreakoutScanner, ScanError};
use breakout_scanner::store::BreakoutStore;
use chrono::{Duration as ChronoDuration, NaiveDate};
use std::collections::HashMap;
use std::sync::{Mutex, Once};
use std::time::Duration;
use tempfile::tempdir;

const BREAKOUT_CLOSE: f64 = 139.5;

fn ensure_test_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn window() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    )
}

fn series_from_closes(ticker: &str, closes: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: start + ChronoDuration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000 + i as i64,
        })
        .collect();
    PriceSeries::new(ticker, bars).unwrap()
}

/// Steady uptrend whose final bar jumps through the upper band.
fn breakout_closes(count: usize) -> Vec<f64> {
    let mut closes: Vec<f64> = (0..count).map(|i| 100.0 + 0.5 * i as f64).collect();
    if let Some(last) = closes.last_mut() {
        *last += 10.0;
    }
    closes
}

/// Forty rising bars, then twenty at 150.0: the band collapses onto the close
/// while the longer averages still lag below it.
fn band_touch_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
    closes.extend(std::iter::repeat(150.0).take(20));
    closes
}

fn flat_closes(count: usize) -> Vec<f64> {
    vec![100.0; count]
}

#[derive(Clone)]
enum StubResponse {
    Series(Vec<f64>),
    NetworkError,
    FailOnceThen(Vec<f64>),
    Hang,
}

#[derive(Default)]
struct StubSource {
    responses: HashMap<String, StubResponse>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StubSource {
    fn with(mut self, ticker: &str, response: StubResponse) -> Self {
        self.responses.insert(ticker.to_string(), response);
        self
    }

    fn calls(&self, ticker: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(ticker)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl MarketDataSource for StubSource {
    async fn fetch(
        &self,
        ticker: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(ticker.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        match self.responses.get(ticker).cloned() {
            None => Err(FetchError::data_unavailable(ticker, "unknown symbol")),
            Some(StubResponse::Series(closes)) => Ok(series_from_closes(ticker, &closes)),
            Some(StubResponse::NetworkError) => Err(FetchError::network(ticker, "connection reset")),
            Some(StubResponse::FailOnceThen(closes)) => {
                if call == 1 {
                    Err(FetchError::network(ticker, "connection reset"))
                } else {
                    Ok(series_from_closes(ticker, &closes))
                }
            }
            Some(StubResponse::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(PriceSeries::empty(ticker))
            }
        }
    }
}

fn test_config() -> ScanConfig {
    ScanConfig {
        concurrency: 2,
        fetch_timeout: Duration::from_secs(5),
        retry_delay: Duration::ZERO,
        ..ScanConfig::default()
    }
}

fn tickers(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_fetch_is_reported_and_breakout_is_saved() -> Result<()> {
    ensure_test_env();
    let source = StubSource::default()
        .with("AAA.NS", StubResponse::NetworkError)
        .with("BBB.NS", StubResponse::Series(breakout_closes(60)));
    let mut store = BreakoutStore::open_in_memory()?;
    store.ensure_schema()?;
    let status = ScanStatus::new();
    let config = test_config();
    let (start, end) = window();

    let report = BreakoutScanner::new(&source, &mut store, &status, &config)
        .scan(&tickers(&["AAA.NS", "BBB.NS"]), start, end)
        .await?;

    assert_eq!(report.scanned, 2);
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].ticker, "BBB.NS");
    assert_eq!(report.candidates[0].close, BREAKOUT_CLOSE);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].ticker, "AAA.NS");
    assert_eq!(report.errors[0].kind, TickerErrorKind::Fetch);

    let saved = store.list_all()?;
    assert_eq!(saved, report.candidates);

    let snapshot = status.snapshot();
    assert_eq!(snapshot.completed_tickers, 2);
    assert_eq!(snapshot.failed_tickers, 1);
    assert_eq!(snapshot.breakouts_found, 1);
    Ok(())
}

#[tokio::test]
async fn close_on_the_upper_band_is_saved() -> Result<()> {
    ensure_test_env();
    let source =
        StubSource::default().with("TOUCH.NS", StubResponse::Series(band_touch_closes()));
    let mut store = BreakoutStore::open_in_memory()?;
    store.ensure_schema()?;
    let status = ScanStatus::new();
    let config = test_config();
    let (start, end) = window();

    let report = BreakoutScanner::new(&source, &mut store, &status, &config)
        .scan(&tickers(&["TOUCH.NS"]), start, end)
        .await?;

    assert_eq!(report.candidates.len(), 1);
    let candidate = &report.candidates[0];
    assert_eq!(candidate.close, 150.0);
    assert_eq!(candidate.upper_band, candidate.close);
    assert!(candidate.ema20 < candidate.close);
    assert!(candidate.macd > 0.0);
    assert!(candidate.rsi > 50.0);

    let saved = store.list_all()?;
    assert_eq!(saved.len(), 1);
    assert_eq!(&saved[0], candidate);
    Ok(())
}

#[tokio::test]
async fn slow_fetch_times_out_and_scan_continues() -> Result<()> {
    ensure_test_env();
    let source = StubSource::default()
        .with("SLOW.NS", StubResponse::Hang)
        .with("BBB.NS", StubResponse::Series(breakout_closes(60)));
    let mut store = BreakoutStore::open_in_memory()?;
    store.ensure_schema()?;
    let status = ScanStatus::new();
    let config = ScanConfig {
        fetch_timeout: Duration::from_millis(50),
        ..test_config()
    };
    let (start, end) = window();

    let report = BreakoutScanner::new(&source, &mut store, &status, &config)
        .scan(&tickers(&["SLOW.NS", "BBB.NS"]), start, end)
        .await?;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].ticker, "SLOW.NS");
    assert_eq!(report.errors[0].kind, TickerErrorKind::Timeout);
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(store.count()?, 1);
    Ok(())
}

#[tokio::test]
async fn transient_failure_is_retried() -> Result<()> {
    ensure_test_env();
    let source =
        StubSource::default().with("BBB.NS", StubResponse::FailOnceThen(breakout_closes(60)));
    let mut store = BreakoutStore::open_in_memory()?;
    store.ensure_schema()?;
    let status = ScanStatus::new();
    let config = ScanConfig {
        fetch_attempts: 2,
        ..test_config()
    };
    let (start, end) = window();

    let report = BreakoutScanner::new(&source, &mut store, &status, &config)
        .scan(&tickers(&["BBB.NS"]), start, end)
        .await?;

    assert_eq!(source.calls("BBB.NS"), 2);
    assert!(report.errors.is_empty());
    assert_eq!(report.candidates.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_symbol_is_not_retried() -> Result<()> {
    ensure_test_env();
    let source = StubSource::default();
    let mut store = BreakoutStore::open_in_memory()?;
    store.ensure_schema()?;
    let status = ScanStatus::new();
    let config = ScanConfig {
        fetch_attempts: 3,
        ..test_config()
    };
    let (start, end) = window();

    let report = BreakoutScanner::new(&source, &mut store, &status, &config)
        .scan(&tickers(&["GONE.NS"]), start, end)
        .await?;

    assert_eq!(source.calls("GONE.NS"), 1);
    assert_eq!(report.errors[0].kind, TickerErrorKind::DataUnavailable);
    Ok(())
}

#[tokio::test]
async fn duplicate_universe_entries_are_scanned_once() -> Result<()> {
    ensure_test_env();
    let source =
        StubSource::default().with("BBB.NS", StubResponse::Series(breakout_closes(60)));
    let mut store = BreakoutStore::open_in_memory()?;
    store.ensure_schema()?;
    let status = ScanStatus::new();
    let config = test_config();
    let (start, end) = window();

    let report = BreakoutScanner::new(&source, &mut store, &status, &config)
        .scan(&tickers(&["BBB.NS", "bbb.ns", " BBB.NS "]), start, end)
        .await?;

    assert_eq!(source.calls("BBB.NS"), 1);
    assert_eq!(report.scanned, 1);
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(store.count()?, 1);
    Ok(())
}

#[tokio::test]
async fn short_and_flat_histories_produce_no_candidates() -> Result<()> {
    ensure_test_env();
    let source = StubSource::default()
        .with("SHORT.NS", StubResponse::Series(breakout_closes(49)))
        .with("FLAT.NS", StubResponse::Series(flat_closes(80)));
    let mut store = BreakoutStore::open_in_memory()?;
    store.ensure_schema()?;
    let status = ScanStatus::new();
    let config = test_config();
    let (start, end) = window();

    let report = BreakoutScanner::new(&source, &mut store, &status, &config)
        .scan(&tickers(&["SHORT.NS", "FLAT.NS"]), start, end)
        .await?;

    assert!(report.candidates.is_empty());
    assert!(report.errors.is_empty());
    assert_eq!(report.insufficient_data, 1);
    assert_eq!(store.count()?, 0);
    Ok(())
}

#[tokio::test]
async fn invalid_inputs_are_rejected_before_fetching() -> Result<()> {
    ensure_test_env();
    let source = StubSource::default();
    let mut store = BreakoutStore::open_in_memory()?;
    store.ensure_schema()?;
    let status = ScanStatus::new();
    let config = test_config();
    let (start, end) = window();

    let mut scanner = BreakoutScanner::new(&source, &mut store, &status, &config);
    let empty = scanner.scan(&tickers(&["", "  "]), start, end).await;
    assert!(matches!(empty, Err(ScanError::EmptyUniverse)));

    let inverted = scanner.scan(&tickers(&["AAA.NS"]), end, start).await;
    assert!(matches!(inverted, Err(ScanError::InvalidWindow { .. })));
    assert_eq!(source.calls("AAA.NS"), 0);
    Ok(())
}

#[tokio::test]
async fn store_failure_aborts_the_scan() -> Result<()> {
    ensure_test_env();
    let dir = tempdir()?;
    let path = dir.path().join("breakouts.db");
    let mut store = BreakoutStore::open(&path)?;
    store.ensure_schema()?;
    rusqlite::Connection::open(&path)?.execute_batch("DROP TABLE bullish_breakouts")?;

    let source =
        StubSource::default().with("BBB.NS", StubResponse::Series(breakout_closes(60)));
    let status = ScanStatus::new();
    let config = test_config();
    let (start, end) = window();

    let result = BreakoutScanner::new(&source, &mut store, &status, &config)
        .scan(&tickers(&["BBB.NS"]), start, end)
        .await;
    assert!(matches!(result, Err(ScanError::Persistence(_))));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scanned_breakouts_survive_reopening_the_store() -> Result<()> {
    ensure_test_env();
    let dir = tempdir()?;
    let app = AppContext::with_settings(dir.path().join("bullish_stocks.db"), HashMap::new());
    let source = StubSource::default()
        .with("AAA.NS", StubResponse::Series(breakout_closes(60)))
        .with("BBB.NS", StubResponse::Series(breakout_closes(70)));
    let config = test_config();
    let (start, end) = window();

    let report = {
        let mut store = app.store()?;
        scan_with_progress(
            &source,
            &mut store,
            &config,
            &tickers(&["AAA.NS", "BBB.NS"]),
            start,
            end,
        )
        .await?
    };
    assert_eq!(report.candidates.len(), 2);

    let reopened = app.store()?;
    let saved = reopened.list_all()?;
    assert_eq!(saved.len(), 2);
    // BBB's last bar is ten days later, so it sorts first
    assert_eq!(saved[0].ticker, "BBB.NS");
    assert_eq!(saved[1].ticker, "AAA.NS");
    assert!(saved[0].date > saved[1].date);
    Ok(())
}

#[tokio::test]
async fn price_changes_skip_failed_tickers() -> Result<()> {
    ensure_test_env();
    let source = StubSource::default()
        .with("AAPL", StubResponse::Series(vec![100.0, 103.0, 104.0]))
        .with("MSFT", StubResponse::Series(vec![50.0, 49.0]))
        .with("NFLX", StubResponse::Series(vec![10.0]))
        .with("INTC", StubResponse::NetworkError);
    let config = test_config();
    let (start, end) = window();

    let changes = collect_price_changes(
        &source,
        &config,
        &tickers(&["AAPL", "MSFT", "NFLX", "INTC", "CSCO"]),
        start,
        end,
    )
    .await;

    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].ticker, "AAPL");
    assert_eq!(changes[0].change_percent, 0.97);
    assert_eq!(changes[1].ticker, "MSFT");
    assert_eq!(changes[1].change_percent, -2.0);
    Ok(())
}
