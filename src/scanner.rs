use crate::config::ScanConfig;
use crate::indicators::IndicatorFrame;
use crate::market_data::{FetchError, MarketDataSource};
use crate::models::{BreakoutRecord, IndicatorSnapshot, NewBreakout, PriceSeries, TickerError};
use crate::retry::retry_fetch;
use crate::scan_status::ScanStatus;
use crate::store::{BreakoutStore, StoreError};
use crate::universe::dedup_universe;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("the ticker universe is empty")]
    EmptyUniverse,

    #[error("scan window start {start} must be before end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("failed to persist breakout: {0}")]
    Persistence(#[from] StoreError),
}

/// What the scan concluded for a single ticker's series.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    InsufficientData { bars: usize },
    /// Enough bars, but an indicator is still undefined at the last bar.
    WarmingUp,
    NoBreakout(IndicatorSnapshot),
    Breakout(NewBreakout),
}

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub candidates: Vec<BreakoutRecord>,
    pub errors: Vec<TickerError>,
    pub scanned: usize,
    pub insufficient_data: usize,
    pub warming_up: usize,
}

pub fn is_bullish_breakout(snapshot: &IndicatorSnapshot) -> bool {
    snapshot.macd > 0.0
        && snapshot.rsi > 50.0
        && snapshot.close >= snapshot.upper_band
        && snapshot.close > snapshot.ema20
}

pub fn evaluate_series(series: &PriceSeries, config: &ScanConfig) -> TickerOutcome {
    let Some(last_bar) = series.last() else {
        return TickerOutcome::InsufficientData { bars: 0 };
    };
    if series.len() < config.min_bars {
        return TickerOutcome::InsufficientData { bars: series.len() };
    }

    let frame = IndicatorFrame::compute(series, &config.indicators);
    let Some(snapshot) = frame.last_snapshot() else {
        return TickerOutcome::WarmingUp;
    };

    if is_bullish_breakout(&snapshot) {
        TickerOutcome::Breakout(NewBreakout::from_snapshot(
            series.ticker(),
            last_bar,
            &snapshot,
        ))
    } else {
        TickerOutcome::NoBreakout(snapshot)
    }
}

/// Fetches one series under the configured timeout, retrying transient
/// failures.
pub async fn fetch_series(
    source: &dyn MarketDataSource,
    config: &ScanConfig,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, FetchError> {
    retry_fetch!(ticker, config.fetch_attempts, config.retry_delay, async {
        match timeout(config.fetch_timeout, source.fetch(ticker, start, end)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                ticker: ticker.to_string(),
                after: config.fetch_timeout,
            }),
        }
    })
}

/// Fetches several tickers with the same bounded, ordered fan-out the scan uses.
pub async fn fetch_all(
    source: &dyn MarketDataSource,
    config: &ScanConfig,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(String, Result<PriceSeries, FetchError>)> {
    stream::iter(tickers.iter())
        .map(|ticker| async move {
            let result = fetch_series(source, config, ticker, start, end).await;
            (ticker.clone(), result)
        })
        .buffered(config.concurrency.max(1))
        .collect()
        .await
}

/// Scans a universe for bullish breakouts and appends every hit to the store.
pub struct BreakoutScanner<'a> {
    source: &'a dyn MarketDataSource,
    store: &'a mut BreakoutStore,
    status: &'a ScanStatus,
    config: &'a ScanConfig,
}

impl<'a> BreakoutScanner<'a> {
    pub fn new(
        source: &'a dyn MarketDataSource,
        store: &'a mut BreakoutStore,
        status: &'a ScanStatus,
        config: &'a ScanConfig,
    ) -> Self {
        Self {
            source,
            store,
            status,
            config,
        }
    }

    /// Fetches are spread over at most `concurrency` in-flight requests;
    /// results are consumed in universe order by this single writer.
    pub async fn scan(
        &mut self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ScanReport, ScanError> {
        let universe = dedup_universe(tickers);
        if universe.is_empty() {
            return Err(ScanError::EmptyUniverse);
        }
        if start >= end {
            return Err(ScanError::InvalidWindow { start, end });
        }
        if universe.len() < tickers.len() {
            info!(
                "Dropped {} duplicate or blank ticker(s) from the universe",
                tickers.len() - universe.len()
            );
        }

        let total = universe.len();
        let source = self.source;
        let config = self.config;
        info!(
            "Scanning {} tickers for bullish breakouts ({} - {}, concurrency {})",
            total, start, end, config.concurrency
        );
        self.status
            .set_phase(format!("Scanning {} tickers for breakouts", total));
        self.status.start(total);

        let outcomes = stream::iter(universe.iter())
            .map(|ticker| async move {
                let result = fetch_series(source, config, ticker, start, end).await;
                (ticker, result)
            })
            .buffered(config.concurrency.max(1));
        futures::pin_mut!(outcomes);

        let mut report = ScanReport::default();
        while let Some((ticker, result)) = outcomes.next().await {
            report.scanned += 1;

            let series = match result {
                Ok(series) => series,
                Err(err) => {
                    warn!("Error processing {}: {}", ticker, err);
                    report.errors.push(TickerError {
                        ticker: ticker.clone(),
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                    self.status.record_ticker(ticker, true, false);
                    continue;
                }
            };

            let mut found = false;
            match evaluate_series(&series, config) {
                TickerOutcome::Breakout(candidate) => {
                    let record = self.store.insert(&candidate)?;
                    info!(
                        "Bullish breakout: {} on {} (close {:.2}, upper band {:.2}, RSI {:.2}, MACD {:.2})",
                        record.ticker,
                        record.date,
                        record.close,
                        record.upper_band,
                        record.rsi,
                        record.macd
                    );
                    report.candidates.push(record);
                    found = true;
                }
                TickerOutcome::InsufficientData { bars } => {
                    debug!(
                        "Skipping {}: {} bars available, {} required",
                        ticker, bars, config.min_bars
                    );
                    report.insufficient_data += 1;
                }
                TickerOutcome::WarmingUp => {
                    debug!("Skipping {}: indicators undefined at the last bar", ticker);
                    report.warming_up += 1;
                }
                TickerOutcome::NoBreakout(_) => {}
            }
            self.status.record_ticker(ticker, false, found);
        }

        self.status.set_phase("Idle");
        info!(
            "Scan complete: {} breakout(s), {} error(s), {} ticker(s) with insufficient data out of {}",
            report.candidates.len(),
            report.errors.len(),
            report.insufficient_data,
            report.scanned
        );
        Ok(report)
    }
}
