use std::sync::{Arc, Mutex};

/// Shared progress of a running scan, readable from another task.
#[derive(Clone, Default)]
pub struct ScanStatus {
    inner: Arc<Mutex<ScanStatusData>>,
}

#[derive(Default)]
struct ScanStatusData {
    phase: String,
    total_tickers: usize,
    completed_tickers: usize,
    failed_tickers: usize,
    breakouts_found: usize,
    last_ticker: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScanStatusSnapshot {
    pub phase: String,
    pub total_tickers: usize,
    pub completed_tickers: usize,
    pub failed_tickers: usize,
    pub breakouts_found: usize,
    pub last_ticker: Option<String>,
}

impl ScanStatusSnapshot {
    /// Fraction of the universe processed, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total_tickers == 0 {
            return 0.0;
        }
        (self.completed_tickers as f64 / self.total_tickers as f64).min(1.0)
    }
}

impl ScanStatus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScanStatusData {
                phase: "Initializing".to_string(),
                ..Default::default()
            })),
        }
    }

    pub fn set_phase<S: Into<String>>(&self, phase: S) {
        if let Ok(mut data) = self.inner.lock() {
            data.phase = phase.into();
        }
    }

    pub fn start(&self, total_tickers: usize) {
        if let Ok(mut data) = self.inner.lock() {
            data.total_tickers = total_tickers;
            data.completed_tickers = 0;
            data.failed_tickers = 0;
            data.breakouts_found = 0;
            data.last_ticker = None;
        }
    }

    pub fn record_ticker(&self, ticker: &str, failed: bool, breakout: bool) {
        if let Ok(mut data) = self.inner.lock() {
            data.completed_tickers += 1;
            if failed {
                data.failed_tickers += 1;
            }
            if breakout {
                data.breakouts_found += 1;
            }
            data.last_ticker = Some(ticker.to_string());
        }
    }

    pub fn snapshot(&self) -> ScanStatusSnapshot {
        if let Ok(data) = self.inner.lock() {
            ScanStatusSnapshot {
                phase: data.phase.clone(),
                total_tickers: data.total_tickers,
                completed_tickers: data.completed_tickers,
                failed_tickers: data.failed_tickers,
                breakouts_found: data.breakouts_found,
                last_ticker: data.last_ticker.clone(),
            }
        } else {
            ScanStatusSnapshot {
                phase: "Status unavailable".to_string(),
                total_tickers: 0,
                completed_tickers: 0,
                failed_tickers: 0,
                breakouts_found: 0,
                last_ticker: None,
            }
        }
    }
}
