use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One trading day of an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("{ticker}: bar dates must be strictly increasing ({previous} followed by {next})")]
    OutOfOrder {
        ticker: String,
        previous: NaiveDate,
        next: NaiveDate,
    },
}

/// Daily bars for one ticker, ordered by date with no duplicates.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        let ticker = ticker.into();
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::OutOfOrder {
                    ticker,
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self { ticker, bars })
    }

    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            bars: Vec::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.low).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|bar| bar.date).collect()
    }
}

/// Last-bar indicator values used by the breakout rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub ema20: f64,
    pub macd: f64,
    pub rsi: f64,
    pub upper_band: f64,
}

/// A breakout detection that has not been written yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBreakout {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub volume: i64,
    pub macd: f64,
    pub rsi: f64,
    pub ema20: f64,
    pub upper_band: f64,
}

impl NewBreakout {
    pub fn from_snapshot(ticker: &str, last_bar: &PriceBar, snapshot: &IndicatorSnapshot) -> Self {
        Self {
            ticker: ticker.to_string(),
            date: last_bar.date,
            close: snapshot.close,
            volume: last_bar.volume,
            macd: snapshot.macd,
            rsi: snapshot.rsi,
            ema20: snapshot.ema20,
            upper_band: snapshot.upper_band,
        }
    }

    pub fn with_id(self, id: i64) -> BreakoutRecord {
        BreakoutRecord {
            id,
            ticker: self.ticker,
            date: self.date,
            close: self.close,
            volume: self.volume,
            macd: self.macd,
            rsi: self.rsi,
            ema20: self.ema20,
            upper_band: self.upper_band,
        }
    }
}

/// A persisted row of the `bullish_breakouts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutRecord {
    pub id: i64,
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub volume: i64,
    pub macd: f64,
    pub rsi: f64,
    pub ema20: f64,
    pub upper_band: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickerErrorKind {
    Fetch,
    Timeout,
    DataUnavailable,
}

impl TickerErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickerErrorKind::Fetch => "fetch",
            TickerErrorKind::Timeout => "timeout",
            TickerErrorKind::DataUnavailable => "data_unavailable",
        }
    }
}

/// A ticker that was skipped because its data could not be obtained.
#[derive(Debug, Clone, Serialize)]
pub struct TickerError {
    pub ticker: String,
    pub kind: TickerErrorKind,
    pub message: String,
}

impl fmt::Display for TickerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.ticker, self.kind.as_str(), self.message)
    }
}
