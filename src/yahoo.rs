use crate::config::DEFAULT_MARKET_DATA_BASE_URL;
use crate::market_data::{FetchError, MarketDataSource};
use crate::models::{PriceBar, PriceSeries};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; breakout-scanner)";
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub fn build_http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("failed to build HTTP client")
}

/// Daily bars from the Yahoo Finance v8 chart endpoint.
pub struct YahooClient {
    http: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MARKET_DATA_BASE_URL.to_string());
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, ticker)
    }
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

fn describe_chart_error(error: &ChartError) -> String {
    match (error.code.as_deref(), error.description.as_deref()) {
        (Some(code), Some(description)) => format!("{} - {}", code, description),
        (Some(code), None) => code.to_string(),
        (None, Some(description)) => description.to_string(),
        (None, None) => "unspecified chart error".to_string(),
    }
}

/// Converts a chart payload into bars, dropping incomplete rows and keeping
/// the latest row when the endpoint repeats a trading date.
fn bars_from_chart(result: ChartResult) -> Vec<PriceBar> {
    let Some(timestamps) = result.timestamp else {
        return Vec::new();
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Vec::new();
    };
    let offset = result.meta.gmtoffset.unwrap_or(0);

    let mut bars: Vec<PriceBar> = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let field = |values: &Vec<Option<f64>>| values.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
            field(&quote.volume),
        ) else {
            continue;
        };
        let Some(local) = DateTime::<Utc>::from_timestamp(ts + offset, 0) else {
            continue;
        };
        bars.push(PriceBar {
            date: local.date_naive(),
            open,
            high,
            low,
            close,
            volume: volume.round() as i64,
        });
    }

    bars.sort_by_key(|bar| bar.date);
    let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(previous) if previous.date == bar.date => *previous = bar,
            _ => deduped.push(bar),
        }
    }
    deduped
}

#[async_trait]
impl MarketDataSource for YahooClient {
    async fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        // period2 is exclusive
        let period1 = midnight_timestamp(start);
        let period2 = midnight_timestamp(end + ChronoDuration::days(1));
        let url = self.chart_url(ticker);
        debug!("Fetching {} bars from {} ({} - {})", ticker, url, start, end);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|err| FetchError::network(ticker, err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| FetchError::network(ticker, err.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            let reason = serde_json::from_str::<ChartResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.chart.error)
                .map(|error| describe_chart_error(&error))
                .unwrap_or_else(|| "symbol not found".to_string());
            return Err(FetchError::data_unavailable(ticker, reason));
        }
        if !status.is_success() {
            return Err(FetchError::network(
                ticker,
                format!("HTTP {}: {}", status, truncate_body(&body)),
            ));
        }

        let parsed: ChartResponse = serde_json::from_str(&body).map_err(|err| {
            FetchError::network(ticker, format!("failed to parse chart response: {}", err))
        })?;

        if let Some(error) = parsed.chart.error {
            return Err(FetchError::data_unavailable(
                ticker,
                describe_chart_error(&error),
            ));
        }

        let result = parsed
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| FetchError::data_unavailable(ticker, "empty chart result"))?;

        let bars = bars_from_chart(result);
        debug!("Fetched {} bars for {}", bars.len(), ticker);
        Ok(PriceSeries::new(ticker, bars)?)
    }
}
