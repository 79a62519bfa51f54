use crate::indicators::IndicatorParams;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_MIN_BARS: usize = 50;
const DEFAULT_FETCH_TIMEOUT_SECS: f64 = 30.0;
const MAX_FETCH_TIMEOUT_SECS: f64 = 86_400.0;
const DEFAULT_RETRY_DELAY_MS: usize = 1_000;
const MAX_DEFAULT_CONCURRENCY: usize = 8;

/// Settings keys read from the process environment by the CLI.
pub const SETTING_KEYS: [&str; 7] = [
    "SCAN_MIN_BARS",
    "SCAN_CONCURRENCY",
    "SCAN_FETCH_TIMEOUT_SECS",
    "SCAN_FETCH_ATTEMPTS",
    "SCAN_RETRY_DELAY_MS",
    "SCAN_WINDOW_START",
    "MARKET_DATA_BASE_URL",
];

pub fn default_window_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

pub fn default_concurrency() -> usize {
    (num_cpus::get() * 2).clamp(1, MAX_DEFAULT_CONCURRENCY)
}

/// Tunables for a breakout scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub min_bars: usize,
    pub concurrency: usize,
    pub fetch_timeout: Duration,
    pub fetch_attempts: u32,
    pub retry_delay: Duration,
    pub window_start: NaiveDate,
    pub indicators: IndicatorParams,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_bars: DEFAULT_MIN_BARS,
            concurrency: default_concurrency(),
            fetch_timeout: Duration::from_secs_f64(DEFAULT_FETCH_TIMEOUT_SECS),
            fetch_attempts: 1,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS as u64),
            window_start: default_window_start(),
            indicators: IndicatorParams::default(),
        }
    }
}

impl ScanConfig {
    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let min_bars = optional_setting_usize(settings, "SCAN_MIN_BARS", 1)?
            .unwrap_or(defaults.min_bars);
        let concurrency = optional_setting_usize(settings, "SCAN_CONCURRENCY", 1)?
            .unwrap_or(defaults.concurrency);
        let fetch_timeout_secs = optional_setting_f64(
            settings,
            "SCAN_FETCH_TIMEOUT_SECS",
            Some(0.001),
            Some(MAX_FETCH_TIMEOUT_SECS),
        )?
        .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
        let fetch_attempts = optional_setting_usize(settings, "SCAN_FETCH_ATTEMPTS", 1)?
            .map(|value| value.min(u32::MAX as usize) as u32)
            .unwrap_or(defaults.fetch_attempts);
        let retry_delay_ms = optional_setting_usize(settings, "SCAN_RETRY_DELAY_MS", 0)?
            .unwrap_or(DEFAULT_RETRY_DELAY_MS);
        let window_start = if has_setting(settings, "SCAN_WINDOW_START") {
            require_setting_date(settings, "SCAN_WINDOW_START")?
        } else {
            defaults.window_start
        };

        Ok(Self {
            min_bars,
            concurrency,
            fetch_timeout: Duration::from_secs_f64(fetch_timeout_secs),
            fetch_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms as u64),
            window_start,
            indicators: defaults.indicators,
        })
    }
}

pub fn market_data_base_url(settings: &HashMap<String, String>) -> String {
    settings
        .get("MARKET_DATA_BASE_URL")
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_MARKET_DATA_BASE_URL.to_string())
}

fn has_setting(settings: &HashMap<String, String>, key: &str) -> bool {
    settings
        .get(key)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false)
}

fn require_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("Missing required setting {}", key))
}

pub fn require_setting_date(settings: &HashMap<String, String>, key: &str) -> Result<NaiveDate> {
    let raw = require_setting(settings, key)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        anyhow!(
            "Setting {} must be a date in YYYY-MM-DD format (value: {})",
            key,
            raw
        )
    })
}

fn require_setting_f64(
    settings: &HashMap<String, String>,
    key: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<f64> {
    let raw = require_setting(settings, key)?;
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() {
        return Err(anyhow!("Setting {} must be finite (value: {})", key, raw));
    }
    if let Some(min_value) = min {
        if value < min_value {
            return Err(anyhow!(
                "Setting {} must be >= {} (value: {})",
                key,
                min_value,
                raw
            ));
        }
    }
    if let Some(max_value) = max {
        if value > max_value {
            return Err(anyhow!(
                "Setting {} must be <= {} (value: {})",
                key,
                max_value,
                raw
            ));
        }
    }
    Ok(value)
}

fn require_setting_usize(
    settings: &HashMap<String, String>,
    key: &str,
    min: usize,
) -> Result<usize> {
    let raw = require_setting(settings, key)?;
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() {
        return Err(anyhow!("Setting {} must be finite (value: {})", key, raw));
    }
    if value.fract() != 0.0 {
        return Err(anyhow!(
            "Setting {} must be an integer (value: {})",
            key,
            raw
        ));
    }
    if value < min as f64 {
        return Err(anyhow!(
            "Setting {} must be >= {} (value: {})",
            key,
            min,
            raw
        ));
    }
    Ok(value as usize)
}

fn optional_setting_f64(
    settings: &HashMap<String, String>,
    key: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Option<f64>> {
    if !has_setting(settings, key) {
        return Ok(None);
    }
    require_setting_f64(settings, key, min, max).map(Some)
}

fn optional_setting_usize(
    settings: &HashMap<String, String>,
    key: &str,
    min: usize,
) -> Result<Option<usize>> {
    if !has_setting(settings, key) {
        return Ok(None);
    }
    require_setting_usize(settings, key, min).map(Some)
}
