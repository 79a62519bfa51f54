use crate::models::{IndicatorSnapshot, PriceSeries};
use chrono::NaiveDate;
use serde::Serialize;

/// Periods used when computing indicators for a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorParams {
    pub ema_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_width: f64,
    pub atr_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_period: 20,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_width: 2.0,
            atr_period: 14,
        }
    }
}

pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut sma_values = vec![None; prices.len()];
    if period == 0 || prices.len() < period {
        return sma_values;
    }

    for i in (period - 1)..prices.len() {
        let window = &prices[i + 1 - period..=i];
        sma_values[i] = Some(window.iter().sum::<f64>() / period as f64);
    }

    sma_values
}

pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let values: Vec<Option<f64>> = prices.iter().copied().map(Some).collect();
    ema_of_defined(&values, period)
}

/// EMA over the defined entries of `values`, seeded with the first defined
/// value. An output is only reported once `period` observations were seen.
fn ema_of_defined(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut ema_values = vec![None; values.len()];
    if period == 0 {
        return ema_values;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut current: Option<f64> = None;
    let mut observations = 0usize;

    for (i, value) in values.iter().enumerate() {
        let Some(value) = *value else {
            continue;
        };
        let ema = match current {
            Some(previous) => previous + multiplier * (value - previous),
            None => value,
        };
        current = Some(ema);
        observations += 1;
        if observations >= period {
            ema_values[i] = Some(ema);
        }
    }

    ema_values
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdOutput {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn calculate_macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> MacdOutput {
    let fast_ema = calculate_ema(prices, fast_period);
    let slow_ema = calculate_ema(prices, slow_period);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(fast, slow)| Some((*fast)? - (*slow)?))
        .collect();

    let signal = ema_of_defined(&line, signal_period);

    let histogram = line
        .iter()
        .zip(&signal)
        .map(|(line, signal)| Some((*line)? - (*signal)?))
        .collect();

    MacdOutput {
        line,
        signal,
        histogram,
    }
}

fn rsi_from_avgs(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// Wilder RSI. The first bar contributes a zero gain and loss, so the first
/// value is reported at index `period - 1`.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut rsi_values = vec![None; prices.len()];
    if period == 0 || prices.is_empty() {
        return rsi_values;
    }

    let alpha = 1.0 / period as f64;
    let mut avg_gain = 0.0f64;
    let mut avg_loss = 0.0f64;

    for i in 0..prices.len() {
        let delta = if i == 0 {
            0.0
        } else {
            prices[i] - prices[i - 1]
        };
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { -delta } else { 0.0 };

        if i == 0 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain += alpha * (gain - avg_gain);
            avg_loss += alpha * (loss - avg_loss);
        }

        if i + 1 >= period {
            rsi_values[i] = Some(rsi_from_avgs(avg_gain, avg_loss));
        }
    }

    rsi_values
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Bands at `width` population standard deviations around the SMA.
pub fn calculate_bollinger_bands(prices: &[f64], period: usize, width: f64) -> BollingerBands {
    let middle = calculate_sma(prices, period);
    let mut upper = vec![None; prices.len()];
    let mut lower = vec![None; prices.len()];

    for (i, mean) in middle.iter().enumerate() {
        let Some(mean) = *mean else {
            continue;
        };
        let window = &prices[i + 1 - period..=i];
        let variance = window.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / period as f64;
        let standard_deviation = variance.sqrt();

        upper[i] = Some(mean + (width * standard_deviation));
        lower[i] = Some(mean - (width * standard_deviation));
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// Wilder ATR seeded with the mean of the first `period` true ranges.
pub fn calculate_atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = highs.len().min(lows.len()).min(closes.len());
    let mut atr_values = vec![None; n];
    if period == 0 || n < period {
        return atr_values;
    }

    let mut tr_values = Vec::with_capacity(n);
    for i in 0..n {
        let high_low = highs[i] - lows[i];
        let tr = if i == 0 {
            high_low
        } else {
            high_low
                .max((highs[i] - closes[i - 1]).abs())
                .max((lows[i] - closes[i - 1]).abs())
        };
        tr_values.push(tr);
    }

    let mut atr = tr_values[..period].iter().sum::<f64>() / period as f64;
    atr_values[period - 1] = Some(atr);
    for i in period..n {
        atr = ((atr * (period as f64 - 1.0)) + tr_values[i]) / period as f64;
        atr_values[i] = Some(atr);
    }

    atr_values
}

/// One row of an [`IndicatorFrame`], for tabular output.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: i64,
    pub ema: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub atr: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
}

/// Every indicator for a series, aligned bar for bar.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
    pub volumes: Vec<i64>,
    pub ema: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: MacdOutput,
    pub bollinger: BollingerBands,
    pub atr: Vec<Option<f64>>,
}

impl IndicatorFrame {
    pub fn compute(series: &PriceSeries, params: &IndicatorParams) -> Self {
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();

        Self {
            dates: series.dates(),
            volumes: series.bars().iter().map(|bar| bar.volume).collect(),
            ema: calculate_ema(&closes, params.ema_period),
            rsi: calculate_rsi(&closes, params.rsi_period),
            macd: calculate_macd(
                &closes,
                params.macd_fast,
                params.macd_slow,
                params.macd_signal,
            ),
            bollinger: calculate_bollinger_bands(
                &closes,
                params.bollinger_period,
                params.bollinger_width,
            ),
            atr: calculate_atr(&highs, &lows, &closes, params.atr_period),
            closes,
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Values at the last bar, or `None` while any input indicator is still
    /// warming up.
    pub fn last_snapshot(&self) -> Option<IndicatorSnapshot> {
        let close = *self.closes.last()?;
        Some(IndicatorSnapshot {
            close,
            ema20: (*self.ema.last()?)?,
            macd: (*self.macd.line.last()?)?,
            rsi: (*self.rsi.last()?)?,
            upper_band: (*self.bollinger.upper.last()?)?,
        })
    }

    pub fn row(&self, index: usize) -> Option<IndicatorRow> {
        Some(IndicatorRow {
            date: *self.dates.get(index)?,
            close: *self.closes.get(index)?,
            volume: *self.volumes.get(index)?,
            ema: self.ema[index],
            rsi: self.rsi[index],
            macd: self.macd.line[index],
            macd_signal: self.macd.signal[index],
            macd_histogram: self.macd.histogram[index],
            atr: self.atr[index],
            bollinger_upper: self.bollinger.upper[index],
            bollinger_lower: self.bollinger.lower[index],
        })
    }

    pub fn tail(&self, count: usize) -> Vec<IndicatorRow> {
        let start = self.len().saturating_sub(count);
        (start..self.len()).filter_map(|i| self.row(i)).collect()
    }
}
