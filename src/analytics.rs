use crate::indicators::calculate_sma;
use crate::models::PriceSeries;
use chrono::NaiveDate;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Day-over-day change in percent; the first bar has no return.
pub fn daily_returns(closes: &[f64]) -> Vec<Option<f64>> {
    simple_returns(closes)
        .into_iter()
        .map(|value| value.map(|r| r * 100.0))
        .collect()
}

fn simple_returns(closes: &[f64]) -> Vec<Option<f64>> {
    let mut returns = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        if i == 0 || closes[i - 1] == 0.0 {
            returns.push(None);
        } else {
            returns.push(Some((closes[i] - closes[i - 1]) / closes[i - 1]));
        }
    }
    returns
}

/// Compounded growth since the first bar, as a fraction.
pub fn cumulative_returns(closes: &[f64]) -> Vec<Option<f64>> {
    let mut growth = 1.0f64;
    simple_returns(closes)
        .into_iter()
        .map(|value| {
            let r = value?;
            growth *= 1.0 + r;
            Some(growth - 1.0)
        })
        .collect()
}

pub fn moving_averages(closes: &[f64], windows: &[usize]) -> BTreeMap<usize, Vec<Option<f64>>> {
    windows
        .iter()
        .filter(|&&window| window > 0)
        .map(|&window| (window, calculate_sma(closes, window)))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let row = self.tickers.iter().position(|t| t == a)?;
        let col = self.tickers.iter().position(|t| t == b)?;
        self.values[row][col]
    }
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }
    let sx = xs.std_dev();
    let sy = ys.std_dev();
    if !(sx > 0.0 && sy > 0.0) {
        return None;
    }
    let covariance = xs.covariance(ys);
    Some((covariance / (sx * sy)).clamp(-1.0, 1.0))
}

/// Pearson correlation of closes, each pair compared on the dates both
/// series traded.
pub fn correlation_matrix(series: &[PriceSeries]) -> CorrelationMatrix {
    let by_date: Vec<HashMap<NaiveDate, f64>> = series
        .iter()
        .map(|s| s.bars().iter().map(|bar| (bar.date, bar.close)).collect())
        .collect();

    let n = series.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for bar in series[i].bars() {
                if let Some(other) = by_date[j].get(&bar.date) {
                    xs.push(bar.close);
                    ys.push(*other);
                }
            }
            let value = pearson(&xs, &ys);
            values[i][j] = value;
            values[j][i] = value;
        }
    }

    CorrelationMatrix {
        tickers: series.iter().map(|s| s.ticker().to_string()).collect(),
        values,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Last close versus the previous close, in percent with two decimals.
pub fn last_change_percent(series: &PriceSeries) -> Option<f64> {
    let bars = series.bars();
    if bars.len() < 2 {
        return None;
    }
    let previous = bars[bars.len() - 2].close;
    let last = bars[bars.len() - 1].close;
    if previous == 0.0 {
        return None;
    }
    Some(round2((last - previous) / previous * 100.0))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChange {
    pub ticker: String,
    pub change_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    pub gainers: Vec<PriceChange>,
    pub losers: Vec<PriceChange>,
}

/// Gainers are the top `count` changes; losers are the bottom `count`, both
/// listed in descending order.
pub fn market_summary(mut changes: Vec<PriceChange>, count: usize) -> MarketSummary {
    changes.sort_by(|a, b| {
        b.change_percent
            .partial_cmp(&a.change_percent)
            .unwrap_or(Ordering::Equal)
    });
    let gainers = changes.iter().take(count).cloned().collect();
    let losers = changes[changes.len().saturating_sub(count)..].to_vec();
    MarketSummary { gainers, losers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::Duration;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn series(ticker: &str, start_offset: i64, closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(start_offset);
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 100,
            })
            .collect();
        PriceSeries::new(ticker, bars).unwrap()
    }

    #[test]
    fn daily_and_cumulative_returns() {
        let closes = [100.0, 110.0, 99.0];
        let daily = daily_returns(&closes);
        assert_eq!(daily[0], None);
        assert!(approx(daily[1].unwrap(), 10.0));
        assert!(approx(daily[2].unwrap(), -10.0));

        let cumulative = cumulative_returns(&closes);
        assert_eq!(cumulative[0], None);
        assert!(approx(cumulative[1].unwrap(), 0.1));
        assert!(approx(cumulative[2].unwrap(), -0.01));
    }

    #[test]
    fn moving_averages_per_window() {
        let closes: Vec<f64> = (1..=10).map(f64::from).collect();
        let averages = moving_averages(&closes, &[2, 5, 0]);
        assert_eq!(averages.len(), 2);
        assert!(approx(averages[&2][9].unwrap(), 9.5));
        assert!(approx(averages[&5][9].unwrap(), 8.0));
        assert_eq!(averages[&5][3], None);
    }

    #[test]
    fn correlation_aligns_on_shared_dates() {
        let a = series("A", 0, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        // starts two days later: shares dates with a[2..]
        let b = series("B", 2, &[30.0, 40.0, 50.0, 60.0]);
        let c = series("C", 0, &[5.0, 4.0, 3.0, 2.0, 1.0]);
        let flat = series("F", 0, &[7.0, 7.0, 7.0, 7.0, 7.0]);

        let matrix = correlation_matrix(&[a, b, c, flat]);
        assert!(approx(matrix.get("A", "A").unwrap(), 1.0));
        assert!(approx(matrix.get("A", "B").unwrap(), 1.0));
        assert!(approx(matrix.get("B", "A").unwrap(), 1.0));
        assert!(approx(matrix.get("A", "C").unwrap(), -1.0));
        assert_eq!(matrix.get("A", "F"), None);
        assert_eq!(matrix.get("F", "F"), None);
    }

    #[test]
    fn last_change_rounds_to_two_decimals() {
        let s = series("A", 0, &[100.0, 103.0, 104.0]);
        assert_eq!(last_change_percent(&s), Some(0.97));
        assert_eq!(last_change_percent(&series("B", 0, &[1.0])), None);
    }

    #[test]
    fn market_summary_splits_gainers_and_losers() {
        let changes: Vec<PriceChange> = (0..7)
            .map(|i| PriceChange {
                ticker: format!("T{}", i),
                change_percent: i as f64 - 3.0,
            })
            .collect();
        let summary = market_summary(changes, 5);
        let gainers: Vec<&str> = summary.gainers.iter().map(|c| c.ticker.as_str()).collect();
        let losers: Vec<&str> = summary.losers.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(gainers, vec!["T6", "T5", "T4", "T3", "T2"]);
        assert_eq!(losers, vec!["T4", "T3", "T2", "T1", "T0"]);
    }
}
