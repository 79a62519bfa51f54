use crate::models::{PriceSeries, SeriesError, TickerErrorKind};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Unknown, delisted or otherwise unresolvable symbol.
    #[error("no data available for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("network error while fetching {ticker}: {reason}")]
    Network { ticker: String, reason: String },

    #[error("fetching {ticker} timed out after {after:?}")]
    Timeout { ticker: String, after: Duration },

    #[error("malformed series received: {0}")]
    InvalidSeries(#[from] SeriesError),
}

impl FetchError {
    pub fn data_unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn network(ticker: &str, reason: impl Into<String>) -> Self {
        Self::Network {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network { .. } | FetchError::Timeout { .. })
    }

    pub fn kind(&self) -> TickerErrorKind {
        match self {
            FetchError::DataUnavailable { .. } | FetchError::InvalidSeries(_) => {
                TickerErrorKind::DataUnavailable
            }
            FetchError::Network { .. } => TickerErrorKind::Fetch,
            FetchError::Timeout { .. } => TickerErrorKind::Timeout,
        }
    }
}

/// Daily bars over an inclusive date window.
///
/// A valid symbol with no bars in the window yields an empty series, not an
/// error. [`crate::yahoo::YahooClient`] is the HTTP implementation.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError>;
}
