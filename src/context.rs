use crate::config::{market_data_base_url, ScanConfig, SETTING_KEYS};
use crate::store::BreakoutStore;
use crate::yahoo::YahooClient;
use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct AppContext {
    store_path: PathBuf,
    settings: HashMap<String, String>,
}

impl AppContext {
    /// Builds a context whose settings come from the process environment.
    pub fn initialize<P: Into<PathBuf>>(store_path: P) -> Self {
        let settings = SETTING_KEYS
            .iter()
            .filter_map(|key| env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();
        Self::with_settings(store_path, settings)
    }

    pub fn with_settings<P: Into<PathBuf>>(
        store_path: P,
        settings: HashMap<String, String>,
    ) -> Self {
        Self {
            store_path: store_path.into(),
            settings,
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn settings(&self) -> &HashMap<String, String> {
        &self.settings
    }

    /// Opens the breakout store and makes sure its table exists.
    pub fn store(&self) -> Result<BreakoutStore> {
        debug!("Opening breakout store at {}", self.store_path.display());
        let store = BreakoutStore::open(&self.store_path)?;
        store.ensure_schema().with_context(|| {
            format!(
                "failed to prepare breakout table in {}",
                self.store_path.display()
            )
        })?;
        Ok(store)
    }

    /// Opens the store for reading only, or `None` when nothing was saved yet.
    pub fn existing_store(&self) -> Result<Option<BreakoutStore>> {
        if !self.store_path.exists() {
            return Ok(None);
        }
        Ok(Some(BreakoutStore::open_read_only(&self.store_path)?))
    }

    pub fn scan_config(&self) -> Result<ScanConfig> {
        ScanConfig::from_settings_map(&self.settings)
    }

    pub fn market_data(&self) -> Result<YahooClient> {
        let config = self.scan_config()?;
        YahooClient::new(
            Some(market_data_base_url(&self.settings)),
            Some(config.fetch_timeout),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_created_with_schema() {
        let dir = tempfile::tempdir().unwrap();
        let app = AppContext::with_settings(dir.path().join("breakouts.db"), HashMap::new());
        let store = app.store().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(app.store_path().exists());
    }

    #[test]
    fn existing_store_does_not_create_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = AppContext::with_settings(dir.path().join("breakouts.db"), HashMap::new());
        assert!(app.existing_store().unwrap().is_none());
        assert!(!app.store_path().exists());

        app.store().unwrap();
        assert!(app.existing_store().unwrap().is_some());
    }

    #[test]
    fn market_data_client_uses_configured_base_url() {
        let mut settings = HashMap::new();
        settings.insert(
            "MARKET_DATA_BASE_URL".to_string(),
            "http://127.0.0.1:9/".to_string(),
        );
        let app = AppContext::with_settings("unused.db", settings);
        let client = app.market_data().unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
    }

    #[test]
    fn invalid_setting_surfaces_as_error() {
        let mut settings = HashMap::new();
        settings.insert("SCAN_MIN_BARS".to_string(), "zero".to_string());
        let app = AppContext::with_settings("unused.db", settings);
        assert!(app.scan_config().is_err());
        assert!(app.market_data().is_err());
    }
}
