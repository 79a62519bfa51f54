use crate::commands::print_json;
use crate::context::AppContext;
use crate::models::BreakoutRecord;
use crate::store::BreakoutStore;
use anyhow::Result;
use log::{info, warn};

/// Reads every saved breakout, newest first. A failed read is reported and
/// treated as an empty history.
pub fn load_history(store: &BreakoutStore) -> Vec<BreakoutRecord> {
    match store.list_all() {
        Ok(records) => records,
        Err(err) => {
            warn!("Failed to read saved breakouts: {}", err);
            Vec::new()
        }
    }
}

pub fn print_history(records: &[BreakoutRecord]) -> Result<()> {
    println!("Saved bullish breakouts");
    if records.is_empty() {
        println!("No data available.");
        return Ok(());
    }
    print_json(records)
}

pub fn run(app: &AppContext) -> Result<()> {
    let records = match app.existing_store() {
        Ok(Some(store)) => load_history(&store),
        Ok(None) => {
            info!("No breakout store at {}", app.store_path().display());
            Vec::new()
        }
        Err(err) => {
            warn!(
                "Breakout store {} unavailable: {:#}",
                app.store_path().display(),
                err
            );
            Vec::new()
        }
    };
    info!("Loaded {} saved breakout(s)", records.len());
    print_history(&records)
}
