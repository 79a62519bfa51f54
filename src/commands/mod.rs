pub mod analyze;
pub mod correlate;
pub mod history;
pub mod market_summary;
pub mod scan;

use anyhow::{Context, Result};
use serde::Serialize;

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to render command output")?;
    println!("{}", rendered);
    Ok(())
}
