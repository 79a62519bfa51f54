use crate::models::{BreakoutRecord, NewBreakout};
use chrono::NaiveDate;
use log::debug;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::Path;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS bullish_breakouts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT,
    date TEXT,
    close REAL,
    volume INTEGER,
    macd REAL,
    rsi REAL,
    ema20 REAL,
    upper_band REAL
)
";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open breakout store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("breakout store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored breakout {id} has an invalid date: {value}")]
    InvalidDate { id: i64, value: String },
}

/// Handle on the `bullish_breakouts` table. Rows are only ever appended.
pub struct BreakoutStore {
    conn: Connection,
}

impl BreakoutStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { conn })
    }

    /// Opens an existing database for reading. A missing file is an error and
    /// is never created.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |source| StoreError::Open {
                path: path.display().to_string(),
                source,
            },
        )?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Ok(Self { conn })
    }

    /// Creates the table when missing; existing rows are left untouched.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    pub fn insert(&mut self, breakout: &NewBreakout) -> Result<BreakoutRecord, StoreError> {
        let date = breakout.date.format(DATE_FORMAT).to_string();
        self.conn.execute(
            "INSERT INTO bullish_breakouts (ticker, date, close, volume, macd, rsi, ema20, upper_band)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                breakout.ticker,
                date,
                breakout.close,
                breakout.volume,
                breakout.macd,
                breakout.rsi,
                breakout.ema20,
                breakout.upper_band,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Stored breakout {} for {} on {}", id, breakout.ticker, date);
        Ok(breakout.clone().with_id(id))
    }

    /// Every stored breakout, most recent detection date first, newer ids
    /// first within a date.
    pub fn list_all(&self) -> Result<Vec<BreakoutRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ticker, date, close, volume, macd, rsi, ema20, upper_band
             FROM bullish_breakouts
             ORDER BY date DESC, id DESC",
        )?;
        let rows = stmt.query_map([], read_row)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, ticker, raw_date, close, volume, macd, rsi, ema20, upper_band) = row?;
            let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT).map_err(|_| {
                StoreError::InvalidDate {
                    id,
                    value: raw_date.clone(),
                }
            })?;
            records.push(BreakoutRecord {
                id,
                ticker,
                date,
                close,
                volume,
                macd,
                rsi,
                ema20,
                upper_band,
            });
        }
        Ok(records)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM bullish_breakouts", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

type RawRow = (i64, String, String, f64, i64, f64, f64, f64, f64);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}
