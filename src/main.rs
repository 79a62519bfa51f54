use anyhow::Result;
use breakout_scanner::{
    commands::{
        analyze::{self, AnalyzeArgs, DEFAULT_ANALYZE_TICKER, DEFAULT_TAIL_ROWS},
        correlate, history, market_summary,
        scan::{self, ScanArgs},
    },
    context::AppContext,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

const DEFAULT_STORE_PATH: &str = "bullish_stocks.db";

#[derive(Parser)]
#[command(name = "breakout-scanner")]
#[command(about = "Scans a stock universe for bullish technical breakouts")]
struct Cli {
    /// SQLite file holding saved breakouts
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_STORE_PATH)]
    db: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the universe for bullish breakouts and save every hit
    Scan {
        /// File listing tickers (comma or whitespace separated, `#` comments); defaults to the built-in NSE list
        #[arg(long = "universe", value_name = "PATH")]
        universe_file: Option<PathBuf>,
        /// First date of the price window (YYYY-MM-DD, defaults to SCAN_WINDOW_START)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last date of the price window (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Print every saved breakout, newest first
    History,
    /// Show indicators, returns and moving averages for one ticker
    Analyze {
        #[arg(default_value = DEFAULT_ANALYZE_TICKER)]
        ticker: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Moving average windows in days
        #[arg(long = "ma", value_delimiter = ',', default_values_t = [20usize, 50])]
        windows: Vec<usize>,
        /// Number of trailing rows to print
        #[arg(long, default_value_t = DEFAULT_TAIL_ROWS)]
        tail: usize,
    },
    /// Top gainers and losers among large-cap US tickers
    MarketSummary {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Entries per side
        #[arg(long, default_value_t = market_summary::DEFAULT_SUMMARY_COUNT)]
        count: usize,
    },
    /// Correlation matrix of closes for the tickers in a portfolio CSV
    Correlate {
        /// CSV file with a `Ticker` column
        #[arg(long, value_name = "PATH")]
        portfolio: PathBuf,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { db, command } = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting breakout scanner. Not financial advice.");
    let app_context = AppContext::initialize(db);

    match command {
        Commands::Scan {
            universe_file,
            start,
            end,
        } => {
            let args = ScanArgs {
                universe_file,
                start,
                end,
            };
            scan::run(&app_context, &args).await?;
        }
        Commands::History => {
            history::run(&app_context)?;
        }
        Commands::Analyze {
            ticker,
            start,
            end,
            windows,
            tail,
        } => {
            let args = AnalyzeArgs {
                ticker,
                start,
                end,
                windows,
                tail,
            };
            analyze::run(&app_context, &args).await?;
        }
        Commands::MarketSummary { start, end, count } => {
            market_summary::run(&app_context, start, end, count).await?;
        }
        Commands::Correlate {
            portfolio,
            start,
            end,
        } => {
            correlate::run(&app_context, &portfolio, start, end).await?;
        }
    }

    Ok(())
}
