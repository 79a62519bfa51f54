use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Built-in NSE scan universe.
pub const DEFAULT_UNIVERSE: &[&str] = &[
    "RELIANCE.NS", "TCS.NS", "INFY.NS", "HDFCBANK.NS", "ICICIBANK.NS", "WIPRO.NS", "LT.NS",
    "HCLTECH.NS", "SBIN.NS", "BHARTIARTL.NS", "ITC.NS", "KOTAKBANK.NS", "AXISBANK.NS",
    "BAJFINANCE.NS", "HINDUNILVR.NS", "ASIANPAINT.NS", "MARUTI.NS", "SUNPHARMA.NS", "HDFC.NS",
    "TITAN.NS", "ULTRACEMCO.NS", "NTPC.NS", "NESTLEIND.NS", "POWERGRID.NS", "ONGC.NS",
    "BAJAJFINSV.NS", "TATAMOTORS.NS", "COALINDIA.NS", "ADANIENT.NS", "ADANIPORTS.NS", "TECHM.NS",
    "HINDALCO.NS", "JSWSTEEL.NS", "BPCL.NS", "IOC.NS", "GRASIM.NS", "CIPLA.NS", "DRREDDY.NS",
    "DIVISLAB.NS", "EICHERMOT.NS", "BAJAJ-AUTO.NS", "HEROMOTOCO.NS", "BRITANNIA.NS",
    "SHREECEM.NS", "INDUSINDBK.NS", "HDFCLIFE.NS", "SBILIFE.NS", "ICICIPRULI.NS", "HAVELLS.NS",
    "GAIL.NS", "PIDILITIND.NS", "DABUR.NS", "GODREJCP.NS", "BERGEPAINT.NS", "AMBUJACEM.NS",
    "ACC.NS", "TATACONSUM.NS", "M&M.NS", "LUPIN.NS", "AUROPHARMA.NS", "BIOCON.NS", "CADILAHC.NS",
    "GLENMARK.NS", "TORNTPHARM.NS", "PEL.NS", "SRF.NS", "ABBOTINDIA.NS", "ALKEM.NS",
    "APOLLOHOSP.NS", "FORTIS.NS", "MAXHEALTH.NS", "METROPOLIS.NS", "DRL.NS", "LALPATHLAB.NS",
    "IPCALAB.NS", "PFIZER.NS", "SANOFI.NS", "SUNTV.NS", "ZEEL.NS", "PVR.NS", "INOXLEISUR.NS",
    "TV18BRDCST.NS", "NETWORK18.NS", "DISHTV.NS", "HATHWAY.NS", "DEN.NS", "SAREGAMA.NS",
    "TIPSINDLTD.NS", "MIRZAINT.NS", "TANLA.NS", "NAUKRI.NS", "INFOEDGE.NS", "IRCTC.NS",
    "ZOMATO.NS", "PAYTM.NS", "POLYCAB.NS", "KEI.NS", "FINCABLES.NS", "HINDZINC.NS", "VEDL.NS",
    "NMDC.NS", "NATIONALUM.NS", "MOIL.NS", "HINDCOPPER.NS", "BALRAMCHIN.NS", "DHAMPURSUG.NS",
    "EIDPARRY.NS", "TRIVENI.NS", "DWARKESH.NS", "DCMSHRIRAM.NS", "DCL.NS", "RAJESHEXPO.NS",
    "MUTHOOTFIN.NS", "MANAPPURAM.NS", "BAJAJHLDNG.NS", "CHOLAFIN.NS", "LICHSGFIN.NS",
    "CANFINHOME.NS", "RECLTD.NS", "PFC.NS", "IRFC.NS", "HUDCO.NS", "NBCC.NS", "NCC.NS",
    "KNRCON.NS", "PNCINFRA.NS", "ASHOKLEY.NS", "ESCORTS.NS", "VOLTAS.NS", "BLUESTARCO.NS",
    "WHIRLPOOL.NS", "IFBIND.NS", "TTKPRESTIG.NS", "CROMPTON.NS", "BAJAJELEC.NS", "ORIENTELEC.NS",
    "BOSCHLTD.NS", "MOTHERSON.NS", "AMARAJABAT.NS", "EXIDEIND.NS", "LUMAXIND.NS", "VARROC.NS",
    "MINDTREE.NS", "MPHASIS.NS", "COFORGE.NS", "PERSISTENT.NS", "LTI.NS", "LTTS.NS",
    "TATAELXSI.NS", "CYIENT.NS", "ZENSARTECH.NS", "NIITTECH.NS", "BIRLACORPN.NS", "JKCEMENT.NS",
    "RAMCOCEM.NS", "HEIDELBERG.NS", "INDIACEM.NS", "ORIENTCEM.NS", "PRSMJOHNSN.NS",
    "JKLAKSHMI.NS", "SAGCEM.NS", "NCLIND.NS", "KCP.NS", "DECCANCE.NS", "ANDHRACEMT.NS",
    "DALBHARAT.NS",
];

/// Large-cap US tickers used for the daily gainers/losers summary.
pub const MARKET_SUMMARY_TICKERS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NVDA", "NFLX", "INTC", "CSCO",
];

/// Normalizes a ticker string by trimming whitespace and uppercasing.
pub fn normalize_ticker_symbol(value: &str) -> Option<String> {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Normalized tickers with repeats removed, first occurrence order kept.
pub fn dedup_universe<I, S>(tickers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for ticker in tickers {
        let Some(symbol) = normalize_ticker_symbol(ticker.as_ref()) else {
            continue;
        };
        if seen.insert(symbol.clone()) {
            unique.push(symbol);
        }
    }
    unique
}

pub fn default_universe() -> Vec<String> {
    dedup_universe(DEFAULT_UNIVERSE.iter())
}

/// Parses tickers separated by commas or whitespace; `#` starts a comment.
pub fn parse_universe(contents: &str) -> Vec<String> {
    let symbols = contents.lines().flat_map(|line| {
        let without_comment = line.split('#').next().unwrap_or("");
        without_comment
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::to_string)
            .collect::<Vec<_>>()
    });
    dedup_universe(symbols)
}

pub fn load_universe_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read universe file {}", path.display()))?;
    Ok(parse_universe(&contents))
}
