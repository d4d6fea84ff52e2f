//! Built-in symbol universe for the quote fallback pipeline.

/// Representative large-cap S&P 500 constituents, used when the caller
/// supplies no symbol list.
pub const SP500_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "AMZN", "GOOGL", "GOOG", "META", "NVDA", "BRK.B", "TSLA", "UNH",
    "XOM", "JNJ", "JPM", "V", "PG", "AVGO", "HD", "MA", "CVX", "LLY",
    "MRK", "ABBV", "PEP", "KO", "COST", "BAC", "TMO", "MCD", "WMT", "CSCO",
    "PFE", "NFLX", "VZ", "ADBE", "CRM", "ABT", "DIS", "ACN", "NKE", "DHR",
    "INTC", "LIN", "TXN", "AMD", "PM", "WFC", "QCOM", "MS", "NEE", "UPS",
    "HON", "AMGN", "ORCL", "IBM", "CAT", "BA", "GE", "UNP", "SCHW", "LOW",
    "RTX", "SPGI", "INTU", "PLD", "AMT", "BKNG", "MDLZ", "GS", "ELV", "AXP",
    "BLK", "LMT", "T", "PYPL", "CVS", "DE", "C", "ADP", "SYK", "NOW",
    "COP", "MO", "ISRG", "TGT", "MDT", "BK", "BDX", "CI", "PGR", "ZTS",
    "MMC", "USB", "SO", "GILD", "REGN", "CB", "DUK", "EW", "ADI", "EQIX",
    "HUM", "ETN", "APD", "EMR", "ICE", "VRTX", "SHW", "PNC", "CSX", "FIS",
    "CL", "ITW", "FDX", "NSC", "AON", "MPC", "PSA", "EOG", "AIG", "FISV",
    "SLB", "GM", "KMB", "DELL", "LRCX", "KLAC", "MAR", "ORLY", "AZO", "ROP",
    "CDNS", "SNPS", "CRWD", "PANW", "FTNT", "DDOG", "TEAM", "OKTA", "ZS", "NET",
    "ALGN", "ROST", "KHC", "DHI", "NOC", "CMCSA", "SBUX", "MU", "EL", "KMI",
    "CCI", "PRU", "TRV", "CME", "TFC", "ALL", "D", "AEP", "EXC", "PCAR",
    "MNST", "PAYX", "CTAS", "HLT", "A", "HCA", "PH", "GIS", "DXCM", "SPG",
    "MET", "OXY", "YUM", "WELL", "VLO", "PSX", "ADM", "AFL", "MCK", "KR",
    "ED", "HES", "WMB", "TEL", "MRNA", "LULU", "EBAY", "CSGP", "IDXX", "VRSK",
    "TT", "MLM", "LEN", "RSG", "MTD", "HPQ", "DTE", "WBD", "WEC",
];

/// [`SP500_SYMBOLS`] as owned strings.
pub fn default_symbols() -> Vec<String> {
    SP500_SYMBOLS.iter().map(|s| s.to_string()).collect()
}
