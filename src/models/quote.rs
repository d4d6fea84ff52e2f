use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Quote — Finnhub `/quote` payload
// ---------------------------------------------------------------------------

/// Point-in-time quote. Finnhub uses single-letter keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Current price.
    #[serde(default, rename = "c")]
    pub current: Option<f64>,
    /// Absolute change.
    #[serde(default, rename = "d")]
    pub change: Option<f64>,
    /// Percent change.
    #[serde(default, rename = "dp")]
    pub percent_change: Option<f64>,
    #[serde(default, rename = "h")]
    pub high: Option<f64>,
    #[serde(default, rename = "l")]
    pub low: Option<f64>,
    #[serde(default, rename = "o")]
    pub open: Option<f64>,
    #[serde(default, rename = "pc")]
    pub previous_close: Option<f64>,
}

// ---------------------------------------------------------------------------
// Profile — Finnhub `/stock/profile2` payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub finnhub_industry: Option<String>,
    #[serde(default)]
    pub market_capitalization: Option<f64>,
}
