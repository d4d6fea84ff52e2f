use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// RankingRow — One ranked symbol, from a server page or local normalization
// ---------------------------------------------------------------------------

/// A single ranked symbol.
///
/// Accepts both the backend's snake_case score columns (`score_buffett`,
/// `combined_rank`, ...) and camelCase names on input; always serializes
/// as camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default, alias = "market_cap")]
    pub market_cap: Option<f64>,
    #[serde(default, alias = "score_buffett")]
    pub score_buffett: Option<f64>,
    #[serde(default, alias = "score_cramer")]
    pub score_cramer: Option<f64>,
    #[serde(default, alias = "combined_rank")]
    pub combined_rank: Option<f64>,
    #[serde(default)]
    pub completeness: Option<f64>,
    #[serde(
        default,
        alias = "last_updated",
        deserialize_with = "deserialize_timestamp"
    )]
    pub last_updated: Option<DateTime<Utc>>,
    /// Placeholder score computed by the fallback pipeline.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub price: f64,
    #[serde(default, rename = "change1D", alias = "change_1d")]
    pub change_1d: f64,
    #[serde(default, rename = "change1W", alias = "change_1w")]
    pub change_1w: f64,
    #[serde(default, rename = "change1M", alias = "change_1m")]
    pub change_1m: f64,
}

impl RankingRow {
    /// A row with only the symbol set; the rest is empty or zero.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: String::new(),
            sector: String::new(),
            market_cap: None,
            score_buffett: None,
            score_cramer: None,
            combined_rank: None,
            completeness: None,
            last_updated: None,
            score: None,
            price: 0.0,
            change_1d: 0.0,
            change_1w: 0.0,
            change_1m: 0.0,
        }
    }

    /// The score shown in the "Score" column: the placeholder score if
    /// present, otherwise whichever formula score the server filled in.
    pub fn display_score(&self) -> Option<f64> {
        self.score.or(self.score_buffett).or(self.score_cramer)
    }
}

/// Timestamps arrive as RFC 3339, as SQLite's `YYYY-MM-DD HH:MM:SS`, or as
/// epoch seconds. Anything else is treated as missing rather than failing
/// the whole page.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
