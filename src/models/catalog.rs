use serde::{Deserialize, Serialize};

use super::row::RankingRow;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Health {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            status: "unavailable".to_string(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

// ---------------------------------------------------------------------------
// Symbol catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default, alias = "market_cap")]
    pub market_cap: Option<f64>,
}

/// Response of `GET /symbols`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolCatalog {
    #[serde(default)]
    pub symbols: Vec<SymbolInfo>,
    #[serde(default)]
    pub sectors: Option<Vec<String>>,
}

impl SymbolCatalog {
    /// The explicit sector list if the server sent one, else the unique
    /// non-empty sectors across symbols in first-seen order.
    pub fn sector_list(&self) -> Vec<String> {
        if let Some(sectors) = &self.sectors {
            return sectors.clone();
        }
        let mut out: Vec<String> = Vec::new();
        for sector in self.symbols.iter().filter_map(|s| s.sector.as_deref()) {
            if !sector.is_empty() && !out.iter().any(|s| s == sector) {
                out.push(sector.to_string());
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Results page
// ---------------------------------------------------------------------------

/// Response of `GET /rankings/latest`. Both fields may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsPage {
    #[serde(default)]
    pub items: Option<Vec<RankingRow>>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl ResultsPage {
    /// Rows plus a total that is never smaller than the row count.
    pub fn into_parts(self) -> (Vec<RankingRow>, usize) {
        let rows = self.items.unwrap_or_default();
        let total = self
            .total
            .map(|t| t as usize)
            .unwrap_or(rows.len())
            .max(rows.len());
        (rows, total)
    }
}
