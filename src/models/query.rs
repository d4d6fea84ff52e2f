use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RankingError;

// ---------------------------------------------------------------------------
// FormulaMode
// ---------------------------------------------------------------------------

/// Which scoring methodology a run (or the fallback pipeline) applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaMode {
    Buffett,
    Cramer,
    #[default]
    Both,
}

impl FormulaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaMode::Buffett => "buffett",
            FormulaMode::Cramer => "cramer",
            FormulaMode::Both => "both",
        }
    }
}

impl fmt::Display for FormulaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormulaMode {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buffett" => Ok(FormulaMode::Buffett),
            "cramer" => Ok(FormulaMode::Cramer),
            "both" => Ok(FormulaMode::Both),
            other => Err(RankingError::InvalidArgument(format!(
                "Invalid formula_mode: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Result-set filters. `None` and an empty sector list mean "not filtered"
/// and are never sent over the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sectors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap_max: Option<f64>,
    /// Minimum completeness percentage, 0 to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness: Option<f64>,
}

impl Filters {
    /// Add a sector, ignoring duplicates and blanks.
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        let sector = sector.into();
        if !sector.trim().is_empty() && !self.sectors.contains(&sector) {
            self.sectors.push(sector);
        }
        self
    }

    pub fn with_market_cap(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.market_cap_min = min;
        self.market_cap_max = max;
        self
    }

    pub fn with_completeness(mut self, pct: Option<f64>) -> Self {
        self.completeness = pct;
        self
    }

    /// Parse a form field: blank input means "no bound".
    pub fn parse_bound(raw: &str) -> crate::Result<Option<f64>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<f64>()
            .map(Some)
            .map_err(|_| RankingError::InvalidArgument(format!("Not a number: {raw}")))
    }

    /// Check bounds before the filters are applied.
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(pct) = self.completeness {
            if !(0.0..=100.0).contains(&pct) {
                return Err(RankingError::InvalidArgument(format!(
                    "completeness must be between 0 and 100, got {pct}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.market_cap_min, self.market_cap_max) {
            if min > max {
                return Err(RankingError::InvalidArgument(format!(
                    "marketCapMin ({min}) is greater than marketCapMax ({max})"
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
            && self.market_cap_min.is_none()
            && self.market_cap_max.is_none()
            && self.completeness.is_none()
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Sortable columns, named as the backend expects them in `sortBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Symbol,
    Name,
    Sector,
    MarketCap,
    ScoreBuffett,
    ScoreCramer,
    #[default]
    CombinedRank,
    Completeness,
    LastUpdated,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Symbol => "symbol",
            SortKey::Name => "name",
            SortKey::Sector => "sector",
            SortKey::MarketCap => "market_cap",
            SortKey::ScoreBuffett => "score_buffett",
            SortKey::ScoreCramer => "score_cramer",
            SortKey::CombinedRank => "combined_rank",
            SortKey::Completeness => "completeness",
            SortKey::LastUpdated => "last_updated",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Exactly one active sort column at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Toggle semantics: same key flips direction, a new key starts ascending.
    pub fn toggled(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.direction.flipped())
        } else {
            Self::new(key, SortDirection::Asc)
        }
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// 0-based page index plus one of the fixed page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: crate::config::DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageSpec {
    pub fn new(page: usize, page_size: usize) -> crate::Result<Self> {
        check_page_size(page_size)?;
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> usize {
        self.page * self.page_size
    }

    /// Number of pages needed for `total` rows (at least one).
    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    pub fn has_next(&self, total: usize) -> bool {
        self.offset() + self.page_size < total
    }

    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    /// 1-based `(from, to)` of the rows on this page, or `(0, 0)` when empty.
    pub fn display_range(&self, total: usize) -> (usize, usize) {
        if total == 0 || self.offset() >= total {
            return (0, 0);
        }
        let from = self.offset() + 1;
        let to = (self.offset() + self.page_size).min(total);
        (from, to)
    }
}

pub fn check_page_size(page_size: usize) -> crate::Result<()> {
    if crate::config::PAGE_SIZES.contains(&page_size) {
        Ok(())
    } else {
        Err(RankingError::InvalidArgument(format!(
            "page size {page_size} is not one of {:?}",
            crate::config::PAGE_SIZES
        )))
    }
}

// ---------------------------------------------------------------------------
// ViewQuery — the tuple a results page is fetched for
// ---------------------------------------------------------------------------

/// Everything that determines which page of results is on screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewQuery {
    pub filters: Filters,
    pub sort: SortSpec,
    pub page: PageSpec,
    pub formula_mode: FormulaMode,
}
