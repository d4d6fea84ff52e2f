//! Client-only ranking pipeline used when no backend run is available.
//!
//! Pulls a point-in-time quote and a company profile for every symbol from
//! the quote provider and turns them into [`RankingRow`]s with a placeholder
//! score. Weekly and monthly changes are derived from the one-day change
//! (x2 and x4); this is a demo approximation, not a historical computation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::batching::{get_batches, run_sequential};
use crate::config::Config;
use crate::error::{RankingError, Result};
use crate::models::{FormulaMode, Profile, Quote, RankingRow};
use crate::quotes::{FinnhubClient, QuoteProvider};

/// `(weekly, monthly)` weights.
pub const BUFFETT_WEIGHTS: (f64, f64) = (0.6, 0.4);
pub const CRAMER_WEIGHTS: (f64, f64) = (0.4, 0.6);

const WEEKLY_MULTIPLIER: f64 = 2.0;
const MONTHLY_MULTIPLIER: f64 = 4.0;

// ---------------------------------------------------------------------------
// Scoring and normalization
// ---------------------------------------------------------------------------

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn weighted((w, m): (f64, f64), change_1w: f64, change_1m: f64) -> f64 {
    w * change_1w + m * change_1m
}

/// Placeholder score: a weighted blend of weekly and monthly change.
///
/// `Both` averages the Buffett and Cramer blends.
pub fn placeholder_score(change_1w: f64, change_1m: f64, formula: FormulaMode) -> f64 {
    let c1w = finite_or_zero(change_1w);
    let c1m = finite_or_zero(change_1m);
    match formula {
        FormulaMode::Buffett => weighted(BUFFETT_WEIGHTS, c1w, c1m),
        FormulaMode::Cramer => weighted(CRAMER_WEIGHTS, c1w, c1m),
        FormulaMode::Both => {
            (weighted(BUFFETT_WEIGHTS, c1w, c1m) + weighted(CRAMER_WEIGHTS, c1w, c1m)) / 2.0
        }
    }
}

/// Map a quote and an optional profile into a row.
pub fn normalize_row(
    symbol: &str,
    quote: &Quote,
    profile: Option<&Profile>,
    formula: FormulaMode,
) -> RankingRow {
    let price = finite_or_zero(quote.current.unwrap_or(0.0));
    let change_1d = finite_or_zero(quote.percent_change.unwrap_or(0.0));
    let change_1w = change_1d * WEEKLY_MULTIPLIER;
    let change_1m = change_1d * MONTHLY_MULTIPLIER;

    let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.trim().is_empty());
    let name = profile
        .and_then(|p| non_empty(&p.name).or_else(|| non_empty(&p.ticker)))
        .unwrap_or_else(|| symbol.to_string());
    let sector = profile
        .and_then(|p| non_empty(&p.finnhub_industry))
        .unwrap_or_else(|| "N/A".to_string());

    let buffett = weighted(BUFFETT_WEIGHTS, change_1w, change_1m);
    let cramer = weighted(CRAMER_WEIGHTS, change_1w, change_1m);
    let (score_buffett, score_cramer) = match formula {
        FormulaMode::Buffett => (Some(buffett), None),
        FormulaMode::Cramer => (None, Some(cramer)),
        FormulaMode::Both => (Some(buffett), Some(cramer)),
    };

    RankingRow {
        name,
        sector,
        // Finnhub reports market capitalization in millions.
        market_cap: profile
            .and_then(|p| p.market_capitalization)
            .map(|m| m * 1_000_000.0),
        score_buffett,
        score_cramer,
        last_updated: Some(Utc::now()),
        score: Some(placeholder_score(change_1w, change_1m, formula)),
        price,
        change_1d,
        change_1w,
        change_1m,
        ..RankingRow::new(symbol)
    }
}

// ---------------------------------------------------------------------------
// Batch fetch
// ---------------------------------------------------------------------------

/// Errors that would fail every symbol, so the batch is aborted instead of
/// silently producing nothing.
fn is_fatal(err: &RankingError) -> bool {
    matches!(
        err,
        RankingError::MissingApiKey | RankingError::InvalidArgument(_) | RankingError::Url(_)
    )
}

/// Fetch quote and profile for every symbol concurrently.
///
/// A failed quote drops that symbol; a failed profile is treated as empty.
/// Rows come back in input order.
pub async fn fetch_batch(
    provider: &dyn QuoteProvider,
    symbols: &[String],
    formula: FormulaMode,
) -> Result<Vec<RankingRow>> {
    let lookups = symbols.iter().map(|symbol| async move {
        let (quote, profile) = futures::join!(provider.quote(symbol), provider.profile(symbol));
        (symbol, quote, profile)
    });

    let mut rows = Vec::with_capacity(symbols.len());
    for (symbol, quote, profile) in join_all(lookups).await {
        let quote = match quote {
            Ok(q) => q,
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                debug!(symbol = %symbol, error = %e, "Quote lookup failed, skipping symbol");
                continue;
            }
        };
        let profile = match profile {
            Ok(p) => Some(p),
            Err(e) => {
                debug!(symbol = %symbol, error = %e, "Profile lookup failed, using empty profile");
                None
            }
        };
        rows.push(normalize_row(symbol, &quote, profile.as_ref(), formula));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// MergedRows
// ---------------------------------------------------------------------------

/// Rows keyed by symbol; a later row for the same symbol replaces the earlier one.
#[derive(Debug, Default, Clone)]
pub struct MergedRows {
    rows: Vec<RankingRow>,
    index: HashMap<String, usize>,
}

impl MergedRows {
    pub fn merge(&mut self, batch: Vec<RankingRow>) {
        for row in batch {
            match self.index.get(&row.symbol) {
                Some(&i) => self.rows[i] = row,
                None => {
                    self.index.insert(row.symbol.clone(), self.rows.len());
                    self.rows.push(row);
                }
            }
        }
    }

    pub fn rows(&self) -> &[RankingRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<RankingRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// FallbackPipeline
// ---------------------------------------------------------------------------

/// Result of a full pipeline pass.
#[derive(Debug, Clone, Default)]
pub struct FallbackOutcome {
    /// Everything merged so far, including partial results on abort.
    pub rows: Vec<RankingRow>,
    pub batches_done: usize,
    pub batches_total: usize,
    /// Why the pass stopped early, if it did.
    pub error: Option<String>,
}

/// Batching driver over a [`QuoteProvider`].
///
/// Without an API key the pipeline is constructed disabled and carries a
/// persistent warning instead of failing at call time.
pub struct FallbackPipeline {
    provider: Option<Arc<dyn QuoteProvider>>,
    batch_size: usize,
    pause: Duration,
    warning: Option<String>,
}

impl FallbackPipeline {
    /// Build the pipeline against Finnhub using the session config.
    pub fn new(config: &Config) -> Self {
        match FinnhubClient::new(config) {
            Ok(client) => Self::with_provider(Arc::new(client), config),
            Err(e) => {
                warn!(error = %e, "Live quote fetch disabled");
                Self {
                    provider: None,
                    batch_size: config.batch_size,
                    pause: config.batch_pause,
                    warning: Some(e.to_string()),
                }
            }
        }
    }

    pub fn with_provider(provider: Arc<dyn QuoteProvider>, config: &Config) -> Self {
        Self {
            provider: Some(provider),
            batch_size: config.batch_size,
            pause: config.batch_pause,
            warning: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Persistent warning shown while the pipeline is disabled.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Process `symbols` in sequential batches, calling `publish` with the
    /// merged rows after every batch.
    ///
    /// Returns `Err(MissingApiKey)` when disabled. A failing batch stops the
    /// pass and is reported in [`FallbackOutcome::error`].
    pub async fn run<P>(
        &self,
        symbols: &[String],
        formula: FormulaMode,
        mut publish: P,
    ) -> Result<FallbackOutcome>
    where
        P: FnMut(&[RankingRow]),
    {
        let provider = self.provider.clone().ok_or(RankingError::MissingApiKey)?;
        let batches = get_batches(symbols, self.batch_size)?;
        let batches_total = batches.len();
        info!(symbols = symbols.len(), batches = batches_total, %formula, "Starting fallback fetch");

        let mut merged = MergedRows::default();
        let mut batches_done = 0;
        let result = run_sequential(
            batches,
            self.pause,
            |batch: Vec<String>| {
                let provider = provider.clone();
                async move { fetch_batch(provider.as_ref(), &batch, formula).await }
            },
            |_, rows| {
                merged.merge(rows);
                batches_done += 1;
                publish(merged.rows());
            },
        )
        .await;

        let error = match result {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, batches_done, "Fallback fetch aborted");
                Some(e.to_string())
            }
        };
        Ok(FallbackOutcome {
            rows: merged.into_rows(),
            batches_done,
            batches_total,
            error,
        })
    }
}
