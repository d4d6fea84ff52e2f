//! Shared test fixtures for the ranking SDK integration tests.
//!
//! Provides an in-memory [`FakeBackend`] with scripted run/status/page
//! responses and call counters, and a [`FakeQuoteProvider`] that serves
//! canned quotes and profiles.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sp_ranking_sdk::models::{
    Health, Profile, Quote, ResultsPage, RunRequest, StartRunResponse, StatusResponse,
    SymbolCatalog, SymbolInfo,
};
use sp_ranking_sdk::{
    ExportFormat, QuoteProvider, RankingBackend, RankingError, RankingRow, Result, ViewQuery,
};

/// Route SDK logs to the test harness. Honors `RUST_LOG`, defaults to `warn`.
/// Safe to call from every test; only the first call installs the subscriber.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Scripted failures surface as a 500 with this message.
fn scripted_error(message: &str) -> RankingError {
    RankingError::Api {
        status: 500,
        message: message.to_string(),
    }
}

pub fn row(symbol: &str) -> RankingRow {
    RankingRow {
        name: format!("{symbol} Inc"),
        sector: "Technology".to_string(),
        price: 100.0,
        ..RankingRow::new(symbol)
    }
}

pub fn page_of(symbols: &[&str], total: u64) -> ResultsPage {
    ResultsPage {
        items: Some(symbols.iter().map(|s| row(s)).collect()),
        total: Some(total),
    }
}

pub fn status(raw: &str, progress: Option<f64>) -> StatusResponse {
    StatusResponse {
        status: Some(raw.to_string()),
        progress,
        ..StatusResponse::default()
    }
}

pub fn started(run_id: &str) -> StartRunResponse {
    StartRunResponse {
        run_id: Some(run_id.to_string()),
        ..StartRunResponse::default()
    }
}

// ---------------------------------------------------------------------------
// FakeBackend
// ---------------------------------------------------------------------------

/// One scripted `/rankings/latest` answer.
pub struct LatestStep {
    pub delay: Duration,
    pub result: std::result::Result<ResultsPage, String>,
}

/// In-memory [`RankingBackend`].
///
/// Unscripted `latest` calls return a generated page of `R<n>` rows out of
/// `total` rows; unscripted status polls answer `running`.
pub struct FakeBackend {
    pub health: Mutex<std::result::Result<Health, String>>,
    pub catalog: Mutex<std::result::Result<SymbolCatalog, String>>,
    pub starts: Mutex<VecDeque<(Duration, std::result::Result<StartRunResponse, String>)>>,
    pub statuses: Mutex<VecDeque<std::result::Result<StatusResponse, String>>>,
    pub latest_script: Mutex<VecDeque<LatestStep>>,
    pub total: AtomicUsize,
    pub export_base: Option<String>,

    pub start_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub status_ids: Mutex<Vec<String>>,
    pub run_requests: Mutex<Vec<RunRequest>>,
    pub latest_calls: Mutex<Vec<ViewQuery>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            health: Mutex::new(Ok(Health {
                status: "ok".to_string(),
                error: None,
            })),
            catalog: Mutex::new(Ok(sample_catalog())),
            starts: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            latest_script: Mutex::new(VecDeque::new()),
            total: AtomicUsize::new(60),
            export_base: None,
            start_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            status_ids: Mutex::new(Vec::new()),
            run_requests: Mutex::new(Vec::new()),
            latest_calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that can build server export URLs under `base`.
    pub fn with_exports(base: &str) -> Self {
        Self {
            export_base: Some(base.to_string()),
            ..Self::default()
        }
    }

    pub fn script_start(&self, result: std::result::Result<StartRunResponse, String>) {
        self.script_start_after(Duration::ZERO, result);
    }

    /// Answer the next start request only after `delay`.
    pub fn script_start_after(
        &self,
        delay: Duration,
        result: std::result::Result<StartRunResponse, String>,
    ) {
        self.starts.lock().unwrap().push_back((delay, result));
    }

    pub fn script_statuses<I>(&self, results: I)
    where
        I: IntoIterator<Item = std::result::Result<StatusResponse, String>>,
    {
        self.statuses.lock().unwrap().extend(results);
    }

    pub fn script_latest(&self, delay: Duration, result: std::result::Result<ResultsPage, String>) {
        self.latest_script
            .lock()
            .unwrap()
            .push_back(LatestStep { delay, result });
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Status polls made for `run_id`.
    pub fn status_count_for(&self, run_id: &str) -> usize {
        self.status_ids
            .lock()
            .unwrap()
            .iter()
            .filter(|id| *id == run_id)
            .count()
    }

    pub fn latest_count(&self) -> usize {
        self.latest_calls.lock().unwrap().len()
    }

    pub fn last_query(&self) -> Option<ViewQuery> {
        self.latest_calls.lock().unwrap().last().cloned()
    }

    fn generated_page(&self, query: &ViewQuery) -> ResultsPage {
        let total = self.total.load(Ordering::SeqCst);
        let start = query.page.offset().min(total);
        let end = (start + query.page.page_size).min(total);
        ResultsPage {
            items: Some((start..end).map(|i| row(&format!("R{i}"))).collect()),
            total: Some(total as u64),
        }
    }
}

#[async_trait]
impl RankingBackend for FakeBackend {
    async fn health(&self) -> Result<Health> {
        self.health
            .lock()
            .unwrap()
            .clone()
            .map_err(|e| scripted_error(&e))
    }

    async fn symbols(&self) -> Result<SymbolCatalog> {
        self.catalog
            .lock()
            .unwrap()
            .clone()
            .map_err(|e| scripted_error(&e))
    }

    async fn start_run(&self, request: &RunRequest) -> Result<StartRunResponse> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.run_requests.lock().unwrap().push(request.clone());
        let next = self.starts.lock().unwrap().pop_front();
        match next {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result.map_err(|e| scripted_error(&e))
            }
            None => Ok(started("1")),
        }
    }

    async fn run_status(&self, run_id: &str) -> Result<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_ids.lock().unwrap().push(run_id.to_string());
        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(result) => result.map_err(|e| scripted_error(&e)),
            None => Ok(status("running", None)),
        }
    }

    async fn latest(&self, query: &ViewQuery) -> Result<ResultsPage> {
        self.latest_calls.lock().unwrap().push(query.clone());
        let step = self.latest_script.lock().unwrap().pop_front();
        match step {
            Some(step) => {
                if !step.delay.is_zero() {
                    tokio::time::sleep(step.delay).await;
                }
                step.result.map_err(|e| scripted_error(&e))
            }
            None => Ok(self.generated_page(query)),
        }
    }

    fn export_url(&self, run_id: &str, format: ExportFormat) -> Option<String> {
        self.export_base.as_ref().map(|base| {
            format!(
                "{base}/rankings/export?run_id={run_id}&format={}",
                format.as_str()
            )
        })
    }
}

pub fn sample_catalog() -> SymbolCatalog {
    let info = |symbol: &str, sector: &str| SymbolInfo {
        symbol: symbol.to_string(),
        name: Some(format!("{symbol} Inc")),
        sector: Some(sector.to_string()),
        market_cap: None,
    };
    SymbolCatalog {
        symbols: vec![
            info("AAPL", "Technology"),
            info("XOM", "Energy"),
            info("MSFT", "Technology"),
            info("JPM", "Financials"),
            info("NOSEC", ""),
        ],
        sectors: None,
    }
}

// ---------------------------------------------------------------------------
// FakeQuoteProvider
// ---------------------------------------------------------------------------

/// Canned quotes: every symbol trades at 100 with a 1.5% daily change
/// unless overridden. Symbols in `failing` error on quote lookups.
#[derive(Default)]
pub struct FakeQuoteProvider {
    pub quotes: HashMap<String, Quote>,
    pub profiles: HashMap<String, Profile>,
    pub failing: HashSet<String>,
    /// Fail every quote with a missing-key error.
    pub fatal: bool,
    pub quote_log: Mutex<Vec<String>>,
}

impl FakeQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(symbols: &[&str]) -> Self {
        Self {
            failing: symbols.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn quote_count(&self) -> usize {
        self.quote_log.lock().unwrap().len()
    }
}

pub fn default_quote() -> Quote {
    Quote {
        current: Some(100.0),
        percent_change: Some(1.5),
        ..Quote::default()
    }
}

#[async_trait]
impl QuoteProvider for FakeQuoteProvider {
    async fn quote(&self, symbol: &str) -> Result<Quote> {
        self.quote_log.lock().unwrap().push(symbol.to_string());
        if self.fatal {
            return Err(RankingError::MissingApiKey);
        }
        if self.failing.contains(symbol) {
            return Err(RankingError::Api {
                status: 404,
                message: format!("Quote fetch failed for {symbol}: 404 Not Found"),
            });
        }
        Ok(self.quotes.get(symbol).cloned().unwrap_or_else(default_quote))
    }

    async fn profile(&self, symbol: &str) -> Result<Profile> {
        match self.profiles.get(symbol) {
            Some(p) => Ok(p.clone()),
            None => Err(RankingError::Api {
                status: 404,
                message: format!("Profile fetch failed for {symbol}: 404 Not Found"),
            }),
        }
    }
}

pub fn symbols(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("S{i:03}")).collect()
}
