//! S&P 500 ranking dashboard SDK for Rust.
//!
//! Drives a ranking backend from a client: triggers server-side ranking runs
//! and polls them to completion, keeps the filter/sort/page view state in
//! sync with the results endpoint, and exports the current result set. When
//! no backend run is available, a quote-provider fallback builds rows locally.
//!
//! # Quick start
//!
//! ```no_run
//! use sp_ranking_sdk::{Config, RankingSdk, SortKey};
//!
//! # async fn demo() -> sp_ranking_sdk::Result<()> {
//! let sdk = RankingSdk::builder().config(Config::from_env()).build()?;
//! sdk.start().await;
//!
//! // Sort by market cap, then trigger a run and wait for the refreshed results
//! sdk.view().set_sort(SortKey::MarketCap).await?;
//! sdk.trigger_run().await?;
//! sdk.runs().join().await;
//!
//! println!("{}", sdk.runs().snapshot().status_text());
//! # Ok(())
//! # }
//! ```

pub mod batching;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod fallback;
pub mod models;
pub mod query_builder;
pub mod quotes;
pub mod symbols;
pub mod view;

pub use client::{BackendClient, OfflineBackend, RankingBackend};
pub use config::{Config, PagePolicy};
pub use controller::{RunController, RunSnapshot};
pub use error::{RankingError, Result};
pub use export::{
    CsvSheetWriter, DirectorySink, ExportCoordinator, ExportFormat, ExportOutcome, ExportSink,
    SheetWriter,
};
pub use fallback::{FallbackOutcome, FallbackPipeline};
pub use models::{
    Filters, FormulaMode, RankingRow, RunState, RunStatus, SortDirection, SortKey, SortSpec,
    ViewQuery,
};
pub use query_builder::QueryBuilder;
pub use quotes::{FinnhubClient, QuoteProvider};
pub use view::{LoadOutcome, RankingView, ViewSnapshot};

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

// ---------------------------------------------------------------------------
// RankingSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`RankingSdk`] instance.
///
/// Use [`RankingSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](RankingSdkBuilder::build) to create the SDK.
/// Collaborators that are not set explicitly are derived from the config.
#[derive(Default)]
pub struct RankingSdkBuilder {
    config: Config,
    backend: Option<Arc<dyn RankingBackend>>,
    quote_provider: Option<Arc<dyn QuoteProvider>>,
    export_sink: Option<Arc<dyn ExportSink>>,
    sheet_writer: Option<Arc<dyn SheetWriter>>,
}

impl RankingSdkBuilder {
    /// Replace the whole configuration, e.g. with [`Config::from_env()`].
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the backend base URL. Trailing slashes are stripped; a blank URL
    /// means offline mode.
    pub fn backend_url(mut self, url: &str) -> Self {
        self.config.backend_url = config::normalize_base_url(url);
        self
    }

    /// Set the quote provider API key used by the fallback pipeline.
    pub fn quote_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.quote_api_key = Some(key.into()).filter(|k| !k.trim().is_empty());
        self
    }

    /// Set the HTTP request timeout. Defaults to 20 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the run status poll interval. Defaults to 2 seconds.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the initial page size; must be one of [`config::PAGE_SIZES`].
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn page_policy(mut self, policy: PagePolicy) -> Self {
        self.config.page_policy = policy;
        self
    }

    /// Directory locally generated exports are saved into.
    pub fn export_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.export_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Use a custom backend instead of [`BackendClient`].
    pub fn backend(mut self, backend: Arc<dyn RankingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a custom quote provider instead of [`FinnhubClient`].
    pub fn quote_provider(mut self, provider: Arc<dyn QuoteProvider>) -> Self {
        self.quote_provider = Some(provider);
        self
    }

    pub fn export_sink(mut self, sink: Arc<dyn ExportSink>) -> Self {
        self.export_sink = Some(sink);
        self
    }

    pub fn sheet_writer(mut self, writer: Arc<dyn SheetWriter>) -> Self {
        self.sheet_writer = Some(writer);
        self
    }

    /// Build the SDK.
    ///
    /// Performs no network I/O. Without a backend URL (and no custom backend)
    /// the SDK runs against [`OfflineBackend`].
    pub fn build(self) -> Result<RankingSdk> {
        models::check_page_size(self.config.page_size)?;
        let config = Arc::new(self.config);

        let backend: Arc<dyn RankingBackend> = match self.backend {
            Some(backend) => backend,
            None if config.backend_url.is_some() => Arc::new(BackendClient::new(&config)?),
            None => {
                warn!("No backend URL configured, running offline");
                Arc::new(OfflineBackend)
            }
        };
        let fallback = Arc::new(match self.quote_provider {
            Some(provider) => FallbackPipeline::with_provider(provider, &config),
            None => FallbackPipeline::new(&config),
        });
        let sink = self
            .export_sink
            .unwrap_or_else(|| Arc::new(DirectorySink::new(&config.export_dir)));
        let sheet_writer = self
            .sheet_writer
            .unwrap_or_else(|| Arc::new(CsvSheetWriter));

        let view = Arc::new(RankingView::new(backend.clone(), &config));
        let runs = RunController::new(backend.clone(), view.clone(), &config);
        let exports = ExportCoordinator::new(backend, sink, sheet_writer);

        Ok(RankingSdk {
            config,
            view,
            runs,
            exports,
            fallback,
        })
    }
}

// ---------------------------------------------------------------------------
// RankingSdk
// ---------------------------------------------------------------------------

/// The main entry point for the ranking SDK.
///
/// Owns one [`RankingView`], one [`RunController`] and one
/// [`ExportCoordinator`] for the session. Created via [`RankingSdk::builder()`].
pub struct RankingSdk {
    config: Arc<Config>,
    view: Arc<RankingView>,
    runs: RunController,
    exports: ExportCoordinator,
    fallback: Arc<FallbackPipeline>,
}

impl std::fmt::Debug for RankingSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingSdk")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RankingSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> RankingSdkBuilder {
        RankingSdkBuilder::default()
    }

    // -- Component accessors -----------------------------------------------

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Filter, sort and pagination state plus the rows on screen.
    pub fn view(&self) -> &Arc<RankingView> {
        &self.view
    }

    /// Run lifecycle controller.
    pub fn runs(&self) -> &RunController {
        &self.runs
    }

    pub fn exports(&self) -> &ExportCoordinator {
        &self.exports
    }

    /// Quote-provider fallback. Disabled, with a warning, without an API key.
    pub fn fallback(&self) -> &Arc<FallbackPipeline> {
        &self.fallback
    }

    // -- Session operations ------------------------------------------------

    /// Check health, load the sector list and fetch the first page.
    pub async fn start(&self) -> LoadOutcome {
        self.view.bootstrap().await;
        self.view.load_data().await
    }

    /// Trigger a run with the view's current formula mode and filters.
    pub async fn trigger_run(&self) -> Result<RunState> {
        let query = self.view.query();
        self.runs.trigger_run(query.formula_mode, query.filters).await
    }

    /// Whether an export would do anything right now.
    pub fn can_export(&self) -> bool {
        export::can_export(self.runs.run_id().as_deref(), &self.view.rows())
    }

    pub fn export_csv(&self) -> Result<ExportOutcome> {
        self.export(ExportFormat::Csv)
    }

    pub fn export_excel(&self) -> Result<ExportOutcome> {
        self.export(ExportFormat::Excel)
    }

    fn export(&self, format: ExportFormat) -> Result<ExportOutcome> {
        let run_id = self.runs.run_id();
        let result = self.exports.export(format, run_id.as_deref(), &self.view.rows());
        if let Err(e) = &result {
            self.view.report_error(e.to_string());
        }
        result
    }

    /// Build rows locally from the quote provider and show them in the view.
    ///
    /// Uses [`symbols::SP500_SYMBOLS`] when `symbols` is `None`. The view is
    /// updated after every batch; an aborted pass keeps its partial rows and
    /// records the failure on the view.
    pub async fn run_fallback(&self, symbols: Option<Vec<String>>) -> Result<FallbackOutcome> {
        let symbols = symbols.unwrap_or_else(symbols::default_symbols);
        let formula = self.view.query().formula_mode;
        let view = self.view.clone();

        let outcome = match self
            .fallback
            .run(&symbols, formula, |rows| view.replace_rows(rows.to_vec()))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.view.report_error(e.to_string());
                return Err(e);
            }
        };
        if let Some(message) = &outcome.error {
            self.view.report_error(message.clone());
        }
        info!(
            rows = outcome.rows.len(),
            batches = outcome.batches_done,
            of = outcome.batches_total,
            "Fallback fetch finished"
        );
        Ok(outcome)
    }

    /// Stop polling and cancel every background task of this session.
    pub fn shutdown(&self) {
        self.runs.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for RankingSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RankingSdk(backend={}, run={}, fallback={})",
            self.config.backend_url.as_deref().unwrap_or("offline"),
            self.runs.snapshot().status_text(),
            if self.fallback.is_enabled() { "enabled" } else { "disabled" }
        )
    }
}
