//! Query/view state: filters, sort, pagination and the rows on screen.
//!
//! Every change to the view tuple issues exactly one page fetch. Each fetch
//! takes a ticket; only the newest ticket may write `data`, `total`,
//! `loading` or `error`, so a slow stale response can never overwrite a
//! fresher one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::client::RankingBackend;
use crate::config::{Config, PagePolicy};
use crate::error::Result;
use crate::models::{
    check_page_size, Filters, FormulaMode, Health, PageSpec, RankingRow, SortKey, SortSpec,
    ViewQuery,
};

/// What happened to a [`RankingView::load_data`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Rows and total were replaced.
    Applied,
    /// Data was cleared and the message recorded.
    Failed(String),
    /// A newer load was issued before this one returned; its response was dropped.
    Superseded,
}

/// Point-in-time copy of the view state for rendering.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    pub query: ViewQuery,
    pub data: Vec<RankingRow>,
    pub total: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub sectors: Vec<String>,
    pub health: Option<Health>,
}

impl ViewSnapshot {
    pub fn total_pages(&self) -> usize {
        self.query.page.total_pages(self.total)
    }

    pub fn has_next_page(&self) -> bool {
        self.query.page.has_next(self.total)
    }

    pub fn has_prev_page(&self) -> bool {
        self.query.page.has_prev()
    }

    /// 1-based `(from, to)` for "Showing from-to of total".
    pub fn display_range(&self) -> (usize, usize) {
        self.query.page.display_range(self.total)
    }
}

#[derive(Debug, Default)]
struct ViewInner {
    query: ViewQuery,
    data: Vec<RankingRow>,
    total: usize,
    loading: bool,
    error: Option<String>,
    sectors: Vec<String>,
    health: Option<Health>,
    /// The tuple `data` was fetched for.
    loaded_for: Option<ViewQuery>,
}

/// Owns the view tuple and the current result page.
pub struct RankingView {
    backend: Arc<dyn RankingBackend>,
    page_policy: PagePolicy,
    inner: RwLock<ViewInner>,
    latest_ticket: AtomicU64,
}

impl RankingView {
    pub fn new(backend: Arc<dyn RankingBackend>, config: &Config) -> Self {
        let query = ViewQuery {
            page: PageSpec {
                page: 0,
                page_size: config.page_size,
            },
            ..ViewQuery::default()
        };
        Self {
            backend,
            page_policy: config.page_policy,
            inner: RwLock::new(ViewInner {
                query,
                ..ViewInner::default()
            }),
            latest_ticket: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ViewInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ViewInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Accessors ---------------------------------------------------------

    pub fn snapshot(&self) -> ViewSnapshot {
        let inner = self.read();
        ViewSnapshot {
            query: inner.query.clone(),
            data: inner.data.clone(),
            total: inner.total,
            loading: inner.loading,
            error: inner.error.clone(),
            sectors: inner.sectors.clone(),
            health: inner.health.clone(),
        }
    }

    pub fn query(&self) -> ViewQuery {
        self.read().query.clone()
    }

    pub fn rows(&self) -> Vec<RankingRow> {
        self.read().data.clone()
    }

    pub fn total(&self) -> usize {
        self.read().total
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// Sectors for the filter panel; empty means "no sectors available".
    pub fn sectors(&self) -> Vec<String> {
        self.read().sectors.clone()
    }

    pub fn health(&self) -> Option<Health> {
        self.read().health.clone()
    }

    // -- Startup -----------------------------------------------------------

    /// Fetch health and the sector catalog. Neither failure is fatal.
    pub async fn bootstrap(&self) {
        let health = match self.backend.health().await {
            Ok(h) => h,
            Err(e) => {
                debug!(error = %e, "Health check failed");
                Health::unavailable(e.to_string())
            }
        };
        self.write().health = Some(health);

        match self.backend.symbols().await {
            Ok(catalog) => {
                let sectors = catalog.sector_list();
                debug!(sectors = sectors.len(), symbols = catalog.symbols.len(), "Loaded symbol catalog");
                self.write().sectors = sectors;
            }
            Err(e) => warn!(error = %e, "Symbol catalog unavailable, sector list left empty"),
        }
    }

    // -- Loading -----------------------------------------------------------

    /// Fetch the page for the current tuple and replace `data`/`total`.
    ///
    /// On failure `data` is cleared, `total` is zero and the message is
    /// recorded. `loading` is cleared by whichever load is newest, whatever
    /// its outcome.
    pub async fn load_data(&self) -> LoadOutcome {
        let (ticket, query) = {
            let mut inner = self.write();
            let ticket = self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
            inner.loading = true;
            inner.error = None;
            if inner.loaded_for.as_ref() != Some(&inner.query) {
                inner.data.clear();
                inner.total = 0;
                inner.loaded_for = None;
            }
            (ticket, inner.query.clone())
        };
        debug!(
            ticket,
            page = query.page.page,
            page_size = query.page.page_size,
            sort = %query.sort.key,
            formula_mode = %query.formula_mode,
            "Loading results page"
        );

        let result = self.backend.latest(&query).await;

        let mut inner = self.write();
        if self.latest_ticket.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "Dropping superseded results page");
            return LoadOutcome::Superseded;
        }
        inner.loading = false;
        match result {
            Ok(page) => {
                let (rows, total) = page.into_parts();
                debug!(ticket, rows = rows.len(), total, "Applied results page");
                inner.data = rows;
                inner.total = total;
                inner.loaded_for = Some(query);
                LoadOutcome::Applied
            }
            Err(e) => {
                let message = match e.to_string() {
                    m if m.is_empty() => "Failed to load data".to_string(),
                    m => m,
                };
                warn!(ticket, error = %message, "Results page failed to load");
                inner.data.clear();
                inner.total = 0;
                inner.loaded_for = None;
                inner.error = Some(message.clone());
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Re-fetch the unchanged tuple.
    pub async fn refresh(&self) -> LoadOutcome {
        self.load_data().await
    }

    /// Apply any number of changes to the tuple and fetch once.
    ///
    /// Returns `Ok(None)` without fetching when nothing changed. Under
    /// [`PagePolicy::ResetOnQueryChange`] a change to filters, formula mode
    /// or page size moves back to page 0 unless the same update also set
    /// the page explicitly.
    pub async fn update<F>(&self, mutate: F) -> Result<Option<LoadOutcome>>
    where
        F: FnOnce(&mut ViewQuery),
    {
        let changed = {
            let mut inner = self.write();
            let current = &inner.query;
            let mut next = current.clone();
            mutate(&mut next);
            check_page_size(next.page.page_size)?;
            next.filters.validate()?;

            if next == *current {
                false
            } else {
                let reshaped = next.filters != current.filters
                    || next.formula_mode != current.formula_mode
                    || next.page.page_size != current.page.page_size;
                if self.page_policy == PagePolicy::ResetOnQueryChange
                    && reshaped
                    && next.page.page == current.page.page
                {
                    next.page.page = 0;
                }
                inner.query = next;
                true
            }
        };
        if !changed {
            return Ok(None);
        }
        Ok(Some(self.load_data().await))
    }

    pub async fn set_page(&self, page: usize) -> Result<Option<LoadOutcome>> {
        self.update(|q| q.page.page = page).await
    }

    /// Advance one page if the current total allows it.
    pub async fn next_page(&self) -> Result<Option<LoadOutcome>> {
        let snap = self.snapshot();
        if !snap.has_next_page() {
            return Ok(None);
        }
        self.set_page(snap.query.page.page + 1).await
    }

    pub async fn prev_page(&self) -> Result<Option<LoadOutcome>> {
        let page = self.read().query.page.page;
        if page == 0 {
            return Ok(None);
        }
        self.set_page(page - 1).await
    }

    pub async fn set_page_size(&self, page_size: usize) -> Result<Option<LoadOutcome>> {
        self.update(|q| q.page.page_size = page_size).await
    }

    /// Toggle sort: the active key flips direction, a new key starts ascending.
    pub async fn set_sort(&self, key: SortKey) -> Result<Option<LoadOutcome>> {
        self.update(|q| q.sort = q.sort.toggled(key)).await
    }

    pub async fn set_sort_spec(&self, sort: SortSpec) -> Result<Option<LoadOutcome>> {
        self.update(|q| q.sort = sort).await
    }

    pub async fn set_filters(&self, filters: Filters) -> Result<Option<LoadOutcome>> {
        self.update(|q| q.filters = filters).await
    }

    pub async fn set_formula_mode(&self, mode: FormulaMode) -> Result<Option<LoadOutcome>> {
        self.update(|q| q.formula_mode = mode).await
    }

    // -- Local rows --------------------------------------------------------

    /// Show locally computed rows (fallback pipeline) in place of a server page.
    ///
    /// Supersedes any in-flight page fetch.
    pub fn replace_rows(&self, rows: Vec<RankingRow>) {
        let mut inner = self.write();
        self.latest_ticket.fetch_add(1, Ordering::SeqCst);
        inner.total = rows.len();
        inner.data = rows;
        inner.loading = false;
        inner.error = None;
        inner.loaded_for = Some(inner.query.clone());
    }

    /// Record a user-visible error (last message wins).
    pub fn report_error(&self, message: impl Into<String>) {
        self.write().error = Some(message.into());
    }
}
