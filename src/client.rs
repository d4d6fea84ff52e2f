//! Backend JSON API client.
//!
//! [`RankingBackend`] is the seam the run controller and the view manager
//! talk to; [`BackendClient`] is the reqwest implementation.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::error::{RankingError, Result};
use crate::export::ExportFormat;
use crate::models::{
    Health, ResultsPage, RunRequest, StartRunResponse, StatusResponse, SymbolCatalog, ViewQuery,
};
use crate::query_builder::QueryBuilder;

/// Operations the dashboard needs from the ranking backend.
#[async_trait]
pub trait RankingBackend: Send + Sync {
    /// `GET /health`.
    async fn health(&self) -> Result<Health>;

    /// `GET /symbols`.
    async fn symbols(&self) -> Result<SymbolCatalog>;

    /// `POST /rankings/run`.
    async fn start_run(&self, request: &RunRequest) -> Result<StartRunResponse>;

    /// `GET /rankings/status?run_id=ID`.
    async fn run_status(&self, run_id: &str) -> Result<StatusResponse>;

    /// `GET /rankings/latest` for the given view tuple.
    async fn latest(&self, query: &ViewQuery) -> Result<ResultsPage>;

    /// URL of a server-generated export, or `None` if the backend cannot
    /// produce one. Never fetched by the SDK itself.
    fn export_url(&self, run_id: &str, format: ExportFormat) -> Option<String>;
}

/// Build the `/rankings/latest` query for a view tuple.
///
/// Unset filter fields are omitted entirely and sectors are repeated.
pub fn latest_query(query: &ViewQuery) -> QueryBuilder {
    let mut qb = QueryBuilder::new("/rankings/latest");
    qb.param("page", query.page.page)
        .param("pageSize", query.page.page_size)
        .param("sortBy", query.sort.key)
        .param("sortDir", query.sort.direction.as_str())
        .param("formula_mode", query.formula_mode)
        .param_list("sectors", query.filters.sectors.as_slice())
        .param_opt("marketCapMin", query.filters.market_cap_min)
        .param_opt("marketCapMax", query.filters.market_cap_max)
        .param_opt("completeness", query.filters.completeness);
    qb
}

/// Build the error surfaced for a non-2xx response.
///
/// JSON bodies contribute their `detail` or `message` field; other bodies
/// are used verbatim. Falls back to `Request failed (<status>)`.
pub fn api_error(status: u16, is_json: bool, body: &str) -> RankingError {
    let fallback = format!("Request failed ({status})");
    let message = if is_json {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                ["detail", "message"]
                    .iter()
                    .find_map(|k| v.get(*k).filter(|d| !d.is_null()).cloned())
            })
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
    } else if body.trim().is_empty() {
        fallback
    } else {
        body.to_string()
    };
    RankingError::Api { status, message }
}

// ---------------------------------------------------------------------------
// BackendClient
// ---------------------------------------------------------------------------

/// reqwest-backed [`RankingBackend`].
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
}

impl BackendClient {
    /// Create a client for `config.backend_url`.
    ///
    /// Fails if no backend URL is configured.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config.backend_url.clone().ok_or_else(|| {
            RankingError::InvalidArgument("backend URL is not configured".into())
        })?;
        let http = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), is_json, &body));
        }
        // 204 and empty bodies decode as an empty object.
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }

    fn get(&self, qb: &QueryBuilder) -> Result<RequestBuilder> {
        let url = qb.to_url(&self.base_url)?;
        debug!(%url, "GET");
        Ok(self.http.get(url))
    }
}

#[async_trait]
impl RankingBackend for BackendClient {
    async fn health(&self) -> Result<Health> {
        self.send(self.get(&QueryBuilder::new("/health"))?).await
    }

    async fn symbols(&self) -> Result<SymbolCatalog> {
        self.send(self.get(&QueryBuilder::new("/symbols"))?).await
    }

    async fn start_run(&self, request: &RunRequest) -> Result<StartRunResponse> {
        let url = format!("{}/rankings/run", self.base_url);
        debug!(%url, formula_mode = %request.formula_mode, "POST");
        self.send(self.http.post(url).json(request)).await
    }

    async fn run_status(&self, run_id: &str) -> Result<StatusResponse> {
        let mut qb = QueryBuilder::new("/rankings/status");
        qb.param("run_id", run_id);
        self.send(self.get(&qb)?).await
    }

    async fn latest(&self, query: &ViewQuery) -> Result<ResultsPage> {
        self.send(self.get(&latest_query(query))?).await
    }

    fn export_url(&self, run_id: &str, format: ExportFormat) -> Option<String> {
        if run_id.is_empty() {
            return None;
        }
        let mut qb = QueryBuilder::new("/rankings/export");
        qb.param("run_id", run_id).param("format", format.as_str());
        qb.to_url(&self.base_url).ok()
    }
}

// ---------------------------------------------------------------------------
// OfflineBackend
// ---------------------------------------------------------------------------

/// Stand-in used when no backend URL is configured.
///
/// Every request fails with the same message so the view and the run
/// controller surface it like any other backend error.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

impl OfflineBackend {
    fn unavailable<T>() -> Result<T> {
        Err(RankingError::InvalidArgument(
            "backend URL is not configured".into(),
        ))
    }
}

#[async_trait]
impl RankingBackend for OfflineBackend {
    async fn health(&self) -> Result<Health> {
        Self::unavailable()
    }

    async fn symbols(&self) -> Result<SymbolCatalog> {
        Self::unavailable()
    }

    async fn start_run(&self, _request: &RunRequest) -> Result<StartRunResponse> {
        Self::unavailable()
    }

    async fn run_status(&self, _run_id: &str) -> Result<StatusResponse> {
        Self::unavailable()
    }

    async fn latest(&self, _query: &ViewQuery) -> Result<ResultsPage> {
        Self::unavailable()
    }

    fn export_url(&self, _run_id: &str, _format: ExportFormat) -> Option<String> {
        None
    }
}
