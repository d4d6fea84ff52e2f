//! External quote provider (Finnhub) used by the fallback pipeline.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::batching::Pacer;
use crate::config::Config;
use crate::error::{RankingError, Result};
use crate::models::{Profile, Quote};
use crate::query_builder::QueryBuilder;

const MAX_ATTEMPTS: u32 = 3;

/// Per-symbol quote and profile lookups.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote>;
    async fn profile(&self, symbol: &str) -> Result<Profile>;
}

/// Finnhub REST client.
#[derive(Debug)]
pub struct FinnhubClient {
    base_url: String,
    api_key: String,
    http: Client,
    pacer: Option<Pacer>,
}

impl FinnhubClient {
    /// Create a client from the session config.
    ///
    /// A missing API key is a hard precondition failure.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .quote_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(RankingError::MissingApiKey)?;
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.quote_base_url.trim_end_matches('/').to_string(),
            api_key,
            http,
            pacer: None,
        })
    }

    /// Space requests out to at most `per_second` calls per second.
    pub fn with_pacing(mut self, per_second: f64) -> Self {
        self.pacer = Some(Pacer::per_second("finnhub", per_second));
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, symbol: &str) -> Result<T> {
        let mut qb = QueryBuilder::new(path);
        qb.param("symbol", symbol).param("token", &self.api_key);
        let url = qb.to_url(&self.base_url)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(pacer) = &self.pacer {
                pacer.wait().await;
            }
            let resp = self.http.get(&url).send().await?;
            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_ATTEMPTS {
                warn!(symbol, path, attempt, "Rate limited by quote provider, backing off");
                tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                continue;
            }
            if !status.is_success() {
                return Err(RankingError::Api {
                    status: status.as_u16(),
                    message: format!(
                        "{} fetch failed for {}: {}",
                        if path.contains("profile") { "Profile" } else { "Quote" },
                        symbol,
                        status
                    ),
                });
            }
            debug!(symbol, path, "Quote provider response");
            return Ok(resp.json().await?);
        }
    }
}

#[async_trait]
impl QuoteProvider for FinnhubClient {
    async fn quote(&self, symbol: &str) -> Result<Quote> {
        self.get("/quote", symbol).await
    }

    async fn profile(&self, symbol: &str) -> Result<Profile> {
        self.get("/stock/profile2", symbol).await
    }
}
