//! Query-string builder for backend GET requests.
//!
//! Empty values are dropped rather than sent as `key=`, and list values are
//! sent as repeated keys (`sectors=A&sectors=B`). Builder methods return
//! `&mut Self` for chaining.
//!
//! # Example
//!
//! ```rust
//! use sp_ranking_sdk::QueryBuilder;
//! let (path, params) = QueryBuilder::new("/rankings/latest")
//!     .param("page", 0)
//!     .param_list("sectors", &["Technology", "Energy"])
//!     .param_opt("marketCapMin", None::<f64>)
//!     .build();
//! assert_eq!(path, "/rankings/latest");
//! assert_eq!(params.len(), 3);
//! ```

use std::fmt::Display;

use url::Url;

use crate::error::Result;

/// Builds a path plus ordered query parameters.
pub struct QueryBuilder {
    path: String,
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a builder for the given endpoint path (e.g. `"/rankings/status"`).
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            params: Vec::new(),
        }
    }

    /// Add a parameter. Values that render as an empty string are skipped.
    pub fn param<V: Display>(&mut self, key: &str, value: V) -> &mut Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.params.push((key.to_string(), value));
        }
        self
    }

    /// Add a parameter only when the value is present.
    pub fn param_opt<V: Display>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.param(key, v);
        }
        self
    }

    /// Add one `key=value` pair per element. An empty list adds nothing.
    pub fn param_list<V: Display>(&mut self, key: &str, values: &[V]) -> &mut Self {
        for v in values {
            self.param(key, v);
        }
        self
    }

    /// Return the path and parameter list.
    pub fn build(&self) -> (String, Vec<(String, String)>) {
        (self.path.clone(), self.params.clone())
    }

    /// Resolve against a base URL, percent-encoding every parameter.
    pub fn to_url(&self, base_url: &str) -> Result<String> {
        let mut url = Url::parse(&format!("{}{}", base_url, self.path))?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &self.params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url.to_string())
    }
}
