//! Catalog lookups: the permissible values of a search field.

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request for {key:?} failed: {message}")]
    Transport { key: String, message: String },
    #[error("catalog server answered {status} for {key:?}: {message}")]
    Status {
        key: String,
        status: u16,
        message: String,
    },
    #[error("catalog response for {key:?} could not be decoded: {message}")]
    Decode { key: String, message: String },
    #[error("no catalog for {0:?}")]
    NotFound(String),
}

/// Body of `GET /v0/catalog/{key}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub query_time: Option<String>,
    pub catalog: Vec<String>,
}

/// Error body returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericError {
    pub error: String,
}

/// Source of catalog values. Values come back in server order; callers sort.
pub trait CatalogSource: Send + Sync + 'static {
    fn fetch(&self, key: &str) -> impl Future<Output = Result<Vec<String>, CatalogError>> + Send;
}

/// Sorts catalog values ascending, the order shown in the value menu.
pub fn sorted_catalog(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values
}

/// In-memory catalog, for embedding fixed value sets and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    values: HashMap<String, Vec<String>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }
}

impl CatalogSource for StaticCatalog {
    async fn fetch(&self, key: &str) -> Result<Vec<String>, CatalogError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(key.to_string()))
    }
}

#[cfg(feature = "http")]
pub use http::HttpCatalog;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use tracing::debug;

    use super::{CatalogError, CatalogResponse, CatalogSource, GenericError};
    use crate::query::encode_component;

    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Catalog client for a running hostdb API server.
    #[derive(Debug, Clone)]
    pub struct HttpCatalog {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpCatalog {
        pub fn new(base_url: impl Into<String>) -> Result<Self, CatalogError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .map_err(|err| CatalogError::Transport {
                    key: String::new(),
                    message: err.to_string(),
                })?;
            Ok(Self::with_client(client, base_url))
        }

        pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
            let base_url = base_url.into().trim_end_matches('/').to_string();
            Self { client, base_url }
        }

        pub fn catalog_url(&self, key: &str) -> String {
            format!("{}/v0/catalog/{}", self.base_url, encode_component(key))
        }
    }

    impl CatalogSource for HttpCatalog {
        async fn fetch(&self, key: &str) -> Result<Vec<String>, CatalogError> {
            let url = self.catalog_url(key);
            debug!(%url, "fetching catalog");
            let transport = |err: reqwest::Error| CatalogError::Transport {
                key: key.to_string(),
                message: err.to_string(),
            };
            let response = self.client.get(&url).send().await.map_err(transport)?;
            let status = response.status();
            let body = response.bytes().await.map_err(transport)?;

            if !status.is_success() {
                let message = serde_json::from_slice::<GenericError>(&body)
                    .map(|err| err.error)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
                return Err(CatalogError::Status {
                    key: key.to_string(),
                    status: status.as_u16(),
                    message,
                });
            }

            let payload: CatalogResponse =
                serde_json::from_slice(&body).map_err(|err| CatalogError::Decode {
                    key: key.to_string(),
                    message: err.to_string(),
                })?;
            Ok(payload.catalog)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_catalog_returns_values_or_not_found() {
        let catalog = StaticCatalog::new().with("env", ["prod", "dev"]);
        assert_eq!(catalog.fetch("env").await.unwrap(), vec!["prod", "dev"]);
        assert!(matches!(
            catalog.fetch("rack").await,
            Err(CatalogError::NotFound(key)) if key == "rack"
        ));
    }

    #[test]
    fn response_tolerates_missing_metadata() {
        let payload: CatalogResponse = serde_json::from_str(r#"{"catalog":["b","a"]}"#).unwrap();
        assert_eq!(payload.count, None);
        assert_eq!(sorted_catalog(payload.catalog), vec!["a", "b"]);
    }

    #[test]
    fn response_reads_full_body() {
        let payload: CatalogResponse =
            serde_json::from_str(r#"{"count":2,"query_time":"1.2ms","catalog":["x","y"]}"#)
                .unwrap();
        assert_eq!(payload.count, Some(2));
        assert_eq!(payload.query_time.as_deref(), Some("1.2ms"));
    }

    #[cfg(feature = "http")]
    #[test]
    fn catalog_url_encodes_key() {
        let catalog = HttpCatalog::with_client(reqwest::Client::new(), "http://hostdb.local/");
        assert_eq!(
            catalog.catalog_url("rack name"),
            "http://hostdb.local/v0/catalog/rack%20name"
        );
    }
}
