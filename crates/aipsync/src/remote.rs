//! Access to the remote publication API.
//!
//! The synchronizer only sees the [`RemoteSource`] trait. [`HttpRemote`]
//! is the production implementation; tests script their own.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::record::{Category, CategoryRecord, VersionDescriptor};

/// Read-only view of the versioned publication API.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the descriptor of the currently published cycle.
    ///
    /// # Errors
    ///
    /// Returns a network error if the request fails, or a format error if
    /// the body is not a version descriptor.
    async fn fetch_version(&self) -> Result<VersionDescriptor>;

    /// Fetch the raw response for one category.
    ///
    /// The payload is either a bare array of records or an object carrying
    /// the array under `data`; see [`normalize`].
    ///
    /// # Errors
    ///
    /// Returns a network error if the request fails.
    async fn fetch_category(&self, category: Category) -> Result<Value>;
}

/// Turn a category response into typed records.
///
/// Accepts a bare array, or an object exposing the array under `data`.
///
/// # Errors
///
/// Returns a format error for any other shape, or if a record does not
/// decode as `R`.
pub fn normalize<R: CategoryRecord>(payload: Value) -> Result<Vec<R>> {
    let category = R::CATEGORY.as_str();
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::format(
                    category,
                    format!("`data` is {}, expected an array", json_kind(&other)),
                ))
            }
            None => {
                return Err(Error::format(
                    category,
                    "object response has no `data` field",
                ))
            }
        },
        other => {
            return Err(Error::format(
                category,
                format!("response is {}, expected an array", json_kind(&other)),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            serde_json::from_value(item)
                .map_err(|e| Error::format(category, format!("record {position}: {e}")))
        })
        .collect()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// [`RemoteSource`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpRemote {
    /// Build a client for the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::network(&config.base_url, e.to_string()))?;
        Ok(Self { client, config })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &RemoteConfig {
        &self.config
    }

    async fn get_json(&self, path: &str, what: &str) -> Result<Value> {
        let url = self.config.url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::network(&url, e.to_string()))?;

        response.json().await.map_err(|e| {
            if e.is_decode() {
                Error::format(what, format!("body is not JSON: {e}"))
            } else {
                Error::network(&url, e.to_string())
            }
        })
    }
}

#[async_trait]
impl RemoteSource for HttpRemote {
    async fn fetch_version(&self) -> Result<VersionDescriptor> {
        let body = self
            .get_json(&self.config.endpoints.version, "version")
            .await?;
        serde_json::from_value(body).map_err(|e| Error::format("version", e.to_string()))
    }

    async fn fetch_category(&self, category: Category) -> Result<Value> {
        let path = self.config.endpoints.for_category(category);
        self.get_json(path, category.as_str()).await
    }
}
