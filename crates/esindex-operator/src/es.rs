//! Elasticsearch index administration over plain HTTP.
//!
//! Requests go to `<uri>/<index>`, where `uri` is the resolved connection URI
//! (credentials in the userinfo part become basic auth). Server certificates
//! are not verified.

use reqwest::{Method, Url, header::CONTENT_TYPE};
use serde::Serialize;
use tokio::time::Duration;
use tracing::debug;

use crate::{
    crds::esindex::{EsIndex, IndexState},
    error::ReconcileError,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexSettings {
    pub number_of_shards: i64,
    pub number_of_replicas: i64,
}

#[derive(Serialize)]
struct CreateIndex<'a> {
    settings: &'a IndexSettings,
}

/// Raw outcome of a request; non-2xx statuses are not errors at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResult {
    pub status: u16,
    pub body: String,
}

impl RestResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Stand-in for a request that was deliberately not sent.
    pub fn skipped() -> Self {
        Self {
            status: 200,
            body: String::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EsClient {
    http: reqwest::Client,
}

impl EsClient {
    pub fn new(timeout: Duration) -> Result<Self, ReconcileError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { http })
    }

    /// Creates the index, or in bind-only mode just checks that it exists.
    pub async fn create_or_adopt(
        &self,
        uri: &str,
        index: &str,
        settings: IndexSettings,
        bind_only: bool,
    ) -> Result<RestResult, ReconcileError> {
        if bind_only {
            return self.get(uri, index).await;
        }
        let body = CreateIndex {
            settings: &settings,
        };
        self.send(Method::PUT, uri, index, Some(&body)).await
    }

    pub async fn get(&self, uri: &str, index: &str) -> Result<RestResult, ReconcileError> {
        self.send(Method::GET, uri, index, None).await
    }

    pub async fn delete(&self, uri: &str, index: &str) -> Result<RestResult, ReconcileError> {
        self.send(Method::DELETE, uri, index, None).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        index: &str,
        body: Option<&CreateIndex<'_>>,
    ) -> Result<RestResult, ReconcileError> {
        let url = index_url(uri, index)?;
        debug!(%method, index, "elastic search request");
        let mut req = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }
        // The URL carries credentials, keep it out of error messages.
        let resp = req.send().await.map_err(|e| e.without_url())?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| e.without_url())?;
        Ok(RestResult { status, body })
    }
}

pub fn index_url(uri: &str, index: &str) -> Result<Url, ReconcileError> {
    let base = uri.trim().trim_end_matches('/');
    Url::parse(&format!("{}/{}", base, index.trim())).map_err(|_| ReconcileError::InvalidUri)
}

/// Deletion leaves the remote index alone for bind-only resources (they never
/// owned it) and for resources that last ended up `Failed`.
pub fn remote_delete_skipped(idx: &EsIndex) -> bool {
    idx.spec.bind_only || idx.state() == IndexState::Failed
}
