//! Thin REST client for an Elasticsearch-7-compatible cluster.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use adsearch_core::config::ClusterSettings;
use adsearch_core::{Error, Result};

use crate::bulk::BulkResponse;
use crate::query::{RootQuery, SearchEnvelope};

/// Requests rotate round-robin over the configured hosts.
#[derive(Clone)]
pub struct ClusterClient {
    http: Client,
    hosts: Arc<Vec<String>>,
    next_host: Arc<AtomicUsize>,
    credentials: Option<(String, String)>,
    index_name: String,
}

impl ClusterClient {
    pub fn new(settings: &ClusterSettings) -> Result<Self> {
        let hosts: Vec<String> = settings
            .hosts
            .iter()
            .map(|h| h.trim().trim_end_matches('/').to_string())
            .filter(|h| !h.is_empty())
            .collect();
        if hosts.is_empty() {
            return Err(Error::InvalidConfig("cluster.hosts must list at least one host".into()));
        }
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| Error::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;
        let credentials = (!settings.username.is_empty()).then(|| (settings.username.clone(), settings.password.clone()));
        debug!(hosts = ?hosts, index = %settings.index_name, "cluster client initialized");
        Ok(Self {
            http,
            hosts: Arc::new(hosts),
            next_host: Arc::new(AtomicUsize::new(0)),
            credentials,
            index_name: settings.index_name.clone(),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let n = self.next_host.fetch_add(1, Ordering::Relaxed);
        let host = &self.hosts[n % self.hosts.len()];
        let builder = self.http.request(method, format!("{}{}", host, path));
        match &self.credentials {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::unavailable(format!("cluster request timed out: {}", e))
            } else if e.is_connect() {
                Error::unavailable(format!("failed to connect to cluster: {}", e))
            } else {
                Error::unavailable(format!("cluster request failed: {}", e))
            }
        })
    }

    async fn body_of(response: Response) -> Result<ClusterResponse> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| Error::unavailable(format!("failed to read cluster response: {}", e)))?;
        Ok(ClusterResponse { status, bytes: bytes.to_vec() })
    }

    /// `GET /_cluster/health`
    pub async fn ping(&self) -> Result<()> {
        let body = Self::body_of(self.send(self.request(Method::GET, "/_cluster/health")).await?).await?;
        if !body.status.is_success() {
            return Err(Error::unavailable(format!("cluster health returned {}: {}", body.status, body.text())));
        }
        Ok(())
    }

    /// Ping up to `retries` times, sleeping `wait` between attempts. Returns
    /// the last error once attempts are exhausted.
    pub async fn ping_with_retry(&self, retries: u32, wait: Duration) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.ping().await {
                Ok(()) => {
                    debug!(attempt, "cluster answered ping");
                    return Ok(());
                }
                Err(e) if attempt >= retries.max(1) => return Err(e),
                Err(e) => {
                    warn!(error = %e, retries_left = retries - attempt, "can't ping cluster, waiting {:?}", wait);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }

    /// `DELETE /{index}?ignore_unavailable=true`. A missing index is not an error.
    pub async fn delete_index(&self) -> Result<()> {
        let path = format!("/{}?ignore_unavailable=true", self.index_name);
        let body = Self::body_of(self.send(self.request(Method::DELETE, &path)).await?).await?;
        if body.status.is_success() || body.status == StatusCode::NOT_FOUND {
            debug!(index = %self.index_name, status = %body.status, "deleted index");
            return Ok(());
        }
        Err(Error::unavailable(format!("cannot delete index {}: {} {}", self.index_name, body.status, body.text())))
    }

    /// `POST /{index}/_search?track_total_hits=true`. A 400 from the cluster
    /// means it could not interpret the query.
    pub async fn search(&self, query: &RootQuery) -> Result<SearchEnvelope> {
        let path = format!("/{}/_search?track_total_hits=true", self.index_name);
        let body = Self::body_of(self.send(self.request(Method::POST, &path).json(query)).await?).await?;
        if body.status == StatusCode::BAD_REQUEST {
            return Err(Error::QueryTranslation(body.text()));
        }
        if !body.status.is_success() {
            return Err(Error::unavailable(format!("search returned {}: {}", body.status, body.text())));
        }
        Ok(serde_json::from_slice(&body.bytes)?)
    }

    /// `POST /_bulk` with an NDJSON body.
    pub async fn bulk(&self, ndjson: Vec<u8>) -> Result<BulkResponse> {
        let builder = self
            .request(Method::POST, "/_bulk")
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(ndjson);
        let body = Self::body_of(self.send(builder).await?).await?;
        if !body.status.is_success() {
            return Err(Error::unavailable(format!("bulk request returned {}: {}", body.status, body.text())));
        }
        Ok(serde_json::from_slice(&body.bytes)?)
    }
}

/// Status plus fully-read body of one cluster response.
struct ClusterResponse {
    status: StatusCode,
    bytes: Vec<u8>,
}

impl ClusterResponse {
    fn text(&self) -> String {
        if self.bytes.is_empty() {
            "No response body".to_string()
        } else {
            String::from_utf8_lossy(&self.bytes).into_owned()
        }
    }
}
