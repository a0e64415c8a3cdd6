pub mod factory;
pub mod health;

use std::sync::Arc;

use tracing::{debug, info, warn};

use adsearch_core::normalize::normalize;
use adsearch_core::{BackendAdapter, BulkOutcome, CancelToken, Error, IndexableDocument, Record, Result};

pub use factory::build_adapter;
pub use health::{HealthReport, HealthStatus};

/// Single entry point for indexing and search. The adapter is chosen once at
/// construction and every call goes to it.
#[derive(Clone)]
pub struct IndexingCoordinator {
    adapter: Arc<dyn BackendAdapter>,
}

impl IndexingCoordinator {
    pub fn new(adapter: Arc<dyn BackendAdapter>) -> Self {
        info!(backend = adapter.name(), "indexing coordinator ready");
        Self { adapter }
    }

    pub fn backend(&self) -> &'static str {
        self.adapter.name()
    }

    pub async fn index_batch(&self, records: &[Record], cancel: &CancelToken) -> Result<BulkOutcome> {
        if records.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let docs: Vec<IndexableDocument> = records.iter().map(IndexableDocument::from_record).collect();
        let submitted = docs.len();
        let outcome = cancel.run(self.adapter.index_batch(docs, cancel)).await;
        match &outcome {
            Ok(o) if o.is_partial() => warn!(backend = self.backend(), submitted, failed = o.failed_count(), "batch partially indexed"),
            Ok(_) => debug!(backend = self.backend(), submitted, "batch indexed"),
            Err(e) => warn!(backend = self.backend(), submitted, error = %e, "batch failed"),
        }
        outcome
    }

    pub async fn search(&self, keyword: &str, cancel: &CancelToken) -> Result<Vec<Record>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(Error::InvalidQuery("keyword can't be empty".into()));
        }
        let raw = cancel.run(self.adapter.query(keyword, cancel)).await?;
        let records = normalize(raw)?;
        debug!(backend = self.backend(), keyword, hits = records.len(), "search");
        Ok(records)
    }

    pub async fn ping(&self) -> Result<()> {
        self.adapter.ping().await
    }

    pub async fn ready(&self) -> Result<()> {
        self.adapter.ready().await
    }

    pub async fn reset(&self) -> Result<()> {
        self.adapter.reset().await
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport::from_ping(self.backend(), self.ping().await)
    }
}
