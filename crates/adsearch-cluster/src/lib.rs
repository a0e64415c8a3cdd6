pub mod bulk;
pub mod client;
pub mod query;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use adsearch_core::config::ClusterSettings;
use adsearch_core::{BackendAdapter, BulkErrorAggregator, BulkOutcome, CancelToken, Error, IndexableDocument, RawHits, Result};

pub use bulk::{BulkHandler, BulkIndexer, BulkIndexerConfig, BulkIndexerStats, BulkItem};
pub use client::ClusterClient;
pub use query::RootQuery;

/// Routes bulk item outcomes into a batch's error aggregator.
struct AggregatingHandler {
    errors: BulkErrorAggregator,
}

impl BulkHandler for AggregatingHandler {
    fn on_success(&self, _doc_id: &str) {}

    fn on_failure(&self, doc_id: &str, cause: &str) {
        warn!(doc_id, cause, "failed to index document");
        self.errors.record(doc_id, cause);
    }
}

pub struct ClusterAdapter {
    client: ClusterClient,
    bulk: BulkIndexerConfig,
    fuzziness: String,
    prefix_length: u32,
    ping_retry: u32,
    ping_wait: Duration,
}

impl ClusterAdapter {
    pub fn new(settings: &ClusterSettings) -> Result<Self> {
        let client = ClusterClient::new(settings)?;
        info!(index = %client.index_name(), "cluster adapter initialized");
        Ok(Self {
            client,
            bulk: BulkIndexerConfig::from_settings(settings),
            fuzziness: settings.fuzziness.clone(),
            prefix_length: settings.prefix_length,
            ping_retry: settings.ping_retry,
            ping_wait: settings.ping_wait(),
        })
    }

    pub fn client(&self) -> &ClusterClient {
        &self.client
    }
}

#[async_trait]
impl BackendAdapter for ClusterAdapter {
    fn name(&self) -> &'static str {
        "elastic"
    }

    async fn index_batch(&self, docs: Vec<IndexableDocument>, cancel: &CancelToken) -> Result<BulkOutcome> {
        let submitted = docs.len();
        let errors = BulkErrorAggregator::new();
        let handler = Arc::new(AggregatingHandler { errors: errors.clone() });
        let indexer = BulkIndexer::new(self.client.clone(), self.bulk.clone(), handler);

        for doc in &docs {
            if cancel.is_cancelled() {
                indexer.abort();
                return Err(Error::Cancelled);
            }
            if let Err(cause) = doc.admit() {
                errors.record(doc.id.clone(), cause);
                continue;
            }
            let item = match BulkItem::index(self.client.index_name(), doc) {
                Ok(item) => item,
                Err(e) => {
                    errors.record(doc.id.clone(), e);
                    continue;
                }
            };
            if let Err(e) = indexer.add(item).await {
                errors.record(doc.id.clone(), e);
            }
        }

        let stats = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            stats = indexer.close() => stats?,
        };
        debug!(?stats, submitted, "bulk indexer closed");
        if stats.num_added > 0 && stats.num_failed == stats.num_added {
            warn!(?stats, "cluster rejected every document in the batch");
        }
        errors.finish(submitted)
    }

    async fn query(&self, keyword: &str, _cancel: &CancelToken) -> Result<RawHits> {
        let query = RootQuery::multi_match(keyword, &self.fuzziness, self.prefix_length);
        let envelope = self.client.search(&query).await?;
        debug!(keyword, total = envelope.total(), took = envelope.took, "cluster search");
        Ok(RawHits::Sources(envelope.into_sources()))
    }

    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }

    async fn ready(&self) -> Result<()> {
        self.client.ping_with_retry(self.ping_retry, self.ping_wait).await
    }

    async fn reset(&self) -> Result<()> {
        self.client.delete_index().await
    }
}
