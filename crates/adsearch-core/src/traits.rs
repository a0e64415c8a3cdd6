use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::types::{BulkOutcome, IndexableDocument, RawHits};

/// One storage/search engine behind the coordinator.
///
/// Implementations own their engine handle and must be safe to call from
/// many tasks at once; the coordinator adds no locking.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Short engine label used in logs and health reports.
    fn name(&self) -> &'static str;

    async fn index_batch(&self, docs: Vec<IndexableDocument>, cancel: &CancelToken) -> Result<BulkOutcome>;

    /// Run one keyword query and return the engine's hits unnormalized.
    async fn query(&self, keyword: &str, cancel: &CancelToken) -> Result<RawHits>;

    async fn ping(&self) -> Result<()>;

    /// Wait until the engine answers. Engines that need start-up grace retry
    /// here; the default is a single ping.
    async fn ready(&self) -> Result<()> {
        self.ping().await
    }

    /// Prepare for a full reseed.
    async fn reset(&self) -> Result<()> {
        Ok(())
    }
}
