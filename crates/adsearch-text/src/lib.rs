pub mod tantivy_utils;
pub mod index;
pub mod search;

use async_trait::async_trait;

use adsearch_core::{BackendAdapter, BulkOutcome, CancelToken, Error, IndexableDocument, RawHits, Result};

pub use index::TantivyAdapter;

#[async_trait]
impl BackendAdapter for TantivyAdapter {
	fn name(&self) -> &'static str {
		"tantivy"
	}

	async fn index_batch(&self, docs: Vec<IndexableDocument>, cancel: &CancelToken) -> Result<BulkOutcome> {
		self.index_documents(docs, cancel).await
	}

	async fn query(&self, keyword: &str, _cancel: &CancelToken) -> Result<RawHits> {
		self.search_stored(keyword)
	}

	async fn ping(&self) -> Result<()> {
		self.index.load_metas().map(|_| ()).map_err(|e| Error::unavailable(format!("tantivy: {}", e)))
	}

	async fn reset(&self) -> Result<()> {
		self.clear().await
	}
}
