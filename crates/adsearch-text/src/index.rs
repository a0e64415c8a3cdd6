use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tantivy::directory::MmapDirectory;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use adsearch_core::config::{expand_path, EmbeddedSettings};
use adsearch_core::{BulkErrorAggregator, BulkOutcome, CancelToken, Error, IndexableDocument, Result};

use crate::tantivy_utils::{build_schema, register_tokenizer, AdFields};

fn engine_err(e: impl std::fmt::Display) -> Error {
	Error::unavailable(format!("tantivy: {}", e))
}

/// Embedded full-text index over classified ads.
///
/// Batches take turns on the writer. A batch holds its turn from the first
/// `add_document` until its commit or rollback; within the batch, documents
/// are added in parallel under the read side of the lock.
pub struct TantivyAdapter {
	pub(crate) index: Index,
	pub(crate) reader: IndexReader,
	pub(crate) fields: AdFields,
	writer: Arc<RwLock<IndexWriter>>,
	turn: Arc<Mutex<()>>,
	pub(crate) max_hits: usize,
	workers: usize,
}

impl TantivyAdapter {
	/// Open the index at `settings.index_path`, creating it on first use.
	pub fn open(settings: &EmbeddedSettings) -> Result<Self> {
		let index_dir = expand_path(&settings.index_path);
		Self::open_in_dir(&index_dir, settings)
	}

	pub fn open_in_dir(index_dir: &Path, settings: &EmbeddedSettings) -> Result<Self> {
		std::fs::create_dir_all(index_dir)?;
		let directory = MmapDirectory::open(index_dir).map_err(engine_err)?;
		let index = Index::open_or_create(directory, build_schema()).map_err(engine_err)?;
		info!(path = %index_dir.display(), "opened embedded index");
		Self::from_index(index, settings)
	}

	pub fn in_memory(settings: &EmbeddedSettings) -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()), settings)
	}

	fn from_index(index: Index, settings: &EmbeddedSettings) -> Result<Self> {
		register_tokenizer(&index);
		let fields = AdFields::resolve(&index.schema())?;
		let writer: IndexWriter = index.writer(settings.writer_heap_bytes).map_err(engine_err)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(engine_err)?;
		Ok(Self {
			index,
			reader,
			fields,
			writer: Arc::new(RwLock::new(writer)),
			turn: Arc::new(Mutex::new(())),
			max_hits: settings.max_hits,
			workers: settings.workers.max(1),
		})
	}

	/// Number of committed, searchable documents.
	pub fn num_docs(&self) -> u64 {
		self.reader.searcher().num_docs()
	}

	/// The batch runs on its own task and reaches commit or rollback even if
	/// the caller stops polling.
	pub(crate) async fn index_documents(&self, docs: Vec<IndexableDocument>, cancel: &CancelToken) -> Result<BulkOutcome> {
		let turn = Arc::clone(&self.turn).lock_owned().await;
		let batch = BatchWriter {
			writer: Arc::clone(&self.writer),
			reader: self.reader.clone(),
			fields: self.fields,
			workers: self.workers,
		};
		let cancel = cancel.clone();
		tokio::spawn(async move {
			let _turn = turn;
			batch.write(docs, &cancel).await
		})
		.await
		.map_err(engine_err)?
	}

	pub(crate) async fn clear(&self) -> Result<()> {
		let _turn = self.turn.lock().await;
		let writer = Arc::clone(&self.writer);
		tokio::task::spawn_blocking(move || {
			let mut writer = writer.write();
			writer.delete_all_documents()?;
			writer.commit()
		})
		.await
		.map_err(engine_err)?
		.map_err(engine_err)?;
		self.reader.reload().map_err(engine_err)?;
		info!("cleared embedded index");
		Ok(())
	}
}

struct BatchWriter {
	writer: Arc<RwLock<IndexWriter>>,
	reader: IndexReader,
	fields: AdFields,
	workers: usize,
}

impl BatchWriter {
	async fn write(&self, docs: Vec<IndexableDocument>, cancel: &CancelToken) -> Result<BulkOutcome> {
		let submitted = docs.len();
		let errors = BulkErrorAggregator::new();
		let permits = Arc::new(Semaphore::new(self.workers));
		let mut tasks = JoinSet::new();

		for doc in docs {
			if cancel.is_cancelled() {
				return self.abandon(tasks).await;
			}
			let permit = Arc::clone(&permits).acquire_owned().await.map_err(engine_err)?;
			let writer = Arc::clone(&self.writer);
			let errors = errors.clone();
			let fields = self.fields;
			tasks.spawn_blocking(move || {
				let _permit = permit;
				if let Err(cause) = doc.admit() {
					errors.record(doc.id, cause);
					return;
				}
				let writer = writer.read();
				writer.delete_term(Term::from_field_text(fields.doc_id, &doc.id));
				if let Err(e) = writer.add_document(to_tantivy_doc(&fields, &doc)) {
					errors.record(doc.id, e);
				}
			});
		}
		while let Some(joined) = tasks.join_next().await {
			if let Err(e) = joined {
				warn!(error = %e, "indexing task did not complete");
			}
		}
		if cancel.is_cancelled() {
			return self.abandon(tasks).await;
		}

		let writer = Arc::clone(&self.writer);
		let opstamp = tokio::task::spawn_blocking(move || writer.write().commit())
			.await
			.map_err(engine_err)?
			.map_err(engine_err)?;
		self.reader.reload().map_err(engine_err)?;
		debug!(opstamp, submitted, failed = errors.len(), "committed batch");
		errors.finish(submitted)
	}

	/// Drop pending adds and roll the writer back to the last commit.
	async fn abandon(&self, mut tasks: JoinSet<()>) -> Result<BulkOutcome> {
		tasks.abort_all();
		while tasks.join_next().await.is_some() {}
		let writer = Arc::clone(&self.writer);
		match tokio::task::spawn_blocking(move || writer.write().rollback()).await {
			Ok(Ok(_)) => debug!("rolled back cancelled batch"),
			Ok(Err(e)) => warn!(error = %e, "rollback failed"),
			Err(e) => warn!(error = %e, "rollback task failed"),
		}
		Err(Error::Cancelled)
	}
}

fn to_tantivy_doc(fields: &AdFields, doc: &IndexableDocument) -> TantivyDocument {
	let record = &doc.payload;
	let mut out = TantivyDocument::default();
	out.add_text(fields.doc_id, &doc.id);
	out.add_i64(fields.id, record.id);
	out.add_text(fields.title, &record.title);
	out.add_text(fields.content, &record.content);
	out.add_text(fields.thumb_url, &record.thumbnail_url);
	out.add_i64(fields.updated_at, record.updated_at);
	for tag in record.tags.normalized() {
		out.add_text(fields.tags, &tag);
	}
	for url in record.image_urls.normalized() {
		out.add_text(fields.image_urls, &url);
	}
	out
}
