//! Asynchronous `_bulk` pipeline.
//!
//! Items are queued with [`BulkIndexer::add`] and buffered by a dispatcher
//! task, which hands a request to a worker whenever the buffer reaches
//! `flush_bytes` or the flush interval elapses. Per-item outcomes are reported
//! through a [`BulkHandler`]. [`BulkIndexer::close`] flushes what is left and
//! waits for every in-flight request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use adsearch_core::config::ClusterSettings;
use adsearch_core::{Error, IndexableDocument, Result};

use crate::client::ClusterClient;

#[derive(Debug, Clone)]
pub struct BulkIndexerConfig {
    pub workers: usize,
    pub flush_bytes: usize,
    pub flush_interval: Duration,
}

impl BulkIndexerConfig {
    pub fn from_settings(settings: &ClusterSettings) -> Self {
        Self {
            workers: settings.workers.max(1),
            flush_bytes: settings.flush_bytes.max(1),
            flush_interval: settings.flush_interval(),
        }
    }
}

/// Receives the outcome of every item, possibly from several workers at once.
pub trait BulkHandler: Send + Sync {
    fn on_success(&self, doc_id: &str);
    fn on_failure(&self, doc_id: &str, cause: &str);
}

/// One `index` action: the action line and the source line, both terminated.
#[derive(Debug, Clone)]
pub struct BulkItem {
    pub doc_id: String,
    pub body: Vec<u8>,
}

impl BulkItem {
    pub fn index(index_name: &str, doc: &IndexableDocument) -> Result<Self> {
        let action = json!({"index": {"_index": index_name, "_id": doc.id}});
        let mut body = serde_json::to_vec(&action)?;
        body.push(b'\n');
        serde_json::to_writer(&mut body, &doc.payload)?;
        body.push(b'\n');
        Ok(Self { doc_id: doc.id.clone(), body })
    }
}

#[derive(Debug, Default)]
struct Counters {
    added: AtomicU64,
    flushed: AtomicU64,
    indexed: AtomicU64,
    failed: AtomicU64,
    requests: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkIndexerStats {
    pub num_added: u64,
    pub num_flushed: u64,
    pub num_indexed: u64,
    pub num_failed: u64,
    pub num_requests: u64,
}

impl Counters {
    fn snapshot(&self) -> BulkIndexerStats {
        BulkIndexerStats {
            num_added: self.added.load(Ordering::SeqCst),
            num_flushed: self.flushed.load(Ordering::SeqCst),
            num_indexed: self.indexed.load(Ordering::SeqCst),
            num_failed: self.failed.load(Ordering::SeqCst),
            num_requests: self.requests.load(Ordering::SeqCst),
        }
    }
}

pub struct BulkIndexer {
    queue: mpsc::Sender<BulkItem>,
    dispatcher: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl BulkIndexer {
    pub fn new(client: ClusterClient, config: BulkIndexerConfig, handler: Arc<dyn BulkHandler>) -> Self {
        let (queue, rx) = mpsc::channel(config.workers * 2);
        let counters = Arc::new(Counters::default());
        let dispatcher = tokio::spawn(dispatch(rx, client, config, handler, Arc::clone(&counters)));
        Self { queue, dispatcher, counters }
    }

    pub async fn add(&self, item: BulkItem) -> Result<()> {
        self.queue
            .send(item)
            .await
            .map_err(|_| Error::unavailable("bulk indexer is closed"))?;
        self.counters.added.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn stats(&self) -> BulkIndexerStats {
        self.counters.snapshot()
    }

    /// Flush the remaining buffer and wait for every request to finish.
    pub async fn close(self) -> Result<BulkIndexerStats> {
        let Self { queue, dispatcher, counters } = self;
        drop(queue);
        dispatcher
            .await
            .map_err(|e| Error::unavailable(format!("bulk dispatcher failed: {}", e)))?;
        Ok(counters.snapshot())
    }

    /// Stop without flushing. In-flight requests are abandoned.
    pub fn abort(self) {
        self.dispatcher.abort();
    }
}

#[derive(Default)]
struct Buffer {
    body: Vec<u8>,
    doc_ids: Vec<String>,
}

async fn dispatch(
    mut rx: mpsc::Receiver<BulkItem>,
    client: ClusterClient,
    config: BulkIndexerConfig,
    handler: Arc<dyn BulkHandler>,
    counters: Arc<Counters>,
) {
    let permits = Arc::new(Semaphore::new(config.workers));
    let mut workers = JoinSet::new();
    let mut buffer = Buffer::default();
    let mut ticker = interval_at(Instant::now() + config.flush_interval, config.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            item = rx.recv() => match item {
                Some(item) => {
                    buffer.body.extend_from_slice(&item.body);
                    buffer.doc_ids.push(item.doc_id);
                    if buffer.body.len() >= config.flush_bytes {
                        flush(&mut buffer, &mut workers, &permits, &client, &handler, &counters).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !buffer.doc_ids.is_empty() {
                    debug!(items = buffer.doc_ids.len(), "interval flush");
                    flush(&mut buffer, &mut workers, &permits, &client, &handler, &counters).await;
                }
            }
        }
    }
    flush(&mut buffer, &mut workers, &permits, &client, &handler, &counters).await;
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "bulk worker did not complete");
        }
    }
}

async fn flush(
    buffer: &mut Buffer,
    workers: &mut JoinSet<()>,
    permits: &Arc<Semaphore>,
    client: &ClusterClient,
    handler: &Arc<dyn BulkHandler>,
    counters: &Arc<Counters>,
) {
    if buffer.doc_ids.is_empty() {
        return;
    }
    let batch = std::mem::take(buffer);
    let Ok(permit) = Arc::clone(permits).acquire_owned().await else {
        return;
    };
    let client = client.clone();
    let handler = Arc::clone(handler);
    let counters = Arc::clone(counters);
    workers.spawn(async move {
        let _permit = permit;
        send_batch(&client, batch, handler.as_ref(), &counters).await;
    });
}

async fn send_batch(client: &ClusterClient, batch: Buffer, handler: &dyn BulkHandler, counters: &Counters) {
    counters.requests.fetch_add(1, Ordering::SeqCst);
    counters.flushed.fetch_add(batch.doc_ids.len() as u64, Ordering::SeqCst);
    let response = match client.bulk(batch.body).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, items = batch.doc_ids.len(), "bulk request failed");
            let cause = e.to_string();
            for doc_id in &batch.doc_ids {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                handler.on_failure(doc_id, &cause);
            }
            return;
        }
    };
    for (pos, doc_id) in batch.doc_ids.iter().enumerate() {
        match response.item(pos).map(BulkResponseItem::failure) {
            Some(None) => {
                counters.indexed.fetch_add(1, Ordering::SeqCst);
                handler.on_success(doc_id);
            }
            Some(Some(cause)) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                handler.on_failure(doc_id, &cause);
            }
            None => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                handler.on_failure(doc_id, "missing from bulk response");
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    /// One single-key map per submitted action, e.g. `{"index": {...}}`.
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkResponseItem>>,
}

impl BulkResponse {
    pub fn item(&self, pos: usize) -> Option<&BulkResponseItem> {
        self.items.get(pos).and_then(|m| m.values().next())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponseItem {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<BulkItemError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

impl BulkResponseItem {
    /// `None` when the item was indexed, otherwise the failure cause.
    pub fn failure(&self) -> Option<String> {
        match &self.error {
            Some(err) => Some(format!("{}: {}", err.kind, err.reason)),
            None if self.status >= 300 => Some(format!("status {}", self.status)),
            None => None,
        }
    }
}
