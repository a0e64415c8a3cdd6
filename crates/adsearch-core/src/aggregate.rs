//! Thread-safe collection of per-document indexing failures.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::types::{BulkOutcome, DocFailure};

/// Shared sink for `{doc_id, cause}` pairs. Cloning shares the same sink, so
/// one clone can be handed to each indexing task or callback.
#[derive(Debug, Clone, Default)]
pub struct BulkErrorAggregator {
    failures: Arc<Mutex<Vec<DocFailure>>>,
}

impl BulkErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, doc_id: impl Into<String>, cause: impl std::fmt::Display) {
        self.failures.lock().push(DocFailure { doc_id: doc_id.into(), cause: cause.to_string() });
    }

    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the batch. Failing every one of `submitted` documents is a
    /// systemic problem and escalates to `BackendUnavailable`.
    pub fn finish(self, submitted: usize) -> Result<BulkOutcome> {
        let failed_items = std::mem::take(&mut *self.failures.lock());
        if submitted > 0 && failed_items.len() >= submitted {
            let first = failed_items.first().map(|f| f.cause.as_str()).unwrap_or_default();
            return Err(Error::BackendUnavailable(format!(
                "all {} documents failed to index (first cause: {})",
                submitted, first
            )));
        }
        Ok(BulkOutcome { failed_items })
    }
}
