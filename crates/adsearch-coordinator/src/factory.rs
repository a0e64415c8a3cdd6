use std::sync::Arc;

use tracing::info;

use adsearch_cluster::ClusterAdapter;
use adsearch_core::config::{BackendKind, Settings};
use adsearch_core::{BackendAdapter, Result};
use adsearch_sql::SqlAdapter;
use adsearch_text::TantivyAdapter;

/// Build the one adapter the process will use, from `settings.backend`.
pub async fn build_adapter(settings: &Settings) -> Result<Arc<dyn BackendAdapter>> {
    let kind = settings.backend_kind()?;
    info!(backend = ?kind, "building backend adapter");
    let adapter: Arc<dyn BackendAdapter> = match kind {
        BackendKind::Embedded => Arc::new(TantivyAdapter::open(&settings.embedded)?),
        BackendKind::Cluster => Arc::new(ClusterAdapter::new(&settings.cluster)?),
        BackendKind::Relational => Arc::new(SqlAdapter::connect(&settings.relational).await?),
    };
    Ok(adapter)
}
