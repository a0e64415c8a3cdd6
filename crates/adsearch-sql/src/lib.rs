pub mod statement;

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, TransactionTrait};
use tracing::{debug, info, warn};

use adsearch_core::config::RelationalSettings;
use adsearch_core::{BackendAdapter, BulkOutcome, CancelToken, Error, IndexableDocument, RawHits, Result};

use crate::statement::{build_inserts, build_tsquery, row_to_record, search_statement};

fn db_err(e: DbErr) -> Error {
    Error::unavailable(format!("database: {}", e))
}

/// PostgreSQL with `to_tsvector` columns beside the raw ones.
pub struct SqlAdapter {
    db: DatabaseConnection,
}

impl SqlAdapter {
    /// Connect, retrying `connect_retry` times `connect_wait_secs` apart.
    pub async fn connect(settings: &RelationalSettings) -> Result<Self> {
        let mut opt = ConnectOptions::new(settings.dsn.clone());
        opt.max_connections(settings.max_connections).sqlx_logging(false);
        let attempts = settings.connect_retry.max(1);
        let mut attempt = 1;
        loop {
            match Database::connect(opt.clone()).await {
                Ok(db) => {
                    info!(attempt, "connected to relational store");
                    return Ok(Self { db });
                }
                Err(e) if attempt >= attempts => return Err(db_err(e)),
                Err(e) => {
                    warn!(error = %e, retries_left = attempts - attempt, "can't connect to database, retrying");
                    tokio::time::sleep(Duration::from_secs(settings.connect_wait_secs)).await;
                    attempt += 1;
                }
            }
        }
    }

    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BackendAdapter for SqlAdapter {
    fn name(&self) -> &'static str {
        "sql"
    }

    /// All rows go in under one transaction; any statement error fails the
    /// batch as a whole.
    async fn index_batch(&self, docs: Vec<IndexableDocument>, cancel: &CancelToken) -> Result<BulkOutcome> {
        let statements = build_inserts(&docs)?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut rows_affected = 0;
        for stmt in statements {
            rows_affected += txn.execute(stmt).await.map_err(db_err)?.rows_affected();
        }
        txn.commit().await.map_err(db_err)?;
        debug!(submitted = docs.len(), rows_affected, "upserted advertisements");
        Ok(BulkOutcome::success())
    }

    async fn query(&self, keyword: &str, _cancel: &CancelToken) -> Result<RawHits> {
        let tsquery = build_tsquery(keyword)?;
        let rows = self.db.query_all(search_statement(&tsquery)).await.map_err(db_err)?;
        debug!(tsquery = %tsquery, rows = rows.len(), "relational search");
        Ok(RawHits::Rows(rows.iter().filter_map(row_to_record).collect()))
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await.map_err(db_err)
    }
}
