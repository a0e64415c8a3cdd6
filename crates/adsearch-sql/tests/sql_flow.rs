use std::collections::BTreeMap;

use adsearch_core::normalize::normalize;
use adsearch_core::{BackendAdapter, CancelToken, Error, IndexableDocument, LooseList, Record};
use adsearch_sql::SqlAdapter;
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, Value};

fn docs(n: i64) -> Vec<IndexableDocument> {
    (1..=n)
        .map(|id| IndexableDocument::from_record(&Record { id, title: format!("bike {id}"), ..Default::default() }))
        .collect()
}

fn row(id: i64, title: &str, tags: Option<&str>) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([
        ("id", Value::from(id)),
        ("title", Value::from(title.to_string())),
        ("content", Value::from(Some("great condition".to_string()))),
        ("thumb_url", Value::from(None::<String>)),
        ("tags", Value::from(tags.map(str::to_string))),
        ("updated_at", Value::from(1_600_000_000_i64)),
        ("image_urls", Value::from(None::<String>)),
    ])
}

#[tokio::test]
async fn batch_is_one_successful_upsert() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 3 }])
        .into_connection();
    let adapter = SqlAdapter::from_connection(db);
    let outcome = adapter.index_batch(docs(3), &CancelToken::never()).await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn statement_failure_fails_the_whole_batch() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_errors([DbErr::Custom("duplicate key value violates unique constraint".into())])
        .into_connection();
    let adapter = SqlAdapter::from_connection(db);
    let err = adapter.index_batch(docs(2), &CancelToken::never()).await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(_)));
}

#[tokio::test]
async fn empty_batch_never_reaches_the_database() {
    let adapter = SqlAdapter::from_connection(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let err = adapter.index_batch(Vec::new(), &CancelToken::never()).await.unwrap_err();
    assert!(matches!(err, Error::EmptyBatch));
}

#[tokio::test]
async fn rows_map_loosely_into_records() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row(4, "Red bike", Some("[\"bike\",\"red\"]")), row(9, "Bike rack", Some("garage"))]])
        .into_connection();
    let adapter = SqlAdapter::from_connection(db);
    let records = normalize(adapter.query("bike", &CancelToken::never()).await.unwrap()).unwrap();
    assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![4, 9]);
    assert_eq!(records[0].tags, LooseList::Sequence(vec!["bike".into(), "red".into()]));
    assert_eq!(records[1].tags, LooseList::Scalar("garage".into()));
    assert_eq!(records[0].content, "great condition");
    assert!(records[0].image_urls.is_absent());
    assert_eq!(records[0].thumbnail_url, "");
}

#[tokio::test]
async fn operator_only_keyword_is_untranslatable() {
    let adapter = SqlAdapter::from_connection(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let err = adapter.query("& !", &CancelToken::never()).await.unwrap_err();
    assert!(matches!(err, Error::QueryTranslation(_)));
}

#[tokio::test]
async fn query_failure_is_backend_unavailable() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([DbErr::Custom("connection reset".into())])
        .into_connection();
    let adapter = SqlAdapter::from_connection(db);
    let err = adapter.query("bike", &CancelToken::never()).await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(_)));
}
