use std::io::Cursor;

use adsearch_core::error::Envelope;
use adsearch_core::normalize::normalize;
use adsearch_core::seed::read_records;
use adsearch_core::{BulkErrorAggregator, Error, IndexableDocument, LooseList, RawHits};
use serde_json::json;

#[test]
fn seed_lines_become_canonical_documents() {
    let ndjson = concat!(
        r#"{"id": 10, "title": "Guitar", "content": "acoustic", "tags": "music", "thumb_url": "g.png"}"#, "\n",
        r#"{"id": 11, "title": "Amp", "tags": ["music", " "], "image_urls": "a.jpg"}"#, "\n",
        "{broken\n",
    );
    let data = read_records(Cursor::new(ndjson)).unwrap();
    assert_eq!(data.skipped, 1);

    let docs: Vec<IndexableDocument> = data.records.iter().map(IndexableDocument::from_record).collect();
    assert_eq!(docs[0].id, "10");
    assert_eq!(docs[0].payload.tags, LooseList::Sequence(vec!["music".into()]));
    assert_eq!(docs[1].payload.tags, LooseList::Sequence(vec!["music".into()]));
    assert_eq!(docs[1].payload.image_urls, LooseList::Sequence(vec!["a.jpg".into()]));
}

#[test]
fn normalized_hits_serialize_into_a_success_envelope() {
    let records = normalize(RawHits::Sources(vec![json!({"id": 3, "title": "Lamp", "thumb_url": "l.png"})])).unwrap();
    let v = serde_json::to_value(Envelope::success(&records)).unwrap();
    assert!(v["error"].is_null());
    assert_eq!(v["data"][0]["id"], 3);
    assert_eq!(v["data"][0]["thumb_url"], "l.png");
}

#[test]
fn partial_failures_ride_in_the_envelope_data() {
    let agg = BulkErrorAggregator::new();
    agg.record("7", "mapper_parsing_exception: failed to parse");
    let outcome = agg.finish(5).unwrap();
    let v = serde_json::to_value(Envelope::success(&outcome)).unwrap();
    assert_eq!(v["data"]["failed_items"][0]["doc_id"], "7");

    let err = BulkErrorAggregator::new().finish(0).map(|o| o.is_success());
    assert!(matches!(err, Ok(true)));
    assert_eq!(Error::EmptyBatch.code(), "EmptyBatchError");
}
