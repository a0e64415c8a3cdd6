//! Reshape engine-native hits into [`Record`]s.
//!
//! Both search engines hand back loosely-typed maps rather than domain
//! objects, so hits are marshalled to a generic JSON form and unmarshalled
//! into `Record`. Relational rows are already mapped and pass through.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{RawHits, Record};

/// Stored fields that keep their array shape after collapsing.
const MULTI_VALUED: [&str; 2] = ["tags", "image_urls"];

pub fn normalize(raw: RawHits) -> Result<Vec<Record>> {
    match raw {
        RawHits::Sources(sources) => round_trip(&sources),
        RawHits::StoredFields(fields) => {
            let collapsed: Vec<Value> = fields.into_iter().map(collapse_stored_fields).collect();
            round_trip(&collapsed)
        }
        RawHits::Rows(rows) => Ok(rows),
    }
}

fn round_trip(hits: &[Value]) -> Result<Vec<Record>> {
    let bytes = serde_json::to_vec(hits)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `{"title": ["x"], "tags": ["a", "b"]}` -> `{"title": "x", "tags": ["a", "b"]}`.
pub fn collapse_stored_fields(doc: Value) -> Value {
    let Value::Object(map) = doc else { return doc };
    let collapsed: Map<String, Value> = map
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                Value::Array(mut values) if !MULTI_VALUED.contains(&name.as_str()) => {
                    if values.is_empty() {
                        Value::Null
                    } else {
                        values.swap_remove(0)
                    }
                }
                other => other,
            };
            (name, value)
        })
        .collect();
    Value::Object(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LooseList;
    use serde_json::json;

    #[test]
    fn stored_fields_collapse_to_records() {
        let raw = RawHits::StoredFields(vec![json!({
            "id": [42], "title": ["Red bike"], "content": ["barely used"],
            "thumb_url": ["t.png"], "updated_at": [1600000000],
            "tags": ["bike", "red"], "image_urls": []
        })]);
        let records = normalize(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 42);
        assert_eq!(records[0].title, "Red bike");
        assert_eq!(records[0].tags, LooseList::Sequence(vec!["bike".into(), "red".into()]));
        assert_eq!(records[0].image_urls, LooseList::Sequence(vec![]));
    }

    #[test]
    fn sources_tolerate_loose_fields() {
        let raw = RawHits::Sources(vec![
            json!({"id": 1, "title": "a", "tags": "solo"}),
            json!({"id": 2, "title": "b", "tags": ["x"], "image_urls": null}),
            json!({"id": 3, "title": "c", "extra": {"ignored": true}}),
        ]);
        let records = normalize(raw).unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(records[0].tags, LooseList::Scalar("solo".into()));
        assert!(records[2].tags.is_absent());
    }

    #[test]
    fn garbage_sources_are_decode_errors() {
        let err = normalize(RawHits::Sources(vec![json!("not an object")])).unwrap_err();
        assert_eq!(err.code(), "DecodeError");
    }
}
