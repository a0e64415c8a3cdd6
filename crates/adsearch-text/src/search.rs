use serde_json::{Map, Value as JsonValue};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::TantivyDocument;
use tracing::debug;

use adsearch_core::{Error, RawHits, Result};

use crate::index::TantivyAdapter;

impl TantivyAdapter {
	/// Keyword search across title, content and tags using the query-string
	/// syntax. Returns at most `max_hits` stored-field maps, best first.
	pub(crate) fn search_stored(&self, keyword: &str) -> Result<RawHits> {
		let query_parser = QueryParser::for_index(&self.index, self.fields.searchable());
		let query = query_parser.parse_query(keyword).map_err(|e| Error::QueryTranslation(e.to_string()))?;
		let searcher = self.reader.searcher();
		let top_docs = searcher
			.search(&query, &TopDocs::with_limit(self.max_hits))
			.map_err(|e| Error::unavailable(format!("tantivy: {}", e)))?;
		debug!(keyword, hits = top_docs.len(), "embedded search");
		let mut hits = Vec::with_capacity(top_docs.len());
		for (_score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(|e| Error::unavailable(format!("tantivy: {}", e)))?;
			hits.push(self.stored_fields(&doc));
		}
		Ok(RawHits::StoredFields(hits))
	}

	/// Every stored field as `name -> [values]`, the shape the normalizer
	/// collapses back into a record.
	fn stored_fields(&self, doc: &TantivyDocument) -> JsonValue {
		let schema = self.index.schema();
		let mut map = Map::new();
		for (field, entry) in schema.fields() {
			if field == self.fields.doc_id || !entry.is_stored() {
				continue;
			}
			let values: Vec<JsonValue> = doc
				.get_all(field)
				.filter_map(|v| {
					if let Some(s) = v.as_str() {
						Some(JsonValue::from(s))
					} else {
						v.as_i64().map(JsonValue::from)
					}
				})
				.collect();
			if !values.is_empty() {
				map.insert(entry.name().to_string(), JsonValue::Array(values));
			}
		}
		JsonValue::Object(map)
	}
}
