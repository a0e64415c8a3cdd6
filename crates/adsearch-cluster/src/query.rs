//! Query DSL requests and search response shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SEARCH_FIELDS: [&str; 3] = ["title", "content", "tags"];

#[derive(Debug, Clone, Serialize)]
pub struct RootQuery {
    pub query: QueryClause,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryClause {
    MultiMatch(MultiMatchQuery),
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiMatchQuery {
    pub query: String,
    pub fields: Vec<String>,
    pub fuzziness: String,
    /// Leading characters excluded from fuzzy expansion.
    pub prefix_length: u32,
}

impl RootQuery {
    pub fn multi_match(keyword: &str, fuzziness: &str, prefix_length: u32) -> Self {
        Self {
            query: QueryClause::MultiMatch(MultiMatchQuery {
                query: keyword.to_string(),
                fields: SEARCH_FIELDS.iter().map(|f| f.to_string()).collect(),
                fuzziness: fuzziness.to_string(),
                prefix_length,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: HitsEnvelope,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    #[serde(default)]
    pub relation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl SearchEnvelope {
    pub fn total(&self) -> u64 {
        self.hits.total.as_ref().map(|t| t.value).unwrap_or(self.hits.hits.len() as u64)
    }

    /// `_source` of every hit in rank order.
    pub fn into_sources(self) -> Vec<Value> {
        self.hits.hits.into_iter().map(|h| h.source).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn multi_match_serializes_to_query_dsl() {
        let q = RootQuery::multi_match("iphone", "AUTO", 2);
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"query": {"multi_match": {
                "query": "iphone",
                "fields": ["title", "content", "tags"],
                "fuzziness": "AUTO",
                "prefix_length": 2
            }}})
        );
    }

    #[test]
    fn search_envelope_keeps_hit_order() {
        let env: SearchEnvelope = serde_json::from_value(json!({
            "took": 3, "timed_out": false,
            "_shards": {"total": 1, "successful": 1, "skipped": 0, "failed": 0},
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "max_score": 1.5,
                "hits": [
                    {"_index": "ads", "_type": "_doc", "_id": "9", "_score": 1.5, "_source": {"id": 9}},
                    {"_index": "ads", "_type": "_doc", "_id": "4", "_score": 0.7, "_source": {"id": 4}}
                ]
            }
        }))
        .unwrap();
        assert_eq!(env.total(), 2);
        assert_eq!(env.into_sources(), vec![json!({"id": 9}), json!({"id": 4})]);
    }
}
