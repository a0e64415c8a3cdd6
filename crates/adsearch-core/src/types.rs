//! Domain types shared by every backend adapter.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub type DocId = String;

/// A field the seed data carries either as one string or as a list of strings.
///
/// Decoding is lenient: `null`/missing is `Absent`, a string is `Scalar`, an
/// array is `Sequence` (non-string elements are stringified, nulls dropped)
/// and any other scalar is kept as its text. Objects carry no usable value and
/// decode to `Absent`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LooseList {
    #[default]
    Absent,
    Scalar(String),
    Sequence(Vec<String>),
}

impl LooseList {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null | Value::Object(_) => Self::Absent,
            Value::String(s) => Self::Scalar(s),
            Value::Bool(b) => Self::Scalar(b.to_string()),
            Value::Number(n) => Self::Scalar(n.to_string()),
            Value::Array(items) => Self::Sequence(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Null => None,
                        Value::String(s) => Some(s),
                        other => Some(other.to_string()),
                    })
                    .collect(),
            ),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The non-blank values, whatever shape they arrived in.
    pub fn normalized(&self) -> Vec<String> {
        let values: Vec<&String> = match self {
            Self::Absent => Vec::new(),
            Self::Scalar(s) => vec![s],
            Self::Sequence(items) => items.iter().collect(),
        };
        values
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Canonical ingestion shape: a `Sequence`, or `Absent` when nothing is left.
    pub fn canonical(&self) -> Self {
        let values = self.normalized();
        if values.is_empty() {
            Self::Absent
        } else {
            Self::Sequence(values)
        }
    }
}

impl<T: Into<String>> From<Vec<T>> for LooseList {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for LooseList {
    fn from(s: &str) -> Self {
        Self::Scalar(s.to_string())
    }
}

impl Serialize for LooseList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Scalar(s) => serializer.serialize_str(s),
            Self::Sequence(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for LooseList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(Value::deserialize(deserializer)?))
    }
}

/// One classified ad.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "thumb_url", alias = "thumbnail_url")]
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "LooseList::is_absent")]
    pub tags: LooseList,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "LooseList::is_absent")]
    pub image_urls: LooseList,
}

impl Record {
    /// Copy with `tags` and `image_urls` rewritten to their canonical shape.
    pub fn normalized(&self) -> Self {
        Self { tags: self.tags.canonical(), image_urls: self.image_urls.canonical(), ..self.clone() }
    }
}

/// The adapter-facing unit of indexing: the record plus its string identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexableDocument {
    pub id: DocId,
    pub payload: Record,
}

impl IndexableDocument {
    pub fn from_record(record: &Record) -> Self {
        Self { id: record.id.to_string(), payload: record.normalized() }
    }

    /// Admission check applied by the search-engine adapters before a document
    /// is submitted. `Err` carries the rejection cause.
    pub fn admit(&self) -> Result<(), String> {
        if self.payload.id < 0 {
            return Err(format!("negative id {}", self.payload.id));
        }
        if self.payload.title.trim().is_empty() && self.payload.content.trim().is_empty() {
            return Err("document has neither title nor content".to_string());
        }
        Ok(())
    }
}

/// A single document that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocFailure {
    pub doc_id: DocId,
    pub cause: String,
}

/// Result of one batch indexing call. No failures means full success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub failed_items: Vec<DocFailure>,
}

impl BulkOutcome {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed_items.is_empty()
    }

    /// Some, but by construction never all, documents failed.
    pub fn is_partial(&self) -> bool {
        !self.failed_items.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.failed_items.len()
    }
}

/// Engine-native hits as they leave an adapter, before normalization.
#[derive(Debug, Clone)]
pub enum RawHits {
    /// Source documents as the cluster returns them under `_source`.
    Sources(Vec<Value>),
    /// Stored-field maps from the embedded index; every field holds an array.
    StoredFields(Vec<Value>),
    /// Rows already mapped column by column.
    Rows(Vec<Record>),
}
