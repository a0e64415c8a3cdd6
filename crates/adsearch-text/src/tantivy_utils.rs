//! adsearch-text
//!
//! Tantivy schema and analyzer for classified ads. Title, content and tags are
//! tokenized for keyword search; the rest of the record is stored only so a
//! hit can be turned back into a full record.
use tantivy::schema::{Field, IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

use adsearch_core::{Error, Result};

pub const AD_TOKENIZER: &str = "ad_text";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("doc_id", STRING | STORED);
	schema_builder.add_i64_field("id", NumericOptions::default().set_indexed().set_stored().set_fast());
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(AD_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field("title", text_options.clone());
	schema_builder.add_text_field("content", text_options.clone());
	schema_builder.add_text_field("tags", text_options);
	schema_builder.add_text_field("thumb_url", STORED);
	schema_builder.add_text_field("image_urls", STORED);
	schema_builder.add_i64_field("updated_at", STORED);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(AD_TOKENIZER, tokenizer);
}

/// Field handles resolved once per opened index.
#[derive(Debug, Clone, Copy)]
pub struct AdFields {
	pub doc_id: Field,
	pub id: Field,
	pub title: Field,
	pub content: Field,
	pub tags: Field,
	pub thumb_url: Field,
	pub image_urls: Field,
	pub updated_at: Field,
}

impl AdFields {
	pub fn resolve(schema: &Schema) -> Result<Self> {
		let field = |name: &str| schema.get_field(name).map_err(|e| Error::unavailable(format!("index schema mismatch: {}", e)));
		Ok(Self {
			doc_id: field("doc_id")?,
			id: field("id")?,
			title: field("title")?,
			content: field("content")?,
			tags: field("tags")?,
			thumb_url: field("thumb_url")?,
			image_urls: field("image_urls")?,
			updated_at: field("updated_at")?,
		})
	}

	pub fn searchable(&self) -> Vec<Field> {
		vec![self.title, self.content, self.tags]
	}
}
