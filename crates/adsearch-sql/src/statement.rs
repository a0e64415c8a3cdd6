//! SQL for the `advertisement` table and its full-text columns.

use std::collections::HashSet;

use sea_orm::{DbBackend, QueryResult, Statement, Value};
use tracing::warn;

use adsearch_core::{Error, IndexableDocument, LooseList, Record, Result};

pub const TABLE: &str = "advertisement";

const COLUMNS_PER_ROW: usize = 7;

/// Postgres caps bind parameters at 65535 per statement.
pub const MAX_ROWS_PER_STATEMENT: usize = 65_535 / COLUMNS_PER_ROW;

const TSQUERY_OPERATORS: &[char] = &['&', '|', '!', '(', ')', ':', '*', '<', '>', '\'', '\\'];

pub const SEARCH_SQL: &str = r#"
SELECT
    a.id,
    a.title,
    a.content,
    a.thumb_url,
    a.tags,
    a.updated_at,
    a.image_urls
FROM
    advertisement a
WHERE
    a.content_tokens @@ to_tsquery($1)
    OR a.title_tokens @@ to_tsquery($1)
ORDER BY
    ts_rank(a.title_tokens, to_tsquery($1)) + ts_rank(a.content_tokens, to_tsquery($1)) DESC,
    a.id
"#;

/// Multi-row upsert for `docs`, one statement per `MAX_ROWS_PER_STATEMENT` rows.
///
/// A repeated id keeps only its last occurrence: one `ON CONFLICT DO UPDATE`
/// statement may not touch the same row twice.
pub fn build_inserts(docs: &[IndexableDocument]) -> Result<Vec<Statement>> {
    if docs.is_empty() {
        return Err(Error::EmptyBatch);
    }
    let rows = last_per_id(docs);
    rows.chunks(MAX_ROWS_PER_STATEMENT).map(build_insert).collect()
}

fn last_per_id(docs: &[IndexableDocument]) -> Vec<&IndexableDocument> {
    let mut seen = HashSet::with_capacity(docs.len());
    let mut rows: Vec<&IndexableDocument> = docs.iter().rev().filter(|doc| seen.insert(doc.payload.id)).collect();
    rows.reverse();
    rows
}

fn build_insert(docs: &[&IndexableDocument]) -> Result<Statement> {
    let mut rows = Vec::with_capacity(docs.len());
    let mut values: Vec<Value> = Vec::with_capacity(docs.len() * COLUMNS_PER_ROW);
    for (n, doc) in docs.iter().enumerate() {
        let base = n * COLUMNS_PER_ROW;
        let p = |i: usize| format!("${}", base + i);
        rows.push(format!(
            "({}, {}, {}, {}, {}, {}, {}, to_tsvector({}::text), to_tsvector({}::text))",
            p(1), p(2), p(3), p(4), p(5), p(6), p(7), p(2), p(3)
        ));
        let record = &doc.payload;
        values.push(record.id.into());
        values.push(record.title.clone().into());
        values.push(record.content.clone().into());
        values.push(record.thumbnail_url.clone().into());
        values.push(list_column(&record.tags)?.into());
        values.push(record.updated_at.into());
        values.push(list_column(&record.image_urls)?.into());
    }
    let sql = format!(
        "INSERT INTO {TABLE} (id, title, content, thumb_url, tags, updated_at, image_urls, title_tokens, content_tokens) \
         VALUES {} \
         ON CONFLICT (id) DO UPDATE SET \
         title = EXCLUDED.title, content = EXCLUDED.content, thumb_url = EXCLUDED.thumb_url, \
         tags = EXCLUDED.tags, updated_at = EXCLUDED.updated_at, image_urls = EXCLUDED.image_urls, \
         title_tokens = EXCLUDED.title_tokens, content_tokens = EXCLUDED.content_tokens",
        rows.join(", ")
    );
    Ok(Statement::from_sql_and_values(DbBackend::Postgres, sql, values))
}

/// `tags` / `image_urls` are stored as JSON text; `Absent` is SQL NULL.
fn list_column(list: &LooseList) -> Result<Option<String>> {
    let values = list.normalized();
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(&values)?))
}

/// `"red  bike"` -> `"red & bike"`. Operator characters are removed from each
/// term; a keyword with no term left cannot be expressed.
pub fn build_tsquery(keyword: &str) -> Result<String> {
    let terms: Vec<String> = keyword
        .split_whitespace()
        .map(|term| term.chars().filter(|c| !TSQUERY_OPERATORS.contains(c)).collect::<String>())
        .filter(|term| !term.is_empty())
        .collect();
    if terms.is_empty() {
        return Err(Error::QueryTranslation(format!("no searchable terms in '{}'", keyword)));
    }
    Ok(terms.join(" & "))
}

pub fn search_statement(tsquery: &str) -> Statement {
    Statement::from_sql_and_values(DbBackend::Postgres, SEARCH_SQL, [tsquery.into()])
}

/// Column-by-column mapping that tolerates missing or extra columns. Rows
/// without an id are dropped.
pub fn row_to_record(row: &QueryResult) -> Option<Record> {
    let Ok(id) = row.try_get::<i64>("", "id") else {
        warn!("skipping advertisement row without id");
        return None;
    };
    let text = |col: &str| row.try_get::<Option<String>>("", col).ok().flatten().unwrap_or_default();
    let list = |col: &str| row.try_get::<Option<String>>("", col).ok().flatten().map(parse_list_column).unwrap_or_default();
    Some(Record {
        id,
        title: text("title"),
        content: text("content"),
        thumbnail_url: text("thumb_url"),
        tags: list("tags"),
        updated_at: row.try_get::<Option<i64>>("", "updated_at").ok().flatten().unwrap_or_default(),
        image_urls: list("image_urls"),
    })
}

fn parse_list_column(raw: String) -> LooseList {
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => LooseList::from_value(value),
        Err(_) => LooseList::Scalar(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, title: &str) -> IndexableDocument {
        IndexableDocument::from_record(&Record { id, title: title.into(), tags: "bike".into(), ..Default::default() })
    }

    #[test]
    fn insert_binds_seven_values_per_row() {
        let stmts = build_inserts(&[doc(1, "a"), doc(2, "b")]).unwrap();
        assert_eq!(stmts.len(), 1);
        let stmt = &stmts[0];
        assert!(stmt.sql.contains("($8, $9, $10, $11, $12, $13, $14, to_tsvector($9::text), to_tsvector($10::text))"));
        assert!(stmt.sql.contains("ON CONFLICT (id) DO UPDATE"));
        let values = stmt.values.as_ref().unwrap();
        assert_eq!(values.0.len(), 14);
        assert_eq!(values.0[4], Value::from(Some("[\"bike\"]".to_string())));
        assert_eq!(values.0[6], Value::from(None::<String>));
    }

    #[test]
    fn repeated_id_binds_its_last_occurrence_once() {
        let stmts = build_inserts(&[doc(7, "first"), doc(8, "other"), doc(7, "second")]).unwrap();
        assert_eq!(stmts.len(), 1);
        let values = &stmts[0].values.as_ref().unwrap().0;
        assert_eq!(values.len(), 2 * COLUMNS_PER_ROW);
        assert_eq!(values[0], Value::from(8i64));
        assert_eq!(values[COLUMNS_PER_ROW], Value::from(7i64));
        assert_eq!(values[COLUMNS_PER_ROW + 1], Value::from("second".to_string()));
        assert!(!stmts[0].sql.contains("$15"));
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(build_inserts(&[]), Err(Error::EmptyBatch)));
    }

    #[test]
    fn large_batches_split_under_the_parameter_cap() {
        let docs: Vec<_> = (0..(MAX_ROWS_PER_STATEMENT as i64 + 5)).map(|i| doc(i, "x")).collect();
        let stmts = build_inserts(&docs).unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1].values.as_ref().unwrap().0.len(), 5 * COLUMNS_PER_ROW);
    }

    #[test]
    fn tsquery_joins_terms_and_strips_operators() {
        assert_eq!(build_tsquery("red  bike").unwrap(), "red & bike");
        assert_eq!(build_tsquery("c++ & (rust)").unwrap(), "c++ & rust");
        assert!(matches!(build_tsquery("& | !"), Err(Error::QueryTranslation(_))));
    }

    #[test]
    fn list_columns_accept_json_or_plain_text() {
        assert_eq!(parse_list_column("[\"a\",\"b\"]".into()), LooseList::Sequence(vec!["a".into(), "b".into()]));
        assert_eq!(parse_list_column("solo".into()), LooseList::Scalar("solo".into()));
    }
}
