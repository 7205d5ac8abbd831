use mongodb::bson::Document;

use crate::raw::RawQuery;
use crate::schema::QuerySchema;
use crate::QueryError;

/// Upper bound on the per-page document count
pub const MAX_LIMIT: u64 = 100;

const DEFAULT_LIMIT: u64 = 10;

/// Build the sort document from the comma-separated `sort` parameter.
///
/// A `-` prefix sorts descending. Keys are validated against the
/// schema's sortable allow-list. Default: `created_at` descending.
pub fn sort_document(query: &RawQuery, schema: &QuerySchema) -> Result<Document, QueryError> {
    let mut doc = Document::new();

    if let Some(value) = query.str_param("sort") {
        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (field, direction) = match token.strip_prefix('-') {
                Some(field) => (field, -1_i32),
                None => (token, 1_i32),
            };
            schema.check_sortable(field)?;
            doc.insert(field, direction);
        }
    }

    if doc.is_empty() {
        doc.insert("created_at", -1_i32);
    }

    Ok(doc)
}

/// Build an inclusion projection from the comma-separated `fields`
/// parameter, validated against the selectable allow-list.
///
/// `None` (full document) when the parameter is absent or empty.
pub fn projection_document(
    query: &RawQuery,
    schema: &QuerySchema,
) -> Result<Option<Document>, QueryError> {
    let value = match query.str_param("fields") {
        Some(value) => value,
        None => return Ok(None),
    };

    let mut doc = Document::new();
    for field in value.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        schema.check_selectable(field)?;
        doc.insert(field, 1_i32);
    }

    if doc.is_empty() {
        return Ok(None);
    }
    Ok(Some(doc))
}

/// Parsed `page`/`limit` with defaults and clamps applied.
///
/// Non-numeric, missing, zero, and negative values fall back to the
/// defaults (page 1, limit 10); limit is capped at [`MAX_LIMIT`].
/// `limit >= 1` always holds, so the total-page division is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl PageParams {
    pub fn from_query(query: &RawQuery) -> Self {
        Self {
            page: parse_positive(query, "page", 1),
            limit: parse_positive(query, "limit", DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn parse_positive(query: &RawQuery, key: &str, default: u64) -> u64 {
    query
        .str_param(key)
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as u64)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    const SCHEMA: QuerySchema = QuerySchema::new(
        &["title"],
        &["title", "price", "created_at"],
        &["title", "price", "brand"],
        &["title", "price"],
    );

    #[test]
    fn test_sort_default_created_at_desc() {
        let doc = sort_document(&RawQuery::parse(""), &SCHEMA).unwrap();
        assert_eq!(doc, doc! { "created_at": -1 });
    }

    #[test]
    fn test_sort_mixed_directions() {
        let doc = sort_document(&RawQuery::parse("sort=-price,title"), &SCHEMA).unwrap();
        assert_eq!(doc, doc! { "price": -1, "title": 1 });
    }

    #[test]
    fn test_sort_empty_tokens_fall_back_to_default() {
        let doc = sort_document(&RawQuery::parse("sort=,,"), &SCHEMA).unwrap();
        assert_eq!(doc, doc! { "created_at": -1 });
    }

    #[test]
    fn test_sort_unknown_field_rejected() {
        let err = sort_document(&RawQuery::parse("sort=secret"), &SCHEMA).unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { kind: "sort", .. }));
    }

    #[test]
    fn test_projection_absent_is_full_document() {
        let projection = projection_document(&RawQuery::parse(""), &SCHEMA).unwrap();
        assert!(projection.is_none());
    }

    #[test]
    fn test_projection_inclusion() {
        let projection =
            projection_document(&RawQuery::parse("fields=title,price"), &SCHEMA).unwrap();
        assert_eq!(projection, Some(doc! { "title": 1, "price": 1 }));
    }

    #[test]
    fn test_projection_unknown_field_rejected() {
        let err = projection_document(&RawQuery::parse("fields=secret"), &SCHEMA).unwrap_err();
        assert!(matches!(
            err,
            QueryError::UnknownField {
                kind: "projection",
                ..
            }
        ));
    }

    #[test]
    fn test_page_params_defaults() {
        let params = PageParams::from_query(&RawQuery::parse(""));
        assert_eq!(params, PageParams { page: 1, limit: 10 });
        assert_eq!(params.skip(), 0);
    }

    #[test]
    fn test_page_params_skip() {
        let params = PageParams::from_query(&RawQuery::parse("page=2&limit=5"));
        assert_eq!(params, PageParams { page: 2, limit: 5 });
        assert_eq!(params.skip(), 5);
    }

    #[test]
    fn test_page_params_rejects_zero_and_negative() {
        let params = PageParams::from_query(&RawQuery::parse("page=0&limit=-3"));
        assert_eq!(params, PageParams { page: 1, limit: 10 });
    }

    #[test]
    fn test_page_params_rejects_non_numeric() {
        let params = PageParams::from_query(&RawQuery::parse("page=abc&limit=1.5"));
        assert_eq!(params, PageParams { page: 1, limit: 10 });
    }

    #[test]
    fn test_page_params_limit_capped() {
        let params = PageParams::from_query(&RawQuery::parse("limit=5000"));
        assert_eq!(params.limit, MAX_LIMIT);
    }
}
