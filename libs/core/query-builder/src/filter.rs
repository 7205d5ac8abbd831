use mongodb::bson::{Bson, Document};
use serde_json::Value;

use crate::raw::{RawQuery, RESERVED_KEYS};
use crate::QueryError;

/// Build a filter document from the non-reserved query parameters.
///
/// Comparison keywords are rewritten structurally: a map key that is
/// exactly `gte`, `gt`, `lte`, or `lt` becomes its `$`-prefixed MongoDB
/// operator, at any nesting depth. Field names merely containing one of
/// those tokens (`gtest`, `weight`) are never touched because keys are
/// whole map entries, not substrings.
///
/// Scalar string values are coerced to the narrowest matching BSON type
/// (i64, then f64, then bool, else string) so `price[gte]=10` compares
/// numerically.
pub fn filter_document(query: &RawQuery) -> Result<Document, QueryError> {
    let mut doc = Document::new();

    for (key, value) in query.iter() {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if key.contains('[') || key.contains(']') {
            return Err(QueryError::Parse(format!(
                "malformed filter key: {key:?}"
            )));
        }
        doc.insert(rewrite_operator(key), to_filter_bson(value)?);
    }

    Ok(doc)
}

fn rewrite_operator(key: &str) -> String {
    match key {
        "gte" => "$gte".to_string(),
        "gt" => "$gt".to_string(),
        "lte" => "$lte".to_string(),
        "lt" => "$lt".to_string(),
        other => other.to_string(),
    }
}

fn to_filter_bson(value: &Value) -> Result<Bson, QueryError> {
    match value {
        Value::Object(map) => {
            let mut doc = Document::new();
            for (key, nested) in map {
                doc.insert(rewrite_operator(key), to_filter_bson(nested)?);
            }
            Ok(Bson::Document(doc))
        }
        Value::Array(items) => Ok(Bson::Array(
            items
                .iter()
                .map(to_filter_bson)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Value::String(s) => Ok(coerce_scalar(s)),
        Value::Bool(b) => Ok(Bson::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Bson::Int64(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Bson::Double(f))
            } else {
                Err(QueryError::Parse(format!("unrepresentable number: {n}")))
            }
        }
        Value::Null => Ok(Bson::Null),
    }
}

fn coerce_scalar(s: &str) -> Bson {
    if let Ok(i) = s.parse::<i64>() {
        Bson::Int64(i)
    } else if let Ok(f) = s.parse::<f64>() {
        Bson::Double(f)
    } else {
        match s {
            "true" => Bson::Boolean(true),
            "false" => Bson::Boolean(false),
            _ => Bson::String(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_reserved_keys_excluded() {
        let raw = RawQuery::parse("search=x&sort=title&limit=5&page=2&fields=title&brand=acme");
        let filter = filter_document(&raw).unwrap();
        assert_eq!(filter, doc! { "brand": "acme" });
    }

    #[test]
    fn test_operator_rewrite_nested() {
        let raw = RawQuery::parse("price[gte]=10&price[lte]=50");
        let filter = filter_document(&raw).unwrap();
        assert_eq!(
            filter,
            doc! { "price": { "$gte": 10_i64, "$lte": 50_i64 } }
        );
    }

    #[test]
    fn test_operator_rewrite_all_tokens() {
        let raw = RawQuery::parse("a[gt]=1&b[lt]=2&c[gte]=3&d[lte]=4");
        let filter = filter_document(&raw).unwrap();
        assert_eq!(filter.get_document("a").unwrap(), &doc! { "$gt": 1_i64 });
        assert_eq!(filter.get_document("b").unwrap(), &doc! { "$lt": 2_i64 });
        assert_eq!(filter.get_document("c").unwrap(), &doc! { "$gte": 3_i64 });
        assert_eq!(filter.get_document("d").unwrap(), &doc! { "$lte": 4_i64 });
    }

    #[test]
    fn test_substring_of_operator_untouched() {
        let raw = RawQuery::parse("gtest=1&price[gtex]=2");
        let filter = filter_document(&raw).unwrap();
        assert_eq!(
            filter,
            doc! { "gtest": 1_i64, "price": { "gtex": 2_i64 } }
        );
    }

    #[test]
    fn test_scalar_coercion() {
        let raw = RawQuery::parse("count=7&ratio=1.5&active=true&name=widget&year=2024x");
        let filter = filter_document(&raw).unwrap();
        assert_eq!(filter.get("count"), Some(&Bson::Int64(7)));
        assert_eq!(filter.get("ratio"), Some(&Bson::Double(1.5)));
        assert_eq!(filter.get("active"), Some(&Bson::Boolean(true)));
        assert_eq!(filter.get("name"), Some(&Bson::String("widget".into())));
        assert_eq!(filter.get("year"), Some(&Bson::String("2024x".into())));
    }

    #[test]
    fn test_repeated_values_become_array() {
        let raw = RawQuery::parse("season=summer&season=winter");
        let filter = filter_document(&raw).unwrap();
        assert_eq!(
            filter.get("season"),
            Some(&Bson::Array(vec![
                Bson::String("summer".into()),
                Bson::String("winter".into()),
            ]))
        );
    }

    #[test]
    fn test_malformed_key_rejected() {
        let raw = RawQuery::parse("price%5Bgte=10");
        let err = filter_document(&raw).unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));
    }

    #[test]
    fn test_empty_query_empty_filter() {
        let filter = filter_document(&RawQuery::parse("")).unwrap();
        assert!(filter.is_empty());
    }
}
