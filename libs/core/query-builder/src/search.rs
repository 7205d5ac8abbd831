use mongodb::bson::{doc, Bson, Document};

/// Build a case-insensitive substring match across the searchable
/// fields: `{"$or": [{field: {"$regex": term, "$options": "i"}}, ...]}`.
///
/// The term is escaped with `regex::escape` so metacharacters match
/// literally instead of acting as a user-supplied pattern. Returns
/// `None` for an empty or whitespace-only term, or an empty field list.
pub fn search_document(term: &str, fields: &[&str]) -> Option<Document> {
    let term = term.trim();
    if term.is_empty() || fields.is_empty() {
        return None;
    }

    let escaped = regex::escape(term);
    let clauses: Vec<Bson> = fields
        .iter()
        .map(|field| doc! { *field: { "$regex": &escaped, "$options": "i" } }.into())
        .collect();

    Some(doc! { "$or": clauses })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["title", "brand", "description", "type"];

    #[test]
    fn test_search_builds_or_over_fields() {
        let document = search_document("wool", FIELDS).unwrap();
        let clauses = document.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 4);
        assert_eq!(
            clauses[0].as_document().unwrap(),
            &doc! { "title": { "$regex": "wool", "$options": "i" } }
        );
        assert_eq!(
            clauses[3].as_document().unwrap(),
            &doc! { "type": { "$regex": "wool", "$options": "i" } }
        );
    }

    #[test]
    fn test_search_escapes_metacharacters() {
        let document = search_document("a.b*c", &["title"]).unwrap();
        let clause = document.get_array("$or").unwrap()[0].as_document().unwrap();
        assert_eq!(
            clause.get_document("title").unwrap().get_str("$regex"),
            Ok(r"a\.b\*c")
        );
    }

    #[test]
    fn test_search_empty_term_is_noop() {
        assert!(search_document("", FIELDS).is_none());
        assert!(search_document("   ", FIELDS).is_none());
    }

    #[test]
    fn test_search_empty_field_list_is_noop() {
        assert!(search_document("wool", &[]).is_none());
    }
}
