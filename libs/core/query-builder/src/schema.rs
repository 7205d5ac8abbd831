use crate::QueryError;

/// Per-resource field allow-lists, declared once and threaded through
/// both the data and count paths.
#[derive(Debug, Clone, Copy)]
pub struct QuerySchema {
    /// Fields the search stage matches against
    pub searchable: &'static [&'static str],
    /// Fields accepted as sort keys
    pub sortable: &'static [&'static str],
    /// Fields accepted in a `fields` projection
    pub selectable: &'static [&'static str],
    /// Top-level fields accepted in filter conditions
    pub filterable: &'static [&'static str],
}

impl QuerySchema {
    pub const fn new(
        searchable: &'static [&'static str],
        sortable: &'static [&'static str],
        selectable: &'static [&'static str],
        filterable: &'static [&'static str],
    ) -> Self {
        Self {
            searchable,
            sortable,
            selectable,
            filterable,
        }
    }

    pub fn check_sortable(&self, field: &str) -> Result<(), QueryError> {
        check(self.sortable, field, "sort")
    }

    pub fn check_selectable(&self, field: &str) -> Result<(), QueryError> {
        check(self.selectable, field, "projection")
    }

    pub fn check_filterable(&self, field: &str) -> Result<(), QueryError> {
        check(self.filterable, field, "filter")
    }
}

fn check(allowed: &[&str], field: &str, kind: &'static str) -> Result<(), QueryError> {
    if allowed.contains(&field) {
        Ok(())
    } else {
        Err(QueryError::UnknownField {
            field: field.to_string(),
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: QuerySchema = QuerySchema::new(
        &["title"],
        &["title", "created_at"],
        &["title", "price"],
        &["title", "price"],
    );

    #[test]
    fn test_check_allowed_field() {
        assert!(SCHEMA.check_sortable("created_at").is_ok());
        assert!(SCHEMA.check_filterable("price").is_ok());
    }

    #[test]
    fn test_check_unknown_field() {
        let err = SCHEMA.check_sortable("password").unwrap_err();
        match err {
            QueryError::UnknownField { field, kind } => {
                assert_eq!(field, "password");
                assert_eq!(kind, "sort");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
