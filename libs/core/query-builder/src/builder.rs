use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use crate::filter::filter_document;
use crate::params::{projection_document, sort_document, PageParams};
use crate::raw::RawQuery;
use crate::schema::QuerySchema;
use crate::search::search_document;
use crate::QueryError;

/// Pagination metadata computed from a count query that ignores
/// skip/limit, so `total` reflects every matching document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_page: u64,
}

impl PaginationMeta {
    /// `limit` must be >= 1; [`PageParams`] guarantees this.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_page: total.div_ceil(limit),
        }
    }
}

/// Composes a MongoDB `find` from an HTTP query string, stage by stage.
///
/// Stages consume and return the builder; each reads only the original
/// [`RawQuery`], never another stage's output. Search and filter
/// conditions AND-accumulate; within search the fields OR-combine.
///
/// [`execute`](Self::execute) always applies skip/limit (defaults page 1,
/// limit 10 when [`paginate`](Self::paginate) was not invoked), so list
/// queries are never unbounded. [`count_total`](Self::count_total)
/// re-derives search and filter from the same query and schema, keeping
/// `total` consistent with the data path without sharing mutable state.
pub struct QueryBuilder<T: Send + Sync> {
    collection: Collection<T>,
    base_filter: Document,
    raw: RawQuery,
    schema: QuerySchema,
    conditions: Vec<Document>,
    sort: Option<Document>,
    projection: Option<Document>,
    page: Option<PageParams>,
}

impl<T> QueryBuilder<T>
where
    T: DeserializeOwned + Send + Sync,
{
    pub fn new(collection: Collection<T>, raw: RawQuery, schema: QuerySchema) -> Self {
        Self {
            collection,
            base_filter: Document::new(),
            raw,
            schema,
            conditions: Vec::new(),
            sort: None,
            projection: None,
            page: None,
        }
    }

    /// Pre-scope the builder to documents matching `filter`, applied to
    /// both the data and count queries.
    pub fn with_base_filter(mut self, filter: Document) -> Self {
        self.base_filter = filter;
        self
    }

    /// Add a case-insensitive substring condition over the schema's
    /// searchable fields. No-op without a non-blank `search` parameter.
    pub fn search(mut self) -> Self {
        if let Some(term) = self.raw.str_param("search") {
            if let Some(condition) = search_document(term, self.schema.searchable) {
                self.conditions.push(condition);
            }
        }
        self
    }

    /// Add the non-reserved query parameters as filter conditions, with
    /// comparison keywords rewritten to MongoDB operators.
    pub fn filter(mut self) -> Result<Self, QueryError> {
        let condition = checked_filter(&self.raw, &self.schema)?;
        if !condition.is_empty() {
            self.conditions.push(condition);
        }
        Ok(self)
    }

    /// Apply the requested sort, or `created_at` descending by default.
    pub fn sort(mut self) -> Result<Self, QueryError> {
        self.sort = Some(sort_document(&self.raw, &self.schema)?);
        Ok(self)
    }

    /// Apply the requested page/limit (clamped) to the data query.
    pub fn paginate(mut self) -> Self {
        self.page = Some(PageParams::from_query(&self.raw));
        self
    }

    /// Apply the requested inclusion projection, if any.
    pub fn fields(mut self) -> Result<Self, QueryError> {
        self.projection = projection_document(&self.raw, &self.schema)?;
        Ok(self)
    }

    fn combined_filter(&self) -> Document {
        let mut clauses: Vec<Document> = Vec::new();
        if !self.base_filter.is_empty() {
            clauses.push(self.base_filter.clone());
        }
        clauses.extend(self.conditions.iter().cloned());
        and_clauses(clauses)
    }

    /// Filter for the count query, derived from the query string
    /// independently of which stages ran on the data path.
    fn count_filter(&self) -> Result<Document, QueryError> {
        let mut clauses: Vec<Document> = Vec::new();
        if !self.base_filter.is_empty() {
            clauses.push(self.base_filter.clone());
        }
        if let Some(term) = self.raw.str_param("search") {
            if let Some(condition) = search_document(term, self.schema.searchable) {
                clauses.push(condition);
            }
        }
        let condition = checked_filter(&self.raw, &self.schema)?;
        if !condition.is_empty() {
            clauses.push(condition);
        }
        Ok(and_clauses(clauses))
    }

    /// Run the accumulated `find`. Skip/limit are always applied.
    #[instrument(skip(self))]
    pub async fn execute(&self) -> Result<Vec<T>, QueryError> {
        let page = self.page.unwrap_or_default();

        let options = FindOptions::builder()
            .sort(self.sort.clone())
            .projection(self.projection.clone())
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();

        let cursor = self
            .collection
            .find(self.combined_filter())
            .with_options(options)
            .await?;
        let results = cursor.try_collect().await?;
        Ok(results)
    }

    /// Count all matching documents (ignoring skip/limit) and combine
    /// with the parsed page/limit into [`PaginationMeta`].
    #[instrument(skip(self))]
    pub async fn count_total(&self) -> Result<PaginationMeta, QueryError> {
        let total = self.collection.count_documents(self.count_filter()?).await?;
        let page = PageParams::from_query(&self.raw);
        Ok(PaginationMeta::new(page.page, page.limit, total))
    }

    /// Run the data and count queries concurrently.
    pub async fn fetch(&self) -> Result<(Vec<T>, PaginationMeta), QueryError> {
        tokio::try_join!(self.execute(), self.count_total())
    }
}

fn checked_filter(raw: &RawQuery, schema: &QuerySchema) -> Result<Document, QueryError> {
    let condition = filter_document(raw)?;
    for key in condition.keys() {
        schema.check_filterable(key)?;
    }
    Ok(condition)
}

fn and_clauses(mut clauses: Vec<Document>) -> Document {
    match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => doc! { "$and": clauses },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::Client;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Item {
        #[allow(dead_code)]
        title: String,
    }

    const SCHEMA: QuerySchema = QuerySchema::new(
        &["title", "brand", "description", "type"],
        &["title", "price", "created_at"],
        &["title", "price", "brand"],
        &["title", "price", "brand", "season"],
    );

    // Client construction is lazy; no server is contacted until a query
    // runs, so state-only tests work without MongoDB.
    async fn test_builder(query: &str) -> QueryBuilder<Item> {
        let client = Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        let collection = client.database("test").collection::<Item>("items");
        QueryBuilder::new(collection, RawQuery::parse(query), SCHEMA)
    }

    #[tokio::test]
    async fn test_no_stages_defaults() {
        let builder = test_builder("search=wool&price[gte]=10&page=3").await;

        assert!(builder.combined_filter().is_empty());
        assert!(builder.sort.is_none());
        assert!(builder.projection.is_none());

        let page = builder.page.unwrap_or_default();
        assert_eq!(page.skip(), 0);
        assert_eq!(page.limit, 10);
    }

    #[tokio::test]
    async fn test_search_and_filter_and_accumulate() {
        let builder = test_builder("search=wool&brand=acme")
            .await
            .search()
            .filter()
            .unwrap();

        let filter = builder.combined_filter();
        let clauses = filter.get_array("$and").unwrap();
        assert_eq!(clauses.len(), 2);
        assert!(clauses[0].as_document().unwrap().contains_key("$or"));
        assert_eq!(
            clauses[1].as_document().unwrap(),
            &doc! { "brand": "acme" }
        );
    }

    #[tokio::test]
    async fn test_single_condition_not_wrapped() {
        let builder = test_builder("brand=acme").await.search().filter().unwrap();
        assert_eq!(builder.combined_filter(), doc! { "brand": "acme" });
    }

    #[tokio::test]
    async fn test_range_filter_document() {
        let builder = test_builder("price[gte]=10&price[lte]=50&page=1&limit=2")
            .await
            .filter()
            .unwrap()
            .paginate();

        assert_eq!(
            builder.combined_filter(),
            doc! { "price": { "$gte": 10_i64, "$lte": 50_i64 } }
        );
        assert_eq!(builder.page, Some(PageParams { page: 1, limit: 2 }));
    }

    #[tokio::test]
    async fn test_count_filter_ignores_pagination_keys() {
        let builder = test_builder("price[gte]=10&page=7&limit=2").await;
        // No stages ran, yet the count path derives the same conditions
        assert_eq!(
            builder.count_filter().unwrap(),
            doc! { "price": { "$gte": 10_i64 } }
        );
    }

    #[tokio::test]
    async fn test_base_filter_scopes_both_paths() {
        let builder = test_builder("brand=acme")
            .await
            .with_base_filter(doc! { "category": "socks" })
            .filter()
            .unwrap();

        let data_filter = builder.combined_filter();
        let count_filter = builder.count_filter().unwrap();
        assert_eq!(data_filter, count_filter);
        assert_eq!(
            data_filter.get_array("$and").unwrap()[0]
                .as_document()
                .unwrap(),
            &doc! { "category": "socks" }
        );
    }

    #[tokio::test]
    async fn test_filter_unknown_field_rejected() {
        let result = test_builder("password=x").await.filter();
        assert!(matches!(
            result.err(),
            Some(QueryError::UnknownField { kind: "filter", .. })
        ));
    }

    #[tokio::test]
    async fn test_sort_and_fields_staged() {
        let builder = test_builder("sort=-price&fields=title,brand")
            .await
            .sort()
            .unwrap()
            .fields()
            .unwrap();

        assert_eq!(builder.sort, Some(doc! { "price": -1 }));
        assert_eq!(builder.projection, Some(doc! { "title": 1, "brand": 1 }));
    }

    #[test]
    fn test_pagination_meta_total_page() {
        assert_eq!(PaginationMeta::new(2, 5, 12).total_page, 3);
        assert_eq!(PaginationMeta::new(1, 10, 0).total_page, 0);
        assert_eq!(PaginationMeta::new(1, 10, 10).total_page, 1);
        assert_eq!(PaginationMeta::new(1, 10, 11).total_page, 2);
    }

    #[test]
    fn test_pagination_meta_serializes_camel_case() {
        let meta = PaginationMeta::new(2, 5, 12);
        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "page": 2, "limit": 5, "total": 12, "totalPage": 3 })
        );
    }

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_fetch_against_live_collection() {
        let builder = test_builder("page=1&limit=2").await.paginate();
        let (items, meta) = builder.fetch().await.unwrap();
        assert!(items.len() <= 2);
        assert_eq!(meta.limit, 2);
    }
}
