//! Query-string driven MongoDB query building.
//!
//! Turns an HTTP query string like
//! `?search=wool&price[gte]=10&sort=-created_at&page=2&limit=5&fields=title,price`
//! into a composed `find` (filter + sort + projection + skip/limit) plus a
//! pagination-metadata object whose `total` is computed independently of
//! skip/limit.
//!
//! # Example
//!
//! ```ignore
//! use query_builder::{QueryBuilder, QuerySchema, RawQuery};
//!
//! const PRODUCTS: QuerySchema = QuerySchema::new(
//!     &["title", "brand", "description", "type"],
//!     &["title", "price", "created_at", "updated_at"],
//!     &["title", "price", "brand", "category", "created_at"],
//!     &["title", "price", "brand", "category", "type", "season", "age_group"],
//! );
//!
//! let raw = RawQuery::parse("price[gte]=10&sort=-created_at&page=2");
//! let (products, meta) = QueryBuilder::new(collection, raw, PRODUCTS)
//!     .search()
//!     .filter()?
//!     .sort()?
//!     .paginate()
//!     .fields()?
//!     .fetch()
//!     .await?;
//! ```

mod builder;
mod error;
mod filter;
mod params;
mod raw;
mod schema;
mod search;

pub use builder::{PaginationMeta, QueryBuilder};
pub use error::QueryError;
pub use filter::filter_document;
pub use params::{projection_document, sort_document, PageParams, MAX_LIMIT};
pub use raw::{RawQuery, RESERVED_KEYS};
pub use schema::QuerySchema;
pub use search::search_document;
