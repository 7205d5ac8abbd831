use async_trait::async_trait;
use query_builder::{PaginationMeta, RawQuery};
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{
    Category, CreateCategory, CreateProduct, Product, UpdateCategory, UpdateProduct,
};

/// Storage abstraction for the catalog domain.
///
/// List operations take the raw request query and return the page of
/// documents together with the pagination metadata computed from the
/// matching total.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_product(&self, input: CreateProduct) -> CatalogResult<Product>;

    async fn get_product(&self, id: Uuid) -> CatalogResult<Option<Product>>;

    async fn list_products(
        &self,
        query: RawQuery,
    ) -> CatalogResult<(Vec<Product>, PaginationMeta)>;

    async fn update_product(&self, id: Uuid, update: UpdateProduct) -> CatalogResult<Product>;

    /// Returns `true` when a document was removed.
    async fn delete_product(&self, id: Uuid) -> CatalogResult<bool>;

    /// Duplicate-title check; `exclude` skips the document being updated.
    async fn exists_product_by_title(
        &self,
        title: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool>;

    async fn count_products_in_category(&self, category_id: Uuid) -> CatalogResult<u64>;

    /// Batch lookup used to embed categories into product responses.
    async fn get_categories_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<Category>>;

    async fn create_category(&self, input: CreateCategory) -> CatalogResult<Category>;

    async fn get_category(&self, id: Uuid) -> CatalogResult<Option<Category>>;

    async fn list_categories(
        &self,
        query: RawQuery,
    ) -> CatalogResult<(Vec<Category>, PaginationMeta)>;

    async fn update_category(&self, id: Uuid, update: UpdateCategory) -> CatalogResult<Category>;

    async fn delete_category(&self, id: Uuid) -> CatalogResult<bool>;

    async fn exists_category_by_name(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool>;
}
