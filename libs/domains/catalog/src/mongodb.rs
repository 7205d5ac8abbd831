use mongodb::bson::{doc, to_bson, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use query_builder::{PaginationMeta, QueryBuilder, RawQuery};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Category, CreateCategory, CreateProduct, Product, UpdateCategory, UpdateProduct,
    CATEGORY_QUERY_SCHEMA, PRODUCT_QUERY_SCHEMA,
};
use crate::repository::CatalogRepository;
use async_trait::async_trait;

const PRODUCTS_COLLECTION: &str = "products";
const CATEGORIES_COLLECTION: &str = "categories";

/// MongoDB-backed catalog repository
#[derive(Debug, Clone)]
pub struct MongoCatalogRepository {
    products: Collection<Product>,
    categories: Collection<Category>,
}

fn id_filter(id: Uuid) -> Document {
    doc! { "_id": to_bson(&id).unwrap_or(Bson::Null) }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == 11000
    )
}

impl MongoCatalogRepository {
    pub fn new(database: &Database) -> Self {
        Self {
            products: database.collection(PRODUCTS_COLLECTION),
            categories: database.collection(CATEGORIES_COLLECTION),
        }
    }

    /// Create the indexes the catalog relies on. Call once at startup.
    pub async fn init_indexes(&self) -> CatalogResult<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.products
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "title": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;

        self.products
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "category": 1, "created_at": -1 })
                    .build(),
            )
            .await?;

        self.categories
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "name": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;

        tracing::info!("Catalog indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for MongoCatalogRepository {
    #[instrument(skip(self, input))]
    async fn create_product(&self, input: CreateProduct) -> CatalogResult<Product> {
        let product = Product::new(input);

        self.products.insert_one(&product).await.map_err(|e| {
            if is_duplicate_key(&e) {
                CatalogError::DuplicateTitle(product.title.clone())
            } else {
                e.into()
            }
        })?;

        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        Ok(self.products.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self, query))]
    async fn list_products(
        &self,
        query: RawQuery,
    ) -> CatalogResult<(Vec<Product>, PaginationMeta)> {
        let builder = QueryBuilder::new(self.products.clone(), query, PRODUCT_QUERY_SCHEMA)
            .search()
            .filter()?
            .sort()?
            .paginate()
            .fields()?;

        Ok(builder.fetch().await?)
    }

    #[instrument(skip(self, update))]
    async fn update_product(&self, id: Uuid, update: UpdateProduct) -> CatalogResult<Product> {
        let mut product = self
            .products
            .find_one(id_filter(id))
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;

        product.apply_update(update);

        self.products
            .replace_one(id_filter(id), &product)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    CatalogError::DuplicateTitle(product.title.clone())
                } else {
                    e.into()
                }
            })?;

        tracing::info!(product_id = %id, "Product updated");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: Uuid) -> CatalogResult<bool> {
        let result = self.products.delete_one(id_filter(id)).await?;
        if result.deleted_count > 0 {
            tracing::info!(product_id = %id, "Product deleted");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    #[instrument(skip(self))]
    async fn exists_product_by_title(
        &self,
        title: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool> {
        let mut filter = doc! { "title": title };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": to_bson(&id).unwrap_or(Bson::Null) });
        }
        let count = self.products.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn count_products_in_category(&self, category_id: Uuid) -> CatalogResult<u64> {
        let filter = doc! { "category": to_bson(&category_id).unwrap_or(Bson::Null) };
        Ok(self.products.count_documents(filter).await?)
    }

    #[instrument(skip(self, ids))]
    async fn get_categories_by_ids(&self, ids: &[Uuid]) -> CatalogResult<Vec<Category>> {
        use futures_util::TryStreamExt;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_values: Vec<Bson> = ids
            .iter()
            .map(|id| to_bson(id).unwrap_or(Bson::Null))
            .collect();
        let cursor = self
            .categories
            .find(doc! { "_id": { "$in": id_values } })
            .await?;

        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self, input))]
    async fn create_category(&self, input: CreateCategory) -> CatalogResult<Category> {
        let category = Category::new(input);

        self.categories.insert_one(&category).await.map_err(|e| {
            if is_duplicate_key(&e) {
                CatalogError::DuplicateName(category.name.clone())
            } else {
                e.into()
            }
        })?;

        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn get_category(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        Ok(self.categories.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self, query))]
    async fn list_categories(
        &self,
        query: RawQuery,
    ) -> CatalogResult<(Vec<Category>, PaginationMeta)> {
        let builder = QueryBuilder::new(self.categories.clone(), query, CATEGORY_QUERY_SCHEMA)
            .search()
            .filter()?
            .sort()?
            .paginate()
            .fields()?;

        Ok(builder.fetch().await?)
    }

    #[instrument(skip(self, update))]
    async fn update_category(&self, id: Uuid, update: UpdateCategory) -> CatalogResult<Category> {
        let mut category = self
            .categories
            .find_one(id_filter(id))
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))?;

        category.apply_update(update);

        self.categories
            .replace_one(id_filter(id), &category)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    CatalogError::DuplicateName(category.name.clone())
                } else {
                    e.into()
                }
            })?;

        tracing::info!(category_id = %id, "Category updated");
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, id: Uuid) -> CatalogResult<bool> {
        let result = self.categories.delete_one(id_filter(id)).await?;
        if result.deleted_count > 0 {
            tracing::info!(category_id = %id, "Category deleted");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    #[instrument(skip(self))]
    async fn exists_category_by_name(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool> {
        let mut filter = doc! { "name": name };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": to_bson(&id).unwrap_or(Bson::Null) });
        }
        let count = self.categories.count_documents(filter).await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_filter_serializes_uuid() {
        let id = Uuid::now_v7();
        let filter = id_filter(id);
        assert!(filter.get("_id").is_some());
        assert_ne!(filter.get("_id"), Some(&Bson::Null));
    }

    // Requires actual MongoDB
    #[tokio::test]
    #[ignore]
    async fn test_product_crud_roundtrip() {
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        let db = client.database("catalog_test");
        let repo = MongoCatalogRepository::new(&db);
        repo.init_indexes().await.unwrap();

        let category = repo
            .create_category(CreateCategory {
                name: format!("cat-{}", Uuid::now_v7()),
                description: None,
            })
            .await
            .unwrap();

        let product = repo
            .create_product(CreateProduct {
                title: format!("prod-{}", Uuid::now_v7()),
                image: "https://example.com/p.jpg".to_string(),
                description: None,
                price: "9.99".to_string(),
                affiliate_link: "https://example.com/buy".to_string(),
                category: category.id,
                brand: None,
                season: vec![],
                age_group: vec![],
                kind: None,
            })
            .await
            .unwrap();

        let fetched = repo.get_product(product.id).await.unwrap();
        assert!(fetched.is_some());

        assert!(repo.delete_product(product.id).await.unwrap());
        assert!(repo.delete_category(category.id).await.unwrap());
    }
}
