use std::sync::Arc;

use query_builder::RawQuery;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    Category, CreateCategory, CreateProduct, ListResponse, Product, ProductWithCategory,
    UpdateCategory, UpdateProduct,
};
use crate::repository::CatalogRepository;

/// Business logic for the catalog domain.
///
/// Owns validation, duplicate checks and category resolution; storage
/// details stay behind [`CatalogRepository`].
pub struct CatalogService<R: CatalogRepository> {
    repository: Arc<R>,
}

impl<R: CatalogRepository> Clone for CatalogService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    async fn ensure_category_exists(&self, id: Uuid) -> CatalogResult<()> {
        match self.repository.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::Validation(format!(
                "Category {id} does not exist"
            ))),
        }
    }

    /// Resolve each product's category in one batch query.
    async fn embed_categories(
        &self,
        products: Vec<Product>,
    ) -> CatalogResult<Vec<ProductWithCategory>> {
        let mut ids: Vec<Uuid> = products.iter().map(|p| p.category).collect();
        ids.sort_unstable();
        ids.dedup();

        let categories = self.repository.get_categories_by_ids(&ids).await?;
        let by_id: std::collections::HashMap<Uuid, Category> =
            categories.into_iter().map(|c| (c.id, c)).collect();

        Ok(products
            .into_iter()
            .map(|p| {
                let category = by_id.get(&p.category).cloned();
                ProductWithCategory::new(p, category)
            })
            .collect())
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(&self, input: CreateProduct) -> CatalogResult<ProductWithCategory> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let category = self
            .repository
            .get_category(input.category)
            .await?
            .ok_or_else(|| {
                CatalogError::Validation(format!("Category {} does not exist", input.category))
            })?;

        if self
            .repository
            .exists_product_by_title(&input.title, None)
            .await?
        {
            return Err(CatalogError::DuplicateTitle(input.title));
        }

        let product = self.repository.create_product(input).await?;
        Ok(ProductWithCategory::new(product, Some(category)))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> CatalogResult<ProductWithCategory> {
        let product = self
            .repository
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;

        let category = self.repository.get_category(product.category).await?;
        Ok(ProductWithCategory::new(product, category))
    }

    #[instrument(skip(self, query))]
    pub async fn list_products(
        &self,
        query: RawQuery,
    ) -> CatalogResult<ListResponse<ProductWithCategory>> {
        let (products, meta) = self.repository.list_products(query).await?;
        let data = self.embed_categories(products).await?;
        Ok(ListResponse { data, meta })
    }

    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        id: Uuid,
        update: UpdateProduct,
    ) -> CatalogResult<ProductWithCategory> {
        update
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        if self.repository.get_product(id).await?.is_none() {
            return Err(CatalogError::ProductNotFound(id));
        }

        if let Some(category) = update.category {
            self.ensure_category_exists(category).await?;
        }

        if let Some(ref title) = update.title {
            if self
                .repository
                .exists_product_by_title(title, Some(id))
                .await?
            {
                return Err(CatalogError::DuplicateTitle(title.clone()));
            }
        }

        let product = self.repository.update_product(id, update).await?;
        let category = self.repository.get_category(product.category).await?;
        Ok(ProductWithCategory::new(product, category))
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> CatalogResult<()> {
        if self.repository.delete_product(id).await? {
            Ok(())
        } else {
            Err(CatalogError::ProductNotFound(id))
        }
    }

    #[instrument(skip(self, input))]
    pub async fn create_category(&self, input: CreateCategory) -> CatalogResult<Category> {
        input
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        if self
            .repository
            .exists_category_by_name(&input.name, None)
            .await?
        {
            return Err(CatalogError::DuplicateName(input.name));
        }

        self.repository.create_category(input).await
    }

    #[instrument(skip(self))]
    pub async fn get_category(&self, id: Uuid) -> CatalogResult<Category> {
        self.repository
            .get_category(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))
    }

    #[instrument(skip(self, query))]
    pub async fn list_categories(
        &self,
        query: RawQuery,
    ) -> CatalogResult<ListResponse<Category>> {
        let (data, meta) = self.repository.list_categories(query).await?;
        Ok(ListResponse { data, meta })
    }

    #[instrument(skip(self, update))]
    pub async fn update_category(
        &self,
        id: Uuid,
        update: UpdateCategory,
    ) -> CatalogResult<Category> {
        update
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        if self.repository.get_category(id).await?.is_none() {
            return Err(CatalogError::CategoryNotFound(id));
        }

        if let Some(ref name) = update.name {
            if self
                .repository
                .exists_category_by_name(name, Some(id))
                .await?
            {
                return Err(CatalogError::DuplicateName(name.clone()));
            }
        }

        self.repository.update_category(id, update).await
    }

    /// Deleting a category is refused while products still reference it.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> CatalogResult<()> {
        if self.repository.get_category(id).await?.is_none() {
            return Err(CatalogError::CategoryNotFound(id));
        }

        let in_use = self.repository.count_products_in_category(id).await?;
        if in_use > 0 {
            return Err(CatalogError::CategoryInUse(id));
        }

        if self.repository.delete_category(id).await? {
            Ok(())
        } else {
            Err(CatalogError::CategoryNotFound(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockCatalogRepository;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn sample_category() -> Category {
        Category {
            id: Uuid::now_v7(),
            name: "Shoes".to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_product(category: Uuid) -> Product {
        Product::new(CreateProduct {
            title: "Wool socks".to_string(),
            image: "https://example.com/socks.jpg".to_string(),
            description: None,
            price: "12.99".to_string(),
            affiliate_link: "https://example.com/buy".to_string(),
            category,
            brand: None,
            season: vec![],
            age_group: vec![],
            kind: None,
        })
    }

    #[tokio::test]
    async fn test_create_product_rejects_missing_category() {
        let category_id = Uuid::now_v7();
        let mut repo = MockCatalogRepository::new();
        repo.expect_get_category()
            .with(eq(category_id))
            .returning(|_| Ok(None));

        let service = CatalogService::new(repo);
        let result = service
            .create_product(CreateProduct {
                title: "Wool socks".to_string(),
                image: "https://example.com/socks.jpg".to_string(),
                description: None,
                price: "12.99".to_string(),
                affiliate_link: "https://example.com/buy".to_string(),
                category: category_id,
                brand: None,
                season: vec![],
                age_group: vec![],
                kind: None,
            })
            .await;

        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_product_rejects_duplicate_title() {
        let category = sample_category();
        let category_id = category.id;
        let mut repo = MockCatalogRepository::new();
        repo.expect_get_category()
            .returning(move |_| Ok(Some(category.clone())));
        repo.expect_exists_product_by_title()
            .with(eq("Wool socks"), eq(None::<Uuid>))
            .returning(|_, _| Ok(true));

        let service = CatalogService::new(repo);
        let result = service
            .create_product(CreateProduct {
                title: "Wool socks".to_string(),
                image: "https://example.com/socks.jpg".to_string(),
                description: None,
                price: "12.99".to_string(),
                affiliate_link: "https://example.com/buy".to_string(),
                category: category_id,
                brand: None,
                season: vec![],
                age_group: vec![],
                kind: None,
            })
            .await;

        assert!(matches!(result, Err(CatalogError::DuplicateTitle(_))));
    }

    #[tokio::test]
    async fn test_create_product_returns_embedded_category() {
        let category = sample_category();
        let category_id = category.id;
        let category_clone = category.clone();

        let mut repo = MockCatalogRepository::new();
        repo.expect_get_category()
            .with(eq(category_id))
            .returning(move |_| Ok(Some(category_clone.clone())));
        repo.expect_exists_product_by_title()
            .returning(|_, _| Ok(false));
        repo.expect_create_product()
            .returning(|input| Ok(Product::new(input)));

        let service = CatalogService::new(repo);
        let created = service
            .create_product(CreateProduct {
                title: "Wool socks".to_string(),
                image: "https://example.com/socks.jpg".to_string(),
                description: None,
                price: "12.99".to_string(),
                affiliate_link: "https://example.com/buy".to_string(),
                category: category_id,
                brand: None,
                season: vec![],
                age_group: vec![],
                kind: None,
            })
            .await
            .unwrap();

        assert_eq!(created.category.map(|c| c.id), Some(category_id));
    }

    #[tokio::test]
    async fn test_update_product_returns_embedded_category() {
        let category = sample_category();
        let product = sample_product(category.id);
        let product_id = product.id;
        let updated = product.clone();
        let category_clone = category.clone();

        let mut repo = MockCatalogRepository::new();
        repo.expect_get_product()
            .returning(move |_| Ok(Some(product.clone())));
        repo.expect_update_product()
            .returning(move |_, _| Ok(updated.clone()));
        repo.expect_get_category()
            .returning(move |_| Ok(Some(category_clone.clone())));

        let service = CatalogService::new(repo);
        let result = service
            .update_product(
                product_id,
                UpdateProduct {
                    price: Some("14.99".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.category.map(|c| c.id), Some(category.id));
    }

    #[tokio::test]
    async fn test_get_product_embeds_category() {
        let category = sample_category();
        let product = sample_product(category.id);
        let product_id = product.id;
        let category_clone = category.clone();

        let mut repo = MockCatalogRepository::new();
        repo.expect_get_product()
            .with(eq(product_id))
            .returning(move |_| Ok(Some(product.clone())));
        repo.expect_get_category()
            .returning(move |_| Ok(Some(category_clone.clone())));

        let service = CatalogService::new(repo);
        let result = service.get_product(product_id).await.unwrap();
        assert_eq!(result.category.map(|c| c.id), Some(category.id));
    }

    #[tokio::test]
    async fn test_get_product_not_found() {
        let mut repo = MockCatalogRepository::new();
        repo.expect_get_product().returning(|_| Ok(None));

        let service = CatalogService::new(repo);
        let result = service.get_product(Uuid::now_v7()).await;
        assert!(matches!(result, Err(CatalogError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_products_resolves_categories_in_batch() {
        let category = sample_category();
        let products = vec![sample_product(category.id), sample_product(category.id)];
        let meta = query_builder::PaginationMeta::new(1, 10, 2);
        let category_clone = category.clone();

        let mut repo = MockCatalogRepository::new();
        repo.expect_list_products()
            .returning(move |_| Ok((products.clone(), meta.clone())));
        repo.expect_get_categories_by_ids()
            .withf(move |ids| ids.len() == 1)
            .returning(move |_| Ok(vec![category_clone.clone()]));

        let service = CatalogService::new(repo);
        let response = service.list_products(RawQuery::parse("")).await.unwrap();
        assert_eq!(response.data.len(), 2);
        assert!(response.data.iter().all(|p| p.category.is_some()));
    }

    #[tokio::test]
    async fn test_delete_category_in_use() {
        let category = sample_category();
        let category_id = category.id;

        let mut repo = MockCatalogRepository::new();
        repo.expect_get_category()
            .returning(move |_| Ok(Some(category.clone())));
        repo.expect_count_products_in_category()
            .with(eq(category_id))
            .returning(|_| Ok(3));

        let service = CatalogService::new(repo);
        let result = service.delete_category(category_id).await;
        assert!(matches!(result, Err(CatalogError::CategoryInUse(_))));
    }

    #[tokio::test]
    async fn test_update_product_duplicate_title_excludes_self() {
        let category = sample_category();
        let product = sample_product(category.id);
        let product_id = product.id;

        let mut repo = MockCatalogRepository::new();
        repo.expect_get_product()
            .returning(move |_| Ok(Some(product.clone())));
        repo.expect_exists_product_by_title()
            .with(eq("Other title"), eq(Some(product_id)))
            .returning(|_, _| Ok(true));

        let service = CatalogService::new(repo);
        let result = service
            .update_product(
                product_id,
                UpdateProduct {
                    title: Some("Other title".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(CatalogError::DuplicateTitle(_))));
    }

    #[tokio::test]
    async fn test_delete_product_not_found() {
        let mut repo = MockCatalogRepository::new();
        repo.expect_delete_product().returning(|_| Ok(false));

        let service = CatalogService::new(repo);
        let result = service.delete_product(Uuid::now_v7()).await;
        assert!(matches!(result, Err(CatalogError::ProductNotFound(_))));
    }
}
