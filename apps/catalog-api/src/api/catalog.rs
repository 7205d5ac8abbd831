//! Catalog API routes

use axum::Router;
use domain_catalog::{handlers, CatalogService, MongoCatalogRepository};

use crate::state::AppState;

/// Create catalog router (products and categories)
pub fn router(state: &AppState) -> Router {
    let repository = MongoCatalogRepository::new(&state.db);
    let service = CatalogService::new(repository);
    handlers::router(service, state.jwt_auth.clone())
}

/// Initialize catalog indexes
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    let repository = MongoCatalogRepository::new(&state.db);
    repository.init_indexes().await?;
    Ok(())
}
