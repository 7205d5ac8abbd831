//! API routes module

pub mod auth;
pub mod catalog;

use axum::Router;

use crate::state::AppState;

/// Create all API routes
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/products", catalog::router(state))
        .nest("/auth", auth::router(state))
}

/// Initialize database indexes
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    catalog::init_indexes(state).await?;
    auth::init_indexes(state).await?;
    Ok(())
}
