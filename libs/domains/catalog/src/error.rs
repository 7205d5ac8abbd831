use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use query_builder::QueryError;
use thiserror::Error;
use uuid::Uuid;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog domain errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    #[error("Product with title '{0}' already exists")]
    DuplicateTitle(String),

    #[error("Category with name '{0}' already exists")]
    DuplicateName(String),

    #[error("Category {0} still has products assigned")]
    CategoryInUse(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid query: {0}")]
    Query(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<mongodb::error::Error> for CatalogError {
    fn from(err: mongodb::error::Error) -> Self {
        CatalogError::Database(err.to_string())
    }
}

impl From<QueryError> for CatalogError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Parse(_) | QueryError::UnknownField { .. } => {
                CatalogError::Query(err.to_string())
            }
            QueryError::Database(e) => CatalogError::Database(e.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ProductNotFound(_) | CatalogError::CategoryNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            CatalogError::DuplicateTitle(_) | CatalogError::DuplicateName(_) => {
                AppError::Conflict(err.to_string())
            }
            CatalogError::CategoryInUse(_) => AppError::Conflict(err.to_string()),
            CatalogError::Validation(msg) | CatalogError::Query(msg) => {
                AppError::BadRequest(msg)
            }
            CatalogError::Database(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = CatalogError::ProductNotFound(Uuid::now_v7());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_duplicate_maps_to_409() {
        let err = CatalogError::DuplicateTitle("Wool socks".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_query_error_maps_to_400() {
        let err = CatalogError::from(QueryError::UnknownField {
            field: "secret".to_string(),
            kind: "sort",
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
