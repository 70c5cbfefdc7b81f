use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Malformed row: {0}")]
    MalformedRow(String),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidArgument(msg.into())
    }

    /// Wraps a failure to check a connection out of the pool.
    pub fn unavailable(err: sqlx::Error) -> Self {
        AppError::StoreUnavailable(err)
    }

    /// Label used for the `errors_total` metric.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::Database(_) => "database",
            AppError::MalformedRow(_) => "malformed_row",
            AppError::Migration(_) => "migration",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => AppError::StoreUnavailable(err),
            other => AppError::Database(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            AppError::InvalidArgument(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::StoreUnavailable(ref e) => {
                tracing::error!("Store unavailable: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable".to_string())
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::MalformedRow(ref msg) => {
                tracing::error!("Malformed row: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Malformed stored data".to_string())
            }
            AppError::Migration(ref e) => {
                tracing::error!("Migration error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_classified_as_unavailable() {
        assert!(matches!(
            AppError::from(sqlx::Error::PoolTimedOut),
            AppError::StoreUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(sqlx::Error::PoolClosed),
            AppError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(AppError::from(sqlx::Error::RowNotFound), AppError::NotFound));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::invalid("hour out of range").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::unavailable(sqlx::Error::PoolClosed).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
