use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Database(err) => {
                // Unique-constraint violations surface as a 400 with a
                // fixed message instead of a generic server error.
                let duplicate = err
                    .as_database_error()
                    .and_then(|e| e.code())
                    .map(|code| code == "23505")
                    .unwrap_or(false);

                if duplicate {
                    (
                        StatusCode::BAD_REQUEST,
                        "Duplicate value for a unique field".to_string(),
                    )
                } else {
                    log::error!("Database error: {}", err);
                    let message = if cfg!(debug_assertions) {
                        err.to_string()
                    } else {
                        "Internal server error".to_string()
                    };
                    (StatusCode::INTERNAL_SERVER_ERROR, message)
                }
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_resource() {
        let err = ApiError::NotFound("Order");
        assert_eq!(err.to_string(), "Order not found");
    }

    #[test]
    fn validation_keeps_the_message() {
        let err = ApiError::validation("Quantity must be at least 1");
        assert_eq!(err.to_string(), "Quantity must be at least 1");
    }
}
