use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use conforma_core::AppError;
use serde::Serialize;
use tracing::error;
use ts_rs::TS;

/// The one message clients see for unexpected server failures. Storage and
/// driver diagnostics stay in the server log.
const INTERNAL_ERROR_MESSAGE: &str = "an internal error occurred";

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Conflict(message) => (StatusCode::CONFLICT, message),
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            AppError::Internal(detail) => {
                error!(%detail, "request failed with an internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_owned(),
                )
            }
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use conforma_core::AppError;

    use super::ApiError;

    #[tokio::test]
    async fn internal_errors_keep_the_driver_detail_out_of_the_body() -> Result<(), axum::Error> {
        let driver_detail = "failed to filter questions: connection refused (os error 111)";
        let response =
            ApiError(AppError::Internal(driver_detail.to_owned())).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body = String::from_utf8_lossy(&body);
        assert!(!body.contains("connection refused"));
        assert!(!body.contains("failed to filter questions"));
        assert!(body.contains("an internal error occurred"));

        Ok(())
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() -> Result<(), axum::Error> {
        let response =
            ApiError(AppError::Validation("invalid site id".to_owned())).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(String::from_utf8_lossy(&body).contains("invalid site id"));

        Ok(())
    }
}
