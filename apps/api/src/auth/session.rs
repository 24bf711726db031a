use axum::Json;
use axum::http::StatusCode;
use conforma_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::dto::UserIdentityResponse;
use crate::error::ApiResult;

use super::SESSION_USER_KEY;

/// POST /auth/logout - Destroy the current session.
pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Return the authenticated user.
pub async fn me_handler(session: Session) -> ApiResult<Json<UserIdentityResponse>> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    Ok(Json(UserIdentityResponse::from(identity)))
}
