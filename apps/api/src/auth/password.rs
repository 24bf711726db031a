use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use conforma_application::{AuthOutcome, RegisterParams};
use conforma_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::dto::{
    AuthLoginRequest as LoginRequest, AuthLoginResponse as LoginResponse,
    AuthRegisterRequest as RegisterRequest, GenericMessageResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{SESSION_CREATED_AT_KEY, SESSION_USER_KEY};

/// POST /auth/register - Create a new account with email+password.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<GenericMessageResponse>)> {
    state
        .user_service
        .register(RegisterParams {
            email: payload.email,
            password: payload.password,
            display_name: payload.display_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenericMessageResponse {
            message: "account created; you can now log in".to_owned(),
        }),
    ))
}

/// POST /auth/login - Authenticate with email+password.
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let outcome = state
        .user_service
        .login(&payload.email, &payload.password)
        .await?;

    let user = match outcome {
        AuthOutcome::Authenticated(user) => user,
        AuthOutcome::Failed => {
            // OWASP: one message for unknown email and wrong password alike.
            return Err(AppError::Unauthorized("invalid credentials".to_owned()).into());
        }
    };

    let identity = UserIdentity::new(user.id, user.display_name, user.email, user.role);

    // OWASP Session Management: regenerate session ID on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to cycle session id: {error}")))?;

    session
        .insert(SESSION_USER_KEY, &identity)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session identity: {error}"))
        })?;

    // OWASP Session Management: record absolute creation time.
    session
        .insert(SESSION_CREATED_AT_KEY, chrono::Utc::now().timestamp())
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session creation time: {error}"))
        })?;

    Ok(Json(LoginResponse {
        status: "authenticated".to_owned(),
    }))
}
