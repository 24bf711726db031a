use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use conforma_core::UserIdentity;
use uuid::Uuid;

use crate::dto::{ActionResponse, FindingResponse, SaveActionRequest, SaveFindingRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_findings_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Json<Vec<FindingResponse>>> {
    let findings = state
        .finding_service
        .list_findings(&user, audit_id)
        .await?
        .into_iter()
        .map(FindingResponse::from)
        .collect();

    Ok(Json(findings))
}

pub async fn create_finding_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
    Json(payload): Json<SaveFindingRequest>,
) -> ApiResult<(StatusCode, Json<FindingResponse>)> {
    let finding = state
        .finding_service
        .create_finding(&user, audit_id, payload.into_input()?)
        .await?;

    Ok((StatusCode::CREATED, Json(FindingResponse::from(finding))))
}

pub async fn update_finding_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(finding_id): Path<Uuid>,
    Json(payload): Json<SaveFindingRequest>,
) -> ApiResult<Json<FindingResponse>> {
    let finding = state
        .finding_service
        .update_finding(&user, finding_id, payload.into_input()?)
        .await?;

    Ok(Json(FindingResponse::from(finding)))
}

pub async fn list_actions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(finding_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ActionResponse>>> {
    let actions = state
        .finding_service
        .list_actions(&user, finding_id)
        .await?
        .into_iter()
        .map(ActionResponse::from)
        .collect();

    Ok(Json(actions))
}

pub async fn create_action_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(finding_id): Path<Uuid>,
    Json(payload): Json<SaveActionRequest>,
) -> ApiResult<(StatusCode, Json<ActionResponse>)> {
    let action = state
        .finding_service
        .create_action(&user, finding_id, payload.into_input()?)
        .await?;

    Ok((StatusCode::CREATED, Json(ActionResponse::from(action))))
}

pub async fn update_action_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(action_id): Path<Uuid>,
    Json(payload): Json<SaveActionRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let action = state
        .finding_service
        .update_action(&user, action_id, payload.into_input()?)
        .await?;

    Ok(Json(ActionResponse::from(action)))
}
