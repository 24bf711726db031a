use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use conforma_core::UserIdentity;
use uuid::Uuid;

use crate::dto::{
    AuditContextResponse, AuditResponse, QuestionnaireResponse, ResponseRecordResponse,
    RoleQualificationResponse, SaveAuditRequest, SaveResponseRequest,
    SaveRoleQualificationRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_audits_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<AuditResponse>>> {
    let audits = state
        .audit_service
        .list_audits(&user)
        .await?
        .into_iter()
        .map(AuditResponse::from)
        .collect();

    Ok(Json(audits))
}

/// POST /api/audits - Create a draft or apply a wizard-style partial update.
pub async fn save_audit_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<SaveAuditRequest>,
) -> ApiResult<(StatusCode, Json<AuditResponse>)> {
    let input = payload.into_input()?;
    let status = if input.id.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let audit = state
        .audit_service
        .create_or_update_draft(&user, input)
        .await?;

    Ok((status, Json(AuditResponse::from(audit))))
}

pub async fn get_audit_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Json<AuditResponse>> {
    let audit = state.audit_service.get_audit(&user, audit_id).await?;

    Ok(Json(AuditResponse::from(audit)))
}

pub async fn delete_audit_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.audit_service.delete_audit(&user, audit_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_audit_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.audit_service.complete_audit(&user, audit_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_role_qualification_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<RoleQualificationResponse>> {
    let economic_role = state.audit_service.get_role_qualification(&user).await?;

    Ok(Json(RoleQualificationResponse { economic_role }))
}

/// PUT /api/role-qualification - Record the requester's default economic role.
pub async fn save_role_qualification_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<SaveRoleQualificationRequest>,
) -> ApiResult<StatusCode> {
    state
        .audit_service
        .set_role_qualification(&user, payload.economic_role)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn audit_context_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Json<AuditContextResponse>> {
    let context = state
        .audit_service
        .get_audit_context(&user, audit_id)
        .await?;

    Ok(Json(AuditContextResponse::from(context)))
}

pub async fn audit_questions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Json<QuestionnaireResponse>> {
    let questionnaire = state
        .questionnaire_service
        .questions_for_audit(&user, audit_id)
        .await?;

    Ok(Json(QuestionnaireResponse::from(questionnaire)))
}

pub async fn list_responses_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ResponseRecordResponse>>> {
    let responses = state
        .audit_service
        .list_responses(&user, audit_id)
        .await?
        .into_iter()
        .map(ResponseRecordResponse::from)
        .collect();

    Ok(Json(responses))
}

/// PUT /api/audits/{id}/responses - Upsert one answer for the requester.
pub async fn save_response_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
    Json(payload): Json<SaveResponseRequest>,
) -> ApiResult<Json<ResponseRecordResponse>> {
    let response = state
        .audit_service
        .save_response(&user, audit_id, payload.into_input()?)
        .await?;

    Ok(Json(ResponseRecordResponse::from(response)))
}
