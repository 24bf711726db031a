use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use conforma_core::UserIdentity;

use crate::dto::{ProcessResponse, QuestionResponse, ReferentialResponse, SaveQuestionRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_referentials_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ReferentialResponse>>> {
    let referentials = state
        .questionnaire_service
        .list_referentials()
        .await?
        .into_iter()
        .map(ReferentialResponse::from)
        .collect();

    Ok(Json(referentials))
}

pub async fn list_processes_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProcessResponse>>> {
    let processes = state
        .questionnaire_service
        .list_processes()
        .await?
        .into_iter()
        .map(ProcessResponse::from)
        .collect();

    Ok(Json(processes))
}

pub async fn list_catalog_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<QuestionResponse>>> {
    let questions = state
        .questionnaire_service
        .list_catalog(&user)
        .await?
        .into_iter()
        .map(QuestionResponse::from)
        .collect();

    Ok(Json(questions))
}

pub async fn create_question_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<SaveQuestionRequest>,
) -> ApiResult<(StatusCode, Json<QuestionResponse>)> {
    let question = state
        .questionnaire_service
        .create_question(&user, payload.into_input()?)
        .await?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from(question))))
}

pub async fn update_question_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(question_id): Path<i64>,
    Json(payload): Json<SaveQuestionRequest>,
) -> ApiResult<Json<QuestionResponse>> {
    let question = state
        .questionnaire_service
        .update_question(&user, question_id, payload.into_input()?)
        .await?;

    Ok(Json(QuestionResponse::from(question)))
}
