use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use conforma_core::UserIdentity;
use uuid::Uuid;

use crate::dto::{OrganisationResponse, SaveOrganisationRequest, SaveSiteRequest, SiteResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_organisations_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<OrganisationResponse>>> {
    let organisations = state
        .directory_service
        .list_organisations(&user)
        .await?
        .into_iter()
        .map(OrganisationResponse::from)
        .collect();

    Ok(Json(organisations))
}

pub async fn create_organisation_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<SaveOrganisationRequest>,
) -> ApiResult<(StatusCode, Json<OrganisationResponse>)> {
    let organisation = state
        .directory_service
        .create_organisation(&user, payload.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrganisationResponse::from(organisation)),
    ))
}

pub async fn get_organisation_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(organisation_id): Path<Uuid>,
) -> ApiResult<Json<OrganisationResponse>> {
    let organisation = state
        .directory_service
        .get_organisation(&user, organisation_id)
        .await?;

    Ok(Json(OrganisationResponse::from(organisation)))
}

pub async fn update_organisation_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(organisation_id): Path<Uuid>,
    Json(payload): Json<SaveOrganisationRequest>,
) -> ApiResult<Json<OrganisationResponse>> {
    let organisation = state
        .directory_service
        .update_organisation(&user, organisation_id, payload.into())
        .await?;

    Ok(Json(OrganisationResponse::from(organisation)))
}

pub async fn delete_organisation_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(organisation_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .directory_service
        .delete_organisation(&user, organisation_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_sites_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<SiteResponse>>> {
    let sites = state
        .directory_service
        .list_sites(&user)
        .await?
        .into_iter()
        .map(SiteResponse::from)
        .collect();

    Ok(Json(sites))
}

pub async fn create_site_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<SaveSiteRequest>,
) -> ApiResult<(StatusCode, Json<SiteResponse>)> {
    let site = state
        .directory_service
        .create_site(&user, payload.into_input()?)
        .await?;

    Ok((StatusCode::CREATED, Json(SiteResponse::from(site))))
}

pub async fn get_site_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(site_id): Path<Uuid>,
) -> ApiResult<Json<SiteResponse>> {
    let site = state.directory_service.get_site(&user, site_id).await?;

    Ok(Json(SiteResponse::from(site)))
}

pub async fn update_site_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(site_id): Path<Uuid>,
    Json(payload): Json<SaveSiteRequest>,
) -> ApiResult<Json<SiteResponse>> {
    let site = state
        .directory_service
        .update_site(&user, site_id, payload.into_input()?)
        .await?;

    Ok(Json(SiteResponse::from(site)))
}

pub async fn delete_site_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(site_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.directory_service.delete_site(&user, site_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
