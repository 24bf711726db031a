use axum::extract::{Extension, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use conforma_core::UserIdentity;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/audits/{id}/report - Generate and stream the audit PDF.
pub async fn audit_report_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(audit_id): Path<Uuid>,
) -> ApiResult<Response> {
    let pdf_bytes = state.report_service.generate(&user, audit_id).await?;

    let disposition = format!("attachment; filename=\"audit-report-{audit_id}.pdf\"");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf_bytes,
    )
        .into_response())
}
