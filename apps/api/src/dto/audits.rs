use conforma_application::{
    AuditContext, AuditDraftInput, AuditRecord, ResponseRecord, SaveResponseInput,
};
use conforma_core::{AppError, AppResult};
use conforma_domain::ProcessToken;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Incoming payload for the audit creation/update wizard.
///
/// Optional fields distinguish "not sent" from "sent empty": an omitted
/// process selection never overwrites a stored one.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/save-audit-request.ts"
)]
pub struct SaveAuditRequest {
    pub id: Option<String>,
    pub site_id: Option<String>,
    #[serde(default)]
    pub title: String,
    pub referential_ids: Option<Vec<i64>>,
    #[ts(type = "Array<number | string> | null")]
    pub process_tokens: Option<Vec<ProcessToken>>,
    pub economic_role: Option<String>,
}

impl SaveAuditRequest {
    /// Converts the payload into a validated service input.
    pub fn into_input(self) -> AppResult<AuditDraftInput> {
        Ok(AuditDraftInput {
            id: parse_optional_uuid(self.id, "audit id")?,
            site_id: parse_optional_uuid(self.site_id, "site id")?,
            title: self.title,
            referential_ids: self.referential_ids,
            process_tokens: self.process_tokens,
            economic_role: self.economic_role,
        })
    }
}

fn parse_optional_uuid(value: Option<String>, label: &str) -> AppResult<Option<Uuid>> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            Uuid::parse_str(value.as_str())
                .map_err(|error| AppError::Validation(format!("invalid {label}: {error}")))
        })
        .transpose()
}

/// API representation of an audit.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/audit-response.ts"
)]
pub struct AuditResponse {
    pub id: String,
    pub site_id: Option<String>,
    pub title: String,
    pub status: String,
    pub referential_ids: Vec<i64>,
    #[ts(type = "Array<number | string>")]
    pub process_tokens: Vec<ProcessToken>,
    pub economic_role: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AuditRecord> for AuditResponse {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: record.audit.id().to_string(),
            site_id: record.audit.site_id().map(|id| id.to_string()),
            title: record.audit.title().to_owned(),
            status: record.audit.status().as_str().to_owned(),
            referential_ids: record.audit.referential_ids().to_vec(),
            process_tokens: record.audit.process_tokens().to_vec(),
            economic_role: record.audit.economic_role().map(ToOwned::to_owned),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Incoming payload for the requester's default economic role.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/save-role-qualification-request.ts"
)]
pub struct SaveRoleQualificationRequest {
    pub economic_role: String,
}

/// API representation of the requester's default economic role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/role-qualification-response.ts"
)]
pub struct RoleQualificationResponse {
    pub economic_role: Option<String>,
}

/// API representation of an audit's filtering context.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/audit-context-response.ts"
)]
pub struct AuditContextResponse {
    pub referential_ids: Vec<i64>,
    #[ts(type = "Array<number | string>")]
    pub process_tokens: Vec<ProcessToken>,
    pub economic_role: Option<String>,
}

impl From<AuditContext> for AuditContextResponse {
    fn from(context: AuditContext) -> Self {
        Self {
            referential_ids: context.referential_ids,
            process_tokens: context.process_tokens,
            economic_role: context.economic_role,
        }
    }
}

/// Incoming payload for saving a questionnaire answer.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/save-response-request.ts"
)]
pub struct SaveResponseRequest {
    pub question_key: String,
    pub value: String,
    pub comment: Option<String>,
    pub evidence_files: Option<Vec<String>>,
}

impl SaveResponseRequest {
    /// Converts the payload into a validated service input.
    pub fn into_input(self) -> AppResult<SaveResponseInput> {
        Ok(SaveResponseInput {
            question_key: self.question_key,
            value: self.value.parse()?,
            comment: self.comment,
            evidence_files: self.evidence_files.unwrap_or_default(),
        })
    }
}

/// API representation of a saved questionnaire answer.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/response-record-response.ts"
)]
pub struct ResponseRecordResponse {
    pub id: String,
    pub audit_id: String,
    pub question_key: String,
    pub value: String,
    pub comment: Option<String>,
    pub evidence_files: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ResponseRecord> for ResponseRecordResponse {
    fn from(record: ResponseRecord) -> Self {
        Self {
            id: record.id.to_string(),
            audit_id: record.audit_id.to_string(),
            question_key: record.question_key,
            value: record.value.as_str().to_owned(),
            comment: record.comment,
            evidence_files: record.evidence_files,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}
