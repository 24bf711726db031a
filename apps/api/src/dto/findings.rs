use std::str::FromStr;

use chrono::NaiveDate;
use conforma_application::{ActionInput, ActionRecord, FindingInput, FindingRecord};
use conforma_core::{AppError, AppResult};
use conforma_domain::{ActionStatus, FindingSeverity, FindingStatus};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for finding creation and updates.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/save-finding-request.ts"
)]
pub struct SaveFindingRequest {
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub status: Option<String>,
    pub clause: Option<String>,
}

impl SaveFindingRequest {
    /// Converts the payload into a validated service input.
    pub fn into_input(self) -> AppResult<FindingInput> {
        let status = match self.status {
            Some(value) => FindingStatus::from_str(value.as_str())?,
            None => FindingStatus::Open,
        };

        Ok(FindingInput {
            title: self.title,
            description: self.description,
            severity: FindingSeverity::from_str(self.severity.as_str())?,
            status,
            clause: self.clause,
        })
    }
}

/// API representation of an audit finding.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/finding-response.ts"
)]
pub struct FindingResponse {
    pub id: String,
    pub audit_id: String,
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub status: String,
    pub clause: Option<String>,
    pub created_at: String,
}

impl From<FindingRecord> for FindingResponse {
    fn from(record: FindingRecord) -> Self {
        Self {
            id: record.id.to_string(),
            audit_id: record.audit_id.to_string(),
            title: record.title,
            description: record.description,
            severity: record.severity.as_str().to_owned(),
            status: record.status.as_str().to_owned(),
            clause: record.clause,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Incoming payload for remediation action creation and updates.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/save-action-request.ts"
)]
pub struct SaveActionRequest {
    pub description: String,
    pub owner: Option<String>,
    /// ISO date, e.g. `2026-09-30`.
    pub due_date: Option<String>,
    pub status: Option<String>,
}

impl SaveActionRequest {
    /// Converts the payload into a validated service input.
    pub fn into_input(self) -> AppResult<ActionInput> {
        let due_date = self
            .due_date
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                NaiveDate::from_str(value.as_str())
                    .map_err(|error| AppError::Validation(format!("invalid due date: {error}")))
            })
            .transpose()?;

        let status = match self.status {
            Some(value) => ActionStatus::from_str(value.as_str())?,
            None => ActionStatus::Planned,
        };

        Ok(ActionInput {
            description: self.description,
            owner: self.owner,
            due_date,
            status,
        })
    }
}

/// API representation of a remediation action.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/action-response.ts"
)]
pub struct ActionResponse {
    pub id: String,
    pub finding_id: String,
    pub description: String,
    pub owner: Option<String>,
    pub due_date: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl From<ActionRecord> for ActionResponse {
    fn from(record: ActionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            finding_id: record.finding_id.to_string(),
            description: record.description,
            owner: record.owner,
            due_date: record.due_date.map(|date| date.to_string()),
            status: record.status.as_str().to_owned(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}
