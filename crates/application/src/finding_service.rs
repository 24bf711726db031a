//! Finding and action ports and application service.
//!
//! Non-conformities raised during an audit and their remediation actions.
//! Findings are created manually downstream of responses (no automatic
//! derivation); each action belongs to exactly one finding. Ownership is
//! always checked through the parent audit.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use conforma_core::{AppError, AppResult, UserIdentity};
use conforma_domain::{ActionStatus, FindingSeverity, FindingStatus};
use uuid::Uuid;

use crate::audit_service::AuditService;

/// Finding record returned by repository queries.
#[derive(Debug, Clone)]
pub struct FindingRecord {
    /// Unique finding identifier.
    pub id: Uuid,
    /// Parent audit.
    pub audit_id: Uuid,
    /// Short title.
    pub title: String,
    /// Detailed description.
    pub description: Option<String>,
    /// Non-conformity severity.
    pub severity: FindingSeverity,
    /// Workflow status.
    pub status: FindingStatus,
    /// Regulatory clause reference, if tied to one.
    pub clause: Option<String>,
    /// Creation time.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Remediation action record returned by repository queries.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    /// Unique action identifier.
    pub id: Uuid,
    /// Parent finding.
    pub finding_id: Uuid,
    /// What is to be done.
    pub description: String,
    /// Who committed to it (free-text label).
    pub owner: Option<String>,
    /// Agreed completion date.
    pub due_date: Option<NaiveDate>,
    /// Workflow status.
    pub status: ActionStatus,
    /// Creation time.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ActionRecord {
    /// Returns whether the action is past due and not completed.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != ActionStatus::Completed
            && self.due_date.map(|due| due < today).unwrap_or(false)
    }
}

/// Incoming finding payload.
#[derive(Debug, Clone)]
pub struct FindingInput {
    /// Short title.
    pub title: String,
    /// Detailed description.
    pub description: Option<String>,
    /// Non-conformity severity.
    pub severity: FindingSeverity,
    /// Workflow status.
    pub status: FindingStatus,
    /// Regulatory clause reference.
    pub clause: Option<String>,
}

/// Incoming action payload.
#[derive(Debug, Clone)]
pub struct ActionInput {
    /// What is to be done.
    pub description: String,
    /// Who committed to it.
    pub owner: Option<String>,
    /// Agreed completion date.
    pub due_date: Option<NaiveDate>,
    /// Workflow status.
    pub status: ActionStatus,
}

/// Repository port for findings and actions.
#[async_trait]
pub trait FindingRepository: Send + Sync {
    /// Inserts a finding under an audit.
    async fn insert_finding(&self, audit_id: Uuid, input: &FindingInput)
    -> AppResult<FindingRecord>;

    /// Lists an audit's findings.
    async fn list_findings(&self, audit_id: Uuid) -> AppResult<Vec<FindingRecord>>;

    /// Finds a finding by id.
    async fn find_finding(&self, id: Uuid) -> AppResult<Option<FindingRecord>>;

    /// Updates a finding in place.
    async fn update_finding(&self, id: Uuid, input: &FindingInput) -> AppResult<FindingRecord>;

    /// Inserts an action under a finding.
    async fn insert_action(&self, finding_id: Uuid, input: &ActionInput)
    -> AppResult<ActionRecord>;

    /// Lists a finding's actions.
    async fn list_actions(&self, finding_id: Uuid) -> AppResult<Vec<ActionRecord>>;

    /// Lists every action under an audit's findings.
    async fn list_actions_for_audit(&self, audit_id: Uuid) -> AppResult<Vec<ActionRecord>>;

    /// Finds an action by id.
    async fn find_action(&self, id: Uuid) -> AppResult<Option<ActionRecord>>;

    /// Updates an action in place.
    async fn update_action(&self, id: Uuid, input: &ActionInput) -> AppResult<ActionRecord>;
}

/// Application service for findings and remediation actions.
#[derive(Clone)]
pub struct FindingService {
    audit_service: AuditService,
    repository: Arc<dyn FindingRepository>,
}

impl FindingService {
    /// Creates a new finding service.
    #[must_use]
    pub fn new(audit_service: AuditService, repository: Arc<dyn FindingRepository>) -> Self {
        Self {
            audit_service,
            repository,
        }
    }

    /// Raises a finding under an audit owned by the requester.
    pub async fn create_finding(
        &self,
        identity: &UserIdentity,
        audit_id: Uuid,
        input: FindingInput,
    ) -> AppResult<FindingRecord> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("finding title is required".to_owned()));
        }

        self.audit_service.owned_audit(identity, audit_id).await?;
        self.repository.insert_finding(audit_id, &input).await
    }

    /// Lists an audit's findings, requiring ownership.
    pub async fn list_findings(
        &self,
        identity: &UserIdentity,
        audit_id: Uuid,
    ) -> AppResult<Vec<FindingRecord>> {
        self.audit_service.owned_audit(identity, audit_id).await?;
        self.repository.list_findings(audit_id).await
    }

    /// Updates a finding, requiring ownership of its audit.
    pub async fn update_finding(
        &self,
        identity: &UserIdentity,
        finding_id: Uuid,
        input: FindingInput,
    ) -> AppResult<FindingRecord> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("finding title is required".to_owned()));
        }

        self.owned_finding(identity, finding_id).await?;
        self.repository.update_finding(finding_id, &input).await
    }

    /// Creates a remediation action under a finding.
    pub async fn create_action(
        &self,
        identity: &UserIdentity,
        finding_id: Uuid,
        input: ActionInput,
    ) -> AppResult<ActionRecord> {
        if input.description.trim().is_empty() {
            return Err(AppError::Validation(
                "action description is required".to_owned(),
            ));
        }

        self.owned_finding(identity, finding_id).await?;
        self.repository.insert_action(finding_id, &input).await
    }

    /// Lists a finding's actions.
    pub async fn list_actions(
        &self,
        identity: &UserIdentity,
        finding_id: Uuid,
    ) -> AppResult<Vec<ActionRecord>> {
        self.owned_finding(identity, finding_id).await?;
        self.repository.list_actions(finding_id).await
    }

    /// Updates an action.
    pub async fn update_action(
        &self,
        identity: &UserIdentity,
        action_id: Uuid,
        input: ActionInput,
    ) -> AppResult<ActionRecord> {
        if input.description.trim().is_empty() {
            return Err(AppError::Validation(
                "action description is required".to_owned(),
            ));
        }

        let action = self
            .repository
            .find_action(action_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("action '{action_id}' does not exist")))?;

        self.owned_finding(identity, action.finding_id).await?;
        self.repository.update_action(action_id, &input).await
    }

    async fn owned_finding(
        &self,
        identity: &UserIdentity,
        finding_id: Uuid,
    ) -> AppResult<FindingRecord> {
        let finding = self
            .repository
            .find_finding(finding_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("finding '{finding_id}' does not exist")))?;

        // Ownership flows through the parent audit; a finding under someone
        // else's audit is indistinguishable from a missing one.
        self.audit_service
            .owned_audit(identity, finding.audit_id)
            .await
            .map_err(|_| AppError::NotFound(format!("finding '{finding_id}' does not exist")))?;

        Ok(finding)
    }
}
