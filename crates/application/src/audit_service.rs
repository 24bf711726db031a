//! Audit lifecycle ports and application service.
//!
//! Covers draft creation and wizard-style partial updates, the audit
//! context read model, and questionnaire response upserts keyed by
//! (user, audit, question key).

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use conforma_core::{AppError, AppResult, UserId, UserIdentity};
use conforma_domain::{Audit, AuditStatus, ProcessToken, ResponseValue};
use uuid::Uuid;

/// Audit aggregate plus storage timestamps.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// The validated audit aggregate.
    pub audit: Audit,
    /// Creation time.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last modification time.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// One saved questionnaire answer.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    /// Unique response identifier.
    pub id: Uuid,
    /// Parent audit.
    pub audit_id: Uuid,
    /// Answering user.
    pub user_id: UserId,
    /// Stable key of the answered question.
    pub question_key: String,
    /// The answer value.
    pub value: ResponseValue,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Uploaded evidence file references.
    pub evidence_files: Vec<String>,
    /// First save time.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last save time.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Incoming payload for the audit creation/update wizard.
///
/// Optional fields distinguish "not sent" from "sent empty": an omitted
/// process selection never overwrites a stored one.
#[derive(Debug, Clone, Default)]
pub struct AuditDraftInput {
    /// Existing audit to update, when the client already holds an id.
    pub id: Option<Uuid>,
    /// Audited site.
    pub site_id: Option<Uuid>,
    /// Audit title.
    pub title: String,
    /// Selected regulatory referential ids.
    pub referential_ids: Option<Vec<i64>>,
    /// Selected process tokens.
    pub process_tokens: Option<Vec<ProcessToken>>,
    /// Declared economic role.
    pub economic_role: Option<String>,
}

/// Incoming payload for saving a questionnaire answer.
#[derive(Debug, Clone)]
pub struct SaveResponseInput {
    /// Stable key of the answered question.
    pub question_key: String,
    /// The answer value.
    pub value: ResponseValue,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Uploaded evidence file references.
    pub evidence_files: Vec<String>,
}

/// Read model assembling an audit's filtering context.
///
/// Arrays are always decoded; raw JSON strings never reach the caller.
#[derive(Debug, Clone)]
pub struct AuditContext {
    /// Selected referential ids.
    pub referential_ids: Vec<i64>,
    /// Decoded process selection tokens.
    pub process_tokens: Vec<ProcessToken>,
    /// Economic role: the audit's own, or the user's role qualification.
    pub economic_role: Option<String>,
}

/// Repository port for audits and responses.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Finds an audit by id.
    async fn find_audit(&self, audit_id: Uuid) -> AppResult<Option<AuditRecord>>;

    /// Lists a user's audits, newest first.
    async fn list_audits(&self, user_id: UserId) -> AppResult<Vec<AuditRecord>>;

    /// Inserts a new audit.
    async fn insert_audit(&self, audit: &Audit) -> AppResult<AuditRecord>;

    /// Persists a merged audit aggregate over an existing row.
    async fn update_audit(&self, audit: &Audit) -> AppResult<AuditRecord>;

    /// Updates only the lifecycle status.
    async fn set_status(&self, audit_id: Uuid, status: AuditStatus) -> AppResult<()>;

    /// Deletes an audit and its dependent rows.
    async fn delete_audit(&self, audit_id: Uuid) -> AppResult<()>;

    /// Inserts or updates the answer for (user, audit, question key).
    async fn upsert_response(
        &self,
        audit_id: Uuid,
        user_id: UserId,
        input: &SaveResponseInput,
    ) -> AppResult<ResponseRecord>;

    /// Lists one user's answers for an audit.
    async fn list_responses(
        &self,
        audit_id: Uuid,
        user_id: UserId,
    ) -> AppResult<Vec<ResponseRecord>>;

    /// Returns the user's declared role qualification, if recorded.
    async fn find_role_qualification(&self, user_id: UserId) -> AppResult<Option<String>>;

    /// Records or replaces the user's declared role qualification.
    async fn upsert_role_qualification(
        &self,
        user_id: UserId,
        economic_role: &str,
    ) -> AppResult<()>;
}

/// Application service for the audit lifecycle.
#[derive(Clone)]
pub struct AuditService {
    repository: Arc<dyn AuditRepository>,
}

impl AuditService {
    /// Creates a new audit service.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Creates a draft or applies a wizard-style partial update.
    ///
    /// Ownership is revalidated before any update. A payload without a
    /// process selection preserves the stored selection; the same holds
    /// for referential ids and the economic role.
    pub async fn create_or_update_draft(
        &self,
        identity: &UserIdentity,
        input: AuditDraftInput,
    ) -> AppResult<AuditRecord> {
        if let Some(audit_id) = input.id {
            let existing = self.owned_audit(identity, audit_id).await?;
            let merged = Self::merge_draft(&existing.audit, input)?;
            return self.repository.update_audit(&merged).await;
        }

        let audit = Audit::new(
            Uuid::new_v4(),
            identity.user_id(),
            input.site_id,
            input.title,
            AuditStatus::Draft,
            input.referential_ids.unwrap_or_default(),
            input.process_tokens.unwrap_or_default(),
            input.economic_role,
        )?;

        self.repository.insert_audit(&audit).await
    }

    fn merge_draft(existing: &Audit, input: AuditDraftInput) -> AppResult<Audit> {
        let title = if input.title.trim().is_empty() {
            existing.title().to_owned()
        } else {
            input.title
        };

        // Selection preservation: "no selection" in the payload (omitted or
        // empty) keeps what the audit already has.
        let process_tokens = match input.process_tokens {
            Some(tokens) if !tokens.is_empty() => tokens,
            _ => existing.process_tokens().to_vec(),
        };
        let referential_ids = match input.referential_ids {
            Some(ids) if !ids.is_empty() => ids,
            _ => existing.referential_ids().to_vec(),
        };
        let economic_role = input
            .economic_role
            .filter(|value| !value.trim().is_empty())
            .or_else(|| existing.economic_role().map(str::to_owned));

        Audit::new(
            existing.id(),
            existing.user_id(),
            input.site_id.or(existing.site_id()),
            title,
            existing.status(),
            referential_ids,
            process_tokens,
            economic_role,
        )
    }

    /// Lists the requester's audits.
    pub async fn list_audits(&self, identity: &UserIdentity) -> AppResult<Vec<AuditRecord>> {
        self.repository.list_audits(identity.user_id()).await
    }

    /// Returns one audit, requiring ownership.
    pub async fn get_audit(&self, identity: &UserIdentity, audit_id: Uuid) -> AppResult<AuditRecord> {
        self.owned_audit(identity, audit_id).await
    }

    /// Deletes an audit, requiring ownership.
    pub async fn delete_audit(&self, identity: &UserIdentity, audit_id: Uuid) -> AppResult<()> {
        self.owned_audit(identity, audit_id).await?;
        self.repository.delete_audit(audit_id).await
    }

    /// Moves an audit to completed.
    pub async fn complete_audit(&self, identity: &UserIdentity, audit_id: Uuid) -> AppResult<()> {
        self.owned_audit(identity, audit_id).await?;
        self.repository
            .set_status(audit_id, AuditStatus::Completed)
            .await
    }

    /// Assembles the audit's filtering context.
    ///
    /// When the audit itself has no economic role, the user's separate role
    /// qualification record fills the gap.
    pub async fn get_audit_context(
        &self,
        identity: &UserIdentity,
        audit_id: Uuid,
    ) -> AppResult<AuditContext> {
        let record = self.owned_audit(identity, audit_id).await?;

        let economic_role = match record.audit.economic_role() {
            Some(role) => Some(role.to_owned()),
            None => {
                self.repository
                    .find_role_qualification(identity.user_id())
                    .await?
            }
        };

        Ok(AuditContext {
            referential_ids: record.audit.referential_ids().to_vec(),
            process_tokens: record.audit.process_tokens().to_vec(),
            economic_role,
        })
    }

    /// Records the requester's default economic role.
    ///
    /// Audits that declare no role of their own fall back to this value
    /// when their filtering context is assembled.
    pub async fn set_role_qualification(
        &self,
        identity: &UserIdentity,
        economic_role: String,
    ) -> AppResult<()> {
        let economic_role = economic_role.trim();
        if economic_role.is_empty() {
            return Err(AppError::Validation("economic_role is required".to_owned()));
        }

        self.repository
            .upsert_role_qualification(identity.user_id(), economic_role)
            .await
    }

    /// Returns the requester's default economic role, if recorded.
    pub async fn get_role_qualification(
        &self,
        identity: &UserIdentity,
    ) -> AppResult<Option<String>> {
        self.repository
            .find_role_qualification(identity.user_id())
            .await
    }

    /// Saves one questionnaire answer as an upsert.
    ///
    /// The first answer moves a draft audit into progress.
    pub async fn save_response(
        &self,
        identity: &UserIdentity,
        audit_id: Uuid,
        input: SaveResponseInput,
    ) -> AppResult<ResponseRecord> {
        if input.question_key.trim().is_empty() {
            return Err(AppError::Validation("question_key is required".to_owned()));
        }

        let record = self.owned_audit(identity, audit_id).await?;

        let saved = self
            .repository
            .upsert_response(audit_id, identity.user_id(), &input)
            .await?;

        if record.audit.status() == AuditStatus::Draft {
            self.repository
                .set_status(audit_id, AuditStatus::InProgress)
                .await?;
        }

        Ok(saved)
    }

    /// Lists the requester's answers for an audit.
    pub async fn list_responses(
        &self,
        identity: &UserIdentity,
        audit_id: Uuid,
    ) -> AppResult<Vec<ResponseRecord>> {
        self.owned_audit(identity, audit_id).await?;
        self.repository
            .list_responses(audit_id, identity.user_id())
            .await
    }

    pub(crate) async fn owned_audit(
        &self,
        identity: &UserIdentity,
        audit_id: Uuid,
    ) -> AppResult<AuditRecord> {
        self.repository
            .find_audit(audit_id)
            .await?
            .filter(|record| record.audit.user_id() == identity.user_id())
            .ok_or_else(|| AppError::NotFound(format!("audit '{audit_id}' does not exist")))
    }
}
