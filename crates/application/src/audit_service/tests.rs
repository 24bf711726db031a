use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use conforma_core::{AccountRole, AppError, AppResult, UserId, UserIdentity};
use conforma_domain::{Audit, AuditStatus, ProcessToken, ResponseValue};
use uuid::Uuid;

use super::{
    AuditDraftInput, AuditRecord, AuditRepository, AuditService, ResponseRecord, SaveResponseInput,
};

#[derive(Default)]
struct TestAuditRepo {
    audits: Mutex<HashMap<Uuid, AuditRecord>>,
    responses: Mutex<HashMap<(Uuid, UserId, String), ResponseRecord>>,
    role_qualifications: Mutex<HashMap<UserId, String>>,
}

impl TestAuditRepo {
    fn lock_err(what: &str) -> AppError {
        AppError::Internal(format!("failed to lock {what}"))
    }
}

#[async_trait]
impl AuditRepository for TestAuditRepo {
    async fn find_audit(&self, audit_id: Uuid) -> AppResult<Option<AuditRecord>> {
        Ok(self
            .audits
            .lock()
            .map_err(|_| Self::lock_err("audits"))?
            .get(&audit_id)
            .cloned())
    }

    async fn list_audits(&self, user_id: UserId) -> AppResult<Vec<AuditRecord>> {
        Ok(self
            .audits
            .lock()
            .map_err(|_| Self::lock_err("audits"))?
            .values()
            .filter(|record| record.audit.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn insert_audit(&self, audit: &Audit) -> AppResult<AuditRecord> {
        let record = AuditRecord {
            audit: audit.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.audits
            .lock()
            .map_err(|_| Self::lock_err("audits"))?
            .insert(audit.id(), record.clone());
        Ok(record)
    }

    async fn update_audit(&self, audit: &Audit) -> AppResult<AuditRecord> {
        let mut audits = self.audits.lock().map_err(|_| Self::lock_err("audits"))?;
        let existing = audits
            .get(&audit.id())
            .ok_or_else(|| AppError::NotFound("audit not stored".to_owned()))?;
        let record = AuditRecord {
            audit: audit.clone(),
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        audits.insert(audit.id(), record.clone());
        Ok(record)
    }

    async fn set_status(&self, audit_id: Uuid, status: AuditStatus) -> AppResult<()> {
        let mut audits = self.audits.lock().map_err(|_| Self::lock_err("audits"))?;
        let record = audits
            .get(&audit_id)
            .ok_or_else(|| AppError::NotFound("audit not stored".to_owned()))?;
        let updated = Audit::new(
            record.audit.id(),
            record.audit.user_id(),
            record.audit.site_id(),
            record.audit.title(),
            status,
            record.audit.referential_ids().to_vec(),
            record.audit.process_tokens().to_vec(),
            record.audit.economic_role().map(str::to_owned),
        )?;
        let created_at = record.created_at;
        audits.insert(
            audit_id,
            AuditRecord {
                audit: updated,
                created_at,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_audit(&self, audit_id: Uuid) -> AppResult<()> {
        self.audits
            .lock()
            .map_err(|_| Self::lock_err("audits"))?
            .remove(&audit_id);
        Ok(())
    }

    async fn upsert_response(
        &self,
        audit_id: Uuid,
        user_id: UserId,
        input: &SaveResponseInput,
    ) -> AppResult<ResponseRecord> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| Self::lock_err("responses"))?;
        let key = (audit_id, user_id, input.question_key.clone());
        let record = match responses.get(&key) {
            Some(existing) => ResponseRecord {
                value: input.value,
                comment: input.comment.clone(),
                evidence_files: input.evidence_files.clone(),
                updated_at: Utc::now(),
                ..existing.clone()
            },
            None => ResponseRecord {
                id: Uuid::new_v4(),
                audit_id,
                user_id,
                question_key: input.question_key.clone(),
                value: input.value,
                comment: input.comment.clone(),
                evidence_files: input.evidence_files.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        };
        responses.insert(key, record.clone());
        Ok(record)
    }

    async fn list_responses(
        &self,
        audit_id: Uuid,
        user_id: UserId,
    ) -> AppResult<Vec<ResponseRecord>> {
        Ok(self
            .responses
            .lock()
            .map_err(|_| Self::lock_err("responses"))?
            .values()
            .filter(|record| record.audit_id == audit_id && record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_role_qualification(&self, user_id: UserId) -> AppResult<Option<String>> {
        Ok(self
            .role_qualifications
            .lock()
            .map_err(|_| Self::lock_err("role qualifications"))?
            .get(&user_id)
            .cloned())
    }

    async fn upsert_role_qualification(
        &self,
        user_id: UserId,
        economic_role: &str,
    ) -> AppResult<()> {
        self.role_qualifications
            .lock()
            .map_err(|_| Self::lock_err("role qualifications"))?
            .insert(user_id, economic_role.to_owned());
        Ok(())
    }
}

fn identity() -> UserIdentity {
    UserIdentity::new(
        UserId::new(),
        "Alice Auditor",
        "alice@example.com",
        AccountRole::User,
    )
}

fn service_with(repo: TestAuditRepo) -> AuditService {
    AuditService::new(std::sync::Arc::new(repo))
}

fn draft_input(title: &str) -> AuditDraftInput {
    AuditDraftInput {
        title: title.to_owned(),
        ..AuditDraftInput::default()
    }
}

#[tokio::test]
async fn create_draft_starts_in_draft_status() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    let record = service
        .create_or_update_draft(&identity, draft_input("Site audit 2026"))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(record.audit.status(), AuditStatus::Draft);
    assert_eq!(record.audit.user_id(), identity.user_id());
}

#[tokio::test]
async fn update_without_process_selection_preserves_stored_tokens() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    let created = service
        .create_or_update_draft(
            &identity,
            AuditDraftInput {
                title: "MDR readiness".to_owned(),
                referential_ids: Some(vec![3]),
                process_tokens: Some(vec![ProcessToken::Text("traceability_udi".to_owned())]),
                economic_role: Some("fabricant".to_owned()),
                ..AuditDraftInput::default()
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    // Second wizard step sends only the title; the selection must survive.
    let updated = service
        .create_or_update_draft(
            &identity,
            AuditDraftInput {
                id: Some(created.audit.id()),
                title: "MDR readiness (renamed)".to_owned(),
                ..AuditDraftInput::default()
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(updated.audit.title(), "MDR readiness (renamed)");
    assert_eq!(
        updated.audit.process_tokens(),
        &[ProcessToken::Text("traceability_udi".to_owned())]
    );
    assert_eq!(updated.audit.referential_ids(), &[3]);
    assert_eq!(updated.audit.economic_role(), Some("fabricant"));
}

#[tokio::test]
async fn empty_selection_in_payload_also_preserves_stored_tokens() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    let created = service
        .create_or_update_draft(
            &identity,
            AuditDraftInput {
                title: "ISO 13485 internal".to_owned(),
                process_tokens: Some(vec![ProcessToken::Id(7)]),
                ..AuditDraftInput::default()
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let updated = service
        .create_or_update_draft(
            &identity,
            AuditDraftInput {
                id: Some(created.audit.id()),
                title: String::new(),
                process_tokens: Some(Vec::new()),
                ..AuditDraftInput::default()
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(updated.audit.title(), "ISO 13485 internal");
    assert_eq!(updated.audit.process_tokens(), &[ProcessToken::Id(7)]);
}

#[tokio::test]
async fn updating_someone_elses_audit_reports_not_found() {
    let service = service_with(TestAuditRepo::default());
    let owner = identity();

    let created = service
        .create_or_update_draft(&owner, draft_input("Owned audit"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let intruder = UserIdentity::new(
        UserId::new(),
        "Mallory",
        "mallory@example.com",
        AccountRole::User,
    );
    let result = service
        .create_or_update_draft(
            &intruder,
            AuditDraftInput {
                id: Some(created.audit.id()),
                title: "Hijacked".to_owned(),
                ..AuditDraftInput::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn saving_same_question_twice_keeps_one_response_with_latest_value() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    let created = service
        .create_or_update_draft(&identity, draft_input("Upsert audit"))
        .await
        .unwrap_or_else(|_| unreachable!());
    let audit_id = created.audit.id();

    let first = service
        .save_response(
            &identity,
            audit_id,
            SaveResponseInput {
                question_key: "q_abc123".to_owned(),
                value: ResponseValue::NonCompliant,
                comment: None,
                evidence_files: Vec::new(),
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let second = service
        .save_response(
            &identity,
            audit_id,
            SaveResponseInput {
                question_key: "q_abc123".to_owned(),
                value: ResponseValue::Compliant,
                comment: Some("fixed after review".to_owned()),
                evidence_files: vec!["evidence/cert.pdf".to_owned()],
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(first.id, second.id);
    assert_eq!(second.value, ResponseValue::Compliant);

    let responses = service
        .list_responses(&identity, audit_id)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].comment.as_deref(), Some("fixed after review"));
}

#[tokio::test]
async fn first_response_moves_draft_into_progress() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    let created = service
        .create_or_update_draft(&identity, draft_input("Lifecycle audit"))
        .await
        .unwrap_or_else(|_| unreachable!());
    let audit_id = created.audit.id();

    service
        .save_response(
            &identity,
            audit_id,
            SaveResponseInput {
                question_key: "q_first".to_owned(),
                value: ResponseValue::Partial,
                comment: None,
                evidence_files: Vec::new(),
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let reloaded = service
        .get_audit(&identity, audit_id)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(reloaded.audit.status(), AuditStatus::InProgress);
}

#[tokio::test]
async fn blank_question_key_is_rejected() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    let created = service
        .create_or_update_draft(&identity, draft_input("Validation audit"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let result = service
        .save_response(
            &identity,
            created.audit.id(),
            SaveResponseInput {
                question_key: "  ".to_owned(),
                value: ResponseValue::Compliant,
                comment: None,
                evidence_files: Vec::new(),
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn audit_context_falls_back_to_saved_role_qualification() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    service
        .set_role_qualification(&identity, "importateur".to_owned())
        .await
        .unwrap_or_else(|_| unreachable!());

    let created = service
        .create_or_update_draft(&identity, draft_input("Roleless audit"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let context = service
        .get_audit_context(&identity, created.audit.id())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(context.economic_role.as_deref(), Some("importateur"));
}

#[tokio::test]
async fn saving_a_role_qualification_trims_and_replaces() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    service
        .set_role_qualification(&identity, "  importateur  ".to_owned())
        .await
        .unwrap_or_else(|_| unreachable!());
    let stored = service
        .get_role_qualification(&identity)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(stored.as_deref(), Some("importateur"));

    service
        .set_role_qualification(&identity, "distributeur".to_owned())
        .await
        .unwrap_or_else(|_| unreachable!());
    let replaced = service
        .get_role_qualification(&identity)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(replaced.as_deref(), Some("distributeur"));
}

#[tokio::test]
async fn blank_role_qualification_is_rejected() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    let result = service
        .set_role_qualification(&identity, "  ".to_owned())
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn audit_own_role_wins_over_qualification() {
    let service = service_with(TestAuditRepo::default());
    let identity = identity();

    service
        .set_role_qualification(&identity, "importateur".to_owned())
        .await
        .unwrap_or_else(|_| unreachable!());

    let created = service
        .create_or_update_draft(
            &identity,
            AuditDraftInput {
                title: "Role audit".to_owned(),
                economic_role: Some("fabricant".to_owned()),
                ..AuditDraftInput::default()
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let context = service
        .get_audit_context(&identity, created.audit.id())
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(context.economic_role.as_deref(), Some("fabricant"));
}
