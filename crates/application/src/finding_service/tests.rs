use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use conforma_core::{AccountRole, AppError, AppResult, UserId, UserIdentity};
use conforma_domain::{ActionStatus, Audit, AuditStatus, FindingSeverity, FindingStatus};
use uuid::Uuid;

use super::{
    ActionInput, ActionRecord, FindingInput, FindingRecord, FindingRepository, FindingService,
};
use crate::audit_service::{
    AuditRecord, AuditRepository, AuditService, ResponseRecord, SaveResponseInput,
};

struct SingleAuditRepo {
    record: AuditRecord,
}

#[async_trait]
impl AuditRepository for SingleAuditRepo {
    async fn find_audit(&self, audit_id: Uuid) -> AppResult<Option<AuditRecord>> {
        Ok((self.record.audit.id() == audit_id).then(|| self.record.clone()))
    }

    async fn list_audits(&self, _user_id: UserId) -> AppResult<Vec<AuditRecord>> {
        Ok(vec![self.record.clone()])
    }

    async fn insert_audit(&self, _audit: &Audit) -> AppResult<AuditRecord> {
        Err(AppError::Internal("not used".to_owned()))
    }

    async fn update_audit(&self, _audit: &Audit) -> AppResult<AuditRecord> {
        Err(AppError::Internal("not used".to_owned()))
    }

    async fn set_status(&self, _audit_id: Uuid, _status: AuditStatus) -> AppResult<()> {
        Ok(())
    }

    async fn delete_audit(&self, _audit_id: Uuid) -> AppResult<()> {
        Ok(())
    }

    async fn upsert_response(
        &self,
        _audit_id: Uuid,
        _user_id: UserId,
        _input: &SaveResponseInput,
    ) -> AppResult<ResponseRecord> {
        Err(AppError::Internal("not used".to_owned()))
    }

    async fn list_responses(
        &self,
        _audit_id: Uuid,
        _user_id: UserId,
    ) -> AppResult<Vec<ResponseRecord>> {
        Ok(Vec::new())
    }

    async fn find_role_qualification(&self, _user_id: UserId) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn upsert_role_qualification(
        &self,
        _user_id: UserId,
        _economic_role: &str,
    ) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct TestFindingRepo {
    findings: Mutex<HashMap<Uuid, FindingRecord>>,
    actions: Mutex<HashMap<Uuid, ActionRecord>>,
}

impl TestFindingRepo {
    fn lock_err(what: &str) -> AppError {
        AppError::Internal(format!("failed to lock {what}"))
    }
}

#[async_trait]
impl FindingRepository for TestFindingRepo {
    async fn insert_finding(
        &self,
        audit_id: Uuid,
        input: &FindingInput,
    ) -> AppResult<FindingRecord> {
        let record = FindingRecord {
            id: Uuid::new_v4(),
            audit_id,
            title: input.title.clone(),
            description: input.description.clone(),
            severity: input.severity,
            status: input.status,
            clause: input.clause.clone(),
            created_at: Utc::now(),
        };
        self.findings
            .lock()
            .map_err(|_| Self::lock_err("findings"))?
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_findings(&self, audit_id: Uuid) -> AppResult<Vec<FindingRecord>> {
        Ok(self
            .findings
            .lock()
            .map_err(|_| Self::lock_err("findings"))?
            .values()
            .filter(|record| record.audit_id == audit_id)
            .cloned()
            .collect())
    }

    async fn find_finding(&self, id: Uuid) -> AppResult<Option<FindingRecord>> {
        Ok(self
            .findings
            .lock()
            .map_err(|_| Self::lock_err("findings"))?
            .get(&id)
            .cloned())
    }

    async fn update_finding(&self, id: Uuid, input: &FindingInput) -> AppResult<FindingRecord> {
        let mut findings = self.findings.lock().map_err(|_| Self::lock_err("findings"))?;
        let existing = findings
            .get(&id)
            .ok_or_else(|| AppError::NotFound("finding not stored".to_owned()))?;
        let record = FindingRecord {
            id,
            audit_id: existing.audit_id,
            title: input.title.clone(),
            description: input.description.clone(),
            severity: input.severity,
            status: input.status,
            clause: input.clause.clone(),
            created_at: existing.created_at,
        };
        findings.insert(id, record.clone());
        Ok(record)
    }

    async fn insert_action(
        &self,
        finding_id: Uuid,
        input: &ActionInput,
    ) -> AppResult<ActionRecord> {
        let record = ActionRecord {
            id: Uuid::new_v4(),
            finding_id,
            description: input.description.clone(),
            owner: input.owner.clone(),
            due_date: input.due_date,
            status: input.status,
            created_at: Utc::now(),
        };
        self.actions
            .lock()
            .map_err(|_| Self::lock_err("actions"))?
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_actions(&self, finding_id: Uuid) -> AppResult<Vec<ActionRecord>> {
        Ok(self
            .actions
            .lock()
            .map_err(|_| Self::lock_err("actions"))?
            .values()
            .filter(|record| record.finding_id == finding_id)
            .cloned()
            .collect())
    }

    async fn list_actions_for_audit(&self, _audit_id: Uuid) -> AppResult<Vec<ActionRecord>> {
        Ok(self
            .actions
            .lock()
            .map_err(|_| Self::lock_err("actions"))?
            .values()
            .cloned()
            .collect())
    }

    async fn find_action(&self, id: Uuid) -> AppResult<Option<ActionRecord>> {
        Ok(self
            .actions
            .lock()
            .map_err(|_| Self::lock_err("actions"))?
            .get(&id)
            .cloned())
    }

    async fn update_action(&self, id: Uuid, input: &ActionInput) -> AppResult<ActionRecord> {
        let mut actions = self.actions.lock().map_err(|_| Self::lock_err("actions"))?;
        let existing = actions
            .get(&id)
            .ok_or_else(|| AppError::NotFound("action not stored".to_owned()))?;
        let record = ActionRecord {
            id,
            finding_id: existing.finding_id,
            description: input.description.clone(),
            owner: input.owner.clone(),
            due_date: input.due_date,
            status: input.status,
            created_at: existing.created_at,
        };
        actions.insert(id, record.clone());
        Ok(record)
    }
}

fn identity() -> UserIdentity {
    UserIdentity::new(
        UserId::new(),
        "Nadia Auditor",
        "nadia@example.test",
        AccountRole::User,
    )
}

fn audit_record(owner: UserId) -> AppResult<AuditRecord> {
    let audit = Audit::new(
        Uuid::new_v4(),
        owner,
        None,
        "Supplier audit",
        AuditStatus::InProgress,
        vec![3],
        Vec::new(),
        None,
    )?;
    Ok(AuditRecord {
        audit,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    })
}

fn service_for(owner: UserId) -> AppResult<(FindingService, Uuid)> {
    let record = audit_record(owner)?;
    let audit_id = record.audit.id();
    let audit_service = AuditService::new(Arc::new(SingleAuditRepo { record }));
    let service = FindingService::new(audit_service, Arc::new(TestFindingRepo::default()));
    Ok((service, audit_id))
}

fn finding_input(title: &str) -> FindingInput {
    FindingInput {
        title: title.to_owned(),
        description: None,
        severity: FindingSeverity::Major,
        status: FindingStatus::Open,
        clause: Some("Art. 27".to_owned()),
    }
}

#[tokio::test]
async fn creating_a_finding_requires_a_title() -> AppResult<()> {
    let user = identity();
    let (service, audit_id) = service_for(user.user_id())?;

    let result = service
        .create_finding(&user, audit_id, finding_input("   "))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn findings_on_someone_elses_audit_report_not_found() -> AppResult<()> {
    let user = identity();
    let (service, audit_id) = service_for(UserId::new())?;

    let result = service
        .create_finding(&user, audit_id, finding_input("UDI label missing"))
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn actions_are_scoped_to_their_finding() -> AppResult<()> {
    let user = identity();
    let (service, audit_id) = service_for(user.user_id())?;

    let first = service
        .create_finding(&user, audit_id, finding_input("UDI label missing"))
        .await?;
    let second = service
        .create_finding(&user, audit_id, finding_input("PMS plan outdated"))
        .await?;

    service
        .create_action(
            &user,
            first.id,
            ActionInput {
                description: "Reprint labels with UDI carrier".to_owned(),
                owner: Some("QA".to_owned()),
                due_date: None,
                status: ActionStatus::Planned,
            },
        )
        .await?;

    let first_actions = service.list_actions(&user, first.id).await?;
    let second_actions = service.list_actions(&user, second.id).await?;

    assert_eq!(first_actions.len(), 1);
    assert!(second_actions.is_empty());
    Ok(())
}

#[tokio::test]
async fn updating_an_action_checks_ownership_through_the_finding() -> AppResult<()> {
    let owner = identity();
    let (service, audit_id) = service_for(owner.user_id())?;

    let finding = service
        .create_finding(&owner, audit_id, finding_input("CAPA overdue"))
        .await?;
    let action = service
        .create_action(
            &owner,
            finding.id,
            ActionInput {
                description: "Close CAPA 2026-014".to_owned(),
                owner: None,
                due_date: None,
                status: ActionStatus::Planned,
            },
        )
        .await?;

    let intruder = identity();
    let result = service
        .update_action(
            &intruder,
            action.id,
            ActionInput {
                description: "Close CAPA 2026-014".to_owned(),
                owner: None,
                due_date: None,
                status: ActionStatus::Completed,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));

    let updated = service
        .update_action(
            &owner,
            action.id,
            ActionInput {
                description: "Close CAPA 2026-014".to_owned(),
                owner: Some("Regulatory".to_owned()),
                due_date: None,
                status: ActionStatus::Completed,
            },
        )
        .await?;

    assert_eq!(updated.status, ActionStatus::Completed);
    assert_eq!(updated.owner.as_deref(), Some("Regulatory"));
    Ok(())
}
