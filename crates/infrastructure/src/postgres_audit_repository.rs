//! PostgreSQL-backed audit and response repository.
//!
//! Process selections are stored as raw JSON text; decoding always goes
//! through the tolerant token decoder so legacy double-encoded rows and
//! malformed values degrade to empty selections instead of failing reads.


use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use conforma_application::{AuditRecord, AuditRepository, ResponseRecord, SaveResponseInput};
use conforma_core::{AppError, AppResult, UserId};
use conforma_domain::{Audit, AuditStatus, ProcessToken, ResponseValue, decode_stored_tokens};

/// PostgreSQL implementation of the audit repository port.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    user_id: Uuid,
    site_id: Option<Uuid>,
    title: String,
    status: String,
    referential_ids: Vec<i64>,
    process_tokens: Option<String>,
    economic_role: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = AppError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let process_tokens = row
            .process_tokens
            .as_deref()
            .map(decode_stored_tokens)
            .unwrap_or_default();

        Ok(Self {
            audit: Audit::new(
                row.id,
                UserId::from_uuid(row.user_id),
                row.site_id,
                row.title,
                AuditStatus::from_str(&row.status)?,
                row.referential_ids,
                process_tokens,
                row.economic_role,
            )?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ResponseRow {
    id: Uuid,
    audit_id: Uuid,
    user_id: Uuid,
    question_key: String,
    value: String,
    comment: Option<String>,
    evidence_files: Vec<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ResponseRow> for ResponseRecord {
    type Error = AppError;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            audit_id: row.audit_id,
            user_id: UserId::from_uuid(row.user_id),
            question_key: row.question_key,
            value: ResponseValue::from_str(&row.value)?,
            comment: row.comment,
            evidence_files: row.evidence_files,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const AUDIT_COLUMNS: &str = "id, user_id, site_id, title, status, referential_ids, \
     process_tokens, economic_role, created_at, updated_at";

const RESPONSE_COLUMNS: &str = "id, audit_id, user_id, question_key, value, comment, \
     evidence_files, created_at, updated_at";

fn encode_tokens(tokens: &[ProcessToken]) -> AppResult<String> {
    serde_json::to_string(tokens)
        .map_err(|error| AppError::Internal(format!("failed to encode process tokens: {error}")))
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn find_audit(&self, audit_id: Uuid) -> AppResult<Option<AuditRecord>> {
        let row = sqlx::query_as::<_, AuditRow>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audits WHERE id = $1"
        ))
        .bind(audit_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find audit: {error}")))?;

        row.map(AuditRecord::try_from).transpose()
    }

    async fn list_audits(&self, user_id: UserId) -> AppResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audits WHERE user_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audits: {error}")))?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }

    async fn insert_audit(&self, audit: &Audit) -> AppResult<AuditRecord> {
        let row = sqlx::query_as::<_, AuditRow>(&format!(
            r#"
            INSERT INTO audits
                (id, user_id, site_id, title, status, referential_ids, process_tokens,
                 economic_role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {AUDIT_COLUMNS}
            "#
        ))
        .bind(audit.id())
        .bind(audit.user_id().as_uuid())
        .bind(audit.site_id())
        .bind(audit.title())
        .bind(audit.status().as_str())
        .bind(audit.referential_ids())
        .bind(encode_tokens(audit.process_tokens())?)
        .bind(audit.economic_role())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert audit: {error}")))?;

        AuditRecord::try_from(row)
    }

    async fn update_audit(&self, audit: &Audit) -> AppResult<AuditRecord> {
        let row = sqlx::query_as::<_, AuditRow>(&format!(
            r#"
            UPDATE audits
            SET site_id = $2, title = $3, status = $4, referential_ids = $5,
                process_tokens = $6, economic_role = $7, updated_at = now()
            WHERE id = $1
            RETURNING {AUDIT_COLUMNS}
            "#
        ))
        .bind(audit.id())
        .bind(audit.site_id())
        .bind(audit.title())
        .bind(audit.status().as_str())
        .bind(audit.referential_ids())
        .bind(encode_tokens(audit.process_tokens())?)
        .bind(audit.economic_role())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update audit: {error}")))?;

        row.map(AuditRecord::try_from)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("audit '{}' does not exist", audit.id())))
    }

    async fn set_status(&self, audit_id: Uuid, status: AuditStatus) -> AppResult<()> {
        sqlx::query("UPDATE audits SET status = $2, updated_at = now() WHERE id = $1")
            .bind(audit_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to set audit status: {error}")))?;
        Ok(())
    }

    async fn delete_audit(&self, audit_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM audits WHERE id = $1")
            .bind(audit_id)
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete audit: {error}")))?;
        Ok(())
    }

    async fn upsert_response(
        &self,
        audit_id: Uuid,
        user_id: UserId,
        input: &SaveResponseInput,
    ) -> AppResult<ResponseRecord> {
        let row = sqlx::query_as::<_, ResponseRow>(&format!(
            r#"
            INSERT INTO audit_responses
                (audit_id, user_id, question_key, value, comment, evidence_files)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (audit_id, user_id, question_key)
            DO UPDATE SET value = EXCLUDED.value,
                          comment = EXCLUDED.comment,
                          evidence_files = EXCLUDED.evidence_files,
                          updated_at = now()
            RETURNING {RESPONSE_COLUMNS}
            "#
        ))
        .bind(audit_id)
        .bind(user_id.as_uuid())
        .bind(&input.question_key)
        .bind(input.value.as_str())
        .bind(&input.comment)
        .bind(&input.evidence_files)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to save response: {error}")))?;

        ResponseRecord::try_from(row)
    }

    async fn list_responses(
        &self,
        audit_id: Uuid,
        user_id: UserId,
    ) -> AppResult<Vec<ResponseRecord>> {
        let rows = sqlx::query_as::<_, ResponseRow>(&format!(
            r#"
            SELECT {RESPONSE_COLUMNS}
            FROM audit_responses
            WHERE audit_id = $1 AND user_id = $2
            ORDER BY created_at
            "#
        ))
        .bind(audit_id)
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list responses: {error}")))?;

        rows.into_iter().map(ResponseRecord::try_from).collect()
    }

    async fn find_role_qualification(&self, user_id: UserId) -> AppResult<Option<String>> {
        let role: Option<(String,)> = sqlx::query_as(
            "SELECT economic_role FROM role_qualifications WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to look up role qualification: {error}"))
        })?;

        Ok(role.map(|(value,)| value))
    }

    async fn upsert_role_qualification(
        &self,
        user_id: UserId,
        economic_role: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_qualifications (user_id, economic_role)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET economic_role = EXCLUDED.economic_role
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(economic_role)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to save role qualification: {error}"))
        })?;

        Ok(())
    }
}
