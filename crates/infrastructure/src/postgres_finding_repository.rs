//! PostgreSQL-backed finding and action repository.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use conforma_application::{
    ActionInput, ActionRecord, FindingInput, FindingRecord, FindingRepository,
};
use conforma_core::{AppError, AppResult};
use conforma_domain::{ActionStatus, FindingSeverity, FindingStatus};

/// PostgreSQL implementation of the finding repository port.
#[derive(Clone)]
pub struct PostgresFindingRepository {
    pool: PgPool,
}

impl PostgresFindingRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FindingRow {
    id: Uuid,
    audit_id: Uuid,
    title: String,
    description: Option<String>,
    severity: String,
    status: String,
    clause: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<FindingRow> for FindingRecord {
    type Error = AppError;

    fn try_from(row: FindingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            audit_id: row.audit_id,
            title: row.title,
            description: row.description,
            severity: FindingSeverity::from_str(&row.severity)?,
            status: FindingStatus::from_str(&row.status)?,
            clause: row.clause,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActionRow {
    id: Uuid,
    finding_id: Uuid,
    description: String,
    owner: Option<String>,
    due_date: Option<chrono::NaiveDate>,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ActionRow> for ActionRecord {
    type Error = AppError;

    fn try_from(row: ActionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            finding_id: row.finding_id,
            description: row.description,
            owner: row.owner,
            due_date: row.due_date,
            status: ActionStatus::from_str(&row.status)?,
            created_at: row.created_at,
        })
    }
}

const FINDING_COLUMNS: &str =
    "id, audit_id, title, description, severity, status, clause, created_at";

const ACTION_COLUMNS: &str = "id, finding_id, description, owner, due_date, status, created_at";

#[async_trait]
impl FindingRepository for PostgresFindingRepository {
    async fn insert_finding(
        &self,
        audit_id: Uuid,
        input: &FindingInput,
    ) -> AppResult<FindingRecord> {
        let row = sqlx::query_as::<_, FindingRow>(&format!(
            r#"
            INSERT INTO findings (audit_id, title, description, severity, status, clause)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {FINDING_COLUMNS}
            "#
        ))
        .bind(audit_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.severity.as_str())
        .bind(input.status.as_str())
        .bind(&input.clause)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert finding: {error}")))?;

        FindingRecord::try_from(row)
    }

    async fn list_findings(&self, audit_id: Uuid) -> AppResult<Vec<FindingRecord>> {
        let rows = sqlx::query_as::<_, FindingRow>(&format!(
            "SELECT {FINDING_COLUMNS} FROM findings WHERE audit_id = $1 ORDER BY created_at"
        ))
        .bind(audit_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list findings: {error}")))?;

        rows.into_iter().map(FindingRecord::try_from).collect()
    }

    async fn find_finding(&self, id: Uuid) -> AppResult<Option<FindingRecord>> {
        let row = sqlx::query_as::<_, FindingRow>(&format!(
            "SELECT {FINDING_COLUMNS} FROM findings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find finding: {error}")))?;

        row.map(FindingRecord::try_from).transpose()
    }

    async fn update_finding(&self, id: Uuid, input: &FindingInput) -> AppResult<FindingRecord> {
        let row = sqlx::query_as::<_, FindingRow>(&format!(
            r#"
            UPDATE findings
            SET title = $2, description = $3, severity = $4, status = $5, clause = $6
            WHERE id = $1
            RETURNING {FINDING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.severity.as_str())
        .bind(input.status.as_str())
        .bind(&input.clause)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update finding: {error}")))?;

        row.map(FindingRecord::try_from)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("finding '{id}' does not exist")))
    }

    async fn insert_action(
        &self,
        finding_id: Uuid,
        input: &ActionInput,
    ) -> AppResult<ActionRecord> {
        let row = sqlx::query_as::<_, ActionRow>(&format!(
            r#"
            INSERT INTO actions (finding_id, description, owner, due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACTION_COLUMNS}
            "#
        ))
        .bind(finding_id)
        .bind(&input.description)
        .bind(&input.owner)
        .bind(input.due_date)
        .bind(input.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert action: {error}")))?;

        ActionRecord::try_from(row)
    }

    async fn list_actions(&self, finding_id: Uuid) -> AppResult<Vec<ActionRecord>> {
        let rows = sqlx::query_as::<_, ActionRow>(&format!(
            "SELECT {ACTION_COLUMNS} FROM actions WHERE finding_id = $1 ORDER BY created_at"
        ))
        .bind(finding_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list actions: {error}")))?;

        rows.into_iter().map(ActionRecord::try_from).collect()
    }

    async fn list_actions_for_audit(&self, audit_id: Uuid) -> AppResult<Vec<ActionRecord>> {
        let rows = sqlx::query_as::<_, ActionRow>(
            r#"
            SELECT a.id, a.finding_id, a.description, a.owner, a.due_date, a.status, a.created_at
            FROM actions a
            JOIN findings f ON f.id = a.finding_id
            WHERE f.audit_id = $1
            ORDER BY a.created_at
            "#,
        )
        .bind(audit_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list actions for audit: {error}"))
        })?;

        rows.into_iter().map(ActionRecord::try_from).collect()
    }

    async fn find_action(&self, id: Uuid) -> AppResult<Option<ActionRecord>> {
        let row = sqlx::query_as::<_, ActionRow>(&format!(
            "SELECT {ACTION_COLUMNS} FROM actions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find action: {error}")))?;

        row.map(ActionRecord::try_from).transpose()
    }

    async fn update_action(&self, id: Uuid, input: &ActionInput) -> AppResult<ActionRecord> {
        let row = sqlx::query_as::<_, ActionRow>(&format!(
            r#"
            UPDATE actions
            SET description = $2, owner = $3, due_date = $4, status = $5
            WHERE id = $1
            RETURNING {ACTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.description)
        .bind(&input.owner)
        .bind(input.due_date)
        .bind(input.status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update action: {error}")))?;

        row.map(ActionRecord::try_from)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("action '{id}' does not exist")))
    }
}
