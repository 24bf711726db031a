//! PostgreSQL-backed organisation and site repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use conforma_application::{
    DirectoryRepository, OrganisationInput, OrganisationRecord, SiteInput, SiteRecord,
};
use conforma_core::{AppError, AppResult, UserId};

/// PostgreSQL implementation of the directory repository port.
#[derive(Clone)]
pub struct PostgresDirectoryRepository {
    pool: PgPool,
}

impl PostgresDirectoryRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrganisationRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    description: Option<String>,
    sector: Option<String>,
    country: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<OrganisationRow> for OrganisationRecord {
    fn from(row: OrganisationRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId::from_uuid(row.user_id),
            name: row.name,
            description: row.description,
            sector: row.sector,
            country: row.country,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SiteRow {
    id: Uuid,
    user_id: Uuid,
    organisation_id: Option<Uuid>,
    name: String,
    address: Option<String>,
    city: Option<String>,
    country: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<SiteRow> for SiteRecord {
    fn from(row: SiteRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId::from_uuid(row.user_id),
            organisation_id: row.organisation_id,
            name: row.name,
            address: row.address,
            city: row.city,
            country: row.country,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl DirectoryRepository for PostgresDirectoryRepository {
    async fn insert_organisation(
        &self,
        user_id: UserId,
        input: &OrganisationInput,
    ) -> AppResult<OrganisationRecord> {
        let row = sqlx::query_as::<_, OrganisationRow>(
            r#"
            INSERT INTO organisations (user_id, name, description, sector, country)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, name, description, sector, country, created_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.sector)
        .bind(&input.country)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert organisation: {error}")))?;

        Ok(row.into())
    }

    async fn list_organisations(&self, user_id: UserId) -> AppResult<Vec<OrganisationRecord>> {
        let rows = sqlx::query_as::<_, OrganisationRow>(
            r#"
            SELECT id, user_id, name, description, sector, country, created_at
            FROM organisations
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list organisations: {error}")))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_organisation(&self, id: Uuid) -> AppResult<Option<OrganisationRecord>> {
        let row = sqlx::query_as::<_, OrganisationRow>(
            r#"
            SELECT id, user_id, name, description, sector, country, created_at
            FROM organisations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find organisation: {error}")))?;

        Ok(row.map(Into::into))
    }

    async fn update_organisation(
        &self,
        id: Uuid,
        input: &OrganisationInput,
    ) -> AppResult<OrganisationRecord> {
        let row = sqlx::query_as::<_, OrganisationRow>(
            r#"
            UPDATE organisations
            SET name = $2, description = $3, sector = $4, country = $5
            WHERE id = $1
            RETURNING id, user_id, name, description, sector, country, created_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.sector)
        .bind(&input.country)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update organisation: {error}")))?;

        row.map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("organisation '{id}' does not exist")))
    }

    async fn delete_organisation(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM organisations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete organisation: {error}"))
            })?;
        Ok(())
    }

    async fn insert_site(&self, user_id: UserId, input: &SiteInput) -> AppResult<SiteRecord> {
        let row = sqlx::query_as::<_, SiteRow>(
            r#"
            INSERT INTO sites (user_id, organisation_id, name, address, city, country)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, organisation_id, name, address, city, country, created_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(input.organisation_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.country)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert site: {error}")))?;

        Ok(row.into())
    }

    async fn list_sites(&self, user_id: UserId) -> AppResult<Vec<SiteRecord>> {
        let rows = sqlx::query_as::<_, SiteRow>(
            r#"
            SELECT id, user_id, organisation_id, name, address, city, country, created_at
            FROM sites
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list sites: {error}")))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_site(&self, id: Uuid) -> AppResult<Option<SiteRecord>> {
        let row = sqlx::query_as::<_, SiteRow>(
            r#"
            SELECT id, user_id, organisation_id, name, address, city, country, created_at
            FROM sites
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find site: {error}")))?;

        Ok(row.map(Into::into))
    }

    async fn update_site(&self, id: Uuid, input: &SiteInput) -> AppResult<SiteRecord> {
        let row = sqlx::query_as::<_, SiteRow>(
            r#"
            UPDATE sites
            SET organisation_id = $2, name = $3, address = $4, city = $5, country = $6
            WHERE id = $1
            RETURNING id, user_id, organisation_id, name, address, city, country, created_at
            "#,
        )
        .bind(id)
        .bind(input.organisation_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.country)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update site: {error}")))?;

        row.map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("site '{id}' does not exist")))
    }

    async fn delete_site(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM sites WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete site: {error}")))?;
        Ok(())
    }
}
