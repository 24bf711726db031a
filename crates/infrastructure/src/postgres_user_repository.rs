//! PostgreSQL-backed user repository.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;

use conforma_application::{SubscriptionTier, UserRecord, UserRepository};
use conforma_core::{AccountRole, AppError, AppResult, UserId};

/// PostgreSQL implementation of the user repository port.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    display_name: String,
    password_hash: String,
    role: String,
    subscription_tier: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            display_name: row.display_name,
            password_hash: row.password_hash,
            role: AccountRole::from_stored(&row.role),
            subscription_tier: SubscriptionTier::from_str(&row.subscription_tier)?,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, email, display_name, password_hash, role, subscription_tier, created_at";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up user by email: {error}")))?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up user by id: {error}")))?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn create(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> AppResult<UserRecord> {
        let result = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, display_name, password_hash)
            VALUES (lower($1), $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(display_name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => UserRecord::try_from(row),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(
                        "an account with this email already exists".to_owned(),
                    ));
                }

                Err(AppError::Internal(format!("failed to create user: {error}")))
            }
        }
    }
}
