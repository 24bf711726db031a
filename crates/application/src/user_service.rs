//! User account ports and application service.
//!
//! Owns registration and password authentication. Failure responses are
//! deliberately generic so account existence cannot be probed.


use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use conforma_core::{AccountRole, AppError, AppResult, UserId};

/// Paid tier attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionTier {
    /// Free plan, single-site audits.
    Free,
    /// Paid plan for consultants.
    Pro,
    /// Multi-site organisation plan.
    Enterprise,
}

impl SubscriptionTier {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(AppError::Validation(format!(
                "unknown subscription tier '{value}'"
            ))),
        }
    }
}

/// User record returned by repository queries.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Canonical lower-cased email address.
    pub email: String,
    /// Display name shown in reports and the UI.
    pub display_name: String,
    /// Argon2id password hash.
    pub password_hash: String,
    /// Account role.
    pub role: AccountRole,
    /// Subscription tier.
    pub subscription_tier: SubscriptionTier,
    /// Account creation time.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Finds a user by their unique identifier.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Creates a new user record and returns it.
    async fn create(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> AppResult<UserRecord>;
}

/// Port for password hashing. Keeps the application layer free of direct
/// cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Result of a login attempt.
#[derive(Debug)]
pub enum AuthOutcome {
    /// Authentication succeeded; a session can be established.
    Authenticated(UserRecord),
    /// Authentication failed; the message never says why.
    Failed,
}

/// Parameters for user registration.
pub struct RegisterParams {
    /// Email address for the new account.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Display name.
    pub display_name: String,
}

const PASSWORD_MIN_LENGTH: usize = 12;

/// Application service for registration and authentication.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            user_repository,
            password_hasher,
        }
    }

    /// Registers a new user with email and password.
    pub async fn register(&self, params: RegisterParams) -> AppResult<UserRecord> {
        let email = params.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("a valid email is required".to_owned()));
        }

        if params.password.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(AppError::Validation(format!(
                "password must be at least {PASSWORD_MIN_LENGTH} characters"
            )));
        }

        let display_name = params.display_name.trim();
        if display_name.is_empty() {
            return Err(AppError::Validation("display name is required".to_owned()));
        }

        let existing = self.user_repository.find_by_email(&email).await?;
        if existing.is_some() {
            // Hash anyway so the conflict path is not observably faster.
            let _ = self.password_hasher.hash_password(&params.password);
            return Err(AppError::Conflict(
                "an account with this email may already exist".to_owned(),
            ));
        }

        let password_hash = self.password_hasher.hash_password(&params.password)?;
        self.user_repository
            .create(&email, display_name, &password_hash)
            .await
    }

    /// Authenticates a user with email and password.
    ///
    /// Returns [`AuthOutcome::Failed`] for unknown email and wrong password
    /// alike, and hashes in both cases to keep timing uniform.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthOutcome> {
        let email = email.trim().to_lowercase();
        let user = self.user_repository.find_by_email(&email).await?;

        let Some(user) = user else {
            let _ = self.password_hasher.hash_password(password);
            return Ok(AuthOutcome::Failed);
        };

        let password_valid = self
            .password_hasher
            .verify_password(password, &user.password_hash)?;

        if !password_valid {
            return Ok(AuthOutcome::Failed);
        }

        Ok(AuthOutcome::Authenticated(user))
    }

    /// Returns a user record by id, if it exists.
    pub async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        self.user_repository.find_by_id(user_id).await
    }
}
