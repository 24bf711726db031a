use serde::{Deserialize, Serialize};

use crate::UserId;

/// Access level attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Regular user: owns and manages their own audit resources.
    User,
    /// Administrator: additionally manages the shared question catalog.
    Admin,
}

impl AccountRole {
    /// Returns a stable storage value for the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parses a stored role value, defaulting unknown values to `User`.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }
}

/// User information persisted in the authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: UserId,
    display_name: String,
    email: String,
    role: AccountRole,
}

impl UserIdentity {
    /// Creates a user identity from authentication data.
    #[must_use]
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        email: impl Into<String>,
        role: AccountRole,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            email: email.into(),
            role,
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the account email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the account role.
    #[must_use]
    pub fn role(&self) -> AccountRole {
        self.role
    }

    /// Returns whether the identity carries administrator rights.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }
}
