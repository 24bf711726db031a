use std::str::FromStr;

use conforma_core::{AppError, AppResult, NonEmptyString, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::process::ProcessToken;

/// Lifecycle state of an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Created through the wizard, still being configured.
    Draft,
    /// Questionnaire in progress.
    InProgress,
    /// Explicitly closed by the auditor.
    Completed,
}

impl AuditStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for AuditStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(Self::Draft),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(AppError::Validation(format!(
                "unknown audit status '{value}'"
            ))),
        }
    }
}

/// An audit engagement owned by a user, optionally tied to a site.
///
/// `referential_ids` and `process_tokens` are carried fully decoded; raw
/// JSON string encodings never cross the domain boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    id: Uuid,
    user_id: UserId,
    site_id: Option<Uuid>,
    title: NonEmptyString,
    status: AuditStatus,
    referential_ids: Vec<i64>,
    process_tokens: Vec<ProcessToken>,
    economic_role: Option<String>,
}

impl Audit {
    /// Creates a validated audit aggregate.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        user_id: UserId,
        site_id: Option<Uuid>,
        title: impl Into<String>,
        status: AuditStatus,
        referential_ids: Vec<i64>,
        process_tokens: Vec<ProcessToken>,
        economic_role: Option<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            user_id,
            site_id,
            title: NonEmptyString::new(title)?,
            status,
            referential_ids,
            process_tokens,
            economic_role: economic_role.filter(|value| !value.trim().is_empty()),
        })
    }

    /// Returns the audit identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the owning user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the audited site, if one is linked.
    #[must_use]
    pub fn site_id(&self) -> Option<Uuid> {
        self.site_id
    }

    /// Returns the audit title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> AuditStatus {
        self.status
    }

    /// Returns the selected regulatory referential ids.
    #[must_use]
    pub fn referential_ids(&self) -> &[i64] {
        &self.referential_ids
    }

    /// Returns the decoded process selection tokens.
    #[must_use]
    pub fn process_tokens(&self) -> &[ProcessToken] {
        &self.process_tokens
    }

    /// Returns the declared economic role, if the audit carries one.
    #[must_use]
    pub fn economic_role(&self) -> Option<&str> {
        self.economic_role.as_deref()
    }
}
