use std::str::FromStr;

use conforma_core::AppError;
use serde::{Deserialize, Serialize};

/// Severity of a non-conformity raised during an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    /// Isolated deviation without systemic impact.
    Minor,
    /// Systemic deviation requiring corrective action.
    Major,
    /// Deviation with direct product-safety impact.
    Critical,
}

impl FindingSeverity {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for FindingSeverity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            "critical" => Ok(Self::Critical),
            _ => Err(AppError::Validation(format!(
                "unknown finding severity '{value}'"
            ))),
        }
    }
}

/// Workflow status of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    /// Raised, not yet addressed.
    Open,
    /// Remediation started.
    InProgress,
    /// Remediation done, pending verification.
    Resolved,
    /// Verified and closed.
    Closed,
}

impl FindingStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for FindingStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(AppError::Validation(format!(
                "unknown finding status '{value}'"
            ))),
        }
    }
}

/// Workflow status of a remediation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Committed to, not yet started.
    Planned,
    /// Being carried out.
    InProgress,
    /// Finished.
    Completed,
}

impl ActionStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for ActionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "planned" => Ok(Self::Planned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(AppError::Validation(format!(
                "unknown action status '{value}'"
            ))),
        }
    }
}
