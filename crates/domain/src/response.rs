use std::str::FromStr;

use conforma_core::AppError;
use serde::{Deserialize, Serialize};

/// Fixed vocabulary for a questionnaire answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseValue {
    /// Requirement is met.
    Compliant,
    /// Requirement is not met.
    NonCompliant,
    /// Requirement is partially met.
    Partial,
    /// Requirement does not apply to this audit.
    NotApplicable,
    /// Answer started but not concluded.
    InProgress,
}

impl ResponseValue {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant => "non_compliant",
            Self::Partial => "partial",
            Self::NotApplicable => "not_applicable",
            Self::InProgress => "in_progress",
        }
    }

    /// Returns whether the answer counts as given for KPI purposes.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl FromStr for ResponseValue {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "compliant" => Ok(Self::Compliant),
            "non_compliant" => Ok(Self::NonCompliant),
            "partial" => Ok(Self::Partial),
            "not_applicable" => Ok(Self::NotApplicable),
            "in_progress" => Ok(Self::InProgress),
            _ => Err(AppError::Validation(format!(
                "unknown response value '{value}'"
            ))),
        }
    }
}
