use std::str::FromStr;

use conforma_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Criticality of a catalog question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    /// Deviation would be a minor non-conformity.
    Minor,
    /// Deviation would be a major non-conformity.
    Major,
    /// Deviation blocks certification.
    Critical,
}

impl Criticality {
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

impl FromStr for Criticality {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            "critical" => Ok(Self::Critical),
            _ => Err(AppError::Validation(format!(
                "unknown criticality '{value}'"
            ))),
        }
    }
}

/// Derives the stable key for a question from its identifying content.
///
/// The key survives catalog re-imports: the same clause, process name, and
/// question text always produce the same key, so saved responses keep
/// pointing at the right question.
#[must_use]
pub fn question_key(clause: &str, process_name: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(clause.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(process_name.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(text.trim().as_bytes());

    let digest = hasher.finalize();
    format!("q_{:x}", digest)[..34].to_owned()
}

/// A catalog question with its applicability metadata.
///
/// `economic_role = None` (or "all") and an empty `applicable_processes`
/// array both mean the question is generic and passes every filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: i64,
    question_key: NonEmptyString,
    referential_id: Option<i64>,
    process_id: Option<i64>,
    clause: Option<String>,
    text: NonEmptyString,
    criticality: Option<Criticality>,
    economic_role: Option<String>,
    applicable_processes: Vec<String>,
    expected_evidence: Option<String>,
}

impl Question {
    /// Creates a validated catalog question.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i64,
        question_key: impl Into<String>,
        referential_id: Option<i64>,
        process_id: Option<i64>,
        clause: Option<String>,
        text: impl Into<String>,
        criticality: Option<Criticality>,
        economic_role: Option<String>,
        applicable_processes: Vec<String>,
        expected_evidence: Option<String>,
    ) -> AppResult<Self> {
        let economic_role = economic_role.filter(|value| !value.trim().is_empty());
        let applicable_processes = applicable_processes
            .into_iter()
            .filter(|entry| !entry.trim().is_empty())
            .collect();

        Ok(Self {
            id,
            question_key: NonEmptyString::new(question_key)?,
            referential_id,
            process_id,
            clause: clause.filter(|value| !value.trim().is_empty()),
            text: NonEmptyString::new(text)?,
            criticality,
            economic_role,
            applicable_processes,
            expected_evidence,
        })
    }

    /// Returns the numeric catalog id.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the stable question key used for response upserts.
    #[must_use]
    pub fn question_key(&self) -> &str {
        self.question_key.as_str()
    }

    /// Returns the owning referential id, if scoped to one.
    #[must_use]
    pub fn referential_id(&self) -> Option<i64> {
        self.referential_id
    }

    /// Returns the primary process id, if scoped to one.
    #[must_use]
    pub fn process_id(&self) -> Option<i64> {
        self.process_id
    }

    /// Returns the regulatory clause reference.
    #[must_use]
    pub fn clause(&self) -> Option<&str> {
        self.clause.as_deref()
    }

    /// Returns the audit question text.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    /// Returns the criticality, if classified.
    #[must_use]
    pub fn criticality(&self) -> Option<Criticality> {
        self.criticality
    }

    /// Returns the economic role this question targets; `None` is generic.
    #[must_use]
    pub fn economic_role(&self) -> Option<&str> {
        self.economic_role.as_deref()
    }

    /// Returns the process tokens this question applies to; empty is generic.
    #[must_use]
    pub fn applicable_processes(&self) -> &[String] {
        &self.applicable_processes
    }

    /// Returns the expected evidence description.
    #[must_use]
    pub fn expected_evidence(&self) -> Option<&str> {
        self.expected_evidence.as_deref()
    }
}
