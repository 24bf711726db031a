use std::str::FromStr;

use conforma_application::{QuestionnaireResult, SaveQuestionInput};
use conforma_core::AppResult;
use conforma_domain::{Criticality, Process, Question, Referential};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// API representation of a regulatory referential.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/referential-response.ts"
)]
pub struct ReferentialResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
}

impl From<Referential> for ReferentialResponse {
    fn from(referential: Referential) -> Self {
        Self {
            id: referential.id(),
            code: referential.code().to_owned(),
            name: referential.name().to_owned(),
        }
    }
}

/// API representation of a process category.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/process-response.ts"
)]
pub struct ProcessResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

impl From<Process> for ProcessResponse {
    fn from(process: Process) -> Self {
        Self {
            id: process.id(),
            slug: process.slug().to_owned(),
            name: process.name().to_owned(),
        }
    }
}

/// API representation of a catalog question.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/question-response.ts"
)]
pub struct QuestionResponse {
    pub id: i64,
    pub question_key: String,
    pub referential_id: Option<i64>,
    pub process_id: Option<i64>,
    pub clause: Option<String>,
    pub text: String,
    pub criticality: Option<String>,
    pub economic_role: Option<String>,
    pub applicable_processes: Vec<String>,
    pub expected_evidence: Option<String>,
}

impl From<Question> for QuestionResponse {
    fn from(question: Question) -> Self {
        Self {
            id: question.id(),
            question_key: question.question_key().to_owned(),
            referential_id: question.referential_id(),
            process_id: question.process_id(),
            clause: question.clause().map(ToOwned::to_owned),
            text: question.text().to_owned(),
            criticality: question
                .criticality()
                .map(|criticality| criticality.as_str().to_owned()),
            economic_role: question.economic_role().map(ToOwned::to_owned),
            applicable_processes: question.applicable_processes().to_vec(),
            expected_evidence: question.expected_evidence().map(ToOwned::to_owned),
        }
    }
}

/// Resolved questionnaire for one audit, with degradation flags.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/questionnaire-response.ts"
)]
pub struct QuestionnaireResponse {
    pub questions: Vec<QuestionResponse>,
    pub role_filter_relaxed: bool,
    pub degraded_to_catalog: bool,
}

impl From<QuestionnaireResult> for QuestionnaireResponse {
    fn from(result: QuestionnaireResult) -> Self {
        Self {
            questions: result
                .questions
                .into_iter()
                .map(QuestionResponse::from)
                .collect(),
            role_filter_relaxed: result.role_filter_relaxed,
            degraded_to_catalog: result.degraded_to_catalog,
        }
    }
}

/// Incoming payload for catalog question administration.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/save-question-request.ts"
)]
pub struct SaveQuestionRequest {
    pub referential_id: Option<i64>,
    pub process_id: Option<i64>,
    pub clause: Option<String>,
    pub text: String,
    pub criticality: Option<String>,
    pub economic_role: Option<String>,
    pub applicable_processes: Option<Vec<String>>,
    pub expected_evidence: Option<String>,
}

impl SaveQuestionRequest {
    /// Converts the payload into a validated service input.
    pub fn into_input(self) -> AppResult<SaveQuestionInput> {
        let criticality = self
            .criticality
            .filter(|value| !value.trim().is_empty())
            .map(|value| Criticality::from_str(value.as_str()))
            .transpose()?;

        Ok(SaveQuestionInput {
            referential_id: self.referential_id,
            process_id: self.process_id,
            clause: self.clause,
            text: self.text,
            criticality,
            economic_role: self.economic_role,
            applicable_processes: self.applicable_processes.unwrap_or_default(),
            expected_evidence: self.expected_evidence,
        })
    }
}
